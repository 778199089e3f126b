//! egui front end
//!
//! Everything on screen is derived from the session phase. Components only
//! read state and return the [`UiAction`] the user asked for; the app hands
//! those to the [`Controller`].

mod app;
pub mod components;
mod textures;
mod theme;

pub use app::CostumeApp;
pub use textures::TextureCache;
pub use theme::Theme;

use crate::integration::{Controller, UiAction};
use crate::session::Phase;
use components::{ActionBar, CameraPreview, ErrorBanner, ResultDisplay, SubjectSelector};
use egui::{self, RichText, Vec2};

/// Render the main content for the current phase
pub fn show_session(
    ui: &mut egui::Ui,
    controller: &Controller,
    textures: &mut TextureCache,
    theme: &Theme,
) -> Option<UiAction> {
    let session = controller.session();
    let mut action = None;

    if session.phase() != Phase::Capturing {
        textures.clear_preview();
    }
    let keep: Vec<_> = session
        .captured_image()
        .into_iter()
        .chain(session.generated_image())
        .map(|image| image.id())
        .collect();
    textures.retain(&keep);

    if session.phase() == Phase::Idle {
        ui.vertical_centered(|ui| {
            ui.add_space(theme.spacing_lg);
            ui.heading(RichText::new("Dress up as a Pokémon").color(theme.text_primary));
            ui.label(
                RichText::new("Take a photo, pick a Pokémon, and see yourself in costume.")
                    .color(theme.text_secondary),
            );
            ui.add_space(theme.spacing);
        });
    }

    ErrorBanner::new(session.last_error(), theme).show(ui);
    ui.add_space(theme.spacing_sm);

    if let Some(selected) = SubjectSelector::new(controller.catalog(), session, theme).show(ui) {
        action = Some(selected);
    }
    ui.add_space(theme.spacing_sm);

    match session.phase() {
        Phase::Idle => {}
        Phase::Capturing => {
            let max = Vec2::new(ui.available_width().min(800.0), 480.0);
            if let Some(preview_action) = CameraPreview::new(controller, textures, theme)
                .max_size(max)
                .show(ui)
            {
                action = Some(preview_action);
            }
        }
        Phase::Captured | Phase::Generating | Phase::Result => {
            ResultDisplay::new(session, textures, theme).show(ui);
        }
    }

    ui.add_space(theme.spacing);
    let camera_ready = controller.preview_frame_count() > 0;
    if let Some(bar_action) = ActionBar::new(session, theme)
        .camera_ready(camera_ready)
        .show(ui)
    {
        action = Some(bar_action);
    }

    action
}
