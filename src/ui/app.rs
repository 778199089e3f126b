//! Main application struct and eframe integration

use crate::integration::Controller;
use crate::session::Phase;
use crate::ui::textures::TextureCache;
use crate::ui::theme::Theme;
use crate::ui::show_session;
use egui::{self, CentralPanel, RichText, TopBottomPanel};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Preview refresh while the camera is live
const PREVIEW_REPAINT: Duration = Duration::from_millis(33);

/// Poll interval while waiting for the generation service
const GENERATION_REPAINT: Duration = Duration::from_millis(100);

pub struct CostumeApp {
    controller: Controller,
    textures: TextureCache,
    theme: Theme,
}

impl CostumeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, controller: Controller) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);

        Self {
            controller,
            textures: TextureCache::new(),
            theme,
        }
    }

    fn show_header(&self, ctx: &egui::Context) {
        TopBottomPanel::top("header")
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_secondary)
                    .inner_margin(12.0),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Pokémon Costume Booth")
                            .size(20.0)
                            .strong()
                            .color(self.theme.text_primary),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let phase = self.controller.phase();
                        let color = match phase {
                            Phase::Generating => self.theme.accent,
                            Phase::Result => self.theme.success,
                            _ => self.theme.text_muted,
                        };
                        ui.label(RichText::new(phase.to_string()).size(13.0).color(color));
                    });
                });
            });
    }

    fn show_content(&mut self, ctx: &egui::Context) {
        let action = CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.theme.bg_primary)
                    .inner_margin(self.theme.spacing_lg),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("content")
                    .show(ui, |ui| {
                        show_session(ui, &self.controller, &mut self.textures, &self.theme)
                    })
                    .inner
            })
            .inner;

        if let Some(action) = action {
            if let Err(e) = self.controller.handle(action) {
                if e.is_recoverable() {
                    debug!("[UI] {}", e);
                } else {
                    warn!("[UI] {}", e);
                }
            }
        }
    }
}

impl eframe::App for CostumeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.controller.poll_events();

        self.show_header(ctx);
        self.show_content(ctx);

        match self.controller.phase() {
            Phase::Capturing => ctx.request_repaint_after(PREVIEW_REPAINT),
            Phase::Generating => ctx.request_repaint_after(GENERATION_REPAINT),
            _ => {}
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("[UI] Window closing");
        self.controller.shutdown();
    }
}
