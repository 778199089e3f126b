//! Phase-dependent action buttons

use crate::integration::UiAction;
use crate::session::{Phase, Session};
use crate::ui::theme::Theme;
use egui::{self, RichText, Vec2};

pub struct ActionBar<'a> {
    session: &'a Session,
    camera_ready: bool,
    theme: &'a Theme,
}

impl<'a> ActionBar<'a> {
    pub fn new(session: &'a Session, theme: &'a Theme) -> Self {
        Self {
            session,
            camera_ready: false,
            theme,
        }
    }

    /// Whether a preview frame is available to capture
    pub fn camera_ready(mut self, ready: bool) -> Self {
        self.camera_ready = ready;
        self
    }

    pub fn show(self, ui: &mut egui::Ui) -> Option<UiAction> {
        let mut action = None;

        ui.horizontal(|ui| match self.session.phase() {
            Phase::Idle => {
                if self.primary_button(ui, "Start Camera", true) {
                    action = Some(UiAction::Start);
                }
            }
            Phase::Capturing => {
                if self.primary_button(ui, "Take Photo", self.camera_ready) {
                    action = Some(UiAction::Capture);
                }
                if ui.button("Start Over").clicked() {
                    action = Some(UiAction::StartOver);
                }
            }
            Phase::Captured | Phase::Result => {
                let label = if self.session.phase() == Phase::Result {
                    "Generate New"
                } else {
                    "Generate"
                };
                // Left enabled so a missing selection reaches validation
                if self.primary_button(ui, label, true) {
                    action = Some(UiAction::Generate);
                }
                if ui.button("Retake Photo").clicked() {
                    action = Some(UiAction::Retake);
                }
                if ui.button("Start Over").clicked() {
                    action = Some(UiAction::StartOver);
                }
            }
            Phase::Generating => {
                self.primary_button(ui, "Generating...", false);
                if ui.button("Start Over").clicked() {
                    action = Some(UiAction::StartOver);
                }
            }
        });

        action
    }

    fn primary_button(&self, ui: &mut egui::Ui, label: &str, enabled: bool) -> bool {
        let button = egui::Button::new(
            RichText::new(label)
                .strong()
                .color(self.theme.text_primary),
        )
        .fill(self.theme.primary_button_fill())
        .rounding(self.theme.button_rounding)
        .min_size(Vec2::new(140.0, 36.0));

        let response = ui.add_enabled(enabled, button);
        response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, label));
        response.clicked()
    }
}
