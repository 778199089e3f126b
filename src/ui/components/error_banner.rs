//! Error message shown above the controls

use crate::ui::theme::Theme;
use egui::{self, RichText};

pub struct ErrorBanner<'a> {
    message: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> ErrorBanner<'a> {
    pub fn new(message: Option<&'a str>, theme: &'a Theme) -> Self {
        Self { message, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) {
        let Some(message) = self.message else {
            return;
        };

        egui::Frame::none()
            .fill(self.theme.error.gamma_multiply(0.15))
            .stroke(egui::Stroke::new(1.0, self.theme.error))
            .rounding(self.theme.button_rounding)
            .inner_margin(self.theme.spacing_sm)
            .show(ui, |ui| {
                let response = ui.label(RichText::new(message).color(self.theme.error));
                let label = format!("Error: {}", message);
                response.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                });
            });
    }
}
