//! Live camera preview, or the blocking device message in its place

use crate::integration::{Controller, UiAction};
use crate::ui::textures::TextureCache;
use crate::ui::theme::Theme;
use egui::{self, load::SizedTexture, RichText, Vec2};

pub struct CameraPreview<'a> {
    controller: &'a Controller,
    textures: &'a mut TextureCache,
    theme: &'a Theme,
    max_size: Vec2,
}

impl<'a> CameraPreview<'a> {
    pub fn new(controller: &'a Controller, textures: &'a mut TextureCache, theme: &'a Theme) -> Self {
        Self {
            controller,
            textures,
            theme,
            max_size: Vec2::new(640.0, 480.0),
        }
    }

    pub fn max_size(mut self, size: Vec2) -> Self {
        self.max_size = size;
        self
    }

    pub fn show(mut self, ui: &mut egui::Ui) -> Option<UiAction> {
        if let Some(message) = self.controller.device_error() {
            return self.show_device_error(ui, message);
        }

        match self.controller.preview_frame() {
            Some(frame) => {
                let texture =
                    self.textures
                        .preview(ui.ctx(), &frame, self.controller.preview_frame_count());
                let response = ui.add(
                    egui::Image::new(SizedTexture::from_handle(&texture))
                        .max_size(self.max_size)
                        .rounding(self.theme.card_rounding),
                );
                response.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Camera preview")
                });
            }
            None => {
                let response = ui.label(
                    RichText::new("Starting camera...").color(self.theme.text_muted),
                );
                response.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Label, true, "Camera starting")
                });
            }
        }
        None
    }

    fn show_device_error(&self, ui: &mut egui::Ui, message: &str) -> Option<UiAction> {
        let mut action = None;
        egui::Frame::none()
            .fill(self.theme.error.gamma_multiply(0.15))
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_lg)
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    let response =
                        ui.label(RichText::new(message).size(16.0).color(self.theme.error));
                    let label = format!("Camera error: {}", message);
                    response.widget_info(|| {
                        egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                    });

                    ui.add_space(self.theme.spacing_sm);
                    if ui.button("Retry Camera").clicked() {
                        action = Some(UiAction::RetryCamera);
                    }
                });
            });
        action
    }
}
