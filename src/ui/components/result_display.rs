//! Captured photo and generated picture, side by side

use crate::camera::StillImage;
use crate::session::{Phase, Session};
use crate::ui::textures::TextureCache;
use crate::ui::theme::Theme;
use egui::{self, load::SizedTexture, RichText, Vec2};

pub struct ResultDisplay<'a> {
    session: &'a Session,
    textures: &'a mut TextureCache,
    theme: &'a Theme,
}

impl<'a> ResultDisplay<'a> {
    pub fn new(session: &'a Session, textures: &'a mut TextureCache, theme: &'a Theme) -> Self {
        Self {
            session,
            textures,
            theme,
        }
    }

    pub fn show(mut self, ui: &mut egui::Ui) {
        let column_width = ((ui.available_width() - self.theme.spacing) / 2.0).max(120.0);
        let image_size = Vec2::new(column_width, column_width * 0.75);

        ui.horizontal_top(|ui| {
            ui.vertical(|ui| {
                ui.set_width(column_width);
                ui.label(RichText::new("Your photo").strong().color(self.theme.text_secondary));
                if let Some(photo) = self.session.captured_image() {
                    show_still(ui, self.textures, photo, image_size, self.theme, "Captured photo");
                }
            });

            ui.add_space(self.theme.spacing);

            ui.vertical(|ui| {
                ui.set_width(column_width);
                let title = format!("{} costume", self.session.selected_name());
                ui.label(RichText::new(title).strong().color(self.theme.text_secondary));

                match self.session.phase() {
                    Phase::Generating => {
                        let response = ui.label(
                            RichText::new("Generating your costume...")
                                .italics()
                                .color(self.theme.accent),
                        );
                        response.widget_info(|| {
                            egui::WidgetInfo::labeled(
                                egui::WidgetType::Label,
                                true,
                                "Generation in progress",
                            )
                        });
                    }
                    Phase::Result => {
                        if let Some(generated) = self.session.generated_image() {
                            show_still(
                                ui,
                                self.textures,
                                generated,
                                image_size,
                                self.theme,
                                "Generated costume",
                            );
                        }
                    }
                    _ => {
                        ui.label(
                            RichText::new("Pick a Pokémon and press Generate")
                                .color(self.theme.text_muted),
                        );
                    }
                }
            });
        });
    }
}

fn show_still(
    ui: &mut egui::Ui,
    textures: &mut TextureCache,
    image: &StillImage,
    max_size: Vec2,
    theme: &Theme,
    label: &str,
) {
    match textures.still(ui.ctx(), image) {
        Some(texture) => {
            let response = ui.add(
                egui::Image::new(SizedTexture::from_handle(&texture))
                    .max_size(max_size)
                    .rounding(theme.card_rounding),
            );
            response.widget_info(|| egui::WidgetInfo::labeled(egui::WidgetType::Label, true, label));
        }
        None => {
            ui.label(RichText::new("Image could not be displayed").color(theme.error));
        }
    }
}
