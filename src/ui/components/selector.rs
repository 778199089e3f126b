//! Subject selector

use crate::catalog::Catalog;
use crate::integration::UiAction;
use crate::session::Session;
use crate::ui::theme::Theme;
use egui::{self, RichText};

/// Drop-down of catalog entries, locked while a generation is outstanding
pub struct SubjectSelector<'a> {
    catalog: &'a Catalog,
    session: &'a Session,
    theme: &'a Theme,
}

impl<'a> SubjectSelector<'a> {
    pub fn new(catalog: &'a Catalog, session: &'a Session, theme: &'a Theme) -> Self {
        Self {
            catalog,
            session,
            theme,
        }
    }

    pub fn show(self, ui: &mut egui::Ui) -> Option<UiAction> {
        let enabled = self.session.selection_enabled();
        let selected = self.session.selected_name();
        let selected_text = self
            .catalog
            .find(selected)
            .map(|entry| entry.label())
            .unwrap_or_else(|| selected.to_string());

        let mut action = None;
        ui.horizontal(|ui| {
            ui.label(RichText::new("Pokémon").color(self.theme.text_secondary));

            ui.add_enabled_ui(enabled, |ui| {
                let combo = egui::ComboBox::from_id_salt("subject_selector")
                    .selected_text(selected_text)
                    .width(220.0)
                    .height(320.0)
                    .show_ui(ui, |ui| {
                        for entry in self.catalog.entries() {
                            let is_selected = entry.name == selected;
                            if ui.selectable_label(is_selected, entry.label()).clicked()
                                && !is_selected
                            {
                                action = Some(UiAction::SelectName(entry.name.clone()));
                            }
                        }
                    });
                combo.response.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::ComboBox, enabled, "Pokémon selector")
                });
            });
        });
        action
    }
}
