use egui::{
    vec2, Align, Id, Key, Layout, Modifiers, RichText, ScrollArea, TextEdit, TextStyle, Ui,
};

use crate::annotation::Polygon;
use crate::state::EditorState;
use crate::theme::AppTheme;
use crate::ui_controls;

const PROMPT_MAX_ROWS: usize = 5;

#[derive(Debug, Default)]
pub struct PromptBarOutput {
    pub remove_label: Option<u32>,
    pub prompt: Option<String>,
    pub submit: bool,
    pub attach: bool,
}

pub fn chip_text(label: u32) -> String {
    format!("{label}  Image area")
}

pub fn points_missing_hint(missing: usize) -> String {
    match missing {
        1 => "Add one more point to describe a change".to_string(),
        n => format!("Add {n} more points to describe a change"),
    }
}

/// The prompt box appears once the outline can be submitted.
pub fn shows_prompt_box(points: &Polygon) -> bool {
    points.is_submittable()
}

pub fn show_prompt_bar(ui: &mut Ui, theme: &AppTheme, state: &EditorState) -> PromptBarOutput {
    let mut out = PromptBarOutput::default();
    let points = &state.current.points;

    ui.add_enabled_ui(!state.is_loading(), |ui| {
        if !points.is_empty() {
            ui.horizontal_wrapped(|ui| {
                for label in points.labels() {
                    if ui_controls::removable_chip(ui, theme, &chip_text(label)).clicked() {
                        out.remove_label = Some(label);
                    }
                }
            });
            ui.add_space(theme.layout.space_1);
        }

        if shows_prompt_box(points) {
            let id = Id::new("prompt_box");
            let enter = ui.memory(|memory| memory.has_focus(id))
                && !ui.input(|input| input.modifiers.shift)
                && ui.input_mut(|input| input.consume_key(Modifiers::NONE, Key::Enter));

            let mut text = state.current.prompt.clone();
            let row_height = ui.text_style_height(&TextStyle::Body);
            let max_height = row_height * PROMPT_MAX_ROWS as f32 + theme.layout.space_2;
            let response = ScrollArea::vertical()
                .id_source("prompt_scroll")
                .max_height(max_height)
                .show(ui, |ui| {
                    ui.add(
                        TextEdit::multiline(&mut text)
                            .id(id)
                            .hint_text("Describe the change for the outlined area")
                            .desired_rows(1)
                            .desired_width(f32::INFINITY)
                            .lock_focus(true),
                    )
                })
                .inner;
            if response.changed() {
                out.prompt = Some(text);
            }
            if enter {
                out.submit = true;
            }
            ui.add_space(theme.layout.space_1);
        } else if !points.is_empty() {
            let missing = Polygon::MIN_SUBMIT_POINTS.saturating_sub(points.len());
            ui.label(
                RichText::new(points_missing_hint(missing))
                    .size(12.0)
                    .color(theme.text.muted),
            );
        }

        ui.horizontal(|ui| {
            let action_h = theme.controls.action_height;
            if ui_controls::ghost_button(ui, theme, "Attach image", vec2(110.0, action_h))
                .on_hover_text("Open an image file")
                .clicked()
            {
                out.attach = true;
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let ready = state.current.validate().is_ok();
                let send = ui.add_enabled_ui(ready, |ui| {
                    ui_controls::primary_button(ui, theme, "Send", vec2(84.0, action_h))
                });
                if send.inner.clicked() {
                    out.submit = true;
                }
                if shows_prompt_box(points) {
                    ui.add_space(theme.layout.space_2);
                    ui_controls::keycap(ui, theme, "Enter");
                }
            });
        });
    });

    out
}
