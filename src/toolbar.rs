use egui::{vec2, Align, Layout, RichText, Ui};

use crate::state::EditorState;
use crate::theme::{AppTheme, WidthClass};
use crate::ui_controls;

#[derive(Debug, Default)]
pub struct ToolbarOutput {
    pub open: bool,
    pub paste: bool,
    pub undo: bool,
    pub redo: bool,
    pub copy: bool,
    pub save: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolbarPlan {
    pub button_width: f32,
    pub show_title: bool,
    pub show_shortcut_hint: bool,
}

pub fn plan_toolbar(width_class: WidthClass) -> ToolbarPlan {
    match width_class {
        WidthClass::Compact => ToolbarPlan {
            button_width: 64.0,
            show_title: false,
            show_shortcut_hint: false,
        },
        WidthClass::Regular => ToolbarPlan {
            button_width: 76.0,
            show_title: true,
            show_shortcut_hint: false,
        },
        WidthClass::Wide => ToolbarPlan {
            button_width: 84.0,
            show_title: true,
            show_shortcut_hint: true,
        },
    }
}

pub fn show_toolbar(
    ui: &mut Ui,
    theme: &AppTheme,
    state: &EditorState,
    width_class: WidthClass,
    copied_feedback: bool,
) -> ToolbarOutput {
    let plan = plan_toolbar(width_class);
    let size = vec2(plan.button_width, theme.controls.action_height);
    let idle = !state.is_loading();
    let has_image = state.current.image.is_some();
    let mut out = ToolbarOutput::default();

    ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
        ui.set_min_height(theme.layout.toolbar_height - 2.0 * theme.layout.panel_padding_y);
        ui.spacing_mut().item_spacing = vec2(theme.layout.control_gap, 0.0);

        if plan.show_title {
            ui.label(
                RichText::new("PolyPrompt")
                    .strong()
                    .color(theme.text.accent),
            );
            ui_controls::vertical_divider(ui, theme, 18.0);
        }

        ui.add_enabled_ui(idle, |ui| {
            out.open = ui_controls::ghost_button(ui, theme, "Open", size)
                .on_hover_text("Ctrl+O")
                .clicked();
            out.paste = ui_controls::ghost_button(ui, theme, "Paste", size)
                .on_hover_text("Ctrl+V")
                .clicked();
        });

        // Undo and redo vanish while a request is in flight.
        if idle {
            ui_controls::vertical_divider(ui, theme, 18.0);
            out.undo = ui
                .add_enabled_ui(state.can_undo(), |ui| {
                    ui_controls::ghost_button(ui, theme, "↩ Undo", size)
                })
                .inner
                .on_hover_text("Ctrl+Z")
                .clicked();
            out.redo = ui
                .add_enabled_ui(state.can_redo(), |ui| {
                    ui_controls::ghost_button(ui, theme, "↪ Redo", size)
                })
                .inner
                .on_hover_text("Ctrl+Shift+Z")
                .clicked();
        }

        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if plan.show_shortcut_hint {
                ui_controls::keycap(ui, theme, "S");
                ui.add_space(theme.layout.space_1);
                ui_controls::keycap(ui, theme, "Ctrl");
                ui.add_space(theme.layout.space_2);
            }

            out.save = ui
                .add_enabled_ui(has_image && idle, |ui| {
                    ui_controls::ghost_button(ui, theme, "Save", size)
                })
                .inner
                .clicked();

            let copy_text = if copied_feedback { "Copied" } else { "Copy" };
            out.copy = ui
                .add_enabled_ui(has_image, |ui| {
                    ui_controls::primary_button(ui, theme, copy_text, size)
                })
                .inner
                .clicked();
        });
    });

    out
}
