use ab_glyph::FontArc;
use egui::{
    vec2, Align2, Color32, ColorImage, CursorIcon, FontId, Painter, Pos2, Rect, Sense, Stroke,
    TextureHandle, TextureOptions, Ui,
};
use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::annotation::Polygon;
use crate::geometry::{self, DisplayPoint, DisplayRect, ImageSize, POINT_HIT_RADIUS};
use crate::render::{self, SceneStyle};
use crate::state::{CursorStyle, EditorState, InteractionCursor};
use crate::theme::AppTheme;

const CANVAS_INSET: f32 = 24.0;

/// Inputs of the last redraw. The scene texture is rebuilt only when one changes.
#[derive(Clone, Debug, PartialEq)]
struct RenderKey {
    image_id: u64,
    polygon: Polygon,
    cursor: InteractionCursor,
    scale: f32,
    preview_factor: f32,
}

/// The photo resized to what the canvas can show, kept between redraws.
struct PreviewBase {
    image_id: u64,
    pixels: RgbaImage,
}

pub struct CanvasView {
    texture: Option<TextureHandle>,
    rendered: Option<RenderKey>,
    font: Option<FontArc>,
    style: SceneStyle,
    pointer_inside: bool,
    preview: Option<PreviewBase>,
}

impl CanvasView {
    pub fn new() -> Self {
        Self {
            texture: None,
            rendered: None,
            font: render::load_system_font(),
            style: SceneStyle::default(),
            pointer_inside: false,
            preview: None,
        }
    }

    pub fn show(&mut self, ui: &mut Ui, theme: &AppTheme, state: &mut EditorState) {
        let Some(image_size) = state.image_size() else {
            empty_canvas(ui, theme);
            return;
        };

        let (canvas_rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(canvas_rect);
        draw_canvas_background(&painter, theme, canvas_rect);

        let display = to_display_rect(canvas_rect.shrink(CANVAS_INSET)).fit_centered(image_size);
        let image_rect = to_egui_rect(display);
        let scale = geometry::display_to_image_scale(display, image_size);

        self.handle_pointer(ui, state, &response, display);
        let factor = preview_factor(image_size, display, ui.ctx().pixels_per_point());
        self.refresh_texture(ui.ctx(), state, scale, factor);

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                image_rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        if let Some(anchor) = hover_hint_anchor(state, display) {
            painter.text(
                Pos2::new(anchor.x + POINT_HIT_RADIUS + 6.0, anchor.y),
                Align2::LEFT_CENTER,
                "drag to move",
                FontId::proportional(12.0),
                theme.text.primary,
            );
        }

        if state.is_loading() {
            painter.rect_filled(
                image_rect,
                0.0,
                Color32::from_rgba_unmultiplied(0, 0, 0, 110),
            );
            ui.put(
                Rect::from_center_size(image_rect.center(), vec2(36.0, 36.0)),
                egui::Spinner::new().size(36.0).color(theme.surfaces.accent),
            );
        }
    }

    fn handle_pointer(
        &mut self,
        ui: &Ui,
        state: &mut EditorState,
        response: &egui::Response,
        display: DisplayRect,
    ) {
        let (hover, pressed, released) = ui.input(|input| {
            (
                input.pointer.hover_pos(),
                input.pointer.primary_pressed(),
                input.pointer.primary_released(),
            )
        });

        let position = hover
            .filter(|_| response.hovered() || response.dragged())
            .map(|pos| DisplayPoint::new(pos.x, pos.y))
            .filter(|pos| display.contains(*pos));

        let Some(position) = position else {
            if self.pointer_inside {
                state.pointer_left();
                self.pointer_inside = false;
            }
            return;
        };
        self.pointer_inside = true;

        let Some(image_size) = state.image_size() else {
            return;
        };
        let image_pos = geometry::to_image_space(position, display, image_size);
        let scale = geometry::display_to_image_scale(display, image_size);

        if pressed {
            state.pointer_pressed(image_pos, scale);
        }
        state.pointer_moved(image_pos, scale);
        if released {
            state.pointer_released();
        }

        let icon = if state.is_loading() {
            CursorIcon::Progress
        } else {
            cursor_icon(state.cursor.style())
        };
        ui.ctx().set_cursor_icon(icon);
    }

    fn refresh_texture(
        &mut self,
        ctx: &egui::Context,
        state: &EditorState,
        scale: f32,
        factor: f32,
    ) {
        let Some(image) = state.current.image.as_ref() else {
            return;
        };

        let key = RenderKey {
            image_id: image.id(),
            polygon: state.current.points.clone(),
            cursor: state.cursor,
            scale,
            preview_factor: factor,
        };
        if self.rendered.as_ref() == Some(&key) {
            return;
        }

        // Markers and outline are drawn at preview resolution; the display
        // size of a preview pixel is `1 / (scale * factor)`.
        let base = if factor < 1.0 {
            let width = scaled_dimension(image.pixels().width(), factor);
            let height = scaled_dimension(image.pixels().height(), factor);
            let stale = self.preview.as_ref().map_or(true, |preview| {
                preview.image_id != image.id() || preview.pixels.dimensions() != (width, height)
            });
            if stale {
                log::debug!("preview base resized to {width}x{height}");
                self.preview = Some(PreviewBase {
                    image_id: image.id(),
                    pixels: imageops::resize(image.pixels(), width, height, FilterType::Triangle),
                });
            }
            self.preview.as_ref().map(|preview| &preview.pixels)
        } else {
            self.preview = None;
            None
        };

        let scene = match render::render_scene(
            base.unwrap_or(image.pixels()),
            &key.polygon.scaled(factor),
            &key.cursor,
            scale * factor,
            &self.style,
            self.font.as_ref(),
        ) {
            Ok(scene) => scene,
            Err(err) => {
                log::error!("cannot render scene: {err:#}");
                return;
            }
        };

        let size = [scene.width() as usize, scene.height() as usize];
        let color = ColorImage::from_rgba_unmultiplied(size, scene.as_raw());
        match self.texture.as_mut() {
            Some(texture) => texture.set(color, TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("scene", color, TextureOptions::LINEAR)),
        }
        self.rendered = Some(key);
    }
}

/// Share of the native resolution worth rendering: the on-screen pixel width
/// of the fitted image over its natural width, capped at 1.
fn preview_factor(image: ImageSize, display: DisplayRect, pixels_per_point: f32) -> f32 {
    if image.is_empty() || display.width <= 0.0 {
        return 1.0;
    }
    (display.width * pixels_per_point / image.width as f32).clamp(f32::EPSILON, 1.0)
}

fn scaled_dimension(size: u32, factor: f32) -> u32 {
    ((size as f32 * factor).round() as u32).max(1)
}

/// Display position of the hovered marker, while nothing is being dragged.
fn hover_hint_anchor(state: &EditorState, display: DisplayRect) -> Option<DisplayPoint> {
    if state.cursor.dragging.is_some() || state.is_loading() {
        return None;
    }
    let point = state.current.points.get(state.cursor.hovered?)?;
    let image_size = state.image_size()?;
    Some(geometry::to_display_space(point.position(), display, image_size))
}

fn cursor_icon(style: CursorStyle) -> CursorIcon {
    match style {
        CursorStyle::Grabbing => CursorIcon::Grabbing,
        CursorStyle::Pointer => CursorIcon::PointingHand,
        CursorStyle::Crosshair => CursorIcon::Crosshair,
    }
}

fn to_display_rect(rect: Rect) -> DisplayRect {
    DisplayRect::new(rect.min.x, rect.min.y, rect.width(), rect.height())
}

fn to_egui_rect(rect: DisplayRect) -> Rect {
    Rect::from_min_size(Pos2::new(rect.left, rect.top), vec2(rect.width, rect.height))
}

fn empty_canvas(ui: &mut Ui, theme: &AppTheme) {
    let (rect, _) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
    let painter = ui.painter_at(rect);
    draw_canvas_background(&painter, theme, rect);
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        "Open an image (Ctrl+O) or paste one (Ctrl+V)",
        FontId::proportional(18.0),
        theme.text.secondary,
    );
}

fn draw_canvas_background(painter: &Painter, theme: &AppTheme, rect: Rect) {
    painter.rect_filled(rect, 16.0, theme.surfaces.canvas_bg);
    painter.rect_stroke(rect, 16.0, Stroke::new(1.0, theme.surfaces.stroke_soft));
}
