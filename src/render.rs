//! Redraw of the editing surface: photo, polygon outline, numbered markers.

use ab_glyph::{point, Font, FontArc, PxScale, Rect, ScaleFont};
use anyhow::Result;
use image::{Rgba as Pixel, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tiny_skia::{PathBuilder, Pixmap, Transform};

use crate::annotation::Polygon;
use crate::color::{self, Rgba};
use crate::geometry::POINT_HIT_RADIUS;
use crate::raster;
use crate::state::InteractionCursor;

/// Outline width in display units.
pub const OUTLINE_WIDTH: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneStyle {
    pub outline_fill: Rgba,
    pub outline_stroke: Rgba,
    pub marker_fill: Rgba,
    pub marker_stroke: Rgba,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            outline_fill: color::TRANSPARENT,
            outline_stroke: color::ACCENT,
            marker_fill: color::ACCENT,
            marker_stroke: color::WHITE,
        }
    }
}

impl SceneStyle {
    /// Active markers swap fill and stroke.
    fn marker_colors(&self, active: bool) -> (Rgba, Rgba) {
        if active {
            (self.marker_stroke, self.marker_fill)
        } else {
            (self.marker_fill, self.marker_stroke)
        }
    }
}

/// Draws the scene at the image's natural size. Display scaling is left to the
/// canvas; `display_to_image_scale` only keeps strokes and markers at a
/// constant on-screen size.
pub fn render_scene(
    image: &RgbaImage,
    polygon: &Polygon,
    cursor: &InteractionCursor,
    display_to_image_scale: f32,
    style: &SceneStyle,
    font: Option<&FontArc>,
) -> Result<RgbaImage> {
    // A fresh pixmap starts fully transparent.
    let mut pixmap = raster::allocate_pixmap(image.width(), image.height())?;
    raster::copy_image_to_pixmap(image, &mut pixmap)?;

    if polygon.shows_outline() {
        if let Some(path) = raster::closed_polygon_path(polygon.points()) {
            raster::fill_and_stroke(
                &mut pixmap,
                &path,
                style.outline_fill,
                style.outline_stroke,
                &raster::round_stroke(OUTLINE_WIDTH * display_to_image_scale),
            );
        }
    }

    let radius = POINT_HIT_RADIUS * display_to_image_scale;
    for (index, point) in polygon.points().iter().enumerate() {
        draw_marker(
            &mut pixmap,
            point.x,
            point.y,
            radius,
            style.marker_colors(cursor.is_active(index)),
        );
    }

    let mut output = raster::pixmap_to_image(&pixmap)?;

    if let Some(font) = font {
        for (index, point) in polygon.points().iter().enumerate() {
            let (_, text) = style.marker_colors(cursor.is_active(index));
            draw_label(&mut output, font, point.x, point.y, radius, point.label, text);
        }
    }

    Ok(output)
}

fn draw_marker(pixmap: &mut Pixmap, x: f32, y: f32, radius: f32, (fill, stroke): (Rgba, Rgba)) {
    if radius <= 0.0 {
        return;
    }
    let Some(circle) = PathBuilder::from_circle(x, y, radius) else {
        return;
    };
    pixmap.fill_path(
        &circle,
        &raster::solid_paint(fill),
        tiny_skia::FillRule::Winding,
        Transform::identity(),
        None,
    );
    pixmap.stroke_path(
        &circle,
        &raster::solid_paint(stroke),
        &raster::round_stroke((radius * 0.2).max(1.0)),
        Transform::identity(),
        None,
    );
}

fn draw_label(
    image: &mut RgbaImage,
    font: &FontArc,
    x: f32,
    y: f32,
    radius: f32,
    label: u32,
    color: Rgba,
) {
    let text = label.to_string();
    let px = radius * 1.2;
    if px < 1.0 {
        return;
    }
    let Some(bounds) = glyph_bounds(font, px, &text) else {
        return;
    };
    draw_text_mut(
        image,
        Pixel(color),
        (x - (bounds.min.x + bounds.max.x) * 0.5).round() as i32,
        (y - (bounds.min.y + bounds.max.y) * 0.5).round() as i32,
        px,
        font,
        &text,
    );
}

/// Ink bounds of `text` relative to the origin `draw_text_mut` is given, using
/// the same baseline-at-ascent layout.
fn glyph_bounds(font: &FontArc, px: f32, text: &str) -> Option<Rect> {
    let scaled = font.as_scaled(PxScale::from(px));
    let mut caret = 0.0;
    let mut bounds: Option<Rect> = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        let glyph = id.with_scale_and_position(px, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let glyph_box = outlined.px_bounds();
        bounds = Some(match bounds {
            Some(acc) => Rect {
                min: point(acc.min.x.min(glyph_box.min.x), acc.min.y.min(glyph_box.min.y)),
                max: point(acc.max.x.max(glyph_box.max.x), acc.max.y.max(glyph_box.max.y)),
            },
            None => glyph_box,
        });
    }
    bounds
}

/// First readable font from the usual system locations.
pub fn load_system_font() -> Option<FontArc> {
    let candidates = [
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/SFNS.ttf",
        "/System/Library/Fonts/Supplemental/Helvetica.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        "C:\\Windows\\Fonts\\arialbd.ttf",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];

    for path in candidates {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                log::debug!("marker labels use {path}");
                return Some(font);
            }
        }
    }

    log::warn!("no system font found, markers are drawn without labels");
    None
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{load_system_font, render_scene, SceneStyle};
    use crate::annotation::Polygon;
    use crate::color::{ACCENT, WHITE};
    use crate::geometry::{ImagePoint, POINT_HIT_RADIUS};
    use crate::state::InteractionCursor;

    const BACKGROUND: Rgba<u8> = Rgba([30, 30, 30, 255]);

    fn polygon_of(coords: &[(f32, f32)]) -> Polygon {
        coords
            .iter()
            .fold(Polygon::new(), |polygon, &(x, y)| {
                polygon.add_point(ImagePoint::new(x, y))
            })
    }

    fn render(polygon: &Polygon, cursor: InteractionCursor, scale: f32) -> RgbaImage {
        let image = RgbaImage::from_pixel(200, 100, BACKGROUND);
        render_scene(&image, polygon, &cursor, scale, &SceneStyle::default(), None)
            .expect("render")
    }

    #[test]
    fn empty_polygon_renders_photo_only() {
        let output = render(&Polygon::new(), InteractionCursor::default(), 1.0);
        assert_eq!(output, RgbaImage::from_pixel(200, 100, BACKGROUND));
    }

    #[test]
    fn two_points_already_draw_a_closed_segment() {
        let polygon = polygon_of(&[(40.0, 50.0), (160.0, 50.0)]);
        let output = render(&polygon, InteractionCursor::default(), 1.0);

        assert_eq!(*output.get_pixel(100, 50), Rgba(ACCENT));
        assert_eq!(*output.get_pixel(100, 30), BACKGROUND);
    }

    #[test]
    fn single_point_draws_marker_without_outline() {
        let polygon = polygon_of(&[(50.0, 50.0)]);
        let output = render(&polygon, InteractionCursor::default(), 1.0);

        assert_eq!(*output.get_pixel(50, 50), Rgba(ACCENT));
        assert_eq!(*output.get_pixel(120, 50), BACKGROUND);
    }

    #[test]
    fn hovered_and_dragged_markers_invert_colors() {
        let polygon = polygon_of(&[(30.0, 50.0), (100.0, 50.0), (170.0, 50.0)]);
        let cursor = InteractionCursor {
            dragging: Some(0),
            hovered: Some(2),
        };
        let output = render(&polygon, cursor, 1.0);

        // 3px below center: inside the marker, clear of the outline stroke.
        assert_eq!(*output.get_pixel(30, 53), Rgba(WHITE));
        assert_eq!(*output.get_pixel(100, 53), Rgba(ACCENT));
        assert_eq!(*output.get_pixel(170, 53), Rgba(WHITE));
    }

    #[test]
    fn marker_size_follows_display_scale() {
        let polygon = polygon_of(&[(100.0, 50.0)]);
        let offset = (POINT_HIT_RADIUS * 1.5) as u32;

        let small = render(&polygon, InteractionCursor::default(), 1.0);
        let large = render(&polygon, InteractionCursor::default(), 2.0);

        assert_eq!(*small.get_pixel(100 + offset, 50), BACKGROUND);
        assert_ne!(*large.get_pixel(100 + offset, 50), BACKGROUND);
    }

    #[test]
    fn rendering_is_repeatable() {
        let polygon = polygon_of(&[(20.0, 20.0), (180.0, 30.0), (90.0, 90.0)]);
        let cursor = InteractionCursor {
            dragging: None,
            hovered: Some(1),
        };
        assert_eq!(render(&polygon, cursor, 1.5), render(&polygon, cursor, 1.5));
    }

    #[test]
    fn outline_width_follows_display_scale() {
        let segment = polygon_of(&[(40.0, 50.0), (160.0, 50.0)]);

        let thin = render(&segment, InteractionCursor::default(), 1.0);
        let thick = render(&segment, InteractionCursor::default(), 3.0);

        // Row 52 lies 2-3px below the line: outside a 2px stroke, inside a 6px one.
        assert_eq!(*thin.get_pixel(100, 52), BACKGROUND);
        assert_eq!(*thick.get_pixel(100, 52), Rgba(ACCENT));
    }

    #[test]
    fn label_is_centered_on_marker() {
        let Some(font) = load_system_font() else {
            return;
        };
        let image = RgbaImage::from_pixel(200, 100, BACKGROUND);
        let polygon = polygon_of(&[(100.0, 50.0)]);
        let radius = POINT_HIT_RADIUS * 2.0;
        let output = render_scene(
            &image,
            &polygon,
            &InteractionCursor::default(),
            2.0,
            &SceneStyle::default(),
            Some(&font),
        )
        .expect("render");

        // Label ink: anything inside the marker body that is not the fill.
        let inner = radius * 0.7;
        let ink: Vec<(u32, u32)> = output
            .enumerate_pixels()
            .filter(|(x, y, pixel)| {
                let dx = *x as f32 + 0.5 - 100.0;
                let dy = *y as f32 + 0.5 - 50.0;
                (dx * dx + dy * dy).sqrt() < inner && **pixel != Rgba(ACCENT)
            })
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!ink.is_empty(), "label was not drawn");

        let min_x = ink.iter().map(|p| p.0).min().expect("ink") as f32;
        let max_x = ink.iter().map(|p| p.0).max().expect("ink") as f32 + 1.0;
        let min_y = ink.iter().map(|p| p.1).min().expect("ink") as f32;
        let max_y = ink.iter().map(|p| p.1).max().expect("ink") as f32 + 1.0;
        assert!(((min_x + max_x) * 0.5 - 100.0).abs() <= 2.0, "x span {min_x}..{max_x}");
        assert!(((min_y + max_y) * 0.5 - 50.0).abs() <= 2.0, "y span {min_y}..{max_y}");
    }
}
