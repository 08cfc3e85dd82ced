//! tiny-skia plumbing shared by the interactive renderer and the mask compositor.

use anyhow::{anyhow, Result};
use image::RgbaImage;
use tiny_skia::{
    ColorU8, FillRule, LineJoin, Paint, Path, PathBuilder, Pixmap, PremultipliedColorU8, Stroke,
    Transform,
};

use crate::annotation::LabeledPoint;
use crate::color::Rgba;

pub fn allocate_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| anyhow!("cannot allocate {width}x{height} pixmap"))
}

/// Copies straight-alpha pixels into the premultiplied pixmap.
pub fn copy_image_to_pixmap(image: &RgbaImage, pixmap: &mut Pixmap) -> Result<()> {
    if image.width() != pixmap.width() || image.height() != pixmap.height() {
        return Err(anyhow!("source image and pixmap size mismatch"));
    }

    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(())
}

pub fn pixmap_to_image(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let straight = PremultipliedColorU8::demultiply(pixel);
        data.extend_from_slice(&[
            straight.red(),
            straight.green(),
            straight.blue(),
            straight.alpha(),
        ]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .ok_or_else(|| anyhow!("cannot construct output image"))
}

pub fn solid_paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

pub fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Closed path through every point in order. `None` when there is nothing to trace.
pub fn closed_polygon_path(points: &[LabeledPoint]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for point in rest {
        pb.line_to(point.x, point.y);
    }
    pb.close();
    pb.finish()
}

/// Fills then strokes `path`, the order a 2D canvas uses for `fill(); stroke();`.
pub fn fill_and_stroke(
    pixmap: &mut Pixmap,
    path: &Path,
    fill: Rgba,
    stroke_color: Rgba,
    stroke: &Stroke,
) {
    if fill[3] > 0 {
        pixmap.fill_path(
            path,
            &solid_paint(fill),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }
    if stroke_color[3] > 0 && stroke.width > 0.0 {
        pixmap.stroke_path(
            path,
            &solid_paint(stroke_color),
            stroke,
            Transform::identity(),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{allocate_pixmap, closed_polygon_path, copy_image_to_pixmap, pixmap_to_image};
    use crate::annotation::LabeledPoint;

    #[test]
    fn opaque_pixels_survive_pixmap_round_trip() {
        let image = RgbaImage::from_fn(7, 5, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 99, 255]));
        let mut pixmap = allocate_pixmap(7, 5).expect("pixmap");
        copy_image_to_pixmap(&image, &mut pixmap).expect("copy");

        assert_eq!(pixmap_to_image(&pixmap).expect("image"), image);
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let image = RgbaImage::new(4, 4);
        let mut pixmap = allocate_pixmap(3, 4).expect("pixmap");
        assert!(copy_image_to_pixmap(&image, &mut pixmap).is_err());
    }

    #[test]
    fn unrepresentable_pixmap_is_an_error() {
        assert!(allocate_pixmap(0, 10).is_err());
        assert!(allocate_pixmap(u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn empty_point_list_has_no_path() {
        assert!(closed_polygon_path(&[]).is_none());
        let segment = [
            LabeledPoint {
                x: 1.0,
                y: 1.0,
                label: 1,
            },
            LabeledPoint {
                x: 9.0,
                y: 1.0,
                label: 2,
            },
        ];
        assert!(closed_polygon_path(&segment).is_some());
    }
}
