//! Display-space to image-space transforms and marker hit-testing.
//!
//! Everything downstream of this module works in image-pixel coordinates;
//! the transform runs once, where pointer input enters the canvas.

use crate::annotation::LabeledPoint;

/// Marker radius and hit radius, in display units.
pub const POINT_HIT_RADIUS: f32 = 10.0;

/// A position in the source image's native pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImagePoint {
    pub x: f32,
    pub y: f32,
}

impl ImagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: ImagePoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A pointer position in display units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen bounding box of the presentation surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn contains(&self, point: DisplayPoint) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }

    /// Largest rect with the image's aspect ratio, centered inside `self`.
    pub fn fit_centered(&self, image: ImageSize) -> DisplayRect {
        if image.is_empty() || self.width <= 0.0 || self.height <= 0.0 {
            return DisplayRect::new(self.left, self.top, 0.0, 0.0);
        }
        let zoom = (self.width / image.width as f32).min(self.height / image.height as f32);
        let width = image.width as f32 * zoom;
        let height = image.height as f32 * zoom;
        DisplayRect::new(
            self.left + (self.width - width) * 0.5,
            self.top + (self.height - height) * 0.5,
            width,
            height,
        )
    }
}

/// Natural pixel dimensions of the source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn axis_scale(image_extent: u32, display_extent: f32) -> f32 {
    if display_extent > 0.0 {
        image_extent as f32 / display_extent
    } else {
        0.0
    }
}

/// Per-axis `image / display` scale factors. A collapsed display axis scales to zero.
pub fn axis_scales(display: DisplayRect, image: ImageSize) -> (f32, f32) {
    (
        axis_scale(image.width, display.width),
        axis_scale(image.height, display.height),
    )
}

/// The wider of the two axis scales, so markers keep one visual size under
/// non-uniform stretching.
pub fn display_to_image_scale(display: DisplayRect, image: ImageSize) -> f32 {
    let (scale_x, scale_y) = axis_scales(display, image);
    scale_x.max(scale_y)
}

pub fn to_image_space(pointer: DisplayPoint, display: DisplayRect, image: ImageSize) -> ImagePoint {
    let (scale_x, scale_y) = axis_scales(display, image);
    ImagePoint::new(
        (pointer.x - display.left) * scale_x,
        (pointer.y - display.top) * scale_y,
    )
}

pub fn to_display_space(point: ImagePoint, display: DisplayRect, image: ImageSize) -> DisplayPoint {
    let (scale_x, scale_y) = axis_scales(display, image);
    let inverse = |scale: f32| if scale > 0.0 { 1.0 / scale } else { 0.0 };
    DisplayPoint::new(
        display.left + point.x * inverse(scale_x),
        display.top + point.y * inverse(scale_y),
    )
}

/// Index of the first marker (array order) whose hit circle contains `position`.
pub fn hit_test(
    points: &[LabeledPoint],
    position: ImagePoint,
    display_to_image_scale: f32,
) -> Option<usize> {
    hit_test_within(points, position, POINT_HIT_RADIUS * display_to_image_scale)
}

pub fn hit_test_within(
    points: &[LabeledPoint],
    position: ImagePoint,
    radius: f32,
) -> Option<usize> {
    points
        .iter()
        .position(|point| point.position().distance_to(position) <= radius)
}

#[cfg(test)]
mod tests {
    use super::{
        axis_scales, display_to_image_scale, hit_test, hit_test_within, to_display_space,
        to_image_space, DisplayPoint, DisplayRect, ImagePoint, ImageSize, POINT_HIT_RADIUS,
    };
    use crate::annotation::LabeledPoint;

    fn point(x: f32, y: f32, label: u32) -> LabeledPoint {
        LabeledPoint { x, y, label }
    }

    #[test]
    fn maps_pointer_with_independent_axis_scales() {
        let display = DisplayRect::new(100.0, 50.0, 400.0, 150.0);
        let image = ImageSize::new(800, 600);

        assert_eq!(axis_scales(display, image), (2.0, 4.0));
        let mapped = to_image_space(DisplayPoint::new(150.5, 60.0), display, image);
        assert_eq!(mapped, ImagePoint::new(101.0, 40.0));
    }

    #[test]
    fn display_scale_uses_wider_axis() {
        let display = DisplayRect::new(0.0, 0.0, 400.0, 150.0);
        assert_eq!(display_to_image_scale(display, ImageSize::new(800, 600)), 4.0);
    }

    #[test]
    fn collapsed_display_rect_degrades_to_zero_transform() {
        let display = DisplayRect::new(10.0, 10.0, 0.0, -5.0);
        let image = ImageSize::new(800, 600);

        assert_eq!(axis_scales(display, image), (0.0, 0.0));
        assert_eq!(
            to_image_space(DisplayPoint::new(50.0, 50.0), display, image),
            ImagePoint::new(0.0, 0.0)
        );
    }

    #[test]
    fn display_space_inverts_image_space() {
        let display = DisplayRect::new(20.0, 30.0, 400.0, 300.0);
        let image = ImageSize::new(800, 600);
        let pointer = DisplayPoint::new(120.0, 80.0);

        let back = to_display_space(to_image_space(pointer, display, image), display, image);
        assert!((back.x - pointer.x).abs() < 1e-4);
        assert!((back.y - pointer.y).abs() < 1e-4);
    }

    #[test]
    fn marker_center_always_hits() {
        let points = [point(40.0, 40.0, 1), point(300.0, 10.0, 2)];
        for radius in [0.0, 0.001, 1.0, 25.0] {
            assert_eq!(
                hit_test_within(&points, ImagePoint::new(300.0, 10.0), radius),
                Some(1)
            );
        }
    }

    #[test]
    fn overlapping_markers_resolve_to_lowest_index() {
        let points = [point(0.0, 0.0, 1), point(6.0, 0.0, 2), point(3.0, 0.0, 3)];
        assert_eq!(hit_test(&points, ImagePoint::new(3.0, 0.0), 1.0), Some(0));
    }

    #[test]
    fn hit_radius_scales_with_display_ratio() {
        let points = [point(100.0, 100.0, 1)];
        let probe = ImagePoint::new(100.0 + POINT_HIT_RADIUS * 1.5, 100.0);

        assert_eq!(hit_test(&points, probe, 1.0), None);
        assert_eq!(hit_test(&points, probe, 2.0), Some(0));
    }

    #[test]
    fn fit_keeps_aspect_and_centers() {
        let area = DisplayRect::new(0.0, 0.0, 1000.0, 400.0);
        let fitted = area.fit_centered(ImageSize::new(800, 600));

        assert!((fitted.height - 400.0).abs() < 1e-4);
        assert!((fitted.width - 533.3333).abs() < 1e-3);
        assert!((fitted.left - 233.3333).abs() < 1e-3);
        assert_eq!(fitted.top, 0.0);
    }
}
