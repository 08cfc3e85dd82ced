use crate::geometry::ImagePoint;

/// Polygon vertex in image-pixel space. `label` is the 1-based position shown
/// on the marker, not an identity: it is rewritten whenever a point is removed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabeledPoint {
    pub x: f32,
    pub y: f32,
    pub label: u32,
}

impl LabeledPoint {
    pub fn position(&self) -> ImagePoint {
        ImagePoint::new(self.x, self.y)
    }
}

/// Ordered vertices of the region of interest. Array order is drawing order
/// and edge order; labels always read `1..=len`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    points: Vec<LabeledPoint>,
}

impl Polygon {
    pub const MIN_SUBMIT_POINTS: usize = 3;
    pub const MIN_OUTLINE_POINTS: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[LabeledPoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&LabeledPoint> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_submittable(&self) -> bool {
        self.points.len() >= Self::MIN_SUBMIT_POINTS
    }

    /// The interactive view starts outlining before the shape can be submitted.
    pub fn shows_outline(&self) -> bool {
        self.points.len() >= Self::MIN_OUTLINE_POINTS
    }

    pub fn labels(&self) -> impl Iterator<Item = u32> + '_ {
        self.points.iter().map(|point| point.label)
    }

    pub fn add_point(&self, pos: ImagePoint) -> Self {
        let mut points = self.points.clone();
        points.push(LabeledPoint {
            x: pos.x,
            y: pos.y,
            label: next_label(points.len()),
        });
        Self { points }
    }

    /// Out-of-range indices leave the polygon unchanged.
    pub fn move_point(&self, index: usize, pos: ImagePoint) -> Self {
        let mut points = self.points.clone();
        if let Some(point) = points.get_mut(index) {
            point.x = pos.x;
            point.y = pos.y;
        }
        Self { points }
    }

    /// Same points and labels with coordinates multiplied by `factor`, for
    /// drawing onto a resized copy of the image.
    pub fn scaled(&self, factor: f32) -> Self {
        let points = self
            .points
            .iter()
            .map(|point| LabeledPoint {
                x: point.x * factor,
                y: point.y * factor,
                ..*point
            })
            .collect();
        Self { points }
    }

    /// Drops the point carrying `label`, then renumbers the rest by position,
    /// so every later point shifts down by one.
    pub fn remove_point(&self, label: u32) -> Self {
        let points = self
            .points
            .iter()
            .filter(|point| point.label != label)
            .enumerate()
            .map(|(index, point)| LabeledPoint {
                label: next_label(index),
                ..*point
            })
            .collect();
        Self { points }
    }
}

fn next_label(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{LabeledPoint, Polygon};
    use crate::geometry::ImagePoint;

    fn polygon_of(coords: &[(f32, f32)]) -> Polygon {
        coords
            .iter()
            .fold(Polygon::new(), |polygon, &(x, y)| {
                polygon.add_point(ImagePoint::new(x, y))
            })
    }

    #[test]
    fn add_then_remove_first_relabels_in_order() {
        let polygon = polygon_of(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        assert_eq!(polygon.labels().collect::<Vec<_>>(), vec![1, 2, 3]);

        let trimmed = polygon.remove_point(1);
        assert_eq!(
            trimmed.points(),
            &[
                LabeledPoint {
                    x: 10.0,
                    y: 0.0,
                    label: 1
                },
                LabeledPoint {
                    x: 10.0,
                    y: 10.0,
                    label: 2
                },
            ]
        );
        assert_eq!(polygon.len(), 3, "original polygon is left untouched");
    }

    #[test]
    fn removing_middle_point_renumbers_every_later_point() {
        let polygon = polygon_of(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0), (5.0, 5.0)]);
        let trimmed = polygon.remove_point(2);

        let summary: Vec<(f32, u32)> = trimmed.points().iter().map(|p| (p.x, p.label)).collect();
        assert_eq!(summary, vec![(1.0, 1), (3.0, 2), (4.0, 3), (5.0, 4)]);
    }

    #[test]
    fn labels_stay_dense_after_any_removal() {
        let coords: Vec<(f32, f32)> = (0..7).map(|i| (i as f32 * 3.0, i as f32)).collect();
        let polygon = polygon_of(&coords);

        for label in 1..=7 {
            let trimmed = polygon.remove_point(label);
            let expected: Vec<u32> = (1..=6).collect();
            assert_eq!(trimmed.labels().collect::<Vec<_>>(), expected);
        }

        let mut shrinking = polygon;
        while !shrinking.is_empty() {
            let middle = (shrinking.len() as u32 + 1) / 2;
            shrinking = shrinking.remove_point(middle);
            let expected: Vec<u32> = (1..=shrinking.len() as u32).collect();
            assert_eq!(shrinking.labels().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn removing_unknown_label_is_a_no_op() {
        let polygon = polygon_of(&[(0.0, 0.0), (5.0, 5.0)]);
        assert_eq!(polygon.remove_point(9), polygon);
    }

    #[test]
    fn move_point_changes_only_target_coordinates() {
        let polygon = polygon_of(&[(10.0, 10.0), (50.0, 10.0), (30.0, 40.0)]);
        let moved = polygon.move_point(0, ImagePoint::new(20.0, 20.0));

        assert_eq!(
            moved.get(0),
            Some(&LabeledPoint {
                x: 20.0,
                y: 20.0,
                label: 1
            })
        );
        assert_eq!(moved.points()[1..], polygon.points()[1..]);
        assert_eq!(
            moved.labels().collect::<Vec<_>>(),
            polygon.labels().collect::<Vec<_>>()
        );
    }

    #[test]
    fn scaling_keeps_order_and_labels() {
        let polygon = polygon_of(&[(10.0, 20.0), (40.0, 8.0)]);
        let half = polygon.scaled(0.5);

        let coords: Vec<(f32, f32, u32)> =
            half.points().iter().map(|p| (p.x, p.y, p.label)).collect();
        assert_eq!(coords, vec![(5.0, 10.0, 1), (20.0, 4.0, 2)]);
        assert_eq!(polygon.scaled(1.0), polygon);
    }

    #[test]
    fn move_point_out_of_range_is_ignored() {
        let polygon = polygon_of(&[(10.0, 10.0)]);
        assert_eq!(polygon.move_point(4, ImagePoint::new(1.0, 1.0)), polygon);
    }

    #[test]
    fn thresholds_for_outline_and_submit_differ() {
        let two = polygon_of(&[(0.0, 0.0), (1.0, 1.0)]);
        assert!(two.shows_outline());
        assert!(!two.is_submittable());
        assert!(two.add_point(ImagePoint::new(2.0, 0.0)).is_submittable());
    }
}
