use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;

use crate::annotation::Polygon;
use crate::chat::ChatLog;
use crate::geometry::{self, ImagePoint, ImageSize};
use crate::history::SubmitHistory;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded bitmap shared between snapshots, the renderer and worker threads.
/// The id changes with every decode and serves as image identity.
#[derive(Clone, Debug)]
pub struct SourceImage {
    id: u64,
    pixels: Arc<RgbaImage>,
}

impl SourceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            pixels: Arc::new(pixels),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn shared_pixels(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.pixels)
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.pixels.width(), self.pixels.height())
    }
}

impl PartialEq for SourceImage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Why a submit quietly did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoImage,
    TooFewPoints,
    EmptyPrompt,
    /// A request is already in flight.
    Busy,
    NothingToRedo,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            SkipReason::NoImage => "Open an image first",
            SkipReason::TooFewPoints => "Mark at least three points",
            SkipReason::EmptyPrompt => "Describe the change first",
            SkipReason::Busy => "Still working on the last request",
            SkipReason::NothingToRedo => "Nothing to redo",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub image: Option<SourceImage>,
    pub points: Polygon,
    pub prompt: String,
}

impl Session {
    /// A fresh editing session on `image`: no points, no prompt.
    pub fn blank(image: Option<SourceImage>) -> Self {
        Self {
            image,
            points: Polygon::new(),
            prompt: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SkipReason> {
        if self.image.is_none() {
            return Err(SkipReason::NoImage);
        }
        if !self.points.is_submittable() {
            return Err(SkipReason::TooFewPoints);
        }
        if self.prompt.is_empty() {
            return Err(SkipReason::EmptyPrompt);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorStyle {
    Grabbing,
    Pointer,
    Crosshair,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionCursor {
    pub dragging: Option<usize>,
    pub hovered: Option<usize>,
}

impl InteractionCursor {
    pub fn is_active(&self, index: usize) -> bool {
        self.dragging == Some(index) || self.hovered == Some(index)
    }

    pub fn style(&self) -> CursorStyle {
        if self.dragging.is_some() {
            CursorStyle::Grabbing
        } else if self.hovered.is_some() {
            CursorStyle::Pointer
        } else {
            CursorStyle::Crosshair
        }
    }

    pub fn reset(&mut self) {
        self.dragging = None;
        self.hovered = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingRequest {
    Submit,
    Resubmit,
}

#[derive(Default)]
pub struct EditorState {
    pub current: Session,
    pub cursor: InteractionCursor,
    pub history: SubmitHistory<Session>,
    pub chat: ChatLog,
    pub pending: Option<PendingRequest>,
}

impl EditorState {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Undo and redo both hang off a previous snapshot that holds an image.
    fn has_undo_target(&self) -> bool {
        self.history.previous().is_some_and(|s| s.image.is_some())
    }

    pub fn can_undo(&self) -> bool {
        !self.is_loading() && self.has_undo_target()
    }

    pub fn can_redo(&self) -> bool {
        !self.is_loading() && self.has_undo_target() && self.history.can_redo()
    }

    /// New photo from the file picker or clipboard. The prompt survives.
    pub fn load_image(&mut self, pixels: RgbaImage) {
        self.current.image = Some(SourceImage::new(pixels));
        self.current.points = Polygon::new();
        self.cursor.reset();
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.current.image.as_ref().map(SourceImage::size)
    }

    pub fn pointer_pressed(&mut self, pos: ImagePoint, display_to_image_scale: f32) {
        if self.is_loading() || self.current.image.is_none() {
            return;
        }

        match geometry::hit_test(self.current.points.points(), pos, display_to_image_scale) {
            Some(index) => self.cursor.dragging = Some(index),
            None => self.current.points = self.current.points.add_point(pos),
        }
    }

    pub fn pointer_moved(&mut self, pos: ImagePoint, display_to_image_scale: f32) {
        if self.is_loading() || self.current.image.is_none() {
            return;
        }

        if let Some(index) = self.cursor.dragging {
            self.current.points = self.current.points.move_point(index, pos);
            return;
        }

        self.cursor.hovered =
            geometry::hit_test(self.current.points.points(), pos, display_to_image_scale);
    }

    pub fn pointer_released(&mut self) {
        if self.is_loading() {
            return;
        }
        self.cursor.dragging = None;
    }

    pub fn pointer_left(&mut self) {
        self.cursor.reset();
    }

    pub fn remove_point(&mut self, label: u32) {
        if self.is_loading() {
            return;
        }
        self.current.points = self.current.points.remove_point(label);
        self.cursor.reset();
    }

    pub fn set_prompt(&mut self, prompt: String) {
        self.current.prompt = prompt;
    }

    /// Validates the current session and marks a request in flight. The
    /// returned snapshot is what gets composited and sent.
    pub fn begin_submit(&mut self) -> Result<Session, SkipReason> {
        if self.is_loading() {
            return Err(SkipReason::Busy);
        }
        self.current.validate()?;
        self.pending = Some(PendingRequest::Submit);
        Ok(self.current.clone())
    }

    /// Runs once both composites exist, before the endpoint answers.
    pub fn commit_submission(&mut self, request: &Session, preview: Option<RgbaImage>) {
        self.history
            .record_submit(Session::blank(request.image.clone()), request.clone());
        self.chat.push_request(request.prompt.clone(), preview);
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        match self.history.take_undo() {
            Some(previous) => {
                self.current = previous;
                self.cursor.reset();
                true
            }
            None => false,
        }
    }

    /// Restores the last submitted session and, when it is still valid, marks
    /// it for re-sending.
    pub fn begin_redo(&mut self) -> Result<Session, SkipReason> {
        if self.is_loading() {
            return Err(SkipReason::Busy);
        }
        let snapshot = self
            .history
            .redo_snapshot()
            .filter(|_| self.has_undo_target())
            .ok_or(SkipReason::NothingToRedo)?;
        self.current = snapshot;
        self.cursor.reset();
        self.current.validate()?;
        self.pending = Some(PendingRequest::Resubmit);
        Ok(self.current.clone())
    }

    pub fn apply_generated(&mut self, pixels: RgbaImage) {
        if self.pending.take() == Some(PendingRequest::Resubmit) {
            if let Some(redo) = self.history.redo_snapshot() {
                self.history.record_resubmit(Session::blank(redo.image));
            }
        }

        let generated = SourceImage::new(pixels);
        self.chat.push_response(generated.pixels().clone());
        self.current = Session::blank(Some(generated));
        self.cursor.reset();
    }

    /// Clears the in-flight flag without touching any snapshot.
    pub fn fail_pending(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::{CursorStyle, EditorState, PendingRequest, SkipReason};
    use crate::geometry::ImagePoint;

    fn photo() -> RgbaImage {
        RgbaImage::from_pixel(400, 300, Rgba([10, 10, 10, 255]))
    }

    fn editor_with_triangle(prompt: &str) -> EditorState {
        let mut state = EditorState::default();
        state.load_image(photo());
        for (x, y) in [(50.0, 50.0), (300.0, 60.0), (200.0, 250.0)] {
            state.pointer_pressed(ImagePoint::new(x, y), 1.0);
            state.pointer_released();
        }
        state.set_prompt(prompt.to_string());
        state
    }

    #[test]
    fn press_on_empty_area_adds_labeled_point() {
        let state = editor_with_triangle("");
        let labels: Vec<u32> = state.current.points.labels().collect();
        assert_eq!(labels, vec![1, 2, 3]);
    }

    #[test]
    fn press_on_marker_starts_drag_instead_of_adding() {
        let mut state = editor_with_triangle("");
        state.pointer_pressed(ImagePoint::new(52.0, 49.0), 1.0);
        assert_eq!(state.cursor.dragging, Some(0));
        assert_eq!(state.current.points.len(), 3);
        assert_eq!(state.cursor.style(), CursorStyle::Grabbing);

        state.pointer_moved(ImagePoint::new(80.0, 90.0), 1.0);
        let moved = state.current.points.get(0).copied().expect("point");
        assert_eq!((moved.x, moved.y, moved.label), (80.0, 90.0, 1));

        state.pointer_released();
        assert_eq!(state.cursor.dragging, None);
    }

    #[test]
    fn hover_tracks_marker_under_pointer() {
        let mut state = editor_with_triangle("");
        state.pointer_moved(ImagePoint::new(301.0, 61.0), 1.0);
        assert_eq!(state.cursor.hovered, Some(1));
        assert_eq!(state.cursor.style(), CursorStyle::Pointer);

        state.pointer_moved(ImagePoint::new(150.0, 150.0), 1.0);
        assert_eq!(state.cursor.hovered, None);
        assert_eq!(state.cursor.style(), CursorStyle::Crosshair);
    }

    #[test]
    fn pointer_leave_resets_cursor() {
        let mut state = editor_with_triangle("");
        state.pointer_pressed(ImagePoint::new(50.0, 50.0), 1.0);
        state.cursor.hovered = Some(0);
        state.pointer_left();
        assert_eq!(state.cursor.dragging, None);
        assert_eq!(state.cursor.hovered, None);
    }

    #[test]
    fn loading_blocks_pointer_mutation() {
        let mut state = editor_with_triangle("make it blue");
        state.begin_submit().expect("valid session");
        state.pointer_pressed(ImagePoint::new(10.0, 10.0), 1.0);
        state.remove_point(1);
        assert_eq!(state.current.points.len(), 3);
    }

    #[test]
    fn submit_skips_incomplete_sessions() {
        let mut state = EditorState::default();
        assert_eq!(state.begin_submit(), Err(SkipReason::NoImage));

        state.load_image(photo());
        state.pointer_pressed(ImagePoint::new(10.0, 10.0), 1.0);
        state.set_prompt("x".into());
        assert_eq!(state.begin_submit(), Err(SkipReason::TooFewPoints));

        let mut state = editor_with_triangle("");
        assert_eq!(state.begin_submit(), Err(SkipReason::EmptyPrompt));
        assert!(!state.is_loading());
    }

    #[test]
    fn commit_records_previous_and_redo_snapshots() {
        let mut state = editor_with_triangle("add a hat");
        let request = state.begin_submit().expect("valid session");
        assert_eq!(state.pending, Some(PendingRequest::Submit));

        state.commit_submission(&request, None);
        let previous = state.history.previous().expect("previous");
        assert_eq!(previous.image, request.image);
        assert!(previous.points.is_empty());
        assert!(previous.prompt.is_empty());
        assert_eq!(state.history.redo_snapshot(), Some(request));
        assert_eq!(state.chat.len(), 1);
    }

    #[test]
    fn generated_image_replaces_session_and_undo_returns_to_source() {
        let mut state = editor_with_triangle("add a hat");
        let request = state.begin_submit().expect("valid session");
        state.commit_submission(&request, None);

        state.apply_generated(RgbaImage::new(64, 64));
        assert!(!state.is_loading());
        assert!(state.current.points.is_empty());
        assert!(state.current.prompt.is_empty());
        assert_ne!(state.current.image, request.image);
        assert_eq!(state.chat.len(), 2);

        assert!(state.undo());
        assert_eq!(state.current.image, request.image);
        assert!(state.current.points.is_empty());
        assert!(!state.can_undo(), "undo target is consumed");
    }

    #[test]
    fn failed_generation_keeps_committed_snapshots() {
        let mut state = editor_with_triangle("add a hat");
        let request = state.begin_submit().expect("valid session");
        state.commit_submission(&request, None);
        state.fail_pending();

        assert!(!state.is_loading());
        assert!(state.can_undo());
        assert_eq!(state.history.redo_snapshot(), Some(request.clone()));
        assert_eq!(state.current, request);
    }

    #[test]
    fn redo_restores_request_and_resubmits() {
        let mut state = editor_with_triangle("add a hat");
        let request = state.begin_submit().expect("valid session");
        state.commit_submission(&request, None);
        state.apply_generated(RgbaImage::new(64, 64));
        assert!(state.can_redo());

        let resent = state.begin_redo().expect("redo snapshot is valid");
        assert_eq!(resent, request);
        assert_eq!(state.current, request);
        assert_eq!(state.pending, Some(PendingRequest::Resubmit));

        state.apply_generated(RgbaImage::new(32, 32));
        assert_eq!(
            state.history.previous().and_then(|s| s.image.clone()),
            request.image
        );
        assert_eq!(state.chat.len(), 3, "resubmits add only the response");
    }

    #[test]
    fn new_image_clears_points_but_keeps_prompt() {
        let mut state = editor_with_triangle("keep me");
        state.load_image(photo());
        assert!(state.current.points.is_empty());
        assert_eq!(state.current.prompt, "keep me");
    }

    #[test]
    fn redo_is_refused_once_undo_consumed_previous() {
        let mut state = editor_with_triangle("add a hat");
        let request = state.begin_submit().expect("valid session");
        state.commit_submission(&request, None);
        state.apply_generated(RgbaImage::new(64, 64));
        assert!(state.undo());

        assert!(!state.can_redo());
        assert_eq!(state.begin_redo(), Err(SkipReason::NothingToRedo));
        assert!(!state.is_loading());
        assert!(state.current.points.is_empty(), "undo result is left alone");
    }

    #[test]
    fn redo_is_disabled_before_any_submit() {
        let mut state = editor_with_triangle("add a hat");
        assert!(!state.can_redo());
        assert_eq!(state.begin_redo(), Err(SkipReason::NothingToRedo));
    }
}
