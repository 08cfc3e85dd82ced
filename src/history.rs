/// The two snapshots a submit leaves behind: `previous` to step back to, and
/// `redo` to re-send the exact request again. Nothing else writes to them.
#[derive(Clone, Debug)]
pub struct SubmitHistory<T: Clone> {
    previous: Option<T>,
    redo: Option<T>,
}

impl<T: Clone> Default for SubmitHistory<T> {
    fn default() -> Self {
        Self {
            previous: None,
            redo: None,
        }
    }
}

impl<T: Clone> SubmitHistory<T> {
    pub fn record_submit(&mut self, previous: T, redo: T) {
        self.previous = Some(previous);
        self.redo = Some(redo);
    }

    /// A re-sent request only moves the undo target; the redo snapshot stays.
    pub fn record_resubmit(&mut self, previous: T) {
        self.previous = Some(previous);
    }

    pub fn can_undo(&self) -> bool {
        self.previous.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.redo.is_some()
    }

    /// Hands out the undo target once; a second undo has nothing to return.
    pub fn take_undo(&mut self) -> Option<T> {
        self.previous.take()
    }

    pub fn redo_snapshot(&self) -> Option<T> {
        self.redo.clone()
    }

    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::SubmitHistory;

    #[test]
    fn submit_undo_redo_flow() {
        let mut history = SubmitHistory::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());

        history.record_submit("before", "request");
        assert_eq!(history.previous(), Some(&"before"));
        assert_eq!(history.take_undo(), Some("before"));
        assert_eq!(history.take_undo(), None);

        assert_eq!(history.redo_snapshot(), Some("request"));
        assert_eq!(history.redo_snapshot(), Some("request"), "redo can be replayed");

        history.record_resubmit("after redo");
        assert_eq!(history.take_undo(), Some("after redo"));
        assert_eq!(history.redo_snapshot(), Some("request"));
    }
}
