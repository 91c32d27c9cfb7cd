//! Snapshot-based undo/redo history.

use crate::element::{Element, ElementId};

/// Maximum number of snapshots to keep by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A full copy of a drawing's element set.
pub type Snapshot = Vec<Element>;

/// Linear, bounded list of snapshots with a cursor.
///
/// The snapshot under the cursor mirrors what is currently shown. Recording
/// after an undo prunes the redo branch.
///
/// Recording can be suspended for the duration of a gesture (a drag, say) so
/// that the gesture lands as a single entry.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    cursor: usize,
    limit: usize,
    in_gesture: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Create an empty history holding at most `limit` snapshots (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
            in_gesture: false,
        }
    }

    /// Create a history seeded with an initial snapshot.
    pub fn with_initial(snapshot: Snapshot, limit: usize) -> Self {
        let mut history = Self::new(limit);
        history.record(snapshot);
        history
    }

    /// Record a snapshot. Returns true if a new entry was added.
    ///
    /// No-op while a gesture is open or when `snapshot` equals the entry under
    /// the cursor.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        if self.in_gesture {
            return false;
        }
        self.push(snapshot)
    }

    fn push(&mut self, snapshot: Snapshot) -> bool {
        if self.current() == Some(&snapshot) {
            return false;
        }

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(snapshot);

        if self.snapshots.len() > self.limit {
            let overflow = self.snapshots.len() - self.limit;
            self.snapshots.drain(..overflow);
        }
        self.cursor = self.snapshots.len() - 1;
        log::trace!("History recorded entry {} of {}", self.cursor + 1, self.snapshots.len());
        true
    }

    /// Step back. Returns the snapshot now under the cursor, which the caller
    /// must restore.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 || self.snapshots.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward. Returns the snapshot now under the cursor.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Suspend recording until [`History::end_gesture`].
    pub fn begin_gesture(&mut self) {
        self.in_gesture = true;
    }

    /// Close a gesture and record its final state as one entry.
    pub fn end_gesture(&mut self, snapshot: Snapshot) -> bool {
        self.in_gesture = false;
        self.push(snapshot)
    }

    /// Close a gesture without recording anything.
    pub fn abort_gesture(&mut self) {
        self.in_gesture = false;
    }

    pub fn in_gesture(&self) -> bool {
        self.in_gesture
    }

    /// Follow an element id reassignment through every snapshot.
    pub fn rename(&mut self, old: &ElementId, new: &ElementId) {
        for element in self.snapshots.iter_mut().flatten() {
            if &element.id == old {
                element.id = new.clone();
            }
        }
    }

    /// Drop every entry and start over from `snapshot`.
    pub fn reset(&mut self, snapshot: Snapshot) {
        self.snapshots.clear();
        self.cursor = 0;
        self.in_gesture = false;
        self.push(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, Geometry};
    use kurbo::Point;

    fn snapshot(xs: &[f64]) -> Snapshot {
        xs.iter()
            .enumerate()
            .map(|(i, &x)| {
                Element::new(
                    ElementId::new(format!("e{i}")),
                    Geometry::at(ElementKind::Door, Point::new(x, 0.0)),
                )
            })
            .collect()
    }

    #[test]
    fn test_record_and_undo_redo() {
        let mut history = History::default();
        history.record(snapshot(&[]));
        history.record(snapshot(&[1.0]));
        history.record(snapshot(&[1.0, 2.0]));
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);

        assert_eq!(history.undo().cloned(), Some(snapshot(&[1.0])));
        assert_eq!(history.undo().cloned(), Some(snapshot(&[])));
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), 0);

        assert_eq!(history.redo().cloned(), Some(snapshot(&[1.0])));
        assert!(history.can_redo());
    }

    #[test]
    fn test_record_equal_snapshot_is_noop() {
        let mut history = History::default();
        assert!(history.record(snapshot(&[1.0])));
        assert!(!history.record(snapshot(&[1.0])));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_record_after_undo_prunes_redo_branch() {
        let s0 = snapshot(&[]);
        let s1 = snapshot(&[1.0]);
        let s2 = snapshot(&[1.0, 2.0]);
        let s3 = snapshot(&[3.0]);

        let mut history = History::default();
        history.record(s0.clone());
        history.record(s1.clone());
        history.record(s2.clone());
        history.undo();
        history.undo();
        history.record(s3.clone());

        assert!(!history.snapshots().contains(&s1));
        assert!(!history.snapshots().contains(&s2));
        assert_eq!(history.current(), Some(&s3));
        assert_eq!(history.snapshots(), &[s0, s3.clone()]);
        assert!(history.redo().is_none());
        assert_eq!(history.current(), Some(&s3));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.record(snapshot(&[i as f64]));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.snapshots()[0], snapshot(&[2.0]));
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_gesture_coalesces_entries() {
        let mut history = History::with_initial(snapshot(&[0.0]), 10);
        history.begin_gesture();
        for x in 1..20 {
            assert!(!history.record(snapshot(&[x as f64])));
        }
        assert!(history.end_gesture(snapshot(&[20.0])));
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().cloned(), Some(snapshot(&[0.0])));
    }

    #[test]
    fn test_rename_follows_through_snapshots() {
        let mut history = History::with_initial(snapshot(&[1.0]), 10);
        history.record(snapshot(&[1.0, 2.0]));
        history.rename(&ElementId::from("e0"), &ElementId::from("server-0"));
        assert!(history.snapshots().iter().all(|s| s[0].id.as_str() == "server-0"));
    }
}
