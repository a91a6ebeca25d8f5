use shared::{NoteFilter, NoteView, PinView};
use std::collections::BTreeSet;

/// Arena key of a note; assigned in posting order.
pub type NoteId = u64;
/// Arena key of a pin; assigned in creation order.
pub type PinId = u64;

/// A posted note.
///
/// Position, size, color and message never change after posting. The only
/// mutable part is the number of pins currently linked to it, which the
/// board keeps equal to the number of pins whose note set holds this id.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: NoteId,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub color: String,
    pub message: String,
    pin_refs: usize,
}

impl Note {
    pub fn new(
        id: NoteId,
        (x, y): (i32, i32),
        (width, height): (i32, i32),
        color: &str,
        message: &str,
    ) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            color: color.to_string(),
            message: message.to_string(),
            pin_refs: 0,
        }
    }

    /// Half-open point-in-rectangle test shared by pinning and filtering
    pub fn contains(&self, px: i32, py: i32) -> bool {
        let (px, py) = (i64::from(px), i64::from(py));
        let (x, y) = (i64::from(self.x), i64::from(self.y));

        px >= x && px < x + i64::from(self.width) && py >= y && py < y + i64::from(self.height)
    }

    /// Notes are uniformly sized, so equal corners mean an identical rectangle
    pub fn same_rectangle(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_refs > 0
    }

    pub fn pin_refs(&self) -> usize {
        self.pin_refs
    }

    pub(crate) fn add_pin_ref(&mut self) {
        self.pin_refs += 1;
    }

    pub(crate) fn remove_pin_ref(&mut self) {
        self.pin_refs = self.pin_refs.saturating_sub(1);
    }

    pub fn matches(&self, filter: &NoteFilter) -> bool {
        if filter.is_empty() {
            return true;
        }
        if let Some(color) = &filter.color {
            if &self.color != color {
                return false;
            }
        }
        if let Some((px, py)) = filter.contains {
            if !self.contains(px, py) {
                return false;
            }
        }
        filter.refers_to_matches(&self.message)
    }

    pub fn view(&self) -> NoteView {
        NoteView {
            x: self.x,
            y: self.y,
            color: self.color.clone(),
            message: self.message.clone(),
            pinned: self.is_pinned(),
        }
    }
}

/// A pin holding down every note it was linked to.
#[derive(Debug, Clone)]
pub struct Pin {
    pub id: PinId,
    pub x: i32,
    pub y: i32,
    notes: BTreeSet<NoteId>,
}

impl Pin {
    pub fn new(id: PinId, x: i32, y: i32) -> Self {
        Self {
            id,
            x,
            y,
            notes: BTreeSet::new(),
        }
    }

    pub fn at(&self, x: i32, y: i32) -> bool {
        self.x == x && self.y == y
    }

    /// Returns true if the note was not linked before
    pub(crate) fn link(&mut self, note: NoteId) -> bool {
        self.notes.insert(note)
    }

    /// Returns true if the note was linked
    pub(crate) fn unlink(&mut self, note: NoteId) -> bool {
        self.notes.remove(&note)
    }

    pub fn holds(&self, note: NoteId) -> bool {
        self.notes.contains(&note)
    }

    pub fn notes(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.notes.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn view(&self) -> PinView {
        PinView {
            x: self.x,
            y: self.y,
        }
    }
}
