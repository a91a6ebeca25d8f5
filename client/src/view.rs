//! Client-side picture of a board, assembled from GET and GET PINS replies

use serde::{Deserialize, Serialize};
use shared::{Handshake, NoteView, PinView};

/// Everything a client knows about the board at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub handshake: Handshake,
    pub notes: Vec<NoteView>,
    pub pins: Vec<PinView>,
}

impl BoardView {
    pub fn pinned_notes(&self) -> impl Iterator<Item = &NoteView> {
        self.notes.iter().filter(|note| note.pinned)
    }

    /// Notes whose rectangle covers the given point.
    ///
    /// Uses the note size from the handshake; the right and bottom edges are
    /// outside the note.
    pub fn notes_at(&self, x: i32, y: i32) -> Vec<&NoteView> {
        let (w, h) = (
            i64::from(self.handshake.note_width),
            i64::from(self.handshake.note_height),
        );
        let (x, y) = (i64::from(x), i64::from(y));

        self.notes
            .iter()
            .filter(|note| {
                let (nx, ny) = (i64::from(note.x), i64::from(note.y));
                nx <= x && x < nx + w && ny <= y && y < ny + h
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
