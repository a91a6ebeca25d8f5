//! The authoritative board shared by every connection.
//!
//! [`Board`] owns the only lock. Each public operation acquires it once and
//! runs to completion before releasing it, so a reader never observes a
//! half-applied post, pin, shake or clear. The state behind the lock is an
//! arena: notes and pins are keyed by integer ids, pins hold sets of note ids
//! and notes hold a count of the pins linked to them.

use crate::entity::{Note, NoteId, Pin, PinId};
use log::{debug, info};
use shared::{ErrorCode, Handshake, NoteFilter, NoteView, PinView};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use tokio::sync::Mutex;

/// Construction-time configuration problems
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be >= 0, got {value}")]
    NegativeDimension { name: &'static str, value: i32 },

    #[error("note size {note_width}x{note_height} does not fit on a {board_width}x{board_height} board")]
    NoteLargerThanBoard {
        board_width: i32,
        board_height: i32,
        note_width: i32,
        note_height: i32,
    },

    #[error("must provide at least one color")]
    NoColors,

    #[error("color names must be single non-empty tokens, got {0:?}")]
    InvalidColor(String),
}

/// Domain-rule violations; a failed operation leaves the board unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{color} is not a valid color")]
    ColorNotSupported { color: String },

    #[error("Note exceeds board boundaries")]
    OutOfBounds,

    #[error("Note overlaps an existing note entirely")]
    CompleteOverlap,

    #[error("No note contains the given point")]
    NoNoteAtCoordinate,

    #[error("No pin exists at the given coordinates")]
    PinNotFound,
}

impl BoardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BoardError::ColorNotSupported { .. } => ErrorCode::ColorNotSupported,
            BoardError::OutOfBounds => ErrorCode::OutOfBounds,
            BoardError::CompleteOverlap => ErrorCode::CompleteOverlap,
            BoardError::NoNoteAtCoordinate => ErrorCode::NoNoteAtCoordinate,
            BoardError::PinNotFound => ErrorCode::PinNotFound,
        }
    }
}

/// Immutable board dimensions, note size and allowed colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    board_width: i32,
    board_height: i32,
    note_width: i32,
    note_height: i32,
    colors: Vec<String>,
}

impl BoardConfig {
    /// Validates the configuration.
    ///
    /// Duplicate colors are collapsed, keeping the order of first occurrence.
    pub fn new<I, S>(
        (board_width, board_height): (i32, i32),
        (note_width, note_height): (i32, i32),
        colors: I,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (name, value) in [
            ("board_width", board_width),
            ("board_height", board_height),
            ("note_width", note_width),
            ("note_height", note_height),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeDimension { name, value });
            }
        }

        if note_width > board_width || note_height > board_height {
            return Err(ConfigError::NoteLargerThanBoard {
                board_width,
                board_height,
                note_width,
                note_height,
            });
        }

        let mut unique = Vec::new();
        for color in colors {
            let color = color.into();
            if color.is_empty() || color.chars().any(char::is_whitespace) {
                return Err(ConfigError::InvalidColor(color));
            }
            if !unique.contains(&color) {
                unique.push(color);
            }
        }
        if unique.is_empty() {
            return Err(ConfigError::NoColors);
        }

        Ok(Self {
            board_width,
            board_height,
            note_width,
            note_height,
            colors: unique,
        })
    }

    pub fn board_size(&self) -> (i32, i32) {
        (self.board_width, self.board_height)
    }

    pub fn note_size(&self) -> (i32, i32) {
        (self.note_width, self.note_height)
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn color_ok(&self, color: &str) -> bool {
        self.colors.iter().any(|c| c == color)
    }

    /// True if a note with its top-left corner at (x, y) lies fully on the board
    pub fn fits(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));

        x >= 0
            && y >= 0
            && x + i64::from(self.note_width) <= i64::from(self.board_width)
            && y + i64::from(self.note_height) <= i64::from(self.board_height)
    }

    pub fn handshake(&self) -> Handshake {
        Handshake {
            board_width: self.board_width,
            board_height: self.board_height,
            note_width: self.note_width,
            note_height: self.note_height,
            colors: self.colors.clone(),
        }
    }
}

/// How many notes and pins an operation removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub notes: usize,
    pub pins: usize,
}

/// Live notes and pins; only reachable through [`Board`]'s lock.
#[derive(Debug, Default)]
pub struct BoardState {
    notes: BTreeMap<NoteId, Note>,
    pins: BTreeMap<PinId, Pin>,
    next_note_id: NoteId,
    next_pin_id: PinId,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Creates a note and attaches it to every pin already inside its rectangle.
    pub fn post(
        &mut self,
        config: &BoardConfig,
        x: i32,
        y: i32,
        color: &str,
        message: &str,
    ) -> Result<NoteId, BoardError> {
        if !config.color_ok(color) {
            return Err(BoardError::ColorNotSupported {
                color: color.to_string(),
            });
        }
        if !config.fits(x, y) {
            return Err(BoardError::OutOfBounds);
        }
        if self.notes.values().any(|note| note.same_rectangle(x, y)) {
            return Err(BoardError::CompleteOverlap);
        }

        let id = self.next_note_id;
        self.next_note_id += 1;

        let note = Note::new(id, (x, y), config.note_size(), color, message);
        let covered: Vec<PinId> = self
            .pins
            .values()
            .filter(|pin| note.contains(pin.x, pin.y))
            .map(|pin| pin.id)
            .collect();

        self.notes.insert(id, note);
        for pin_id in covered {
            self.link(pin_id, id);
        }

        Ok(id)
    }

    /// Pins every note containing the point; returns how many notes it covers.
    pub fn pin_at(&mut self, x: i32, y: i32) -> Result<usize, BoardError> {
        let hits: Vec<NoteId> = self
            .notes
            .values()
            .filter(|note| note.contains(x, y))
            .map(|note| note.id)
            .collect();

        if hits.is_empty() {
            return Err(BoardError::NoNoteAtCoordinate);
        }

        let pin_id = match self.pin_id_at(x, y) {
            Some(id) => id,
            None => {
                let id = self.next_pin_id;
                self.next_pin_id += 1;
                self.pins.insert(id, Pin::new(id, x, y));
                id
            }
        };

        for note_id in &hits {
            self.link(pin_id, *note_id);
        }

        Ok(hits.len())
    }

    /// Removes the pin at the exact point; returns how many notes it released.
    pub fn unpin_at(&mut self, x: i32, y: i32) -> Result<usize, BoardError> {
        let pin = self
            .pin_id_at(x, y)
            .and_then(|id| self.pins.remove(&id))
            .ok_or(BoardError::PinNotFound)?;

        let mut released = 0;
        for note_id in pin.notes() {
            if let Some(note) = self.notes.get_mut(&note_id) {
                note.remove_pin_ref();
                released += 1;
            }
        }

        Ok(released)
    }

    /// Drops every unpinned note, then every pin left holding nothing.
    pub fn shake(&mut self) -> Removal {
        let loose: Vec<NoteId> = self
            .notes
            .values()
            .filter(|note| !note.is_pinned())
            .map(|note| note.id)
            .collect();

        for note_id in &loose {
            self.notes.remove(note_id);
        }
        for pin in self.pins.values_mut() {
            for note_id in &loose {
                pin.unlink(*note_id);
            }
        }

        let pins_before = self.pins.len();
        self.pins.retain(|_, pin| !pin.is_empty());

        Removal {
            notes: loose.len(),
            pins: pins_before - self.pins.len(),
        }
    }

    pub fn clear(&mut self) -> Removal {
        let removal = Removal {
            notes: self.notes.len(),
            pins: self.pins.len(),
        };
        self.notes.clear();
        self.pins.clear();
        removal
    }

    /// Notes matching every supplied filter, in posting order
    pub fn notes(&self, filter: &NoteFilter) -> Vec<NoteView> {
        self.notes
            .values()
            .filter(|note| note.matches(filter))
            .map(Note::view)
            .collect()
    }

    /// Pins in creation order
    pub fn pins(&self) -> Vec<PinView> {
        self.pins.values().map(Pin::view).collect()
    }

    /// Describes every broken invariant; empty when the state is consistent.
    pub fn audit(&self, config: &BoardConfig) -> Vec<String> {
        let mut problems = Vec::new();
        let mut corners = HashSet::new();

        for note in self.notes.values() {
            if !config.fits(note.x, note.y) {
                problems.push(format!("note {} at ({}, {}) is off the board", note.id, note.x, note.y));
            }
            if !config.color_ok(&note.color) {
                problems.push(format!("note {} has unsupported color {}", note.id, note.color));
            }
            if !corners.insert((note.x, note.y)) {
                problems.push(format!("note {} duplicates the rectangle at ({}, {})", note.id, note.x, note.y));
            }

            let linked = self.pins.values().filter(|pin| pin.holds(note.id)).count();
            if linked != note.pin_refs() {
                problems.push(format!(
                    "note {} counts {} pins but {} pins link it",
                    note.id,
                    note.pin_refs(),
                    linked
                ));
            }
        }

        for pin in self.pins.values() {
            if pin.is_empty() {
                problems.push(format!("pin {} at ({}, {}) holds no notes", pin.id, pin.x, pin.y));
            }
            for note_id in pin.notes() {
                if !self.notes.contains_key(&note_id) {
                    problems.push(format!("pin {} links missing note {}", pin.id, note_id));
                }
            }
        }

        problems
    }

    fn pin_id_at(&self, x: i32, y: i32) -> Option<PinId> {
        self.pins.values().find(|pin| pin.at(x, y)).map(|pin| pin.id)
    }

    /// Links both sides at once so the note's count always matches the pin sets
    fn link(&mut self, pin_id: PinId, note_id: NoteId) {
        if let (Some(pin), Some(note)) = (self.pins.get_mut(&pin_id), self.notes.get_mut(&note_id)) {
            if pin.link(note_id) {
                note.add_pin_ref();
            }
        }
    }
}

/// The shared board: fixed configuration plus lock-protected state.
pub struct Board {
    config: BoardConfig,
    state: Mutex<BoardState>,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BoardState::new()),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn color_ok(&self, color: &str) -> bool {
        self.config.color_ok(color)
    }

    pub async fn post(&self, x: i32, y: i32, color: &str, message: &str) -> Result<(), BoardError> {
        let result = {
            let mut state = self.state.lock().await;
            state.post(&self.config, x, y, color, message)
        };

        let id = result?;
        debug!("Posted note {} at ({}, {})", id, x, y);
        Ok(())
    }

    pub async fn pin_at(&self, x: i32, y: i32) -> Result<(), BoardError> {
        let covered = {
            let mut state = self.state.lock().await;
            state.pin_at(x, y)
        }?;

        debug!("Pinned ({}, {}) covering {} notes", x, y, covered);
        Ok(())
    }

    pub async fn unpin_at(&self, x: i32, y: i32) -> Result<(), BoardError> {
        let released = {
            let mut state = self.state.lock().await;
            state.unpin_at(x, y)
        }?;

        debug!("Unpinned ({}, {}) releasing {} notes", x, y, released);
        Ok(())
    }

    pub async fn shake(&self) -> Removal {
        let removal = self.state.lock().await.shake();
        info!("Shake removed {} notes and {} pins", removal.notes, removal.pins);
        removal
    }

    pub async fn clear(&self) -> Removal {
        let removal = self.state.lock().await.clear();
        info!("Clear removed {} notes and {} pins", removal.notes, removal.pins);
        removal
    }

    pub async fn get_notes(&self, filter: &NoteFilter) -> Vec<NoteView> {
        self.state.lock().await.notes(filter)
    }

    pub async fn pins_snapshot(&self) -> Vec<PinView> {
        self.state.lock().await.pins()
    }

    pub async fn audit(&self) -> Vec<String> {
        self.state.lock().await.audit(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn config() -> BoardConfig {
        BoardConfig::new((200, 100), (20, 10), ["red", "blue"]).unwrap()
    }

    fn all() -> NoteFilter {
        NoteFilter::default()
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            BoardConfig::new((-1, 100), (20, 10), ["red"]),
            Err(ConfigError::NegativeDimension {
                name: "board_width",
                value: -1
            })
        );
        assert!(matches!(
            BoardConfig::new((10, 10), (20, 10), ["red"]),
            Err(ConfigError::NoteLargerThanBoard { .. })
        ));
        assert_eq!(
            BoardConfig::new((10, 10), (5, 5), Vec::<String>::new()),
            Err(ConfigError::NoColors)
        );
        assert_eq!(
            BoardConfig::new((10, 10), (5, 5), ["dark red"]),
            Err(ConfigError::InvalidColor("dark red".to_string()))
        );
    }

    #[test]
    fn test_config_collapses_duplicate_colors() {
        let config = BoardConfig::new((10, 10), (5, 5), ["red", "blue", "red"]).unwrap();
        assert_eq!(config.colors(), ["red".to_string(), "blue".to_string()]);
        assert_eq!(config.handshake().lines()[2], "COLORS 2 red blue");
    }

    #[test]
    fn test_config_fits() {
        let config = config();
        assert!(config.fits(0, 0));
        assert!(config.fits(180, 90));
        assert!(!config.fits(181, 90));
        assert!(!config.fits(180, 91));
        assert!(!config.fits(-1, 0));
        assert!(!config.fits(i32::MAX, 0));
    }

    #[test]
    fn test_post_adds_unpinned_note() {
        let config = config();
        let mut state = BoardState::new();

        state.post(&config, 10, 10, "red", "hi").unwrap();

        let notes = state.notes(&all());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "hi");
        assert!(!notes[0].pinned);
    }

    #[test]
    fn test_post_checks_rules_in_order() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "first").unwrap();

        // Unsupported color wins over bounds and overlap
        assert_eq!(
            state.post(&config, 10, 10, "green", "x"),
            Err(BoardError::ColorNotSupported {
                color: "green".to_string()
            })
        );
        assert_eq!(
            state.post(&config, 500, 500, "green", "x").unwrap_err().code(),
            ErrorCode::ColorNotSupported
        );
        assert_eq!(state.post(&config, 190, 10, "red", "x"), Err(BoardError::OutOfBounds));
        assert_eq!(state.post(&config, 10, 10, "blue", "x"), Err(BoardError::CompleteOverlap));
        assert_eq!(state.note_count(), 1);
    }

    #[test]
    fn test_partial_overlap_is_allowed() {
        let config = config();
        let mut state = BoardState::new();

        state.post(&config, 10, 10, "red", "a").unwrap();
        state.post(&config, 15, 12, "red", "b").unwrap();
        assert_eq!(state.note_count(), 2);
    }

    #[test]
    fn test_pin_requires_note() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();

        assert_eq!(state.pin_at(50, 50), Err(BoardError::NoNoteAtCoordinate));
        assert_eq!(state.pin_count(), 0);
    }

    #[test]
    fn test_pin_covers_every_overlapping_note() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();
        state.post(&config, 15, 12, "blue", "b").unwrap();
        state.post(&config, 100, 50, "blue", "c").unwrap();

        assert_eq!(state.pin_at(16, 13), Ok(2));

        let pinned: Vec<bool> = state.notes(&all()).iter().map(|n| n.pinned).collect();
        assert_eq!(pinned, vec![true, true, false]);
        assert!(state.audit(&config).is_empty());
    }

    #[test]
    fn test_repin_is_idempotent() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();

        state.pin_at(15, 15).unwrap();
        state.pin_at(15, 15).unwrap();

        assert_eq!(state.pin_count(), 1);
        assert!(state.audit(&config).is_empty());

        // One unpin releases it completely
        state.unpin_at(15, 15).unwrap();
        assert!(!state.notes(&all())[0].pinned);
    }

    #[test]
    fn test_post_under_existing_pin_is_born_pinned() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();
        state.pin_at(15, 15).unwrap();

        state.post(&config, 12, 12, "blue", "b").unwrap();
        state.post(&config, 16, 16, "blue", "c").unwrap();

        let notes = state.notes(&all());
        assert!(notes[1].pinned);
        assert!(!notes[2].pinned);
        assert!(state.audit(&config).is_empty());
    }

    #[test]
    fn test_unpin() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();

        assert_eq!(state.unpin_at(15, 15), Err(BoardError::PinNotFound));

        state.pin_at(15, 15).unwrap();
        state.pin_at(12, 12).unwrap();

        // Still held by the second pin
        assert_eq!(state.unpin_at(15, 15), Ok(1));
        assert!(state.notes(&all())[0].pinned);

        assert_eq!(state.unpin_at(12, 12), Ok(1));
        assert!(!state.notes(&all())[0].pinned);
        assert_eq!(state.pin_count(), 0);
    }

    #[test]
    fn test_shake_removes_only_unpinned_notes() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "keep").unwrap();
        state.post(&config, 100, 50, "blue", "drop").unwrap();
        state.pin_at(15, 15).unwrap();

        let removal = state.shake();
        assert_eq!(removal, Removal { notes: 1, pins: 0 });

        let notes = state.notes(&all());
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "keep");

        assert_eq!(state.shake(), Removal::default());
        assert!(state.audit(&config).is_empty());
    }

    #[test]
    fn test_clear_ignores_pins() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();
        state.pin_at(15, 15).unwrap();

        assert_eq!(state.clear(), Removal { notes: 1, pins: 1 });
        assert_eq!(state.note_count(), 0);
        assert!(state.pins().is_empty());
    }

    #[test]
    fn test_filters_intersect() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 0, 0, "red", "Buy milk").unwrap();
        state.post(&config, 5, 5, "blue", "buy MILK now").unwrap();
        state.post(&config, 100, 50, "red", "milk run").unwrap();
        state.post(&config, 8, 3, "red", "call mom").unwrap();

        let red = state.notes(&all().with_color("red"));
        assert_eq!(red.len(), 3);

        let milk = state.notes(&all().referring_to("milk"));
        assert_eq!(milk.len(), 3);

        let near = state.notes(&all().containing(9, 6));
        assert_eq!(near.len(), 3);

        let both = state.notes(&all().with_color("red").referring_to("milk").containing(9, 6));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].message, "Buy milk");
    }

    #[test]
    fn test_pins_snapshot_order() {
        let config = config();
        let mut state = BoardState::new();
        state.post(&config, 10, 10, "red", "a").unwrap();
        state.pin_at(15, 15).unwrap();
        state.pin_at(11, 11).unwrap();

        assert_eq!(state.pins(), vec![PinView { x: 15, y: 15 }, PinView { x: 11, y: 11 }]);
    }

    #[tokio::test]
    async fn test_board_scenario() {
        let board = Board::new(config());

        board.post(10, 10, "red", "hi").await.unwrap();
        assert_eq!(
            board.post(10, 10, "red", "again").await,
            Err(BoardError::CompleteOverlap)
        );
        board.pin_at(15, 15).await.unwrap();
        assert!(board.get_notes(&all()).await[0].pinned);

        board.shake().await;
        assert_eq!(board.get_notes(&all()).await.len(), 1);

        board.unpin_at(15, 15).await.unwrap();
        board.shake().await;
        assert!(board.get_notes(&all()).await.is_empty());
        assert!(board.pins_snapshot().await.is_empty());
        assert!(board.color_ok("blue"));
        assert!(!board.color_ok("green"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_operations_keep_invariants() {
        let config = BoardConfig::new((60, 40), (10, 10), ["red", "blue"]).unwrap();
        let board = Arc::new(Board::new(config));

        let mut handles = Vec::new();
        for seed in 0..8u64 {
            let board = Arc::clone(&board);
            handles.push(tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..300 {
                    let x = rng.gen_range(-5..65);
                    let y = rng.gen_range(-5..45);
                    let _ = match rng.gen_range(0..10) {
                        0..=3 => board.post(x, y, "red", "fuzz").await,
                        4..=5 => board.pin_at(x, y).await,
                        6..=7 => board.unpin_at(x, y).await,
                        8 => {
                            board.shake().await;
                            Ok(())
                        }
                        _ => {
                            board.get_notes(&NoteFilter::default()).await;
                            Ok(())
                        }
                    };
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(board.audit().await, Vec::<String>::new());

        // With auto-attach, a note is pinned exactly when some pin lies inside it
        let (note_w, note_h) = board.config().note_size();
        let pins = board.pins_snapshot().await;
        for note in board.get_notes(&all()).await {
            let covered = pins.iter().any(|p| {
                p.x >= note.x && p.x < note.x + note_w && p.y >= note.y && p.y < note.y + note_h
            });
            assert_eq!(note.pinned, covered, "note at ({}, {})", note.x, note.y);
        }
    }
}
