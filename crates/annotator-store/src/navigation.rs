//! Cursor movement and keyboard command dispatch
//!
//! The cursor is a small state machine over `[0, len)`:
//!
//! ```text
//!            next()            next()
//!  AtStart ─────────▶ Middle ─────────▶ AtEnd
//!          ◀─────────        ◀─────────
//!           previous()        previous()
//!
//!  Empty: both moves are no-ops
//! ```
//!
//! Keys map to commands through one fixed table ([`command_for`]).
//! [`dispatch`] applies the table to a store unless the event must be
//! suppressed.

use crate::persistence::SnapshotBackend;
use crate::store::ExperimentStore;
use annotator_schema::Annotation;

/// Where the cursor sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// No entries
    Empty,
    /// First entry (also the single-entry case)
    AtStart,
    /// Strictly between first and last
    Middle,
    /// Last entry of two or more
    AtEnd,
}

/// Bounds-checked index into the entry list
///
/// Invariant: `index < len` whenever `len > 0`, and `index == 0` when `len == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    index: usize,
    len: usize,
}

impl Cursor {
    /// Cursor at the first of `len` entries
    #[inline]
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    /// Current index
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of entries the cursor ranges over
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check for zero entries
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Classify the current index
    #[must_use]
    pub const fn position(&self) -> Position {
        if self.len == 0 {
            Position::Empty
        } else if self.index == 0 {
            Position::AtStart
        } else if self.index + 1 == self.len {
            Position::AtEnd
        } else {
            Position::Middle
        }
    }

    /// Whether [`Cursor::previous`] would move
    #[inline]
    #[must_use]
    pub const fn can_go_previous(&self) -> bool {
        self.index > 0
    }

    /// Whether [`Cursor::next`] would move
    #[inline]
    #[must_use]
    pub const fn can_go_next(&self) -> bool {
        self.index + 1 < self.len
    }

    /// Step back one entry; returns whether the cursor moved
    pub fn previous(&mut self) -> bool {
        if self.can_go_previous() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one entry; returns whether the cursor moved
    pub fn next(&mut self) -> bool {
        if self.can_go_next() {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

/// Discrete key identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Left arrow
    ArrowLeft,
    /// Right arrow
    ArrowRight,
    /// Printable character
    Char(char),
    /// Anything else, by name
    Other(String),
}

/// Surface the key event came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Not inside an editable field
    #[default]
    Global,
    /// Free-text editing surface (notes); never intercepted
    TextField,
}

/// One key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key pressed
    pub key: Key,
    /// Originating surface
    pub source: InputSource,
}

impl KeyEvent {
    /// Key pressed outside any text field
    #[inline]
    #[must_use]
    pub fn global(key: Key) -> Self {
        Self {
            key,
            source: InputSource::Global,
        }
    }

    /// Key typed into a text field
    #[inline]
    #[must_use]
    pub fn in_text_field(key: Key) -> Self {
        Self {
            key,
            source: InputSource::TextField,
        }
    }
}

/// Action bound to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Move to previous entry
    Previous,
    /// Move to next entry
    Next,
    /// Toggle verdict on current entry
    Toggle(Annotation),
}

/// Why a key event was not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// No experiment, or one without entries
    NoData,
    /// Event originated from a text field
    TextInput,
}

/// Result of [`dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Command ran (a move at a boundary still counts as run)
    Applied(Command),
    /// Nothing ran
    Suppressed(SuppressReason),
    /// Key has no binding
    Unbound,
}

/// Fixed key table
///
/// | key | command |
/// |---|---|
/// | `←` | previous |
/// | `→` | next |
/// | `y` / `Y` | toggle pass |
/// | `n` / `N` | toggle fail |
#[must_use]
pub fn command_for(key: &Key) -> Option<Command> {
    match key {
        Key::ArrowLeft => Some(Command::Previous),
        Key::ArrowRight => Some(Command::Next),
        Key::Char('y' | 'Y') => Some(Command::Toggle(Annotation::Pass)),
        Key::Char('n' | 'N') => Some(Command::Toggle(Annotation::Fail)),
        Key::Char(_) | Key::Other(_) => None,
    }
}

/// Route a key event to the store
///
/// Suppressed entirely (no move, no mutation) when the store has no entries
/// or the event comes from a text field.
pub fn dispatch<B: SnapshotBackend>(store: &mut ExperimentStore<B>, event: &KeyEvent) -> Dispatch {
    if event.source == InputSource::TextField {
        return Dispatch::Suppressed(SuppressReason::TextInput);
    }
    if store.is_empty() {
        return Dispatch::Suppressed(SuppressReason::NoData);
    }
    let Some(command) = command_for(&event.key) else {
        return Dispatch::Unbound;
    };
    match command {
        Command::Previous => {
            store.previous();
        }
        Command::Next => {
            store.next();
        }
        Command::Toggle(verdict) => {
            store.toggle_annotation(verdict);
        }
    }
    Dispatch::Applied(command)
}
