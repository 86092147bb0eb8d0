//! Type safe description of a Turing machine transition table.
//!
//! Unlike the const-generic `States<STATES, SYMBOLS>` this crate's ancestor
//! used, `n` here is a run-time quantity (it comes from the CLI/config), so
//! a table is a heap-allocated, variable-length collection of transitions
//! rather than a fixed-size array baked into the type.

use serde::{Deserialize, Serialize};

/// The binary alphabet. `m` is always 2.
pub const SYMBOLS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(u8);

impl Symbol {
    #[inline]
    pub fn new(value: u8) -> Option<Self> {
        (value < SYMBOLS as u8).then_some(Self(value))
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn complement(self) -> Self {
        Self(1 - self.0)
    }
}

/// A non-negative state index. `0` is the distinguished halt state; active
/// states are `1..=n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State(u32);

impl State {
    pub const HALT: State = State(0);

    #[inline]
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_halt(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Left,
    Right,
    /// Used only for the implicit self-action of the halt state.
    None,
}

impl Move {
    #[inline]
    pub fn offset(self) -> i64 {
        match self {
            Move::Left => -1,
            Move::Right => 1,
            Move::None => 0,
        }
    }
}

/// One `(next_state, write_symbol, move)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub next_state: State,
    pub write: Symbol,
    pub move_: Move,
}

impl Transition {
    #[inline]
    pub fn halt(write: Symbol) -> Self {
        Self {
            next_state: State::HALT,
            write,
            move_: Move::None,
        }
    }
}

/// A total mapping from `(state, symbol)` with `state in 1..=n_states` to a
/// [`Transition`]. Stored row-major: `entries[2*(state - 1) + symbol]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    n_states: u32,
    entries: Vec<Transition>,
}

impl TransitionTable {
    pub fn new(n_states: u32, entries: Vec<Transition>) -> Self {
        assert_eq!(entries.len(), 2 * n_states as usize);
        Self { n_states, entries }
    }

    #[inline]
    pub fn n_states(&self) -> u32 {
        self.n_states
    }

    #[inline]
    pub fn get(&self, state: State, symbol: Symbol) -> Transition {
        debug_assert!(!state.is_halt());
        let index = 2 * (state.get() as usize - 1) + symbol.get() as usize;
        self.entries[index]
    }

    #[inline]
    pub fn set(&mut self, state: State, symbol: Symbol, transition: Transition) {
        debug_assert!(!state.is_halt());
        let index = 2 * (state.get() as usize - 1) + symbol.get() as usize;
        self.entries[index] = transition;
    }

    pub fn entries(&self) -> &[Transition] {
        &self.entries
    }
}
