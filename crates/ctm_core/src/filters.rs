//! Runtime non-halting filters, applied after every simulation step.
//!
//! Both filters are sound: a positive verdict implies the machine truly never
//! halts. Neither ever reports a false positive, since a false positive would
//! bias the distribution. Both can be independently disabled by the driver.

use std::collections::HashSet;

use arrayvec::ArrayVec;

use crate::machine::State;

/// Detects a machine that drifts monotonically into fresh blank territory:
/// `n+1` consecutive moves into never-before-seen blank cells imply the
/// finite state has repeated while the tape ahead is uniformly blank.
pub struct EscapeeFilter {
    threshold: u32,
    seen: HashSet<i64>,
    run: u32,
}

impl EscapeeFilter {
    pub fn new(n_states: u32) -> Self {
        Self {
            threshold: n_states,
            seen: HashSet::new(),
            run: 0,
        }
    }

    /// `is_blank` is whether the cell at `head` currently holds the blank
    /// symbol. Returns `true` once the run of fresh-blank moves exceeds `n`.
    pub fn step(&mut self, head: i64, is_blank: bool) -> bool {
        if is_blank && !self.seen.contains(&head) {
            self.seen.insert(head);
            self.run += 1;
        } else {
            self.run = 0;
        }
        self.run > self.threshold
    }
}

#[derive(PartialEq, Eq, Clone)]
struct Config {
    state: u32,
    head: i64,
    tape: Vec<u8>,
}

/// Detects a configuration (state + head + visited tape content) that
/// recurs exactly every two steps. The history never needs to hold more
/// than the last three configurations, so it lives in a fixed-capacity
/// `ArrayVec` rather than a growable deque.
#[derive(Default)]
pub struct Period2Filter {
    history: ArrayVec<Config, 3>,
}

impl Period2Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, state: State, head: i64, tape_snapshot: Vec<u8>) -> bool {
        if self.history.is_full() {
            self.history.remove(0);
        }
        self.history.push(Config {
            state: state.get(),
            head,
            tape: tape_snapshot,
        });
        self.history.len() == 3 && self.history[0] == self.history[2]
    }
}
