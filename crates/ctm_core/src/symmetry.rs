//! The symmetry group used to reduce the enumeration and to complete a
//! reduced aggregate back into raw-equivalent counts (§4.2, §4.6).
//!
//! Two independent involutions act on a whole transition table:
//! - blank-symbol complementation flips every transition's `write` bit;
//! - move reversal flips every transition's direction (L <-> R).
//!
//! Composed with the identity they form the Klein four-group `G` this crate
//! reduces by. A machine code is canonical iff it is the smallest code in its
//! `G`-orbit among codes whose root transition is non-trivial (§4.2 step c).

use crate::codec;
use crate::machine::{Move, Transition, TransitionTable};

pub fn complement_table(table: &TransitionTable) -> TransitionTable {
    let entries = table
        .entries()
        .iter()
        .map(|t| Transition {
            next_state: t.next_state,
            write: t.write.complement(),
            move_: t.move_,
        })
        .collect();
    TransitionTable::new(table.n_states(), entries)
}

pub fn reverse_table(table: &TransitionTable) -> TransitionTable {
    let entries = table
        .entries()
        .iter()
        .map(|t| {
            let move_ = match t.move_ {
                Move::Left => Move::Right,
                Move::Right => Move::Left,
                Move::None => Move::None,
            };
            Transition {
                next_state: t.next_state,
                write: t.write,
                move_,
            }
        })
        .collect();
    TransitionTable::new(table.n_states(), entries)
}

/// The four codes in `code`'s orbit under `G` (with repeats if `code` has
/// nontrivial stabilizers).
pub fn orbit(code: u128, n_states: u32) -> [u128; 4] {
    let table = codec::decode(code, n_states).unwrap();
    let comp = complement_table(&table);
    let rev = reverse_table(&table);
    let comp_rev = reverse_table(&comp);
    [
        code,
        codec::encode(&comp),
        codec::encode(&rev),
        codec::encode(&comp_rev),
    ]
}

pub fn complement_string(s: &str) -> String {
    s.chars()
        .map(|c| if c == '0' { '1' } else { '0' })
        .collect()
}

pub fn reverse_string(s: &str) -> String {
    s.chars().rev().collect()
}
