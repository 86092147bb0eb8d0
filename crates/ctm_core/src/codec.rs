//! Bijection between machine codes (non-negative integers) and transition
//! tables, for a fixed state count `n`.
//!
//! A transition table is laid out as `2n` mixed-radix digits in base
//! `base = 4n + 2`, big-endian: the digit for `(state, symbol)` sits at
//! position `2*(state-1) + symbol`, with `state=1, symbol=0` most
//! significant. See the module-level comment in `machine.rs` for the table
//! layout this codec reads and writes.

use crate::error::CoreError;
use crate::machine::{Move, State, Symbol, Transition, TransitionTable};

/// Number of digit values per transition cell for a machine class with `n`
/// active states.
#[inline]
pub fn base(n_states: u32) -> u128 {
    4 * n_states as u128 + 2
}

/// Size of the raw enumeration: `base(n)^(2n)`.
pub fn space_size(n_states: u32) -> u128 {
    base(n_states)
        .checked_pow(2 * n_states)
        .expect("n_states too large to represent the enumeration size in a u128")
}

/// Encode a transition table as its machine code.
pub fn encode(table: &TransitionTable) -> u128 {
    let base = base(table.n_states());
    table
        .entries()
        .iter()
        .fold(0u128, |acc, t| acc * base + encode_digit(*t) as u128)
}

/// Decode a machine code into a transition table for a fixed `n_states`.
pub fn decode(code: u128, n_states: u32) -> Result<TransitionTable, CoreError> {
    let base = base(n_states);
    let limit = space_size(n_states);
    if code >= limit {
        return Err(CoreError::CodecOutOfRange {
            code,
            n_states,
            limit,
        });
    }

    let digit_count = 2 * n_states as usize;
    let mut digits = vec![0u128; digit_count];
    let mut remaining = code;
    for slot in digits.iter_mut().rev() {
        *slot = remaining % base;
        remaining /= base;
    }

    let entries = digits.into_iter().map(decode_digit).collect();
    Ok(TransitionTable::new(n_states, entries))
}

#[inline]
fn encode_digit(t: Transition) -> u128 {
    if t.next_state.is_halt() {
        t.write.get() as u128
    } else {
        let move_bit = match t.move_ {
            Move::Left => 0,
            Move::Right => 1,
            Move::None => unreachable!("a non-halt transition always moves"),
        };
        let e = (t.next_state.get() as u128 - 1) * 4 + t.write.get() as u128 * 2 + move_bit;
        2 + e
    }
}

#[inline]
fn decode_digit(d: u128) -> Transition {
    match d {
        0 => Transition::halt(Symbol::new(0).unwrap()),
        1 => Transition::halt(Symbol::new(1).unwrap()),
        _ => {
            let e = d - 2;
            let next_state = 1 + e / 4;
            let write = (e / 2) % 2;
            let move_ = if e % 2 == 0 { Move::Left } else { Move::Right };
            Transition {
                next_state: State::new(next_state as u32),
                write: Symbol::new(write as u8).unwrap(),
                move_,
            }
        }
    }
}
