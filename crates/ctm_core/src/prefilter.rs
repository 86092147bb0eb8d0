//! Static, pre-simulation non-halting check.

use crate::machine::TransitionTable;

/// `true` iff no entry in the table ever transitions to the halt state, in
/// which case simulating it would be pointless: it can never halt.
pub fn is_hopeless(table: &TransitionTable) -> bool {
    table.entries().iter().all(|t| !t.next_state.is_halt())
}
