//! The bounded simulator: runs one machine on a blank tape until it halts,
//! times out, or a runtime filter proves it can never halt.

use serde::{Deserialize, Serialize};

use crate::filters::{EscapeeFilter, Period2Filter};
use crate::machine::{State, Symbol, TransitionTable};
use crate::prefilter;
use crate::tape::Tape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NonHaltReason {
    Timeout,
    Escapee,
    CycleTwo,
    NoHaltTransitionEverReachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Halted { output: String },
    NonHalting(NonHaltReason),
}

/// Which runtime filters (§4.5) are active for a run. Both default on; the
/// driver may turn either off, but doing so never changes which machines
/// *actually* halt, only how quickly non-halting ones are recognized.
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    pub escapee: bool,
    pub period_two: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            escapee: true,
            period_two: true,
        }
    }
}

/// Run `table` to completion or to a verdict, applying the pre-run filter
/// first and then simulating with the runtime filters active.
pub fn simulate(
    table: &TransitionTable,
    max_steps: u64,
    blank: Symbol,
    filters: FilterConfig,
) -> Outcome {
    if prefilter::is_hopeless(table) {
        return Outcome::NonHalting(NonHaltReason::NoHaltTransitionEverReachable);
    }
    simulate_unfiltered_prefilter(table, max_steps, blank, filters)
}

/// Simulate without the pre-run filter, used by filter-soundness tests that
/// want to confirm a runtime-filter verdict against a much longer run of the
/// same machine.
pub fn simulate_unfiltered_prefilter(
    table: &TransitionTable,
    max_steps: u64,
    blank: Symbol,
    filters: FilterConfig,
) -> Outcome {
    let mut tape = Tape::new(blank);
    let mut state = State::new(1);
    let mut head: i64 = 0;
    let mut steps: u64 = 0;

    let mut escapee = filters.escapee.then(|| EscapeeFilter::new(table.n_states()));
    let mut period_two = filters.period_two.then(Period2Filter::new);

    loop {
        if state.is_halt() {
            crate::cold();
            return Outcome::Halted {
                output: tape.output(),
            };
        }

        let symbol = tape.read(head);
        let transition = table.get(state, symbol);
        tape.write(head, transition.write);
        state = transition.next_state;
        head += transition.move_.offset();

        steps += 1;
        if steps >= max_steps {
            crate::cold();
            return Outcome::NonHalting(NonHaltReason::Timeout);
        }

        if let Some(filter) = escapee.as_mut() {
            let is_blank = tape.read(head).get() == blank.get();
            if filter.step(head, is_blank) {
                crate::cold();
                return Outcome::NonHalting(NonHaltReason::Escapee);
            }
        }
        if let Some(filter) = period_two.as_mut() {
            if filter.step(state, head, tape.visited_snapshot()) {
                crate::cold();
                return Outcome::NonHalting(NonHaltReason::CycleTwo);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn no_filters() -> FilterConfig {
        FilterConfig {
            escapee: false,
            period_two: false,
        }
    }

    #[test]
    fn determinism() {
        let n = 3;
        let table = codec::decode(12345, n).unwrap();
        let blank = Symbol::new(0).unwrap();
        let a = simulate(&table, 200, blank, FilterConfig::default());
        let b = simulate(&table, 200, blank, FilterConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn one_state_halts_in_one_step_with_output_one() {
        // Single active state; both transitions halt-write-1. The machine
        // is not rejected by the pre-run filter (it has a halt transition)
        // and halts immediately, writing `1` under the head.
        let n = 1;
        let base = codec::base(n);
        let code = 1 * base + 1; // both digits: halt, write 1
        let table = codec::decode(code, n).unwrap();
        let blank = Symbol::new(0).unwrap();
        let outcome = simulate(&table, 100, blank, FilterConfig::default());
        assert_eq!(
            outcome,
            Outcome::Halted {
                output: "1".to_string()
            }
        );
    }

    #[test]
    fn hopeless_machine_never_enters_simulator() {
        let n = 2;
        let base = codec::base(n);
        let code = 2 * base + 2; // all digits are continue-transitions
        let table = codec::decode(code, n).unwrap();
        let blank = Symbol::new(0).unwrap();
        let outcome = simulate(&table, 1_000_000, blank, FilterConfig::default());
        assert_eq!(
            outcome,
            Outcome::NonHalting(NonHaltReason::NoHaltTransitionEverReachable)
        );
    }

    #[test]
    fn period_two_filter_catches_ping_pong_within_a_few_steps() {
        use crate::machine::{Move, State as S, Transition, TransitionTable};
        // Two states that alternately write 0/1 at positions 0/1 and bounce
        // back and forth forever: never halts, caught by the period-2 filter
        // well before the step budget.
        let table = TransitionTable::new(
            2,
            vec![
                // state 1, symbol 0: write 1, move right, goto state 2
                Transition {
                    next_state: S::new(2),
                    write: Symbol::new(1).unwrap(),
                    move_: Move::Right,
                },
                // state 1, symbol 1: write 1, move right, goto state 2
                Transition {
                    next_state: S::new(2),
                    write: Symbol::new(1).unwrap(),
                    move_: Move::Right,
                },
                // state 2, symbol 0: write 0, move left, goto state 1
                Transition {
                    next_state: S::new(1),
                    write: Symbol::new(0).unwrap(),
                    move_: Move::Left,
                },
                // state 2, symbol 1: write 0, move left, goto state 1
                Transition {
                    next_state: S::new(1),
                    write: Symbol::new(0).unwrap(),
                    move_: Move::Left,
                },
            ],
        );
        let blank = Symbol::new(0).unwrap();
        let outcome = simulate(&table, 1_000_000, blank, FilterConfig::default());
        assert_eq!(outcome, Outcome::NonHalting(NonHaltReason::CycleTwo));
    }

    #[test]
    fn escapee_filter_witness_never_halts_under_much_longer_budget() {
        // Reachable halt transitions exist (so the pre-run filter lets it
        // through), but state 1 only ever reads a fresh blank cell and keeps
        // writing blank while drifting right, so those halt transitions are
        // never actually reached: a genuine escapee, not a hopeless machine.
        use crate::machine::{Move, State as S, Transition, TransitionTable};
        let table = TransitionTable::new(
            2,
            vec![
                Transition {
                    next_state: S::new(1),
                    write: Symbol::new(0).unwrap(),
                    move_: Move::Right,
                },
                Transition::halt(Symbol::new(1).unwrap()),
                Transition::halt(Symbol::new(0).unwrap()),
                Transition::halt(Symbol::new(1).unwrap()),
            ],
        );
        let blank = Symbol::new(0).unwrap();

        let caught = simulate(&table, 1_000_000, blank, FilterConfig::default());
        assert_eq!(caught, Outcome::NonHalting(NonHaltReason::Escapee));

        let unfiltered =
            simulate_unfiltered_prefilter(&table, 100_000, blank, no_filters());
        assert_eq!(unfiltered, Outcome::NonHalting(NonHaltReason::Timeout));
    }

    #[test]
    fn filter_soundness_witnesses_never_halt_under_much_longer_budget() {
        // The same ping-pong machine, run without any runtime filters for a
        // step budget far beyond what the period-2 filter would have used:
        // it still never halts, confirming the filter's verdict was sound.
        use crate::machine::{Move, State as S, Transition, TransitionTable};
        let table = TransitionTable::new(
            2,
            vec![
                Transition {
                    next_state: S::new(2),
                    write: Symbol::new(1).unwrap(),
                    move_: Move::Right,
                },
                Transition {
                    next_state: S::new(2),
                    write: Symbol::new(1).unwrap(),
                    move_: Move::Right,
                },
                Transition {
                    next_state: S::new(1),
                    write: Symbol::new(0).unwrap(),
                    move_: Move::Left,
                },
                Transition {
                    next_state: S::new(1),
                    write: Symbol::new(0).unwrap(),
                    move_: Move::Left,
                },
            ],
        );
        let blank = Symbol::new(0).unwrap();
        let outcome = simulate_unfiltered_prefilter(&table, 100_000, blank, no_filters());
        assert_eq!(outcome, Outcome::NonHalting(NonHaltReason::Timeout));
    }
}
