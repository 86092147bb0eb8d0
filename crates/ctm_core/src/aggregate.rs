//! Accumulates simulation outcomes into counts, and completes a
//! symmetry-reduced aggregate back into raw-equivalent counts (§4.6).
//!
//! Completion works in three steps:
//! 1. Blank-complement duplication: every recorded halted output also
//!    contributes its bit-complement, and every non-halting count doubles.
//!    This reconstructs the `{identity, complement}` half of the orbit.
//! 2. Move-reversal duplication: the same done with string reversal,
//!    reconstructing the other half.
//! 3. The six trivial-root digit values, excluded from the reduced
//!    enumeration entirely, are added back in closed form: the two
//!    "halts immediately" digits each account for `base^(2n-1)` raw codes
//!    that output `"0"` or `"1"` respectively; the four "self-loop into
//!    state 1" digits each account for `base^(2n-1)` raw codes that are
//!    unconditionally an Escapee (see `enumerate::is_trivial_root`).
//!
//! Steps 1 and 2 are exact, not approximate: neither `complement_table` nor
//! `reverse_table` ever fixes a non-trivial-root code (the root transition,
//! being a continue-transition by definition of non-trivial, always has its
//! write bit flipped by complement and its move flipped by reverse, so it
//! never maps to itself). The four-element symmetry group therefore acts
//! freely on the non-trivial-root codes, and duplicating counts by these two
//! independent involutions reconstructs the raw totals exactly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::simulate::{NonHaltReason, Outcome};
use crate::symmetry;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregator {
    counts: HashMap<String, u64>,
    non_halt: HashMap<NonHaltReason, u64>,
    total_seen: u64,
    completed: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &Outcome) {
        self.total_seen += 1;
        match outcome {
            Outcome::Halted { output } => {
                *self.counts.entry(output.clone()).or_insert(0) += 1;
            }
            Outcome::NonHalting(reason) => {
                *self.non_halt.entry(*reason).or_insert(0) += 1;
            }
        }
    }

    pub fn counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    pub fn non_halt(&self) -> &HashMap<NonHaltReason, u64> {
        &self.non_halt
    }

    pub fn total_seen(&self) -> u64 {
        self.total_seen
    }

    /// Merge another aggregator's tallies into this one. Associative and
    /// commutative: batches from any worker, processed in any order, merge
    /// to the same result.
    pub fn merge(&mut self, other: &Aggregator) {
        for (output, count) in &other.counts {
            *self.counts.entry(output.clone()).or_insert(0) += count;
        }
        for (reason, count) in &other.non_halt {
            *self.non_halt.entry(*reason).or_insert(0) += count;
        }
        self.total_seen += other.total_seen;
    }

    /// Complete a reduced-enumeration aggregate into raw-equivalent counts.
    /// Must be called exactly once, after all reduced-enumeration batches
    /// have been merged in, and never on an aggregate built from the raw
    /// enumeration (which needs no completion).
    pub fn apply_completion(&mut self, n_states: u32) {
        assert!(!self.completed, "completion must only be applied once");
        self.completed = true;

        self.counts = duplicate_by(&self.counts, symmetry::complement_string);
        self.non_halt = double(&self.non_halt);
        self.counts = duplicate_by(&self.counts, symmetry::reverse_string);
        self.non_halt = double(&self.non_halt);

        let base = codec::base(n_states);
        let digit_count = 2 * n_states;
        let trivial_block = base.pow(digit_count - 1) as u64;

        *self.counts.entry("0".to_string()).or_insert(0) += trivial_block;
        *self.counts.entry("1".to_string()).or_insert(0) += trivial_block;
        *self
            .non_halt
            .entry(NonHaltReason::Escapee)
            .or_insert(0) += 4 * trivial_block;

        self.total_seen = self.counts.values().sum::<u64>() + self.non_halt.values().sum::<u64>();
    }

    /// Normalize counts into a probability distribution over the halted
    /// output strings, dividing by the halting total `H = Σ C[s]` rather
    /// than the whole raw space: `D(s)` is a distribution over the strings
    /// machines actually halt with, conditioned on halting at all. Empty
    /// if no machine has halted yet.
    pub fn finalise(&self) -> HashMap<String, f64> {
        let halting_total: u64 = self.counts.values().sum();
        if halting_total == 0 {
            return HashMap::new();
        }
        let total = halting_total as f64;
        self.counts
            .iter()
            .map(|(output, count)| (output.clone(), *count as f64 / total))
            .collect()
    }
}

fn duplicate_by(
    counts: &HashMap<String, u64>,
    transform: impl Fn(&str) -> String,
) -> HashMap<String, u64> {
    let mut out = HashMap::new();
    for (output, count) in counts {
        *out.entry(output.clone()).or_insert(0) += count;
        *out.entry(transform(output)).or_insert(0) += count;
    }
    out
}

fn double<K: Clone + Eq + std::hash::Hash>(map: &HashMap<K, u64>) -> HashMap<K, u64> {
    map.iter().map(|(k, v)| (k.clone(), v * 2)).collect()
}
