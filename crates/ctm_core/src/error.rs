//! Error taxonomy for the CTM core.
//!
//! Non-halting outcomes are not errors - they are expected results and flow
//! through [`crate::simulate::Outcome`] instead. The variants here are the
//! ones that mean something is actually wrong: bad input, or an invariant the
//! rest of the core relies on turning out to be false.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("n_states must be positive (got {0})")]
    InvalidStateCount(u32),

    #[error("blank symbol must be 0 or 1 (got {0})")]
    InvalidBlankSymbol(u8),

    #[error("max_runtime_steps must be positive")]
    InvalidStepBudget,

    #[error("machine code {code} is out of range for n_states={n_states} (base^(2n) = {limit})")]
    CodecOutOfRange {
        code: u128,
        n_states: u32,
        limit: u128,
    },

    /// Should never occur: transition tables are total, so lookup never fails.
    #[error("simulator internal invariant violated: {0}")]
    SimulatorInternal(String),
}
