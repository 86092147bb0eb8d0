pub mod aggregate;
pub mod codec;
pub mod enumerate;
pub mod error;
pub mod filters;
pub mod machine;
pub mod prefilter;
pub mod simulate;
pub mod symmetry;
pub mod tape;

/// Calling this function is a hint to the compiler that this code path is unlikely to be executed.
#[cold]
fn cold() {}
