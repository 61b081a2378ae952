//! Query layer: element sets, relational operators, cancellation.
//!
//! Rules compose these primitives; none of them mutate the graph or the
//! abstract value store, so any number of rules can evaluate concurrently
//! over the same unit.

mod cancel;
mod context;
mod set;

pub use cancel::CancellationToken;
pub use context::QueryContext;
pub use set::ElementSet;
