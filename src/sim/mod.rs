/// Tick and wall clocks.
pub mod clock;
/// Closed-loop runner for one charger and its queue.
pub mod runner;
pub mod summary;
/// Per-tick records.
pub mod types;

pub use runner::Runner;
pub use summary::RunSummary;
pub use types::TickRecord;
