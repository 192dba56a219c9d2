//! Timeframe scheduling core: intervals, requests and the per-appliance queue.

pub mod handler;
/// Half-open time ranges.
pub mod interval;
/// Runtime and SoC demand requests.
pub mod request;
pub mod state;
/// Intervals bound to requests and lifecycle state.
pub mod timeframe;

pub use handler::TimeframeIntervalHandler;
pub use interval::Interval;
pub use request::{Request, RequestKind, RuntimeRequest, SocRequest};
pub use state::TimeframeIntervalState;
pub use timeframe::{RequestSnapshot, TimeframeInterval, TimeframeIntervalSnapshot};
