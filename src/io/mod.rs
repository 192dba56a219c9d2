/// CSV export of tick records.
pub mod export;
