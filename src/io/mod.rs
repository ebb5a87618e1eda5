/// CSV export of history samples.
pub mod export;
