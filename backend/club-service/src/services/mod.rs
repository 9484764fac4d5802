pub mod coordinator;
pub mod counters;
