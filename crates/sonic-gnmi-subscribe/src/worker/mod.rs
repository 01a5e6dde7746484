//! Per-path subscription workers (spec §4.6.1-§4.6.3).

pub mod field;
pub mod multi_field;
pub mod table_key;

pub use multi_field::UpdatesOnly;
