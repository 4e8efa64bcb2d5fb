//!  Storage is organized through [log_store::LogStoreImpl].
//!  The basic idea is:
//!   - There is a directory with all the partitions.
//!   - Each partition is a JSON-lines file holding the records of one local calendar day.
//!   - Records are only ever appended. Nothing in dayscribe edits or removes them.

pub mod entities;
pub mod log_store;
pub mod record_event;
