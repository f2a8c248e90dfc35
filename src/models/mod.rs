//! Data models representing database rows.
//!
//! Every struct here maps to one table of the banking test schema.
//! Rows are read fresh on each call; nothing is cached in memory.

/// Bank account model
pub mod account;
/// Customer model
pub mod customer;
/// Recorded test outcome model
pub mod test_result;
/// Account transaction model
pub mod transaction;
/// TestRail API types
pub mod testrail;
