//! Banking Testkit - Test support for the demo banking application's UI suite
//!
//! The browser tests drive the web UI; this crate owns everything around
//! them that talks to real infrastructure.
//!
//! # Architecture
//!
//! - **Database**: MySQL via sqlx, behind an owned pool handle (`db::Database`)
//! - **Fixtures**: known customers/accounts seeded and cleared per run
//! - **Results**: TestRail v2 API over reqwest, fed by parsed report logs
//! - **Format**: configuration from environment variables (`.env` supported)
//!
//! # Typical Session
//!
//! 1. Validate the environment
//! 2. Open the pool and seed fixtures
//! 3. Run the browser suite (outside this crate)
//! 4. Clear fixtures and close the pool
//! 5. Upload the results to TestRail

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod retry;
pub mod services;
