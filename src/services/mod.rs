//! Business logic services.
//!
//! Services sit on top of `db::Database` and the TestRail HTTP client.
//! They hold the fixture data, schema setup and result upload logic.

pub mod fixture_service;
pub mod report_parser;
pub mod schema_service;
pub mod testrail_service;
