//! NBA Medallion - pipeline plumbing for NBA stats ETL jobs
//!
//! This crate holds the two pieces the bronze/silver/gold applications share:
//! an adaptive rate limiter for the rate-limited stats API, and the router that
//! turns object storage notifications into per-date processing jobs.

pub mod config;
pub mod error;
pub mod logging;
pub mod ratelimit;
pub mod routing;
