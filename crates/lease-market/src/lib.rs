//! Listing aggregation layer for a property-leasing marketplace.
//!
//! Listings, their broker profiles and the offers, applications,
//! appointments and view counters attached to them are read from a
//! [`store::DocumentStore`] and media is staged through a
//! [`storage::StorageGateway`]. Both are traits so the hosted backends stay
//! behind a narrow contract; in-memory implementations ship for tests,
//! demos and local serving.

pub mod activity;
pub mod config;
pub mod error;
pub mod leases;
pub mod listings;
pub mod storage;
pub mod store;
pub mod telemetry;

pub use error::AppError;
