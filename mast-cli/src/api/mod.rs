//! MAST REST API
//!
//! A small client for the references, experiments, run results and files
//! collections, plus the [`RecordStore`] seam the upload pipeline talks to.

pub mod client;
pub mod operation;
pub mod store;

pub use client::{DEFAULT_API_URL, MastClient, record_id};
pub use operation::{Operation, Resource};
pub use store::RecordStore;
