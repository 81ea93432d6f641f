//! Resvault Client - clients for the remote services
//!
//! This crate provides implementations of the `resvault_core` traits:
//!
//! - [`catalog`] - the transport.data.gouv.fr dataset catalog (HTTP, `reqwest`)
//! - [`storage`] - S3-compatible object storage (`aws-sdk-s3`)
//!
//! # Overview
//!
//! The clients handle authentication, request building, response parsing,
//! and mapping of transport errors into `AppError`.

pub mod catalog;
pub mod storage;

// Re-export main client types
pub use catalog::TransportCatalogClient;
pub use storage::S3ObjectStore;
