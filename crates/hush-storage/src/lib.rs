//! Object storage for finished videos.
//!
//! This crate provides:
//! - The `BlobStore` seam the pipeline uploads through
//! - An S3-compatible implementation (Supabase Storage, R2, MinIO)
//! - Key and public URL derivation

pub mod client;
pub mod error;
pub mod store;

pub use client::{S3BlobStore, S3Config};
pub use error::{StorageError, StorageResult};
pub use store::{blob_key, public_url_for, BlobStore};
