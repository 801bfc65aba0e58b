//! Metadata records for processed videos.
//!
//! This crate provides:
//! - The `MetadataStore` seam the pipeline writes through
//! - A PostgREST client (Supabase `rest/v1`) implementing it
//! - Request metrics

pub mod client;
pub mod error;
pub mod metrics;
pub mod store;
pub mod types;

pub use client::{RestMetadataConfig, RestMetadataStore};
pub use error::{MetadataError, MetadataResult};
pub use store::MetadataStore;
pub use types::{NewVideoRow, VideoRow};
