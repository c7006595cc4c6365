//! AI-assisted album credit enrichment.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - typed credits and the merge rules
//! - **API DTOs** (`dto.rs`) - exact Messages API request/response shapes
//! - **Client** (`client.rs`) - HTTP client with the forced tool schema
//! - **Service** (`service.rs`) - job orchestration over one album or a
//!   whole collection
//!
//! The decoupling means the merge logic never sees the wire format: the
//! structured response is validated at the client boundary and converted
//! to the same typed representation manual edits use.

pub mod client;
pub mod domain;
pub mod dto;
pub mod service;

use async_trait::async_trait;

pub use client::{CreditsClient, CreditsRequest};
pub use domain::{AlbumFacts, EnrichmentError};
pub use service::{Enricher, EnrichmentScope};

/// Trait for the credits model lookup.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait CreditsApi: Send + Sync {
    /// Ask for credits for one album.
    ///
    /// `Ok(None)` means the model produced no usable structured output.
    async fn fetch_credits(
        &self,
        request: &CreditsRequest,
    ) -> Result<Option<AlbumFacts>, EnrichmentError>;
}

#[async_trait]
impl CreditsApi for CreditsClient {
    async fn fetch_credits(
        &self,
        request: &CreditsRequest,
    ) -> Result<Option<AlbumFacts>, EnrichmentError> {
        self.fetch_credits(request).await
    }
}
