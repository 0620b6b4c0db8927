//! Commerce platform API clients.
//!
//! # Architecture
//!
//! - The platform is the source of truth - no local sync, direct API calls
//! - One shared [`CommerceHttp`] handles OAuth tokens and request plumbing
//! - [`CatalogClient`], [`CartClient`] and [`CustomerClient`] wrap the
//!   search, cart and customer endpoint families on top of it
//! - Each client is fronted by an `async_trait` seam (`CatalogApi`,
//!   `CartApi`, `CustomerApi`) so orchestrators can run against in-memory
//!   fakes in tests
//!
//! Versioned resources (cart, customer) require the last observed version
//! on every mutation; the clients wrap mutations in a bounded
//! refetch-and-retry on version conflict (2 attempts).
//!
//! # Example
//!
//! ```rust,ignore
//! use bookstall_storefront::commerce::{CommerceHttp, CartClient, CartApi, CartUpdateAction};
//!
//! let http = CommerceHttp::new(&config);
//! let cart = CartClient::new(http.clone());
//!
//! let snapshot = cart
//!     .mutate(vec![CartUpdateAction::AddDiscountCode { code: "SUMMER24".into() }])
//!     .await?;
//! ```

mod cart;
mod catalog;
mod customer;
mod http;
pub mod types;

pub use cart::{CartApi, CartClient, CartUpdateAction};
pub use catalog::{
    CatalogApi, CatalogClient, NumericRange, ProductSearchRequest, SortKey, escape_filter_value,
};
pub use customer::{
    AddressAssignment, CustomerApi, CustomerClient, CustomerDraft, CustomerUpdateAction,
    ProfileUpdate, SignInOutcome, plan_address_assignment,
};
pub use http::{AuthFlow, CommerceHttp};

use thiserror::Error;

/// Errors that can occur when talking to the commerce platform.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform rejected the request.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Human-readable message from the error body.
        message: String,
        /// Machine-readable error codes from the error body.
        codes: Vec<String>,
    },

    /// JSON (de)serialization failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The supplied version no longer matches the resource.
    #[error("Version conflict: resource was modified concurrently")]
    VersionConflict,

    /// Token exchange or session state failure.
    #[error("Auth error: {0}")]
    Auth(String),
}

impl CommerceError {
    /// Whether a mutation hitting this error may be retried after
    /// refetching the latest resource version.
    #[must_use]
    pub const fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict)
    }
}

/// Total attempts for a version-guarded mutation (initial try + one
/// refetch-and-retry on conflict).
pub(crate) const MUTATION_ATTEMPTS: u32 = 2;

/// Drive a version-guarded mutation attempt to completion.
///
/// `op` must refetch the resource and post against the fresh version on
/// every call; this runs it up to `attempts` times, retrying only on
/// [`CommerceError::VersionConflict`] and surfacing the conflict once the
/// budget is exhausted. Any other error returns immediately.
pub(crate) async fn retry_on_conflict<T, F, Fut>(attempts: u32, mut op: F) -> Result<T, CommerceError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, CommerceError>>,
{
    for attempt in 1..=attempts {
        match op(attempt).await {
            Err(CommerceError::VersionConflict) if attempt < attempts => {
                tracing::debug!(attempt, "Version conflict, retrying against a fresh snapshot");
            }
            other => return other,
        }
    }
    Err(CommerceError::VersionConflict)
}
