//! Bookstall storefront library.
//!
//! A headless bookstore storefront built against a hosted commerce
//! platform. The platform owns every non-trivial behavior - catalog
//! storage, pricing, discounts, stock, authentication - and this crate
//! contributes the client-side orchestration on top of its HTTP API:
//!
//! - [`commerce`] - typed clients for the platform's search, cart and
//!   customer endpoints, including the query-string filter grammar and
//!   version-guarded mutation action lists
//! - [`controllers`] - catalog and cart orchestrators plus auth/profile
//!   flows, holding the UI-facing state machines
//! - [`session`] - the client-side session cache and cart badge store
//! - [`validation`] - form schemas applied before any remote call
//!
//! Presentation (rendering, routing) is out of scope; the controllers are
//! the public surface a UI layer drives.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commerce;
pub mod config;
pub mod controllers;
pub mod error;
pub mod session;
pub mod state;
pub mod validation;

pub use config::{CommerceConfig, ConfigError};
pub use error::{AppError, Result};
pub use state::AppState;
