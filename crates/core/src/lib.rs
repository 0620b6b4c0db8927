//! Bookstall Core - Shared types library.
//!
//! This crate provides common types used across all Bookstall components:
//! - `storefront` - The storefront library (catalog, cart, profile)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Every
//! entity here is owned by the remote commerce platform; these types give
//! the rest of the workspace a type-safe vocabulary for talking about them.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, versions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
