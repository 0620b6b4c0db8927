//! Core types for Bookstall.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod localized;
pub mod money;
pub mod version;

pub use email::{Email, EmailError};
pub use id::*;
pub use localized::LocalizedString;
pub use money::{CurrencyCode, Money};
pub use version::Version;
