//! UI-facing orchestrators.
//!
//! Each controller owns one screen-level state machine: it validates
//! input, drives the commerce clients, and exposes the state a rendering
//! layer reads. Remote failures never wipe what the user already sees;
//! the previous snapshot stays and a [`Notice`] carries the problem.

mod auth;
mod cart;
mod catalog;
mod profile;

pub use auth::AuthController;
pub use cart::CartController;
pub use catalog::{
    Breadcrumb, CatalogController, CategoryNode, Phase, SearchIntent, build_category_tree,
};
pub use profile::ProfileController;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient user-facing message (toast, banner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}
