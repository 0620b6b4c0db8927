//! Optimistic-concurrency version tokens.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Monotonic version counter carried by cart and customer records.
///
/// Every mutating call against a versioned resource must supply the version
/// last observed; the platform rejects the call if the resource has moved
/// on. The counter is only ever produced by the platform - client code
/// reads it from a snapshot and echoes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Wrap a platform-issued version number.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// The raw version number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version a successful single mutation would produce.
    ///
    /// Only meaningful for tests and fake backends; real snapshots always
    /// come from the platform.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(version: u64) -> Self {
        Self(version)
    }
}
