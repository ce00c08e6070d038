//! Identity of the person driving the dashboard.
//!
//! Authentication itself lives outside this crate. Everything here sees only
//! the answer to "who is signed in, if anyone", through [`AuthGate`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::util::clean_text;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("User id cannot be empty or whitespace-only")]
    EmptyUserId,
}

/// Opaque identifier of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: &str) -> Result<Self, AuthError> {
        clean_text(raw).map(Self).ok_or(AuthError::EmptyUserId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current user's identity.
///
/// `None` means nobody is signed in: writes are refused with
/// `Unauthenticated` and the bookmark listing reads as empty.
pub trait AuthGate: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Identity fixed for the lifetime of the gate (one CLI invocation, one test).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user: Option<UserId>,
}

impl StaticIdentity {
    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }

    /// Builds a gate from an optional raw id; blank ids count as anonymous.
    pub fn from_raw(raw: Option<&str>) -> Self {
        Self {
            user: raw.and_then(|r| UserId::new(r).ok()),
        }
    }
}

impl AuthGate for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.user.clone()
    }
}
