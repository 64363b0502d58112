//! Caller-supplied request context
//!
//! Identity is never read from global state. The caller builds a
//! [`RequestContext`] and the orchestrator hands it to every external call.

use serde::{Deserialize, Serialize};

/// Context threaded through every Convert/Analyze/Optimize call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Optional user identifier forwarded to the engine
    user: Option<String>,
}

impl RequestContext {
    /// Context with no user attached
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for a named user; blank names are treated as anonymous
    pub fn for_user(user: impl Into<String>) -> Self {
        let user = user.into();
        let user = user.trim();
        Self {
            user: (!user.is_empty()).then(|| user.to_string()),
        }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}
