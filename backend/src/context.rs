//! Per-request correlation context
//!
//! Carries correlation metadata only. Business state never travels here.

use uuid::Uuid;

/// Correlation data threaded explicitly through service calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Context with a freshly generated request id, for calls that do not
    /// originate from HTTP (startup tasks, tests)
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::generate()
    }
}
