//! Common types used across the service

use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Page/limit pagination as sent in query strings
///
/// Missing, unparsable or non-positive values fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default, deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: Some(i64::from(page)),
            limit: Some(i64::from(limit)),
        }
    }

    pub fn page(&self) -> u32 {
        positive_or(self.page, DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        positive_or(self.limit, DEFAULT_PAGE_LIMIT)
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}

fn positive_or(value: Option<i64>, default: u32) -> u32 {
    match value {
        Some(v) if v > 0 => u32::try_from(v).unwrap_or(u32::MAX),
        _ => default,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInt {
    Int(i64),
    Text(String),
}

/// Optional integer that reads anything it cannot parse as absent
///
/// Query strings deliver `?limit=` and `?limit=abc` as text; both mean "use
/// the default" rather than a rejected request.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawInt>::deserialize(deserializer).unwrap_or(None);
    Ok(match raw {
        Some(RawInt::Int(value)) => Some(value),
        Some(RawInt::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Resolve a requested result limit, falling back to `default` when absent or
/// non-positive
pub fn effective_limit(requested: Option<i64>, default: u32) -> u32 {
    positive_or(requested, default)
}
