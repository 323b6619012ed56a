//! Data models shared across database access and API handlers.

use serde::{Deserialize, Serialize};

pub mod calendar;
pub mod equipment;
pub mod personal_record;
pub mod profile;
pub mod session;
pub mod subscription;
pub mod user;
pub mod workout;

/// Query parameters for paginated endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationQuery {
    /// Maximum number of records to return (default: 50, max: 500).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Number of records to skip (default: 0).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl PaginationQuery {
    /// Returns a clamped limit value (1..=500).
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 500)
    }

    /// Returns offset, floored at 0.
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Wrapper for paginated API responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            data,
            total,
            limit,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_limit_and_offset() {
        let query = PaginationQuery {
            limit: 9999,
            offset: -5,
        };
        assert_eq!(query.limit(), 500);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn pagination_defaults() {
        let query = PaginationQuery::default();
        assert_eq!(query.limit(), 50);
        assert_eq!(query.offset(), 0);
    }
}
