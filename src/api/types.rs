//! Shared types for the API layer.

use std::sync::Arc;

use serde::Deserialize;

use crate::core_state::CoreState;

/// Default and maximum page size for history listings.
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// `?limit=` for history listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_limit_defaults_and_clamps() {
        assert_eq!(ListQuery::default().limit(), DEFAULT_LIST_LIMIT);
        assert_eq!(ListQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(ListQuery { limit: Some(10_000) }.limit(), MAX_LIST_LIMIT);
        assert_eq!(ListQuery { limit: Some(7) }.limit(), 7);
    }
}
