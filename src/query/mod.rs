//! Remote query engine seam.
//!
//! The analytical engine is an external collaborator. The dashboard only needs
//! `execute(query, dialect) -> Table`, so that is the whole trait. Failures here
//! are the one error class that reaches the user.

use crate::table::Table;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// SQL dialect understood by the remote engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    Legacy,
    Standard,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Legacy => write!(f, "legacy"),
            Dialect::Standard => write!(f, "standard"),
        }
    }
}

/// Remote compute failures, attributed to the panel that issued the query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Malformed query: {0}")]
    Malformed(String),

    #[error("Query authentication failed: {0}")]
    Authentication(String),

    #[error("Query engine error: {0}")]
    Engine(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

/// The slow remote fetch behind every panel
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, query: &str, dialect: Dialect) -> Result<Table, QueryError>;
}

/// Run `query` against `engine`, bounded by `limit` when one is set
pub async fn execute_with_timeout(
    engine: &dyn QueryEngine,
    query: &str,
    dialect: Dialect,
    limit: Option<Duration>,
) -> Result<Table, QueryError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, engine.execute(query, dialect))
            .await
            .map_err(|_| QueryError::Timeout(limit))?,
        None => engine.execute(query, dialect).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowEngine;

    #[async_trait]
    impl QueryEngine for SlowEngine {
        async fn execute(&self, _query: &str, _dialect: Dialect) -> Result<Table, QueryError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Table::new(["x"]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_query_error() {
        let result =
            execute_with_timeout(&SlowEngine, "SELECT 1", Dialect::Legacy, Some(Duration::from_secs(5)))
                .await;
        assert_eq!(result, Err(QueryError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_limit_waits_for_engine() {
        let result = execute_with_timeout(&SlowEngine, "SELECT 1", Dialect::Standard, None).await;
        assert_eq!(result.map(|t| t.columns().to_vec()), Ok(vec!["x".to_string()]));
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::Legacy.to_string(), "legacy");
        assert_eq!(Dialect::Standard.to_string(), "standard");
    }
}
