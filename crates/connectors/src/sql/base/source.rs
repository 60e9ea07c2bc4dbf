use crate::sql::base::{error::DbError, requests::FetchRowsRequest};
use async_trait::async_trait;
use model::records::row::RowData;

/// Read side of a sync run: the scraper database.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn fetch_rows(&self, request: FetchRowsRequest) -> Result<Vec<RowData>, DbError>;

    async fn count_rows(&self, table: &str) -> Result<u64, DbError>;

    async fn ping(&self) -> Result<(), DbError>;

    /// Releases pooled connections. Calling it more than once is harmless.
    async fn close(&self);
}
