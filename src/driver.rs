#[cfg(feature = "pg")]
pub mod pg;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::fmt::Debug;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::types::Result;

/// A database backend the record store can run on.
#[async_trait]
pub trait DatabaseDriver: Debug + Sync + Send + 'static {
    fn name(&self) -> &'static str;
    fn connection(&self) -> DatabaseConnection;
    /// Backend-specific session tuning, applied once after connecting.
    async fn configure(&self) -> Result<()>;
}
