use std::path::Path;

use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectOptions;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use tracing::error;

use crate::types::Result;

use super::DatabaseDriver;

#[derive(Debug)]
#[fxstruct(sync, no_new)]
pub struct Sqlite {
    connection: DatabaseConnection,
}

impl Sqlite {
    /// Open or create database file `db_name` in `db_dir`.
    pub async fn connect(db_dir: &Path, db_name: &str) -> Result<Self> {
        let db_path = db_dir.join(db_name);
        Self::open(&format!("sqlite://{}?mode=rwc", db_path.display())).await
    }

    pub async fn open(url: &str) -> Result<Self> {
        let mut opts = ConnectOptions::new(url);
        opts.sqlx_logging(false);

        let db = sea_orm::Database::connect(opts)
            .await
            .inspect_err(|e| error!(url, error = %e, "cannot connect to SQLite database"))?;

        Ok(Self { connection: db })
    }
}

#[async_trait]
impl DatabaseDriver for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn configure(&self) -> Result<()> {
        let db = &self.connection;

        db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        db.execute_unprepared("PRAGMA synchronous=NORMAL;").await?;

        Ok(())
    }
}
