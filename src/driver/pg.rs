use std::time::Duration;

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
pub struct Pg {
    connection: DatabaseConnection,
}

impl Pg {
    pub async fn connect(url: &str) -> Result<Self> {
        let mut opts = ConnectOptions::new(url);
        opts.max_connections(20)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(20))
            .max_lifetime(Duration::from_secs(60))
            .test_before_acquire(true)
            .sqlx_logging(false);

        let connection = sea_orm::Database::connect(opts)
            .await
            .inspect_err(|e| error!(error = %e, "cannot connect to PostgreSQL database"))?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl DatabaseDriver for Pg {
    fn name(&self) -> &'static str {
        "pg"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn configure(&self) -> Result<()> {
        self.connection()
            .execute_unprepared("SET TIME ZONE 'UTC';")
            .await?;

        Ok(())
    }
}
