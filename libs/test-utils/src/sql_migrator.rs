use deadpool_postgres::Pool;

/// Plain-SQL migration runner over the domain migration files.
pub struct SqlMigrator {
    pool: Pool,
}

impl SqlMigrator {
    pub fn new(pool: Pool) -> Self { Self { pool } }

    pub async fn run_all_migrations(&self) -> anyhow::Result<()> {
        self.create_migration_table().await?;

        let migrations = [
            (
                "001_create_applications",
                include_str!(
                    "../../../domains/apps/migrations/sql/001_create_applications.sql"
                ),
            ),
            (
                "002_create_events",
                include_str!(
                    "../../../domains/events/migrations/sql/002_create_events.sql"
                ),
            ),
        ];

        for (name, sql) in migrations {
            if self.is_migration_applied(name).await? {
                continue;
            }

            let mut client = self.pool.get().await?;
            let tx = client.transaction().await?;
            tx.batch_execute(sql).await.map_err(|e| {
                anyhow::anyhow!("Failed to run migration {}: {}", name, e)
            })?;
            tx.execute(
                "INSERT INTO _migrations (name, applied_at) VALUES ($1, NOW())",
                &[&name],
            )
            .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    async fn create_migration_table(&self) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    name TEXT PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .await?;
        Ok(())
    }

    async fn is_migration_applied(&self, name: &str) -> anyhow::Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) FROM _migrations WHERE name = $1",
                &[&name],
            )
            .await?;
        let count: i64 = row.get(0);
        Ok(count > 0)
    }
}
