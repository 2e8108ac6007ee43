use app_errors::ApplicationError;
use app_models::{AppKind, Application};
use chrono::{DateTime, Utc};
use sql_connection::SqlConnect;
use tracing::instrument;
use uuid::Uuid;

const APP_COLUMNS: &str = "id, name, domain, kind, key_hash, active, \
                           expires_at, owner_id, created_at";

#[derive(Clone)]
pub struct AppDao {
    db: SqlConnect,
}

impl AppDao {
    pub fn new(db: SqlConnect) -> Self { Self { db } }

    fn map_row(row: &tokio_postgres::Row) -> Application {
        let kind: String = row.get(3);
        Application {
            id: row.get(0),
            name: row.get(1),
            domain: row.get(2),
            // kind passed the table CHECK constraint; the fallback never runs
            kind: AppKind::parse(&kind).unwrap_or(AppKind::Web),
            key_hash: row.get(4),
            active: row.get(5),
            expires_at: row.get(6),
            owner_id: row.get(7),
            created_at: row.get(8),
        }
    }

    #[instrument(skip(self, app), fields(app.name = %app.name))]
    pub async fn insert(
        &self, app: &Application,
    ) -> Result<Application, ApplicationError> {
        let client = self.db.get_client().await?;
        let stmt = client
            .prepare(
                "INSERT INTO applications (id, name, domain, kind, \
                 key_hash, active, expires_at, owner_id, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 RETURNING id, name, domain, kind, key_hash, active, \
                 expires_at, owner_id, created_at",
            )
            .await?;
        let row = client
            .query_one(
                &stmt,
                &[
                    &app.id,
                    &app.name,
                    &app.domain,
                    &app.kind.as_str(),
                    &app.key_hash,
                    &app.active,
                    &app.expires_at,
                    &app.owner_id,
                    &app.created_at,
                ],
            )
            .await?;
        Ok(Self::map_row(&row))
    }

    /// Every active, unexpired application. Authentication walks this
    /// whole set and verifies the presented key against each hash, so
    /// the call cost is linear in the number of live applications.
    #[instrument(skip(self))]
    pub async fn find_active(
        &self, now: DateTime<Utc>,
    ) -> Result<Vec<Application>, ApplicationError> {
        let client = self.db.get_read_client().await?;
        let stmt = client
            .prepare(&format!(
                "SELECT {APP_COLUMNS} FROM applications \
                 WHERE active AND expires_at > $1 \
                 ORDER BY created_at"
            ))
            .await?;
        let rows = client.query(&stmt, &[&now]).await?;
        Ok(rows.iter().map(Self::map_row).collect())
    }

    /// Flip the active flag. Revocation never deletes the record.
    #[instrument(skip(self))]
    pub async fn set_active(
        &self, app_id: Uuid, owner_id: Uuid, active: bool,
    ) -> Result<Application, ApplicationError> {
        let client = self.db.get_client().await?;
        let stmt = client
            .prepare(&format!(
                "UPDATE applications SET active = $3 \
                 WHERE id = $1 AND owner_id = $2 \
                 RETURNING {APP_COLUMNS}"
            ))
            .await?;
        let rows = client.query(&stmt, &[&app_id, &owner_id, &active]).await?;
        rows.first()
            .map(Self::map_row)
            .ok_or(ApplicationError::NotFound { app_id })
    }

    /// Replace the stored hash and reset expiry, keeping the record.
    #[instrument(skip(self, key_hash))]
    pub async fn replace_key(
        &self, app_id: Uuid, owner_id: Uuid, key_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Application, ApplicationError> {
        let client = self.db.get_client().await?;
        let stmt = client
            .prepare(&format!(
                "UPDATE applications \
                 SET key_hash = $3, expires_at = $4, active = TRUE \
                 WHERE id = $1 AND owner_id = $2 \
                 RETURNING {APP_COLUMNS}"
            ))
            .await?;
        let rows = client
            .query(&stmt, &[&app_id, &owner_id, &key_hash, &expires_at])
            .await?;
        rows.first()
            .map(Self::map_row)
            .ok_or(ApplicationError::NotFound { app_id })
    }
}
