use app_dao::AppDao;
use app_errors::ApplicationError;
use app_models::{Application, RegisterAppRequest};
use chrono::{Duration, Utc};
use rand::{Rng, distributions::Alphanumeric};
use sql_connection::SqlConnect;
use tracing::{instrument, warn};
use uuid::Uuid;

pub const KEY_LENGTH: usize = 32;
const KEY_VALIDITY_DAYS: i64 = 365;

/// Issued key material. The plaintext exists only in this value; the
/// store keeps a salted hash.
#[derive(Debug)]
pub struct IssuedApplication {
    pub plaintext_key: String,
    pub app: Application,
}

/// Holds application identity and hashed secrets.
///
/// The hash is salted per record, so there is no index from a presented
/// key to its row: `authenticate` walks every active, unexpired record
/// and verifies against each hash. That keeps key material unindexable
/// at the price of a scan that is linear in the number of live
/// applications — fine at moderate scale, and the limit callers should
/// know about.
#[derive(Clone)]
pub struct CredentialStore {
    app_dao: AppDao,
}

/// Fixed-length key over the alphanumeric alphabet.
pub fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect()
}

impl CredentialStore {
    pub fn new(db: SqlConnect) -> Self {
        Self {
            app_dao: AppDao::new(db),
        }
    }

    /// Register an application and issue its key. The plaintext is
    /// returned exactly once and is not recoverable afterwards.
    #[instrument(skip(self, request), fields(app.name = %request.name))]
    pub async fn issue(
        &self, request: RegisterAppRequest,
    ) -> Result<IssuedApplication, ApplicationError> {
        let plaintext_key = generate_key();
        let key_hash = bcrypt::hash(&plaintext_key, bcrypt::DEFAULT_COST)?;
        let now = Utc::now();

        let app = Application {
            id: Uuid::now_v7(),
            name: request.name,
            domain: request.domain,
            kind: request.kind,
            key_hash,
            active: true,
            expires_at: now + Duration::days(KEY_VALIDITY_DAYS),
            owner_id: request.owner_id,
            created_at: now,
        };

        let app = self.app_dao.insert(&app).await?;
        Ok(IssuedApplication { plaintext_key, app })
    }

    /// Resolve a presented key to its application, or `None`.
    ///
    /// Unknown, expired and revoked keys are indistinguishable here:
    /// expired and inactive records are excluded from the scan before
    /// any hash is checked, and all three outcomes produce the same
    /// `None`. Verification itself is bcrypt's constant-time check.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self, presented_key: &str,
    ) -> Result<Option<Application>, ApplicationError> {
        let candidates = self.app_dao.find_active(Utc::now()).await?;

        for app in candidates {
            match bcrypt::verify(presented_key, &app.key_hash) {
                Ok(true) => return Ok(Some(app)),
                Ok(false) => {}
                Err(err) => {
                    // A corrupt hash must not end the scan early.
                    warn!(app.id = %app.id, error = %err, "unverifiable key hash");
                }
            }
        }
        Ok(None)
    }

    /// Deactivate the key. History stays; the record is never deleted.
    #[instrument(skip(self))]
    pub async fn revoke(
        &self, app_id: Uuid, owner_id: Uuid,
    ) -> Result<Application, ApplicationError> {
        self.app_dao.set_active(app_id, owner_id, false).await
    }

    /// Issue a fresh key for an existing record, resetting expiry. The
    /// previous key stops verifying the moment the hash is replaced.
    #[instrument(skip(self))]
    pub async fn regenerate(
        &self, app_id: Uuid, owner_id: Uuid,
    ) -> Result<IssuedApplication, ApplicationError> {
        let plaintext_key = generate_key();
        let key_hash = bcrypt::hash(&plaintext_key, bcrypt::DEFAULT_COST)?;
        let expires_at = Utc::now() + Duration::days(KEY_VALIDITY_DAYS);

        let app = self
            .app_dao
            .replace_key(app_id, owner_id, &key_hash, expires_at)
            .await?;
        Ok(IssuedApplication { plaintext_key, app })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_fixed_length_alphanumeric() {
        for _ in 0..32 {
            let key = generate_key();
            assert_eq!(key.len(), KEY_LENGTH);
            assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn generated_keys_do_not_repeat() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_verifies_and_is_salted() {
        let key = generate_key();
        let hash_a = bcrypt::hash(&key, bcrypt::DEFAULT_COST).unwrap();
        let hash_b = bcrypt::hash(&key, bcrypt::DEFAULT_COST).unwrap();
        // Per-record salt: same plaintext, different hashes.
        assert_ne!(hash_a, hash_b);
        assert!(bcrypt::verify(&key, &hash_a).unwrap());
        assert!(bcrypt::verify(&key, &hash_b).unwrap());
        assert!(!bcrypt::verify("not-the-key", &hash_a).unwrap());
    }
}
