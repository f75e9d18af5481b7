//! Postgres-backed preferences store (`user_preferences`, see `sql/schema.sql`).
//!
//! Every operation runs in its own transaction that first scopes the row-level
//! security policy to the caller via `app.clerk_user_id`.

use async_trait::async_trait;
use sqlx::{Connection, FromRow, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::{Instrument, info_span};

use super::{PreferencesPatch, PreferencesStore, StoreError, StoreResult, Theme, UserPreferences};

const COLUMNS: &str = "clerk_user_id, theme, notifications, last_login_reminder, \
                       verification_prompted, created_at, updated_at";

impl<'r> FromRow<'r, PgRow> for UserPreferences {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let theme: String = row.try_get("theme")?;
        let theme = theme.parse::<Theme>().map_err(|err| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                err,
            )))
        })?;
        Ok(Self {
            clerk_user_id: row.try_get("clerk_user_id")?,
            theme,
            notifications: row.try_get("notifications")?,
            last_login_reminder: row.try_get("last_login_reminder")?,
            verification_prompted: row.try_get("verification_prompted")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgPreferencesStore {
    pool: PgPool,
}

impl PgPreferencesStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Open a transaction with the RLS owner setting bound to `clerk_user_id`.
    async fn scoped(&self, clerk_user_id: &str) -> StoreResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('app.clerk_user_id', $1, TRUE)")
            .bind(clerk_user_id)
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// `SET` list shared by update and upsert: merge present fields and only move
/// `updated_at` when a value actually changes.
const MERGE_ASSIGNMENTS: &str = r"
    theme = COALESCE($2, user_preferences.theme),
    notifications = COALESCE($3, user_preferences.notifications),
    last_login_reminder = COALESCE($4, user_preferences.last_login_reminder),
    verification_prompted = COALESCE($5, user_preferences.verification_prompted),
    updated_at = CASE
        WHEN (
            user_preferences.theme,
            user_preferences.notifications,
            user_preferences.last_login_reminder,
            user_preferences.verification_prompted
        ) IS DISTINCT FROM (
            COALESCE($2, user_preferences.theme),
            COALESCE($3, user_preferences.notifications),
            COALESCE($4, user_preferences.last_login_reminder),
            COALESCE($5, user_preferences.verification_prompted)
        )
        THEN NOW()
        ELSE user_preferences.updated_at
    END
";

#[async_trait]
impl PreferencesStore for PgPreferencesStore {
    async fn find(&self, clerk_user_id: &str) -> StoreResult<Option<UserPreferences>> {
        let span = info_span!("db.preferences.find", db.system = "postgresql");
        async {
            let mut tx = self.scoped(clerk_user_id).await?;
            let row = sqlx::query_as::<_, UserPreferences>(&format!(
                "SELECT {COLUMNS} FROM user_preferences WHERE clerk_user_id = $1"
            ))
            .bind(clerk_user_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(row)
        }
        .instrument(span)
        .await
    }

    async fn create(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences> {
        let span = info_span!("db.preferences.create", db.system = "postgresql");
        async {
            let mut tx = self.scoped(clerk_user_id).await?;
            let query = format!(
                r"
                INSERT INTO user_preferences
                    (clerk_user_id, theme, notifications, last_login_reminder, verification_prompted)
                VALUES ($1, COALESCE($2, 'system'), COALESCE($3, TRUE), $4, COALESCE($5, FALSE))
                RETURNING {COLUMNS}
                "
            );
            let row = sqlx::query_as::<_, UserPreferences>(&query)
                .bind(clerk_user_id)
                .bind(patch.theme.map(Theme::as_str))
                .bind(patch.notifications)
                .bind(patch.last_login_reminder)
                .bind(patch.verification_prompted)
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        StoreError::Conflict
                    } else {
                        StoreError::Database(err)
                    }
                })?;
            tx.commit().await?;
            Ok(row)
        }
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences> {
        let span = info_span!("db.preferences.update", db.system = "postgresql");
        async {
            let mut tx = self.scoped(clerk_user_id).await?;
            let query = format!(
                "UPDATE user_preferences SET {MERGE_ASSIGNMENTS} WHERE clerk_user_id = $1 RETURNING {COLUMNS}"
            );
            let row = sqlx::query_as::<_, UserPreferences>(&query)
                .bind(clerk_user_id)
                .bind(patch.theme.map(Theme::as_str))
                .bind(patch.notifications)
                .bind(patch.last_login_reminder)
                .bind(patch.verification_prompted)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::NotFound)?;
            tx.commit().await?;
            Ok(row)
        }
        .instrument(span)
        .await
    }

    async fn upsert(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences> {
        let span = info_span!("db.preferences.upsert", db.system = "postgresql");
        async {
            let mut tx = self.scoped(clerk_user_id).await?;
            let query = format!(
                r"
                INSERT INTO user_preferences
                    (clerk_user_id, theme, notifications, last_login_reminder, verification_prompted)
                VALUES ($1, COALESCE($2, 'system'), COALESCE($3, TRUE), $4, COALESCE($5, FALSE))
                ON CONFLICT (clerk_user_id) DO UPDATE SET {MERGE_ASSIGNMENTS}
                RETURNING {COLUMNS}
                "
            );
            let row = sqlx::query_as::<_, UserPreferences>(&query)
                .bind(clerk_user_id)
                .bind(patch.theme.map(Theme::as_str))
                .bind(patch.notifications)
                .bind(patch.last_login_reminder)
                .bind(patch.verification_prompted)
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(row)
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, clerk_user_id: &str) -> StoreResult<()> {
        let span = info_span!("db.preferences.delete", db.system = "postgresql");
        async {
            let mut tx = self.scoped(clerk_user_id).await?;
            let result = sqlx::query("DELETE FROM user_preferences WHERE clerk_user_id = $1")
                .bind(clerk_user_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            if result.rows_affected() == 0 {
                Err(StoreError::NotFound)
            } else {
                Ok(())
            }
        }
        .instrument(span)
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await?;
            Ok(())
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use sqlx::postgres::PgPoolOptions;
    use ulid::Ulid;

    const SCHEMA: &str = include_str!("../../sql/schema.sql");

    /// `None` unless `SHIPSMIND_TEST_DSN` points at a scratch database.
    async fn test_store() -> Result<Option<PgPreferencesStore>> {
        let Ok(dsn) = std::env::var("SHIPSMIND_TEST_DSN") else {
            eprintln!("Skipping test: SHIPSMIND_TEST_DSN is not set");
            return Ok(None);
        };
        let pool = PgPoolOptions::new().max_connections(2).connect(&dsn).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Some(PgPreferencesStore::new(pool)))
    }

    #[test]
    fn only_database_errors_are_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }

    // One test for the whole lifecycle so the schema is applied once.
    #[tokio::test]
    async fn preferences_round_trip_against_postgres() -> Result<()> {
        let Some(store) = test_store().await? else {
            return Ok(());
        };
        store.ping().await?;
        let user_id = format!("user_test_{}", Ulid::new());

        assert!(store.find(&user_id).await?.is_none());

        let dark = PreferencesPatch {
            theme: Some(Theme::Dark),
            ..PreferencesPatch::default()
        };
        let created = store.create(&user_id, &dark).await?;
        assert_eq!(created.theme, Theme::Dark);
        assert!(created.notifications);
        assert!(!created.verification_prompted);
        assert!(created.last_login_reminder.is_none());

        let again = store.create(&user_id, &PreferencesPatch::default()).await;
        assert!(matches!(again, Err(StoreError::Conflict)));

        // Same values: the row is returned untouched.
        let unchanged = store.upsert(&user_id, &dark).await?;
        assert_eq!(unchanged.updated_at, created.updated_at);

        let prompted = store
            .update(&user_id, &PreferencesPatch::verification_prompted())
            .await?;
        assert!(prompted.verification_prompted);
        assert_eq!(prompted.theme, Theme::Dark);
        assert!(prompted.notifications);
        assert!(prompted.updated_at >= created.updated_at);
        assert_eq!(prompted.created_at, created.created_at);

        let found = store.find(&user_id).await?;
        assert_eq!(found.as_ref(), Some(&prompted));

        store.delete(&user_id).await?;
        assert!(matches!(
            store.delete(&user_id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.update(&user_id, &dark).await,
            Err(StoreError::NotFound)
        ));
        Ok(())
    }
}
