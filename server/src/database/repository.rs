//! Repository layer for database operations
//!
//! This module provides CRUD operations for users, trackers and logs.
//! Tracker lookups are always scoped to the owning user, log lookups
//! to the owning tracker.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Underlying pool, shared with the session store
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== Users =====

    /// Create a new user
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created user: {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: i64) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::UserNotFound(id))
    }

    /// Find a user by username
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // ===== Trackers =====

    /// Create a tracker owned by a user
    pub async fn create_tracker(&self, user_id: i64, req: &NewTracker) -> Result<Tracker> {
        let tracker = sqlx::query_as::<_, Tracker>(
            r#"
            INSERT INTO trackers (user_id, name, tracker_type, settings, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&req.name)
        .bind(req.tracker_type)
        .bind(&req.settings)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created tracker: {} for user: {}", tracker.id, user_id);
        Ok(tracker)
    }

    /// Get a tracker owned by a user
    pub async fn get_tracker(&self, user_id: i64, id: i64) -> Result<Tracker> {
        sqlx::query_as::<_, Tracker>("SELECT * FROM trackers WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TrackerNotFound(id))
    }

    /// List a user's trackers in creation order
    pub async fn list_trackers(&self, user_id: i64) -> Result<Vec<Tracker>> {
        let trackers =
            sqlx::query_as::<_, Tracker>("SELECT * FROM trackers WHERE user_id = ? ORDER BY id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(trackers)
    }

    /// Replace a tracker's name, type and settings
    pub async fn update_tracker(&self, user_id: i64, id: i64, req: &NewTracker) -> Result<Tracker> {
        sqlx::query_as::<_, Tracker>(
            r#"
            UPDATE trackers SET name = ?, tracker_type = ?, settings = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(req.tracker_type)
        .bind(&req.settings)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::TrackerNotFound(id))
    }

    /// Delete a tracker and, through the cascade, its logs
    pub async fn delete_tracker(&self, user_id: i64, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM trackers WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TrackerNotFound(id));
        }

        tracing::debug!("Deleted tracker: {}", id);
        Ok(())
    }

    pub async fn count_trackers(&self, user_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM trackers WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // ===== Logs =====

    /// Append a log to a tracker
    pub async fn create_log(&self, tracker_id: i64, req: &NewLog) -> Result<Log> {
        let log = sqlx::query_as::<_, Log>(
            r#"
            INSERT INTO logs (tracker_id, timestamp, value, note, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(tracker_id)
        .bind(&req.timestamp)
        .bind(&req.value)
        .bind(&req.note)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created log: {} for tracker: {}", log.id, tracker_id);
        Ok(log)
    }

    /// Get a log belonging to a tracker
    pub async fn get_log(&self, tracker_id: i64, id: i64) -> Result<Log> {
        sqlx::query_as::<_, Log>("SELECT * FROM logs WHERE id = ? AND tracker_id = ?")
            .bind(id)
            .bind(tracker_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::LogNotFound(id))
    }

    /// List a tracker's logs in creation order
    pub async fn list_logs(&self, tracker_id: i64) -> Result<Vec<Log>> {
        let logs = sqlx::query_as::<_, Log>("SELECT * FROM logs WHERE tracker_id = ? ORDER BY id")
            .bind(tracker_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(logs)
    }

    pub async fn update_log(&self, tracker_id: i64, id: i64, req: &NewLog) -> Result<Log> {
        sqlx::query_as::<_, Log>(
            r#"
            UPDATE logs SET timestamp = ?, value = ?, note = ?
            WHERE id = ? AND tracker_id = ?
            RETURNING *
            "#,
        )
        .bind(&req.timestamp)
        .bind(&req.value)
        .bind(&req.note)
        .bind(id)
        .bind(tracker_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::LogNotFound(id))
    }

    pub async fn delete_log(&self, tracker_id: i64, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM logs WHERE id = ? AND tracker_id = ?")
            .bind(id)
            .bind(tracker_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::LogNotFound(id));
        }

        tracing::debug!("Deleted log: {}", id);
        Ok(())
    }

    /// Count logs across all of a user's trackers
    pub async fn count_logs(&self, user_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM logs l
            JOIN trackers t ON t.id = l.tracker_id
            WHERE t.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Most recent log timestamp across all of a user's trackers
    pub async fn latest_log_timestamp(&self, user_id: i64) -> Result<Option<String>> {
        let latest: Option<String> = sqlx::query_scalar(
            r#"
            SELECT MAX(l.timestamp) FROM logs l
            JOIN trackers t ON t.id = l.tracker_id
            WHERE t.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(latest)
    }

    // ===== Bulk import =====

    /// Store imported trackers and their logs in a single transaction.
    ///
    /// Either every tracker and log is created or none is.
    pub async fn import_trackers(
        &self,
        user_id: i64,
        imported: &[ImportedTracker],
    ) -> Result<Vec<Tracker>> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(imported.len());

        for item in imported {
            let tracker = sqlx::query_as::<_, Tracker>(
                r#"
                INSERT INTO trackers (user_id, name, tracker_type, settings, created_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(&item.tracker.name)
            .bind(item.tracker.tracker_type)
            .bind(&item.tracker.settings)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            for log in &item.logs {
                sqlx::query(
                    r#"
                    INSERT INTO logs (tracker_id, timestamp, value, note, created_at)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(tracker.id)
                .bind(&log.timestamp)
                .bind(&log.value)
                .bind(&log.note)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            tracing::debug!(
                "Imported tracker: {} with {} logs",
                tracker.id,
                item.logs.len()
            );
            created.push(tracker);
        }

        tx.commit().await?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    fn quantitative(name: &str) -> NewTracker {
        NewTracker {
            name: name.to_string(),
            tracker_type: TrackerType::Quantitative,
            settings: None,
        }
    }

    fn log(timestamp: &str, value: &str) -> NewLog {
        NewLog {
            timestamp: timestamp.to_string(),
            value: value.to_string(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let repo = create_test_repo().await;

        let user = repo.create_user("alice", "hash").await.unwrap();
        let found = repo.find_user_by_username("alice").await.unwrap().unwrap();

        assert_eq!(found.id, user.id);
        assert!(repo.find_user_by_username("bob").await.unwrap().is_none());
        assert!(matches!(
            repo.get_user(user.id + 1).await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_by_schema() {
        let repo = create_test_repo().await;

        repo.create_user("alice", "hash").await.unwrap();
        let result = repo.create_user("alice", "other").await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_tracker_crud_is_scoped_to_owner() {
        let repo = create_test_repo().await;
        let alice = repo.create_user("alice", "hash").await.unwrap();
        let bob = repo.create_user("bob", "hash").await.unwrap();

        let tracker = repo.create_tracker(alice.id, &quantitative("Weight")).await.unwrap();
        assert_eq!(tracker.tracker_type, TrackerType::Quantitative);

        assert!(matches!(
            repo.get_tracker(bob.id, tracker.id).await,
            Err(AppError::TrackerNotFound(_))
        ));
        assert!(repo.delete_tracker(bob.id, tracker.id).await.is_err());

        let updated = repo
            .update_tracker(
                alice.id,
                tracker.id,
                &NewTracker {
                    name: "Mood".to_string(),
                    tracker_type: TrackerType::Qualitative,
                    settings: Some("low,mid,high".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Mood");
        assert_eq!(updated.tracker_type, TrackerType::Qualitative);

        repo.delete_tracker(alice.id, tracker.id).await.unwrap();
        assert_eq!(repo.count_trackers(alice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_logs_and_aggregates() {
        let repo = create_test_repo().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        let tracker = repo.create_tracker(user.id, &quantitative("Weight")).await.unwrap();

        assert_eq!(repo.latest_log_timestamp(user.id).await.unwrap(), None);

        repo.create_log(tracker.id, &log("2024-01-02T08:00:00", "70.5"))
            .await
            .unwrap();
        let second = repo
            .create_log(tracker.id, &log("2024-01-01T08:00:00", "71"))
            .await
            .unwrap();

        let logs = repo.list_logs(tracker.id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].value, "70.5");

        assert_eq!(repo.count_logs(user.id).await.unwrap(), 2);
        assert_eq!(
            repo.latest_log_timestamp(user.id).await.unwrap().as_deref(),
            Some("2024-01-02T08:00:00")
        );

        let updated = repo
            .update_log(tracker.id, second.id, &log("2024-01-03T08:00:00", "72"))
            .await
            .unwrap();
        assert_eq!(updated.value, "72");

        repo.delete_log(tracker.id, second.id).await.unwrap();
        assert!(matches!(
            repo.get_log(tracker.id, second.id).await,
            Err(AppError::LogNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deleting_tracker_removes_logs() {
        let repo = create_test_repo().await;
        let user = repo.create_user("alice", "hash").await.unwrap();
        let tracker = repo.create_tracker(user.id, &quantitative("Steps")).await.unwrap();
        repo.create_log(tracker.id, &log("2024-01-01T00:00:00", "1000"))
            .await
            .unwrap();

        repo.delete_tracker(user.id, tracker.id).await.unwrap();

        assert_eq!(repo.count_logs(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_trackers_in_one_transaction() {
        let repo = create_test_repo().await;
        let user = repo.create_user("alice", "hash").await.unwrap();

        let imported = vec![
            ImportedTracker {
                tracker: quantitative("Weight"),
                logs: vec![log("2024-01-01T08:00:00", "70"), log("2024-01-02T08:00:00", "71")],
            },
            ImportedTracker {
                tracker: quantitative("Steps"),
                logs: vec![],
            },
        ];

        let created = repo.import_trackers(user.id, &imported).await.unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(repo.count_trackers(user.id).await.unwrap(), 2);
        assert_eq!(repo.count_logs(user.id).await.unwrap(), 2);
    }
}
