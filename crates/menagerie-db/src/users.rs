//! Durable user records in SQLite.
//!
//! User records live in their own keyed store, separate from the
//! snapshot document, and are loaded into the in-memory entity store at
//! startup. Credential material (password hashes, tokens) is owned by
//! the external credential service and never stored here.

use chrono::{DateTime, Utc};
use menagerie_types::{User, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `users` table.
#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Raw row shape of the `users` table.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    created_at: DateTime<Utc>,
    online: bool,
    difficulty: f64,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|err| DbError::Corrupt {
            reason: format!("user id {:?} is not a UUID: {err}", row.id),
        })?;
        Ok(Self {
            id: UserId::from(id),
            username: row.username,
            created_at: row.created_at,
            online: row.online,
            difficulty: menagerie_types::normalize_difficulty(row.difficulty),
        })
    }
}

impl UserStore {
    /// Open (creating if missing) the user database at `path` and
    /// bootstrap the schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the pool cannot be opened or the
    /// schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool (tests use `sqlite::memory:`) and
    /// bootstrap the schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the schema cannot be created.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, DbError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Create the `users` table if it does not exist yet.
    async fn migrate(&self) -> Result<(), DbError> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                online INTEGER NOT NULL DEFAULT 0,
                difficulty REAL NOT NULL DEFAULT 1.0
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new user record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UsernameTaken`] if the username is already
    /// registered, or [`DbError::Sqlite`] for any other failure.
    pub async fn insert(&self, user: &User) -> Result<(), DbError> {
        let result = sqlx::query(
            r"INSERT INTO users (id, username, created_at, online, difficulty)
              VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(user.created_at)
        .bind(user.online)
        .bind(user.difficulty)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation()) =>
            {
                Err(DbError::UsernameTaken {
                    username: user.username.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a user by identifier. Returns `None` when no row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Corrupt`] if the stored row cannot be decoded.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, created_at, online, difficulty
              FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Load every user record, for hydrating the in-memory store at
    /// startup.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails, or
    /// [`DbError::Corrupt`] if any stored row cannot be decoded.
    pub async fn load_all(&self) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, created_at, online, difficulty
              FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Update a user's online flag.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn set_online(&self, id: UserId, online: bool) -> Result<(), DbError> {
        sqlx::query(r"UPDATE users SET online = ? WHERE id = ?")
            .bind(online)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Update a user's difficulty multiplier.
    ///
    /// The caller is expected to have normalized the value already;
    /// this method stores what it is given.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn set_difficulty(&self, id: UserId, difficulty: f64) -> Result<(), DbError> {
        sqlx::query(r"UPDATE users SET difficulty = ? WHERE id = ?")
            .bind(difficulty)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
