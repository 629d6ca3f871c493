pub mod error;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod password;
pub mod users;

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::anyhow;
use rusqlite::Connection;
use tracing::info;

pub use error::{DbError, Result};
pub use models::NewUser;
pub use password::HashingConfig;

use password::Passwords;

/// Settings applied when the database is opened.
#[derive(Debug, Clone, Copy)]
pub struct DbConfig {
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
    pub hashing: HashingConfig,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            hashing: HashingConfig::default(),
        }
    }
}

/// Handle over the `users` and `messages` tables.
///
/// Every data-access operation is a method on this type. It holds the
/// connection and the password hasher, nothing else.
pub struct Database {
    conn: Mutex<Connection>,
    passwords: Passwords,
}

impl Database {
    pub fn open(path: &Path, config: &DbConfig) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn, config)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory(config: &DbConfig) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config)
    }

    fn init(conn: Connection, config: &DbConfig) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(config.busy_timeout)?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            passwords: Passwords::new(config.hashing)?,
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn database() -> Database {
        let config = DbConfig {
            hashing: HashingConfig::minimal(),
            ..DbConfig::default()
        };
        Database::open_in_memory(&config).unwrap()
    }

    pub fn register(db: &Database, username: &str) {
        db.register(&NewUser {
            username,
            password: "password123",
            first_name: "Test",
            last_name: username,
            phone: "555-0100",
        })
        .unwrap();
    }
}
