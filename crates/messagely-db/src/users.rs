use chrono::{DateTime, Utc};
use messagely_types::models::{LoginStamp, ReceivedMessage, SentMessage, UserProfile, UserSummary};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::Database;
use crate::error::{DbError, Result, is_unique_violation};
use crate::models::{NewUser, user_summary};

impl Database {
    /// Hash the password and insert a new user. The primary key on `username`
    /// decides duplicates.
    pub fn register(&self, new_user: &NewUser<'_>) -> Result<UserProfile> {
        new_user.validate()?;

        // Hash outside the connection lock
        let password_hash = self.passwords.hash(new_user.password)?;
        let join_at = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, first_name, last_name, phone, join_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    new_user.username,
                    password_hash,
                    new_user.first_name,
                    new_user.last_name,
                    new_user.phone,
                    join_at,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::Conflict(format!("Username '{}' is already taken", new_user.username))
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })?;

        info!(username = new_user.username, "Registered user");

        Ok(UserProfile {
            username: new_user.username.to_string(),
            first_name: new_user.first_name.to_string(),
            last_name: new_user.last_name.to_string(),
            phone: new_user.phone.to_string(),
            join_at,
            last_login_at: None,
        })
    }

    /// Is this username/password pair valid?
    ///
    /// Unknown usernames and wrong passwords both come back as `Ok(false)`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(DbError::Validation("Username and password required".into()));
        }

        let stored: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT password FROM users WHERE username = ?1", [username], |row| row.get(0))
                .optional()?)
        })?;

        match stored {
            Some(hash) => self.passwords.verify(password, &hash),
            None => {
                self.passwords.verify_dummy(password);
                debug!(username, "Authentication attempt for unknown user");
                Ok(false)
            }
        }
    }

    pub fn update_login_timestamp(&self, username: &str) -> Result<LoginStamp> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE users SET last_login_at = ?1 WHERE username = ?2
                 RETURNING username, last_login_at",
                params![now, username],
                |row| {
                    Ok(LoginStamp {
                        username: row.get(0)?,
                        last_login_at: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| DbError::user_not_found(username))
        })
    }

    /// Basic info on every user, ordered by username.
    ///
    /// Unbounded: returns the whole table.
    pub fn all_users(&self) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT username, first_name, last_name, phone FROM users ORDER BY username")?;
            let users = stmt
                .query_map([], |row| user_summary(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    pub fn get_user(&self, username: &str) -> Result<UserProfile> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT username, first_name, last_name, phone, join_at, last_login_at
                 FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(UserProfile {
                        username: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        phone: row.get(3)?,
                        join_at: row.get(4)?,
                        last_login_at: row.get(5)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| DbError::user_not_found(username))
        })
    }

    /// Messages sent by `username`, each with the recipient's public fields.
    pub fn messages_from(&self, username: &str) -> Result<Vec<SentMessage>> {
        self.with_conn(|conn| {
            ensure_user_exists(conn, username)?;

            let mut stmt = conn.prepare(
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        u.username, u.first_name, u.last_name, u.phone
                 FROM messages m
                 JOIN users u ON u.username = m.to_username
                 WHERE m.from_username = ?1
                 ORDER BY m.sent_at, m.id",
            )?;

            let messages = stmt
                .query_map([username], |row| {
                    Ok(SentMessage {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        sent_at: row.get(2)?,
                        read_at: row.get::<_, Option<DateTime<Utc>>>(3)?,
                        to_user: user_summary(row, 4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(messages)
        })
    }

    /// Messages received by `username`, each with the sender's public fields.
    pub fn messages_to(&self, username: &str) -> Result<Vec<ReceivedMessage>> {
        self.with_conn(|conn| {
            ensure_user_exists(conn, username)?;

            let mut stmt = conn.prepare(
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        u.username, u.first_name, u.last_name, u.phone
                 FROM messages m
                 JOIN users u ON u.username = m.from_username
                 WHERE m.to_username = ?1
                 ORDER BY m.sent_at, m.id",
            )?;

            let messages = stmt
                .query_map([username], |row| {
                    Ok(ReceivedMessage {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        sent_at: row.get(2)?,
                        read_at: row.get::<_, Option<DateTime<Utc>>>(3)?,
                        from_user: user_summary(row, 4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(messages)
        })
    }
}

pub(crate) fn user_exists(conn: &Connection, username: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn ensure_user_exists(conn: &Connection, username: &str) -> Result<()> {
    if user_exists(conn, username)? {
        Ok(())
    } else {
        Err(DbError::user_not_found(username))
    }
}
