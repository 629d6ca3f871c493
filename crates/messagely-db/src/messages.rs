use chrono::Utc;
use messagely_types::models::{MessageDetail, NewMessage, ReadReceipt};
use rusqlite::{OptionalExtension, params};
use tracing::info;

use crate::Database;
use crate::error::{DbError, Result, is_foreign_key_violation};
use crate::models::user_summary;
use crate::users::user_exists;

impl Database {
    /// A message with both parties' public profiles. Callers decide whether
    /// the requester may see it.
    pub fn get_message(&self, id: i64) -> Result<MessageDetail> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT m.id, m.body, m.sent_at, m.read_at,
                        f.username, f.first_name, f.last_name, f.phone,
                        t.username, t.first_name, t.last_name, t.phone
                 FROM messages m
                 JOIN users f ON f.username = m.from_username
                 JOIN users t ON t.username = m.to_username
                 WHERE m.id = ?1",
                [id],
                |row| {
                    Ok(MessageDetail {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        sent_at: row.get(2)?,
                        read_at: row.get(3)?,
                        from_user: user_summary(row, 4)?,
                        to_user: user_summary(row, 8)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| DbError::message_not_found(id))
        })
    }

    /// Sender and recipient usernames of a message.
    pub fn message_participants(&self, id: i64) -> Result<(String, String)> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT from_username, to_username FROM messages WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| DbError::message_not_found(id))
        })
    }

    pub fn create_message(&self, from_username: &str, to_username: &str, body: &str) -> Result<NewMessage> {
        if body.trim().is_empty() {
            return Err(DbError::Validation("Message body must not be empty".into()));
        }

        let sent_at = Utc::now();

        let id = self.with_conn(|conn| {
            if !user_exists(conn, to_username)? {
                return Err(DbError::Validation(format!("Recipient '{to_username}' does not exist")));
            }

            conn.query_row(
                "INSERT INTO messages (from_username, to_username, body, sent_at)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING id",
                params![from_username, to_username, body, sent_at],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DbError::Validation("Sender or recipient does not exist".into())
                } else {
                    e.into()
                }
            })
        })?;

        info!(id, from = from_username, to = to_username, "Created message");

        Ok(NewMessage {
            id,
            from_username: from_username.to_string(),
            to_username: to_username.to_string(),
            body: body.to_string(),
            sent_at,
        })
    }

    /// Stamp `read_at`. A message is read at most once: a second call fails
    /// with `Conflict` and leaves the first timestamp in place.
    pub fn mark_read(&self, id: i64) -> Result<ReadReceipt> {
        let now = Utc::now();

        self.with_conn(|conn| {
            let updated = conn
                .query_row(
                    "UPDATE messages SET read_at = ?1
                     WHERE id = ?2 AND read_at IS NULL
                     RETURNING id, read_at",
                    params![now, id],
                    |row| {
                        Ok(ReadReceipt {
                            id: row.get(0)?,
                            read_at: row.get(1)?,
                        })
                    },
                )
                .optional()?;

            if let Some(receipt) = updated {
                return Ok(receipt);
            }

            let exists = conn
                .query_row("SELECT 1 FROM messages WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();

            if exists {
                Err(DbError::Conflict(format!("Message {id} was already read")))
            } else {
                Err(DbError::message_not_found(id))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{database, register};

    fn with_pair() -> Database {
        let db = database();
        register(&db, "alice");
        register(&db, "bob");
        db
    }

    #[test]
    fn create_then_get_round_trips() {
        let db = with_pair();
        let created = db.create_message("alice", "bob", "hi").unwrap();
        assert_eq!(created.from_username, "alice");
        assert_eq!(created.to_username, "bob");

        let msg = db.get_message(created.id).unwrap();
        assert_eq!(msg.id, created.id);
        assert_eq!(msg.body, "hi");
        assert_eq!(msg.sent_at, created.sent_at);
        assert!(msg.read_at.is_none());
        assert_eq!(msg.from_user.username, "alice");
        assert_eq!(msg.to_user.username, "bob");
        assert_eq!(msg.to_user.last_name, "bob");
    }

    #[test]
    fn create_rejects_empty_body() {
        let db = with_pair();
        assert!(matches!(
            db.create_message("alice", "bob", "   "),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_unknown_recipient() {
        let db = with_pair();
        let err = db.create_message("alice", "ghost", "hello?").unwrap_err();
        match err {
            DbError::Validation(msg) => assert!(msg.contains("ghost")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_unknown_sender() {
        let db = with_pair();
        assert!(matches!(
            db.create_message("ghost", "bob", "boo"),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn get_unknown_message_is_not_found() {
        let db = with_pair();
        assert!(matches!(
            db.get_message(42),
            Err(DbError::NotFound { entity: "Message", .. })
        ));
    }

    #[test]
    fn participants_are_sender_then_recipient() {
        let db = with_pair();
        let created = db.create_message("bob", "alice", "yo").unwrap();
        assert_eq!(
            db.message_participants(created.id).unwrap(),
            ("bob".to_string(), "alice".to_string())
        );
        assert!(db.message_participants(created.id + 1).is_err());
    }

    #[test]
    fn mark_read_sets_timestamp_once() {
        let db = with_pair();
        let created = db.create_message("alice", "bob", "hi").unwrap();

        let receipt = db.mark_read(created.id).unwrap();
        assert_eq!(receipt.id, created.id);
        assert!(receipt.read_at >= created.sent_at);
        assert!(receipt.read_at <= Utc::now());

        let second = db.mark_read(created.id);
        assert!(matches!(second, Err(DbError::Conflict(_))));

        let msg = db.get_message(created.id).unwrap();
        assert_eq!(msg.read_at, Some(receipt.read_at));
    }

    #[test]
    fn mark_read_unknown_message_is_not_found() {
        let db = with_pair();
        assert!(matches!(db.mark_read(7), Err(DbError::NotFound { .. })));
    }
}
