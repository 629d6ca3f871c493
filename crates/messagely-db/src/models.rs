use messagely_types::models::UserSummary;

use crate::error::{DbError, Result};

/// Input to [`Database::register`](crate::Database::register). The password is plaintext here and
/// is hashed before it reaches the store.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
}

impl NewUser<'_> {
    pub(crate) fn validate(&self) -> Result<()> {
        let fields = [
            ("username", self.username),
            ("password", self.password),
            ("first_name", self.first_name),
            ("last_name", self.last_name),
            ("phone", self.phone),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(DbError::Validation(format!("Missing required fields: {}", missing.join(", "))));
        }

        // Usernames are keys: "alice " must not become a second alice
        if self.username.trim() != self.username {
            return Err(DbError::Validation(
                "Username must not start or end with whitespace".into(),
            ));
        }

        Ok(())
    }
}

/// Reads `username, first_name, last_name, phone` starting at column `start`.
pub(crate) fn user_summary(row: &rusqlite::Row<'_>, start: usize) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        username: row.get(start)?,
        first_name: row.get(start + 1)?,
        last_name: row.get(start + 2)?,
        phone: row.get(start + 3)?,
    })
}
