//! Code for creating the user table and resolving users from the database.
//!
//! Authentication happens outside of this crate. Callers hand over the user
//! ID from their session, and [resolve_user] turns it into a [UserID] that the
//! rest of the ledger accepts. Every ledger operation is scoped to that ID.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::Error;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's display name.
    pub name: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a [Error::EmptyName] if `name` is blank, or a [Error::SqlError] if
/// an SQL related error occurred.
pub fn create_user(name: &str, connection: &Connection) -> Result<User, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection.execute("INSERT INTO user (name) VALUES (?1)", (name,))?;

    let id = UserID::new(connection.last_insert_rowid());
    tracing::info!("created user {id}");

    Ok(User {
        id,
        name: name.to_owned(),
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, name FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], |row| {
            Ok(User {
                id: UserID::new(row.get(0)?),
                name: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

/// Resolve the identity supplied by the request layer into a registered user.
///
/// This fails closed: a missing identity or an ID that does not belong to a
/// registered user is rejected.
///
/// # Errors
///
/// Returns [Error::Unauthorized] if `user_id` is `None` or unknown, or
/// [Error::SqlError] if the lookup itself failed.
pub fn resolve_user(user_id: Option<UserID>, connection: &Connection) -> Result<User, Error> {
    let Some(user_id) = user_id else {
        tracing::warn!("rejected a request without a user identity");
        return Err(Error::Unauthorized);
    };

    match get_user_by_id(user_id, connection) {
        Err(Error::NotFound) => {
            tracing::warn!("rejected a request for unknown user {user_id}");
            Err(Error::Unauthorized)
        }
        result => result,
    }
}
