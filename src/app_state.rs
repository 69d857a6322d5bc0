//! Implements a struct that holds the state shared by ledger front-ends.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use time::Date;

use crate::{Error, db::initialize, timezone::today_in};

/// The state shared by everything that serves ledger requests.
#[derive(Debug, Clone)]
pub struct LedgerState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LedgerState {
    /// Create a new [LedgerState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the ledger models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an error if the timezone is unknown or the database cannot be initialized.
    pub fn new(db_connection: Connection, local_timezone: &str) -> Result<Self, Error> {
        today_in(local_timezone)?;
        initialize(&db_connection)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }

    /// Lock the database connection.
    ///
    /// # Errors
    /// Returns [Error::DatabaseLockError] if another thread panicked while holding the lock.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }

    /// The current date in the local timezone.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the local timezone is unknown.
    pub fn today(&self) -> Result<Date, Error> {
        today_in(&self.local_timezone)
    }
}

#[cfg(test)]
mod ledger_state_tests {
    use rusqlite::Connection;

    use crate::{Error, create_user, get_user_by_id};

    use super::LedgerState;

    #[test]
    fn new_initializes_database() {
        let state = LedgerState::new(Connection::open_in_memory().unwrap(), "Etc/UTC").unwrap();

        let connection = state.connection().unwrap();
        let user = create_user("Test User", &connection).unwrap();

        assert_eq!(get_user_by_id(user.id, &connection), Ok(user));
    }

    #[test]
    fn new_rejects_unknown_timezone() {
        let result = LedgerState::new(Connection::open_in_memory().unwrap(), "Mars/Olympus");

        assert_eq!(
            result.map(|_| ()),
            Err(Error::InvalidTimezone("Mars/Olympus".to_owned()))
        );
    }

    #[test]
    fn clones_share_the_connection() {
        let state = LedgerState::new(Connection::open_in_memory().unwrap(), "Etc/UTC").unwrap();
        let clone = state.clone();

        let user = create_user("Test User", &state.connection().unwrap()).unwrap();

        assert_eq!(get_user_by_id(user.id, &clone.connection().unwrap()), Ok(user));
    }
}
