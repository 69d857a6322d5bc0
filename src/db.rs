//! Set up the application's SQLite database.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, category::create_category_table,
    template::create_template_table, transaction::create_transaction_tables,
    transfer::create_transfer_table, user::create_user_table,
};

/// Create the tables for every ledger model.
///
/// Safe to call on an already initialized database.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_tables(&transaction)?;
    create_transfer_table(&transaction)?;
    create_template_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(initialize(&conn), Ok(()));
        assert_eq!(initialize(&conn), Ok(()));
    }

    #[test]
    fn initialize_enables_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let enabled: bool = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }
}
