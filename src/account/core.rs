//! Defines the account model and its database queries.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    database_id::AccountID,
    money::{from_cents, to_cents},
};

// ============================================================================
// MODELS
// ============================================================================

/// A bank account, credit card, wallet or any other pot of money.
///
/// An account only stores its initial balance. The current balance is always
/// derived from the account's incomes, expenses and transfers, see
/// [crate::compute_balance].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountID,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The display name of the account.
    pub name: String,
    /// Optional free text about the account.
    pub description: Option<String>,
    /// The balance of the account before any recorded activity.
    pub initial_balance: Decimal,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the account was last edited.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Account {
    /// Create a new account.
    ///
    /// Shortcut for [NewAccount] for discoverability.
    pub fn build(name: &str, initial_balance: Decimal, user_id: UserID) -> NewAccount {
        NewAccount {
            user_id,
            name: name.to_owned(),
            description: None,
            initial_balance,
        }
    }
}

/// The data needed to create an [Account].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The user that will own the account.
    pub user_id: UserID,
    /// The display name, must not be blank.
    pub name: String,
    /// Optional free text about the account.
    pub description: Option<String>,
    /// The balance of the account before any recorded activity.
    pub initial_balance: Decimal,
}

impl NewAccount {
    /// Set the description for the account.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
}

/// The user editable fields of an [Account].
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    /// The new display name, must not be blank.
    pub name: String,
    /// The new description.
    pub description: Option<String>,
    /// The corrected initial balance.
    pub initial_balance: Decimal,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const ACCOUNT_COLUMNS: &str =
    "id, user_id, name, description, initial_balance, created_at, updated_at";

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            initial_balance INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
    )?;

    Ok(())
}

/// Create a new account in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::AmountOutOfRange] if the initial balance cannot be stored,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_account(new_account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let name = validate_name(&new_account.name)?;
    let initial_balance = to_cents(new_account.initial_balance)?;
    let now = OffsetDateTime::now_utc();

    let account = connection
        .prepare(&format!(
            "INSERT INTO account
             (user_id, name, description, initial_balance, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            (
                new_account.user_id.as_i64(),
                name,
                new_account.description,
                initial_balance,
                now,
            ),
            map_account_row,
        )?;

    tracing::info!("created account {} for user {}", account.id, account.user_id);

    Ok(account)
}

/// Retrieve an account owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to an account owned by the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_account(
    id: AccountID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_account_row)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's accounts ordered by name.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE user_id = ?1 ORDER BY name ASC, id ASC"
        ))?
        .query_map([user_id.as_i64()], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Edit the name, description and initial balance of an account.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the new name is blank,
/// - [Error::NotFound] if `id` does not refer to an account owned by the user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_account(
    id: AccountID,
    update: AccountUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = validate_name(&update.name)?;
    let initial_balance = to_cents(update.initial_balance)?;

    let account = connection
        .prepare(&format!(
            "UPDATE account
             SET name = ?1, description = ?2, initial_balance = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6
             RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            (
                name,
                update.description,
                initial_balance,
                OffsetDateTime::now_utc(),
                id,
                user_id.as_i64(),
            ),
            map_account_row,
        )?;

    Ok(account)
}

/// Delete an account that no transaction refers to.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to an account owned by the user,
/// - [Error::AccountInUse] if an income, expense or transfer references the account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_account(
    id: AccountID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;

    get_account(id, user_id, &transaction)?;

    let reference_count: i64 = transaction.query_row(
        "SELECT
            (SELECT COUNT(id) FROM income WHERE account_id = ?1)
            + (SELECT COUNT(id) FROM expense WHERE account_id = ?1)
            + (SELECT COUNT(id) FROM transfer WHERE from_account_id = ?1 OR to_account_id = ?1)",
        [id],
        |row| row.get(0),
    )?;

    if reference_count > 0 {
        tracing::debug!("account {id} is referenced by {reference_count} transactions");
        return Err(Error::AccountInUse);
    }

    transaction.execute(
        "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;
    transaction.commit()?;

    tracing::info!("deleted account {id} for user {user_id}");

    Ok(())
}

fn validate_name(name: &str) -> Result<&str, Error> {
    let name = name.trim();

    if name.is_empty() {
        Err(Error::EmptyName)
    } else {
        Ok(name)
    }
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        initial_balance: from_cents(row.get(4)?),
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Category, CategoryKind, Error, NewTransaction, NewTransfer, TransactionKind, User,
        create_category, create_transaction, create_transfer, create_user, db::initialize,
    };

    use super::{
        Account, AccountUpdate, create_account, delete_account, get_account, get_accounts,
        update_account,
    };

    fn get_test_connection() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Test User", &conn).unwrap();
        (conn, user)
    }

    #[test]
    fn create_succeeds() {
        let (conn, user) = get_test_connection();

        let account = create_account(
            Account::build("Checking", dec!(100.50), user.id).description("Everyday"),
            &conn,
        )
        .expect("Could not create account");

        assert!(account.id > 0);
        assert_eq!(account.name, "Checking");
        assert_eq!(account.description.as_deref(), Some("Everyday"));
        assert_eq!(account.initial_balance, dec!(100.50));
        assert_eq!(get_account(account.id, user.id, &conn), Ok(account));
    }

    #[test]
    fn create_fails_on_blank_name() {
        let (conn, user) = get_test_connection();

        let result = create_account(Account::build("  ", dec!(0), user.id), &conn);

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn get_is_scoped_to_owner() {
        let (conn, user) = get_test_connection();
        let other_user = create_user("Someone Else", &conn).unwrap();
        let account = create_account(Account::build("Savings", dec!(1), user.id), &conn).unwrap();

        let result = get_account(account.id, other_user.id, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_accounts_orders_by_name() {
        let (conn, user) = get_test_connection();
        let other_user = create_user("Someone Else", &conn).unwrap();
        create_account(Account::build("Wallet", dec!(0), user.id), &conn).unwrap();
        create_account(Account::build("Brokerage", dec!(0), user.id), &conn).unwrap();
        create_account(Account::build("Hidden", dec!(0), other_user.id), &conn).unwrap();

        let names: Vec<String> = get_accounts(user.id, &conn)
            .unwrap()
            .into_iter()
            .map(|account| account.name)
            .collect();

        assert_eq!(names, vec!["Brokerage", "Wallet"]);
    }

    #[test]
    fn update_changes_fields() {
        let (conn, user) = get_test_connection();
        let account = create_account(Account::build("Old", dec!(10), user.id), &conn).unwrap();

        let updated = update_account(
            account.id,
            AccountUpdate {
                name: "New".to_owned(),
                description: Some("Renamed".to_owned()),
                initial_balance: dec!(25.75),
            },
            user.id,
            &conn,
        )
        .unwrap();

        assert_eq!(updated.name, "New");
        assert_eq!(updated.description.as_deref(), Some("Renamed"));
        assert_eq!(updated.initial_balance, dec!(25.75));
        assert_eq!(updated.created_at, account.created_at);
    }

    #[test]
    fn update_missing_account_is_not_found() {
        let (conn, user) = get_test_connection();

        let result = update_account(
            999,
            AccountUpdate {
                name: "New".to_owned(),
                description: None,
                initial_balance: dec!(0),
            },
            user.id,
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_unreferenced_account_succeeds() {
        let (conn, user) = get_test_connection();
        let account = create_account(Account::build("Unused", dec!(0), user.id), &conn).unwrap();

        assert_eq!(delete_account(account.id, user.id, &conn), Ok(()));
        assert_eq!(get_account(account.id, user.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_account_is_not_found() {
        let (conn, user) = get_test_connection();

        assert_eq!(delete_account(123, user.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_fails_while_income_references_account() {
        let (conn, user) = get_test_connection();
        let account = create_account(Account::build("Salary", dec!(0), user.id), &conn).unwrap();
        let category =
            create_category(Category::build("Wages", CategoryKind::Income, user.id), &conn)
                .unwrap();
        create_transaction(
            NewTransaction::build(
                TransactionKind::Income,
                account.id,
                category.id,
                dec!(10),
                date!(2025 - 01 - 01),
                "Pay",
                user.id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(
            delete_account(account.id, user.id, &conn),
            Err(Error::AccountInUse)
        );
    }

    #[test]
    fn delete_fails_while_transfer_references_account() {
        let (conn, user) = get_test_connection();
        let from = create_account(Account::build("From", dec!(100), user.id), &conn).unwrap();
        let to = create_account(Account::build("To", dec!(0), user.id), &conn).unwrap();
        create_transfer(
            NewTransfer::build(from.id, to.id, dec!(5), date!(2025 - 01 - 01), "Move", user.id),
            &conn,
        )
        .unwrap();

        assert_eq!(delete_account(to.id, user.id, &conn), Err(Error::AccountInUse));
        assert_eq!(
            delete_account(from.id, user.id, &conn),
            Err(Error::AccountInUse)
        );
    }
}
