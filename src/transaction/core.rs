//! Defines the core data models and database queries for incomes and expenses.

use std::fmt::Display;

use rusqlite::{Connection, Row, params_from_iter};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    account::get_account,
    category::{CategoryKind, get_category},
    database_id::{AccountID, CategoryID, TransactionID},
    filter::{FilterTarget, ListFilter},
    money::{from_cents, to_positive_cents},
    text::normalize_description,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction is money earned or money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned into an account.
    Income,
    /// Money spent from an account.
    Expense,
}

impl TransactionKind {
    /// The table that stores transactions of this kind.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// The kind of category that transactions of this kind must use.
    pub fn category_kind(&self) -> CategoryKind {
        match self {
            Self::Income => CategoryKind::Income,
            Self::Expense => CategoryKind::Expense,
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// An income or an expense, i.e. an event where money was either earned or spent.
///
/// To create a new `Transaction`, use [NewTransaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction, unique within its kind.
    pub id: TransactionID,
    /// The user that owns the transaction.
    pub user_id: UserID,
    /// Whether this is an income or an expense.
    pub kind: TransactionKind,
    /// The account the money went into or came out of.
    pub account_id: AccountID,
    /// The category of the transaction, of the matching kind.
    pub category_id: CategoryID,
    /// The amount of money earned or spent, always positive.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The description with accents stripped, lower-cased and whitespace
    /// collapsed, used for searching.
    pub description_normalized: String,
    /// Optional free text notes.
    pub notes: Option<String>,
}

/// The data needed to create a [Transaction].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The user that will own the transaction.
    pub user_id: UserID,
    /// Whether this is an income or an expense.
    pub kind: TransactionKind,
    /// The account the money goes into or comes out of.
    pub account_id: AccountID,
    /// The category, which must be of the matching kind.
    pub category_id: CategoryID,
    /// The amount, which must be greater than zero.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// What the transaction was for.
    pub description: String,
    /// Optional free text notes.
    pub notes: Option<String>,
}

impl NewTransaction {
    /// Create a new income or expense.
    pub fn build(
        kind: TransactionKind,
        account_id: AccountID,
        category_id: CategoryID,
        amount: Decimal,
        date: Date,
        description: &str,
        user_id: UserID,
    ) -> Self {
        Self {
            user_id,
            kind,
            account_id,
            category_id,
            amount,
            date,
            description: description.to_owned(),
            notes: None,
        }
    }

    /// Set the notes for the transaction.
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_owned());
        self
    }
}

/// The user editable fields of a [Transaction].
///
/// The kind of a transaction cannot change; delete it and create one of the
/// other kind instead.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    /// The account the money went into or came out of.
    pub account_id: AccountID,
    /// The category, which must be of the matching kind.
    pub category_id: CategoryID,
    /// The amount, which must be greater than zero.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// What the transaction was for.
    pub description: String,
    /// Optional free text notes.
    pub notes: Option<String>,
}

impl From<Transaction> for TransactionUpdate {
    fn from(transaction: Transaction) -> Self {
        Self {
            account_id: transaction.account_id,
            category_id: transaction.category_id,
            amount: transaction.amount,
            date: transaction.date,
            description: transaction.description,
            notes: transaction.notes,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, category_id, amount, date, \
    description, description_normalized, notes";

/// Create a new income or expense in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::NotFound] if the account or the category does not belong to the user,
/// - [Error::CategoryKindMismatch] if the category is not of the transaction's kind,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = to_positive_cents(new_transaction.amount)?;
    let kind = new_transaction.kind;
    let user_id = new_transaction.user_id;

    let sql_transaction = connection.unchecked_transaction()?;

    check_references(
        kind,
        new_transaction.account_id,
        new_transaction.category_id,
        user_id,
        &sql_transaction,
    )?;

    let transaction = sql_transaction
        .prepare(&format!(
            "INSERT INTO {table} (user_id, account_id, category_id, amount, date, \
             description, description_normalized, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TRANSACTION_COLUMNS}",
            table = kind.table(),
        ))?
        .query_row(
            (
                user_id.as_i64(),
                new_transaction.account_id,
                new_transaction.category_id,
                amount,
                new_transaction.date,
                &new_transaction.description,
                normalize_description(&new_transaction.description),
                &new_transaction.notes,
            ),
            |row| map_transaction_row(kind, row),
        )?;

    sql_transaction.commit()?;

    tracing::info!("created {kind} {} for user {user_id}", transaction.id);

    Ok(transaction)
}

/// Retrieve an income or expense by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction of this kind owned by the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    kind: TransactionKind,
    id: TransactionID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {table} WHERE id = ?1 AND user_id = ?2",
            table = kind.table(),
        ))?
        .query_row((id, user_id.as_i64()), |row| map_transaction_row(kind, row))
        .map_err(|error| error.into())
}

/// Retrieve the incomes or expenses matching `filter`, newest first.
///
/// # Errors
/// Returns [Error::AmountOutOfRange] if an amount bound in the filter cannot be
/// stored, or [Error::SqlError] if the query fails.
pub fn get_transactions(
    kind: TransactionKind,
    filter: &ListFilter,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let predicate = filter.to_predicate(user_id, FilterTarget::Transaction)?;

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM {table} WHERE {predicate} \
             ORDER BY date DESC, id DESC",
            table = kind.table(),
            predicate = predicate.sql(),
        ))?
        .query_map(params_from_iter(predicate.params()), |row| {
            map_transaction_row(kind, row)
        })?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Replace the editable fields of an income or expense.
///
/// The normalised description is recomputed from the new description.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::NotFound] if the transaction, account or category does not belong to the user,
/// - [Error::CategoryKindMismatch] if the category is not of the transaction's kind,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    kind: TransactionKind,
    id: TransactionID,
    update: TransactionUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let amount = to_positive_cents(update.amount)?;

    let sql_transaction = connection.unchecked_transaction()?;

    check_references(
        kind,
        update.account_id,
        update.category_id,
        user_id,
        &sql_transaction,
    )?;

    let transaction = sql_transaction
        .prepare(&format!(
            "UPDATE {table}
             SET account_id = ?1, category_id = ?2, amount = ?3, date = ?4,
                 description = ?5, description_normalized = ?6, notes = ?7
             WHERE id = ?8 AND user_id = ?9
             RETURNING {TRANSACTION_COLUMNS}",
            table = kind.table(),
        ))?
        .query_row(
            (
                update.account_id,
                update.category_id,
                amount,
                update.date,
                &update.description,
                normalize_description(&update.description),
                &update.notes,
                id,
                user_id.as_i64(),
            ),
            |row| map_transaction_row(kind, row),
        )?;

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Delete an income or expense.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction of this
/// kind owned by the user.
pub fn delete_transaction(
    kind: TransactionKind,
    id: TransactionID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        &format!(
            "DELETE FROM {table} WHERE id = ?1 AND user_id = ?2",
            table = kind.table()
        ),
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("deleted {kind} {id} for user {user_id}");

    Ok(())
}

/// Create the income and expense tables in the database.
///
/// # Errors
/// Returns an error if the tables cannot be created or if there is an SQL error.
pub fn create_transaction_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for kind in [TransactionKind::Income, TransactionKind::Expense] {
        // Category IDs are not foreign keys: deleting a category keeps its
        // transactions, which reports then show as "Unknown".
        connection.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                amount INTEGER NOT NULL CHECK (amount > 0),
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                description_normalized TEXT NOT NULL,
                notes TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_account ON {table}(account_id);
            CREATE INDEX IF NOT EXISTS idx_{table}_user_date ON {table}(user_id, date);",
            table = kind.table(),
        ))?;
    }

    Ok(())
}

fn check_references(
    kind: TransactionKind,
    account_id: AccountID,
    category_id: CategoryID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    get_account(account_id, user_id, connection)?;
    let category = get_category(category_id, user_id, connection)?;

    if category.kind != kind.category_kind() {
        tracing::debug!(
            "rejected {} category {category_id} for an {kind}",
            category.kind
        );
        return Err(Error::CategoryKindMismatch);
    }

    Ok(())
}

fn map_transaction_row(kind: TransactionKind, row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        kind,
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        amount: from_cents(row.get(4)?),
        date: row.get(5)?,
        description: row.get(6)?,
        description_normalized: row.get(7)?,
        notes: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
