//! Defines the transfer model and its database queries.

use rusqlite::{
    Connection, Row, Transaction as SqlTransaction, TransactionBehavior, params_from_iter,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, UserID,
    database_id::{AccountID, TransferID},
    filter::{FilterTarget, ListFilter},
    money::{from_cents, to_positive_cents},
    text::normalize_description,
    transfer::guard::{TransferCheck, validate_transfer},
};

/// Money moved from one of a user's accounts to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// The ID of the transfer.
    pub id: TransferID,
    /// The user that owns both accounts.
    pub user_id: UserID,
    /// The account the money left.
    pub from_account_id: AccountID,
    /// The account the money arrived in.
    pub to_account_id: AccountID,
    /// The amount moved, always positive.
    pub amount: Decimal,
    /// When the transfer happened.
    pub date: Date,
    /// A text description of the transfer.
    pub description: String,
    /// The searchable form of the description.
    pub description_normalized: String,
    /// Optional free text notes.
    pub notes: Option<String>,
}

/// The data needed to create a [Transfer].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    /// The user that owns both accounts.
    pub user_id: UserID,
    /// The account the money leaves.
    pub from_account_id: AccountID,
    /// The account the money arrives in, must differ from the source.
    pub to_account_id: AccountID,
    /// The amount to move, must be greater than zero.
    pub amount: Decimal,
    /// When the transfer happened.
    pub date: Date,
    /// A text description of the transfer.
    pub description: String,
    /// Optional free text notes.
    pub notes: Option<String>,
}

impl NewTransfer {
    /// Create a new transfer.
    pub fn build(
        from_account_id: AccountID,
        to_account_id: AccountID,
        amount: Decimal,
        date: Date,
        description: &str,
        user_id: UserID,
    ) -> Self {
        Self {
            user_id,
            from_account_id,
            to_account_id,
            amount,
            date,
            description: description.to_owned(),
            notes: None,
        }
    }

    /// Set the notes for the transfer.
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_owned());
        self
    }
}

/// The user editable fields of a [Transfer].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferUpdate {
    /// The account the money leaves.
    pub from_account_id: AccountID,
    /// The account the money arrives in, must differ from the source.
    pub to_account_id: AccountID,
    /// The amount to move, must be greater than zero.
    pub amount: Decimal,
    /// When the transfer happened.
    pub date: Date,
    /// A text description of the transfer.
    pub description: String,
    /// Optional free text notes.
    pub notes: Option<String>,
}

impl From<Transfer> for TransferUpdate {
    fn from(transfer: Transfer) -> Self {
        Self {
            from_account_id: transfer.from_account_id,
            to_account_id: transfer.to_account_id,
            amount: transfer.amount,
            date: transfer.date,
            description: transfer.description,
            notes: transfer.notes,
        }
    }
}

const TRANSFER_COLUMNS: &str = "id, user_id, from_account_id, to_account_id, amount, date, \
    description, description_normalized, notes";

/// Create the transfer table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transfer_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transfer (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            from_account_id INTEGER NOT NULL,
            to_account_id INTEGER NOT NULL,
            amount INTEGER NOT NULL CHECK (amount > 0),
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            description_normalized TEXT NOT NULL,
            notes TEXT,
            CHECK (from_account_id != to_account_id),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(from_account_id) REFERENCES account(id) ON UPDATE CASCADE,
            FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_transfer_from ON transfer(from_account_id);
        CREATE INDEX IF NOT EXISTS idx_transfer_to ON transfer(to_account_id);
        CREATE INDEX IF NOT EXISTS idx_transfer_user_date ON transfer(user_id, date);",
    )?;

    Ok(())
}

/// Create a transfer after checking that the source account can cover it.
///
/// The check and the insert run in one `IMMEDIATE` transaction, which takes
/// the database write lock before the balance is read. Another writer cannot
/// spend the same balance between the check and the insert.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::InvalidAccounts] if the accounts are the same or not owned by the user,
/// - [Error::InsufficientFunds] if the source account cannot cover the amount,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transfer(
    new_transfer: NewTransfer,
    connection: &Connection,
) -> Result<Transfer, Error> {
    let amount = to_positive_cents(new_transfer.amount)?;
    let user_id = new_transfer.user_id;

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    validate_transfer(
        user_id,
        &TransferCheck {
            from_account_id: new_transfer.from_account_id,
            to_account_id: new_transfer.to_account_id,
            amount: from_cents(amount),
            existing_transfer_id: None,
        },
        &sql_transaction,
    )?;

    let transfer = sql_transaction
        .prepare(&format!(
            "INSERT INTO transfer (user_id, from_account_id, to_account_id, amount, date, \
             description, description_normalized, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {TRANSFER_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                new_transfer.from_account_id,
                new_transfer.to_account_id,
                amount,
                new_transfer.date,
                &new_transfer.description,
                normalize_description(&new_transfer.description),
                &new_transfer.notes,
            ),
            map_transfer_row,
        )?;

    sql_transaction.commit()?;

    tracing::info!(
        "created transfer {} of {} from account {} to account {}",
        transfer.id,
        transfer.amount,
        transfer.from_account_id,
        transfer.to_account_id
    );

    Ok(transfer)
}

/// Retrieve a transfer by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transfer owned by the user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transfer(
    id: TransferID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transfer, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfer WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_transfer_row)
        .map_err(|error| error.into())
}

/// Retrieve the transfers matching `filter`, newest first.
///
/// # Errors
/// Returns [Error::AmountOutOfRange] if an amount bound in the filter cannot be
/// stored, or [Error::SqlError] if the query fails.
pub fn get_transfers(
    filter: &ListFilter,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transfer>, Error> {
    let predicate = filter.to_predicate(user_id, FilterTarget::Transfer)?;

    connection
        .prepare(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfer WHERE {predicate} \
             ORDER BY date DESC, id DESC",
            predicate = predicate.sql(),
        ))?
        .query_map(params_from_iter(predicate.params()), map_transfer_row)?
        .map(|maybe_transfer| maybe_transfer.map_err(|error| error.into()))
        .collect()
}

/// Replace the editable fields of a transfer after checking that the source
/// account can cover the new amount.
///
/// If the source account is unchanged, the transfer's current amount counts
/// as available, since the edit replaces it. Like [create_transfer], the check
/// and the write share one `IMMEDIATE` transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the amount is not greater than zero,
/// - [Error::NotFound] if the transfer does not belong to the user,
/// - [Error::InvalidAccounts] if the accounts are the same or not owned by the user,
/// - [Error::InsufficientFunds] if the source account cannot cover the amount,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transfer(
    id: TransferID,
    update: TransferUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transfer, Error> {
    let amount = to_positive_cents(update.amount)?;

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    validate_transfer(
        user_id,
        &TransferCheck {
            from_account_id: update.from_account_id,
            to_account_id: update.to_account_id,
            amount: from_cents(amount),
            existing_transfer_id: Some(id),
        },
        &sql_transaction,
    )?;

    let transfer = sql_transaction
        .prepare(&format!(
            "UPDATE transfer
             SET from_account_id = ?1, to_account_id = ?2, amount = ?3, date = ?4,
                 description = ?5, description_normalized = ?6, notes = ?7
             WHERE id = ?8 AND user_id = ?9
             RETURNING {TRANSFER_COLUMNS}"
        ))?
        .query_row(
            (
                update.from_account_id,
                update.to_account_id,
                amount,
                update.date,
                &update.description,
                normalize_description(&update.description),
                &update.notes,
                id,
                user_id.as_i64(),
            ),
            map_transfer_row,
        )?;

    sql_transaction.commit()?;

    tracing::info!("updated transfer {id} for user {user_id}");

    Ok(transfer)
}

/// Delete a transfer.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transfer owned by the user.
pub fn delete_transfer(
    id: TransferID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM transfer WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("deleted transfer {id} for user {user_id}");

    Ok(())
}

fn map_transfer_row(row: &Row) -> Result<Transfer, rusqlite::Error> {
    Ok(Transfer {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        from_account_id: row.get(2)?,
        to_account_id: row.get(3)?,
        amount: from_cents(row.get(4)?),
        date: row.get(5)?,
        description: row.get(6)?,
        description_normalized: row.get(7)?,
        notes: row.get(8)?,
    })
}
