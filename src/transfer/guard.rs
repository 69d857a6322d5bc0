//! Checks that a transfer can be covered by its source account.

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    Error, UserID,
    account::get_account,
    balance::compute_balance,
    database_id::{AccountID, TransferID},
    transfer::get_transfer,
};

/// A proposed transfer, either new or an edit of an existing one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferCheck {
    /// The account the money leaves.
    pub from_account_id: AccountID,
    /// The account the money arrives in.
    pub to_account_id: AccountID,
    /// The amount to move.
    pub amount: Decimal,
    /// The transfer being edited, `None` when creating a transfer.
    pub existing_transfer_id: Option<TransferID>,
}

/// Check that a transfer would not overdraw its source account.
///
/// The available balance is the source account's derived balance. When an
/// existing transfer is edited and keeps its source account, that transfer's
/// current amount is added back first, because the edit replaces the old
/// debit rather than adding a second one. A transfer may bring the source
/// balance to exactly zero.
///
/// Amounts are not checked for being positive here, callers validate that
/// before writing.
///
/// This is a read-only check. [crate::create_transfer] and
/// [crate::update_transfer] repeat it inside the write transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAccounts] if either account does not belong to the user,
///   or the source and destination are the same account,
/// - [Error::NotFound] if the transfer being edited does not belong to the user,
/// - [Error::InsufficientFunds] if the available balance is less than the amount,
/// - or [Error::SqlError] if a query fails.
pub fn validate_transfer(
    user_id: UserID,
    check: &TransferCheck,
    connection: &Connection,
) -> Result<(), Error> {
    if check.from_account_id == check.to_account_id {
        tracing::debug!(
            "rejected transfer from account {} to itself",
            check.from_account_id
        );
        return Err(Error::InvalidAccounts);
    }

    for account_id in [check.from_account_id, check.to_account_id] {
        match get_account(account_id, user_id, connection) {
            Ok(_) => {}
            Err(Error::NotFound) => {
                tracing::debug!("rejected transfer with unknown account {account_id}");
                return Err(Error::InvalidAccounts);
            }
            Err(error) => return Err(error),
        }
    }

    let current_balance = compute_balance(check.from_account_id, user_id, connection)?;

    let available = match check.existing_transfer_id {
        Some(transfer_id) => {
            let existing = get_transfer(transfer_id, user_id, connection)?;

            if existing.from_account_id == check.from_account_id {
                current_balance + existing.amount
            } else {
                current_balance
            }
        }
        None => current_balance,
    };

    if available < check.amount {
        tracing::warn!(
            "rejected transfer of {} from account {}: only {available} available",
            check.amount,
            check.from_account_id
        );
        return Err(Error::InsufficientFunds {
            available,
            required: check.amount,
        });
    }

    tracing::debug!(
        "transfer of {} from account {} is covered by {available}",
        check.amount,
        check.from_account_id
    );

    Ok(())
}
