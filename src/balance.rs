//! Derives account balances from the transaction history.
//!
//! Balances are never stored. Each one is recomputed on read as
//!
//! ```text
//! initial balance + incomes + transfers in - expenses - transfers out
//! ```
//!
//! so it cannot drift from the rows it is derived from.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error, UserID,
    account::{Account, get_account, get_accounts},
    database_id::AccountID,
    money::{from_cents, to_cents},
};

/// The current balance of one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    /// The account the balance is for.
    pub account_id: AccountID,
    /// The account's display name.
    pub name: String,
    /// The derived balance as of now.
    pub balance: Decimal,
}

/// The stored and aggregated parts that make up a balance, in cents.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct BalanceComponents {
    initial_balance: i64,
    incomes: i64,
    expenses: i64,
    transfers_in: i64,
    transfers_out: i64,
}

impl BalanceComponents {
    fn total(&self) -> Decimal {
        from_cents(self.initial_balance) + from_cents(self.incomes) + from_cents(self.transfers_in)
            - from_cents(self.expenses)
            - from_cents(self.transfers_out)
    }
}

/// Compute the current balance of an account owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if the account does not belong to the user,
/// - or [Error::SqlError] if one of the aggregate queries fails.
pub fn compute_balance(
    account_id: AccountID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let account = get_account(account_id, user_id, connection)?;

    balance_of(&account, connection)
}

/// Compute the current balance of every account the user owns, ordered by account name.
///
/// # Errors
/// Returns [Error::SqlError] if any of the queries fail.
pub fn compute_all_balances(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<AccountBalance>, Error> {
    get_accounts(user_id, connection)?
        .into_iter()
        .map(|account| {
            Ok(AccountBalance {
                balance: balance_of(&account, connection)?,
                account_id: account.id,
                name: account.name,
            })
        })
        .collect()
}

fn balance_of(account: &Account, connection: &Connection) -> Result<Decimal, Error> {
    let components = BalanceComponents {
        initial_balance: to_cents(account.initial_balance)?,
        incomes: sum_amounts(
            "SELECT COALESCE(SUM(amount), 0) FROM income WHERE account_id = ?1",
            account.id,
            connection,
        )?,
        expenses: sum_amounts(
            "SELECT COALESCE(SUM(amount), 0) FROM expense WHERE account_id = ?1",
            account.id,
            connection,
        )?,
        transfers_in: sum_amounts(
            "SELECT COALESCE(SUM(amount), 0) FROM transfer WHERE to_account_id = ?1",
            account.id,
            connection,
        )?,
        transfers_out: sum_amounts(
            "SELECT COALESCE(SUM(amount), 0) FROM transfer WHERE from_account_id = ?1",
            account.id,
            connection,
        )?,
    };

    tracing::debug!("balance components for account {}: {components:?}", account.id);

    Ok(components.total())
}

fn sum_amounts(query: &str, account_id: AccountID, connection: &Connection) -> Result<i64, Error> {
    connection
        .prepare_cached(query)?
        .query_row([account_id], |row| row.get(0))
        .map_err(|error| error.into())
}
