//! Budgeteur Ledger is the consistency and aggregation engine behind a
//! personal multi-account finance tracker.
//!
//! Users record incomes, expenses and transfers between their accounts. This
//! library stores those records in SQLite and derives everything else from
//! them on read: account balances, category breakdowns and monthly trends.
//! It also guards the two places where writes must keep an invariant:
//! transfers may not overdraw their source account, and each user has at most
//! one default template per template kind.

#![warn(missing_docs)]

use rust_decimal::Decimal;

mod account;
mod app_state;
mod balance;
mod category;
mod database_id;
mod date_range;
mod db;
mod filter;
mod money;
mod report;
mod template;
mod text;
mod timezone;
mod transaction;
mod transfer;
mod user;

pub use account::{
    Account, AccountUpdate, NewAccount, create_account, delete_account, get_account,
    get_accounts, update_account,
};
pub use app_state::LedgerState;
pub use balance::{AccountBalance, compute_all_balances, compute_balance};
pub use category::{
    Category, CategoryKind, NewCategory, create_category, delete_category, get_categories,
    get_category, update_category,
};
pub use database_id::{AccountID, CategoryID, DatabaseID, TemplateID, TransactionID, TransferID};
pub use date_range::{DateRange, MonthKey};
pub use db::initialize as initialize_db;
pub use filter::ListFilter;
pub use report::{
    CategoryTotal, MonthlyTrend, ReportSummary, category_breakdown, monthly_trends,
    report_summary,
};
pub use template::{
    DefaultChange, NewTemplate, Template, TemplateKind, TemplateRefs, TemplateUpdate,
    create_template, delete_template, duplicate_template, get_default_template, get_template,
    get_templates, set_default, update_template,
};
pub use text::normalize_description;
pub use timezone::{get_local_offset, today_in};
pub use transaction::{
    NewTransaction, Transaction, TransactionKind, TransactionUpdate, create_transaction,
    delete_transaction, get_transaction, get_transactions, update_transaction,
};
pub use transfer::{
    NewTransfer, Transfer, TransferCheck, TransferUpdate, create_transfer, delete_transfer,
    get_transfer, get_transfers, update_transfer, validate_transfer,
};
pub use user::{User, UserID, create_user, get_user_by_id, resolve_user};

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found for the acting user.
    ///
    /// This covers accounts, categories, transactions, transfers and templates
    /// that either do not exist or belong to a different user. Internally, this
    /// error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A transfer referenced an account the acting user does not own, or the
    /// source and destination accounts are the same.
    #[error("the transfer accounts are invalid")]
    InvalidAccounts,

    /// The source account of a transfer cannot cover the requested amount.
    ///
    /// Both figures are carried so the caller can tell the user exactly how
    /// much is available.
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds {
        /// The balance the source account can spend for this transfer.
        available: Decimal,
        /// The amount the transfer asked for.
        required: Decimal,
    },

    /// The caller did not supply a resolved, registered user identity.
    #[error("no authorized user for this request")]
    Unauthorized,

    /// An account cannot be deleted while incomes, expenses or transfers
    /// still reference it.
    #[error("the account is still referenced by transactions")]
    AccountInUse,

    /// An income was given an expense category, or vice versa.
    #[error("the category kind does not match the transaction kind")]
    CategoryKindMismatch,

    /// Transaction and transfer amounts must be greater than zero.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(Decimal),

    /// The amount cannot be represented as a whole number of cents.
    #[error("{0} is too large to be stored")]
    AmountOutOfRange(Decimal),

    /// An empty string was used as a name.
    #[error("name cannot be empty")]
    EmptyName,

    /// A date range ended before it started.
    #[error("invalid date range: {0} is after {1}")]
    InvalidDateRange(time::Date, time::Date),

    /// A monthly report was asked to cover months that cannot be represented as dates.
    #[error("cannot report on {0} months")]
    InvalidMonthCount(u32),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
