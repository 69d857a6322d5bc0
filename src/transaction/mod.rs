//! Incomes and expenses.
//!
//! Both kinds share one model, [Transaction], and are stored in separate
//! tables. Every income and expense belongs to exactly one account and one
//! category of the matching kind.

mod core;

pub use core::{
    NewTransaction, Transaction, TransactionKind, TransactionUpdate, create_transaction,
    create_transaction_tables, delete_transaction, get_transaction, get_transactions,
    update_transaction,
};
