//! Accounts that money is earned into, spent from and moved between.

mod core;

pub use core::{
    Account, AccountUpdate, NewAccount, create_account, create_account_table, delete_account,
    get_account, get_accounts, update_account,
};
