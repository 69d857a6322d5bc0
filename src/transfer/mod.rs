//! Transfers of money between two of a user's accounts.
//!
//! A transfer lowers the derived balance of its source account and raises the
//! balance of its destination. Writes go through [validate_transfer] so a
//! transfer can never overdraw its source account.

mod core;
mod guard;

pub use core::{
    NewTransfer, Transfer, TransferUpdate, create_transfer, create_transfer_table,
    delete_transfer, get_transfer, get_transfers, update_transfer,
};
pub use guard::{TransferCheck, validate_transfer};
