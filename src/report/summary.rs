//! Income, expense and balance overview for a date range.

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error, UserID,
    balance::{AccountBalance, compute_all_balances},
    date_range::DateRange,
    report::breakdown::{CategoryTotal, category_breakdown},
    transaction::TransactionKind,
};

/// An overview of a user's finances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// The sum of all incomes in the range.
    pub total_income: Decimal,
    /// The sum of all expenses in the range.
    pub total_expenses: Decimal,
    /// Income minus expenses in the range.
    pub net_balance: Decimal,
    /// The current balance of every account, regardless of the range.
    pub account_balances: Vec<AccountBalance>,
    /// Incomes in the range per category.
    pub income_by_category: Vec<CategoryTotal>,
    /// Expenses in the range per category.
    pub expense_by_category: Vec<CategoryTotal>,
}

/// Summarise the user's incomes and expenses within `range`.
///
/// The income and expense totals are the sums of the two category breakdowns.
/// Account balances are always as of now and ignore `range`.
///
/// # Errors
/// Returns [Error::SqlError] if a query fails.
pub fn report_summary(
    user_id: UserID,
    range: DateRange,
    connection: &Connection,
) -> Result<ReportSummary, Error> {
    let income_by_category =
        category_breakdown(user_id, TransactionKind::Income, range, connection)?;
    let expense_by_category =
        category_breakdown(user_id, TransactionKind::Expense, range, connection)?;
    let account_balances = compute_all_balances(user_id, connection)?;

    let total_income: Decimal = income_by_category.iter().map(|total| total.total).sum();
    let total_expenses: Decimal = expense_by_category.iter().map(|total| total.total).sum();

    Ok(ReportSummary {
        total_income,
        total_expenses,
        net_balance: total_income - total_expenses,
        account_balances,
        income_by_category,
        expense_by_category,
    })
}
