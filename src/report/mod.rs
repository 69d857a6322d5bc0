//! Read-only reports aggregated from incomes, expenses and account balances.
//!
//! Every amount is summed in SQL over integer cents and only converted to a
//! [rust_decimal::Decimal] once the totals are known.

mod breakdown;
mod summary;
mod trends;

pub use breakdown::{CategoryTotal, category_breakdown};
pub use summary::{ReportSummary, report_summary};
pub use trends::{MonthlyTrend, monthly_trends};
