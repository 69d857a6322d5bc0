//! Income and expenses per calendar month.

use std::collections::BTreeMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::{
    Error, UserID,
    date_range::{DateRange, MonthKey},
    money::from_cents,
    transaction::TransactionKind,
};

/// The income and expenses of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// The month, serialized as `YYYY-MM`.
    pub month: MonthKey,
    /// The sum of all incomes dated in the month.
    pub income: Decimal,
    /// The sum of all expenses dated in the month.
    pub expenses: Decimal,
}

/// Sum the user's incomes and expenses for each of the last `month_count`
/// calendar months, ending with the month that contains `today`.
///
/// Every month in the window gets an entry, in chronological order. Months
/// without any transactions are reported as zero. A `month_count` of zero
/// gives an empty list.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidMonthCount] if the window reaches past the earliest or latest
///   representable date,
/// - or [Error::SqlError] if a query fails.
pub fn monthly_trends(
    user_id: UserID,
    month_count: u32,
    today: Date,
    connection: &Connection,
) -> Result<Vec<MonthlyTrend>, Error> {
    if month_count == 0 {
        return Ok(Vec::new());
    }

    let current_month = MonthKey::of(today);
    let first_month = current_month.months_before(month_count - 1);
    let Some(window) = first_month
        .first_day()
        .zip(current_month.last_day())
        .and_then(|(start, end)| DateRange::new(start, end).ok())
    else {
        tracing::error!(
            "{month_count} months ending at {current_month} is outside the supported dates"
        );
        return Err(Error::InvalidMonthCount(month_count));
    };

    let incomes = monthly_sums(user_id, TransactionKind::Income, window, connection)?;
    let expenses = monthly_sums(user_id, TransactionKind::Expense, window, connection)?;

    let mut trends = BTreeMap::new();
    let mut month = first_month;
    for _ in 0..month_count {
        trends.insert(
            month,
            MonthlyTrend {
                month,
                income: Decimal::ZERO,
                expenses: Decimal::ZERO,
            },
        );
        month = month.next();
    }

    for (month, total) in incomes {
        if let Some(trend) = trends.get_mut(&month) {
            trend.income = from_cents(total);
        }
    }

    for (month, total) in expenses {
        if let Some(trend) = trends.get_mut(&month) {
            trend.expenses = from_cents(total);
        }
    }

    tracing::debug!("monthly trends for user {user_id} from {first_month} to {current_month}");

    Ok(trends.into_values().collect())
}

/// Sum amounts per month for dates in `range`.
fn monthly_sums(
    user_id: UserID,
    kind: TransactionKind,
    range: DateRange,
    connection: &Connection,
) -> Result<Vec<(MonthKey, i64)>, Error> {
    connection
        .prepare(&format!(
            "SELECT strftime('%Y-%m', date) AS month, SUM(amount) FROM {table}
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             GROUP BY month",
            table = kind.table(),
        ))?
        .query_map((user_id.as_i64(), range.start, range.end), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .map(|maybe_sum| maybe_sum.map_err(|error| error.into()))
        .collect()
}

#[cfg(test)]
mod trends_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Date, macros::date};

    use crate::{
        Account, AccountID, Category, CategoryID, CategoryKind, Error, NewTransaction,
        TransactionKind, User, create_account, create_category, create_transaction, create_user,
        date_range::MonthKey, db::initialize,
    };

    use super::{MonthlyTrend, monthly_trends};

    struct Fixture {
        conn: Connection,
        user: User,
        account_id: AccountID,
        income_category: CategoryID,
        expense_category: CategoryID,
    }

    fn get_fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Test User", &conn).unwrap();
        let account = create_account(Account::build("Main", dec!(0), user.id), &conn).unwrap();
        let income_category =
            create_category(Category::build("Pay", CategoryKind::Income, user.id), &conn)
                .unwrap();
        let expense_category =
            create_category(Category::build("Food", CategoryKind::Expense, user.id), &conn)
                .unwrap();

        Fixture {
            conn,
            account_id: account.id,
            income_category: income_category.id,
            expense_category: expense_category.id,
            user,
        }
    }

    fn record(kind: TransactionKind, amount: Decimal, date: Date, fixture: &Fixture) {
        let category_id = match kind {
            TransactionKind::Income => fixture.income_category,
            TransactionKind::Expense => fixture.expense_category,
        };

        create_transaction(
            NewTransaction::build(
                kind,
                fixture.account_id,
                category_id,
                amount,
                date,
                "",
                fixture.user.id,
            ),
            &fixture.conn,
        )
        .unwrap();
    }

    fn months(trends: &[MonthlyTrend]) -> Vec<String> {
        trends.iter().map(|trend| trend.month.to_string()).collect()
    }

    #[test]
    fn covers_every_month_with_zero_fill() {
        let fixture = get_fixture();

        let trends =
            monthly_trends(fixture.user.id, 12, date!(2025 - 06 - 15), &fixture.conn).unwrap();

        assert_eq!(trends.len(), 12);
        assert_eq!(trends[0].month.to_string(), "2024-07");
        assert_eq!(trends[11].month.to_string(), "2025-06");
        assert!(
            trends
                .iter()
                .all(|trend| trend.income.is_zero() && trend.expenses.is_zero())
        );
    }

    #[test]
    fn orders_chronologically_across_year_boundary() {
        let fixture = get_fixture();

        let trends =
            monthly_trends(fixture.user.id, 4, date!(2025 - 02 - 10), &fixture.conn).unwrap();

        assert_eq!(
            months(&trends),
            vec!["2024-11", "2024-12", "2025-01", "2025-02"]
        );
    }

    #[test]
    fn sums_incomes_and_expenses_per_month() {
        let fixture = get_fixture();
        record(TransactionKind::Income, dec!(100), date!(2024 - 12 - 01), &fixture);
        record(TransactionKind::Income, dec!(20.50), date!(2024 - 12 - 31), &fixture);
        record(TransactionKind::Expense, dec!(7.25), date!(2025 - 01 - 15), &fixture);

        let trends =
            monthly_trends(fixture.user.id, 3, date!(2025 - 02 - 01), &fixture.conn).unwrap();

        assert_eq!(
            trends,
            vec![
                MonthlyTrend {
                    month: trends[0].month,
                    income: dec!(120.50),
                    expenses: dec!(0),
                },
                MonthlyTrend {
                    month: trends[1].month,
                    income: dec!(0),
                    expenses: dec!(7.25),
                },
                MonthlyTrend {
                    month: trends[2].month,
                    income: dec!(0),
                    expenses: dec!(0),
                },
            ]
        );
        assert_eq!(months(&trends), vec!["2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn excludes_transactions_outside_window() {
        let fixture = get_fixture();
        record(TransactionKind::Expense, dec!(1), date!(2025 - 02 - 28), &fixture);
        record(TransactionKind::Expense, dec!(2), date!(2025 - 03 - 01), &fixture);
        record(TransactionKind::Expense, dec!(4), date!(2025 - 04 - 30), &fixture);
        record(TransactionKind::Expense, dec!(8), date!(2025 - 05 - 01), &fixture);

        let trends =
            monthly_trends(fixture.user.id, 2, date!(2025 - 04 - 02), &fixture.conn).unwrap();

        let total: Decimal = trends.iter().map(|trend| trend.expenses).sum();
        assert_eq!(total, dec!(6));
    }

    #[test]
    fn single_month_is_current_month() {
        let fixture = get_fixture();

        let trends =
            monthly_trends(fixture.user.id, 1, date!(2025 - 01 - 31), &fixture.conn).unwrap();

        assert_eq!(months(&trends), vec!["2025-01"]);
    }

    #[test]
    fn zero_months_is_empty() {
        let fixture = get_fixture();

        let trends = monthly_trends(fixture.user.id, 0, date!(2025 - 01 - 31), &fixture.conn);

        assert_eq!(trends, Ok(vec![]));
    }

    #[test]
    fn rejects_window_before_earliest_date() {
        let fixture = get_fixture();

        let trends = monthly_trends(
            fixture.user.id,
            u32::MAX,
            date!(2025 - 01 - 31),
            &fixture.conn,
        );

        assert_eq!(trends, Err(Error::InvalidMonthCount(u32::MAX)));
    }

    #[test]
    fn current_month_at_latest_date_is_reported() {
        let fixture = get_fixture();

        let trends = monthly_trends(fixture.user.id, 2, Date::MAX, &fixture.conn).unwrap();

        assert_eq!(trends.len(), 2);
        assert_eq!(trends[1].month, MonthKey::of(Date::MAX));
    }
}
