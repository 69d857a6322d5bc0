//! Totals per category over a date range.

use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    Error, UserID,
    category::get_categories,
    database_id::CategoryID,
    date_range::DateRange,
    money::from_cents,
    transaction::TransactionKind,
};

/// The name shown for transactions whose category has been deleted.
const UNKNOWN_CATEGORY: &str = "Unknown";

/// How much of a report's total went to one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category the total is for.
    pub category_id: CategoryID,
    /// The category's current name, or "Unknown" if it was deleted.
    pub category_name: String,
    /// The sum of the category's transactions in the range.
    pub total: Decimal,
    /// The category's share of the grand total, from 0 to 100.
    pub percentage: Decimal,
}

/// Sum the user's incomes or expenses within `range` per category.
///
/// The result is sorted by total, largest first, with ties broken by category
/// ID. A range without transactions gives an empty list.
///
/// # Errors
/// Returns [Error::SqlError] if a query fails.
pub fn category_breakdown(
    user_id: UserID,
    kind: TransactionKind,
    range: DateRange,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let sums: Vec<(CategoryID, i64)> = connection
        .prepare(&format!(
            "SELECT category_id, SUM(amount) FROM {table}
             WHERE user_id = ?1 AND date BETWEEN ?2 AND ?3
             GROUP BY category_id",
            table = kind.table(),
        ))?
        .query_map((user_id.as_i64(), range.start, range.end), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<_, _>>()?;

    if sums.is_empty() {
        return Ok(Vec::new());
    }

    let names: HashMap<CategoryID, String> = get_categories(user_id, None, connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();

    let grand_total: Decimal = sums.iter().map(|(_, total)| from_cents(*total)).sum();

    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(category_id, total)| {
            let category_name = match names.get(&category_id) {
                Some(name) => name.clone(),
                None => {
                    tracing::warn!(
                        "{kind} category {category_id} no longer exists, \
                         reporting it as {UNKNOWN_CATEGORY}"
                    );
                    UNKNOWN_CATEGORY.to_owned()
                }
            };
            let total = from_cents(total);

            CategoryTotal {
                category_id,
                category_name,
                total,
                percentage: percentage_of(total, grand_total),
            }
        })
        .collect();

    totals.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });

    tracing::debug!(
        "{kind} breakdown for user {user_id} has {} categories totalling {grand_total}",
        totals.len()
    );

    Ok(totals)
}

fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod breakdown_tests {
    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Account, AccountID, Category, CategoryID, CategoryKind, DateRange, NewTransaction,
        TransactionKind, User, create_account, create_category, create_transaction, create_user,
        db::initialize, delete_category,
    };

    use super::{CategoryTotal, category_breakdown, percentage_of};

    struct Fixture {
        conn: Connection,
        user: User,
        account_id: AccountID,
    }

    fn get_fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Test User", &conn).unwrap();
        let account = create_account(Account::build("Card", dec!(0), user.id), &conn).unwrap();

        Fixture {
            conn,
            account_id: account.id,
            user,
        }
    }

    fn expense_category(name: &str, fixture: &Fixture) -> CategoryID {
        create_category(
            Category::build(name, CategoryKind::Expense, fixture.user.id),
            &fixture.conn,
        )
        .unwrap()
        .id
    }

    fn spend(category_id: CategoryID, amount: Decimal, date: time::Date, fixture: &Fixture) {
        create_transaction(
            NewTransaction::build(
                TransactionKind::Expense,
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

    fn january() -> DateRange {
        DateRange::new(date!(2025 - 01 - 01), date!(2025 - 01 - 31)).unwrap()
    }

    #[test]
    fn groups_and_sorts_by_total() {
        let fixture = get_fixture();
        let food = expense_category("Food", &fixture);
        let transport = expense_category("Transport", &fixture);
        spend(food, dec!(30.00), date!(2025 - 01 - 05), &fixture);
        spend(transport, dec!(25.00), date!(2025 - 01 - 06), &fixture);
        spend(food, dec!(45.00), date!(2025 - 01 - 20), &fixture);

        let breakdown = category_breakdown(
            fixture.user.id,
            TransactionKind::Expense,
            january(),
            &fixture.conn,
        )
        .unwrap();

        assert_eq!(
            breakdown,
            vec![
                CategoryTotal {
                    category_id: food,
                    category_name: "Food".to_owned(),
                    total: dec!(75.00),
                    percentage: dec!(75),
                },
                CategoryTotal {
                    category_id: transport,
                    category_name: "Transport".to_owned(),
                    total: dec!(25.00),
                    percentage: dec!(25),
                },
            ]
        );
    }

    #[test]
    fn range_is_inclusive_at_both_ends() {
        let fixture = get_fixture();
        let food = expense_category("Food", &fixture);
        spend(food, dec!(1), date!(2024 - 12 - 31), &fixture);
        spend(food, dec!(2), date!(2025 - 01 - 01), &fixture);
        spend(food, dec!(4), date!(2025 - 01 - 31), &fixture);
        spend(food, dec!(8), date!(2025 - 02 - 01), &fixture);

        let breakdown = category_breakdown(
            fixture.user.id,
            TransactionKind::Expense,
            january(),
            &fixture.conn,
        )
        .unwrap();

        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].total, dec!(6));
    }

    #[test]
    fn empty_range_gives_empty_list() {
        let fixture = get_fixture();

        let breakdown = category_breakdown(
            fixture.user.id,
            TransactionKind::Income,
            january(),
            &fixture.conn,
        );

        assert_eq!(breakdown, Ok(vec![]));
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let fixture = get_fixture();
        for (name, amount) in [("A", dec!(10.00)), ("B", dec!(10.00)), ("C", dec!(10.00))] {
            let category = expense_category(name, &fixture);
            spend(category, amount, date!(2025 - 01 - 15), &fixture);
        }

        let breakdown = category_breakdown(
            fixture.user.id,
            TransactionKind::Expense,
            january(),
            &fixture.conn,
        )
        .unwrap();

        let sum: Decimal = breakdown.iter().map(|total| total.percentage).sum();
        assert!((sum - dec!(100)).abs() < dec!(0.000001), "got {sum}");
    }

    #[test]
    fn deleted_category_is_reported_as_unknown() {
        let fixture = get_fixture();
        let food = expense_category("Food", &fixture);
        spend(food, dec!(12.00), date!(2025 - 01 - 15), &fixture);
        delete_category(food, fixture.user.id, &fixture.conn).unwrap();

        let breakdown = category_breakdown(
            fixture.user.id,
            TransactionKind::Expense,
            january(),
            &fixture.conn,
        )
        .unwrap();

        assert_eq!(breakdown[0].category_id, food);
        assert_eq!(breakdown[0].category_name, "Unknown");
        assert_eq!(breakdown[0].total, dec!(12.00));
    }

    #[test]
    fn other_users_transactions_are_excluded() {
        let fixture = get_fixture();
        let food = expense_category("Food", &fixture);
        spend(food, dec!(5), date!(2025 - 01 - 15), &fixture);
        let other_user = create_user("Other", &fixture.conn).unwrap();

        let breakdown = category_breakdown(
            other_user.id,
            TransactionKind::Expense,
            january(),
            &fixture.conn,
        );

        assert_eq!(breakdown, Ok(vec![]));
    }

    #[test]
    fn grand_total_larger_than_i64_cents_is_summed() {
        let fixture = get_fixture();
        let rent = expense_category("Rent", &fixture);
        let tax = expense_category("Tax", &fixture);
        spend(rent, dec!(60000000000000000), date!(2025 - 01 - 10), &fixture);
        spend(tax, dec!(60000000000000000), date!(2025 - 01 - 11), &fixture);

        let breakdown = category_breakdown(
            fixture.user.id,
            TransactionKind::Expense,
            january(),
            &fixture.conn,
        )
        .unwrap();

        assert_eq!(breakdown.len(), 2);
        for category_total in breakdown {
            assert_eq!(category_total.total, dec!(60000000000000000));
            assert_eq!(category_total.percentage, dec!(50));
        }
    }

    #[test]
    fn percentage_of_zero_total_is_zero() {
        assert_eq!(percentage_of(dec!(0), dec!(0)), dec!(0));
    }
}
