//! Composable filters for listing incomes, expenses and transfers.
//!
//! A [ListFilter] is made of a fixed set of optional clauses. Each clause that
//! is set contributes one condition to the SQL `WHERE` predicate, and the
//! clauses are always joined with `AND` after the user scope.

use rusqlite::types::Value;
use rust_decimal::Decimal;

use crate::{
    Error, UserID,
    database_id::{AccountID, CategoryID},
    date_range::DateRange,
    money::to_cents,
    text::normalize_description,
};

/// Optional conditions for narrowing down a list of transactions or transfers.
///
/// ```
/// use budgeteur_ledger::ListFilter;
///
/// let filter = ListFilter::new().account(3).description("Café");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilter {
    account_id: Option<AccountID>,
    category_id: Option<CategoryID>,
    description: Option<String>,
    min_amount: Option<Decimal>,
    max_amount: Option<Decimal>,
    date_range: Option<DateRange>,
}

impl ListFilter {
    /// A filter that matches everything the user owns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match rows that touch the account.
    ///
    /// For transfers this matches either the source or the destination.
    pub fn account(mut self, account_id: AccountID) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Only match incomes or expenses in the category. Ignored for transfers.
    pub fn category(mut self, category_id: CategoryID) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Only match rows whose description contains `text`, ignoring case and accents.
    ///
    /// Blank text removes the clause.
    pub fn description(mut self, text: &str) -> Self {
        let normalized = normalize_description(text);
        self.description = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// Only match amounts within the inclusive bounds that are given.
    pub fn amount_between(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// Only match rows dated within `range`.
    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Render the filter as a `WHERE` predicate for the given table shape.
    pub(crate) fn to_predicate(
        &self,
        user_id: UserID,
        target: FilterTarget,
    ) -> Result<Predicate, Error> {
        let mut predicate = Predicate::new(user_id);

        if let Some(account_id) = self.account_id {
            match target {
                FilterTarget::Transaction => {
                    predicate.push("account_id = ?", [Value::Integer(account_id)]);
                }
                FilterTarget::Transfer => {
                    predicate.push(
                        "(from_account_id = ? OR to_account_id = ?)",
                        [Value::Integer(account_id), Value::Integer(account_id)],
                    );
                }
            }
        }

        if let (Some(category_id), FilterTarget::Transaction) = (self.category_id, target) {
            predicate.push("category_id = ?", [Value::Integer(category_id)]);
        }

        if let Some(description) = &self.description {
            predicate.push(
                "description_normalized LIKE '%' || ? || '%' ESCAPE '\\'",
                [Value::Text(escape_like(description))],
            );
        }

        if let Some(min_amount) = self.min_amount {
            predicate.push("amount >= ?", [Value::Integer(to_cents(min_amount)?)]);
        }

        if let Some(max_amount) = self.max_amount {
            predicate.push("amount <= ?", [Value::Integer(to_cents(max_amount)?)]);
        }

        if let Some(range) = self.date_range {
            predicate.push(
                "date BETWEEN ? AND ?",
                [
                    Value::Text(range.start.to_string()),
                    Value::Text(range.end.to_string()),
                ],
            );
        }

        Ok(predicate)
    }
}

/// The shape of the table a [ListFilter] is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterTarget {
    /// The `income` and `expense` tables.
    Transaction,
    /// The `transfer` table.
    Transfer,
}

/// An SQL `WHERE` predicate and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    clauses: Vec<&'static str>,
    params: Vec<Value>,
}

impl Predicate {
    fn new(user_id: UserID) -> Self {
        Self {
            clauses: vec!["user_id = ?"],
            params: vec![Value::Integer(user_id.as_i64())],
        }
    }

    fn push<const N: usize>(&mut self, clause: &'static str, params: [Value; N]) {
        self.clauses.push(clause);
        self.params.extend(params);
    }

    /// The predicate text, without the `WHERE` keyword.
    pub(crate) fn sql(&self) -> String {
        self.clauses.join(" AND ")
    }

    /// The parameters in the order their placeholders appear in [Predicate::sql].
    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for character in text.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use rusqlite::types::Value;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{UserID, date_range::DateRange};

    use super::{FilterTarget, ListFilter, escape_like};

    #[test]
    fn empty_filter_is_user_scope_only() {
        let predicate = ListFilter::new()
            .to_predicate(UserID::new(1), FilterTarget::Transaction)
            .unwrap();

        assert_eq!(predicate.sql(), "user_id = ?");
        assert_eq!(predicate.params(), &[Value::Integer(1)]);
    }

    #[test]
    fn all_clauses_compose_in_order() {
        let range = DateRange::new(date!(2025 - 01 - 01), date!(2025 - 01 - 31)).unwrap();
        let predicate = ListFilter::new()
            .account(2)
            .category(3)
            .description("Café")
            .amount_between(Some(dec!(1)), Some(dec!(9.99)))
            .date_range(range)
            .to_predicate(UserID::new(1), FilterTarget::Transaction)
            .unwrap();

        assert_eq!(
            predicate.sql(),
            "user_id = ? AND account_id = ? AND category_id = ? \
             AND description_normalized LIKE '%' || ? || '%' ESCAPE '\\' \
             AND amount >= ? AND amount <= ? AND date BETWEEN ? AND ?"
        );
        assert_eq!(
            predicate.params(),
            &[
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
                Value::Text("cafe".to_owned()),
                Value::Integer(100),
                Value::Integer(999),
                Value::Text("2025-01-01".to_owned()),
                Value::Text("2025-01-31".to_owned()),
            ]
        );
    }

    #[test]
    fn transfer_account_clause_matches_either_side() {
        let predicate = ListFilter::new()
            .account(5)
            .category(9)
            .to_predicate(UserID::new(1), FilterTarget::Transfer)
            .unwrap();

        assert_eq!(
            predicate.sql(),
            "user_id = ? AND (from_account_id = ? OR to_account_id = ?)"
        );
        assert_eq!(predicate.params().len(), 3);
    }

    #[test]
    fn blank_description_is_ignored() {
        assert_eq!(ListFilter::new().description("  "), ListFilter::new());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
