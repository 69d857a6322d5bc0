//! Categories for grouping incomes and expenses, e.g. "Salary" or "Groceries".

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserID, database_id::CategoryID};

/// Whether a category groups incomes or expenses.
///
/// A category may only be attached to transactions of the matching kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl CategoryKind {
    /// The value stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for CategoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CategoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(FromSqlError::Other(
                format!("unknown category kind \"{other}\"").into(),
            )),
        }
    }
}

/// A named group of incomes or expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryID,
    /// The user that owns the category.
    pub user_id: UserID,
    /// The display name of the category.
    pub name: String,
    /// Whether the category is for incomes or expenses.
    #[serde(rename = "type")]
    pub kind: CategoryKind,
    /// When the category was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the category was last renamed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Category {
    /// Create a new category.
    ///
    /// Shortcut for [NewCategory] for discoverability.
    pub fn build(name: &str, kind: CategoryKind, user_id: UserID) -> NewCategory {
        NewCategory {
            user_id,
            name: name.to_owned(),
            kind,
        }
    }
}

/// The data needed to create a [Category].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The user that will own the category.
    pub user_id: UserID,
    /// The display name, must not be blank.
    pub name: String,
    /// Whether the category is for incomes or expenses.
    pub kind: CategoryKind,
}

const CATEGORY_COLUMNS: &str = "id, user_id, name, kind, created_at, updated_at";

/// Create the category table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user_kind ON category(user_id, kind);",
    )?;

    Ok(())
}

/// Create a category and return it with its generated ID.
///
/// # Errors
/// Returns [Error::EmptyName] if the name is blank, or [Error::SqlError] on any SQL error.
pub fn create_category(
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = new_category.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection
        .prepare(&format!(
            "INSERT INTO category (user_id, name, kind, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (
                new_category.user_id.as_i64(),
                name,
                new_category.kind,
                OffsetDateTime::now_utc(),
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist for the user.
pub fn get_category(
    id: CategoryID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_row)
        .map_err(|error| error.into())
}

/// Retrieve a user's categories ordered alphabetically by name, optionally
/// only those of one `kind`.
pub fn get_categories(
    user_id: UserID,
    kind: Option<CategoryKind>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category
             WHERE user_id = ?1 AND (?2 IS NULL OR kind = ?2)
             ORDER BY name ASC, id ASC"
        ))?
        .query_map((user_id.as_i64(), kind), map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Rename a category. The kind of a category cannot change.
///
/// # Errors
/// Returns [Error::EmptyName] if the name is blank, or [Error::NotFound] if
/// the category does not exist for the user.
pub fn update_category(
    id: CategoryID,
    name: &str,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection
        .prepare(&format!(
            "UPDATE category SET name = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_row(
            (name, OffsetDateTime::now_utc(), id, user_id.as_i64()),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Delete a category.
///
/// Transactions keep their category ID, and reports show them under
/// "Unknown" from then on.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist for the user.
pub fn delete_category(
    id: CategoryID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        kind: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{Error, User, create_user, db::initialize};

    use super::{
        Category, CategoryKind, create_category, delete_category, get_categories, get_category,
        update_category,
    };

    fn get_test_connection() -> (Connection, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user("Test User", &conn).unwrap();
        (conn, user)
    }

    #[test]
    fn create_category_succeeds() {
        let (conn, user) = get_test_connection();

        let category = create_category(
            Category::build(" Groceries ", CategoryKind::Expense, user.id),
            &conn,
        )
        .expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, "Groceries");
        assert_eq!(category.kind, CategoryKind::Expense);
        assert_eq!(get_category(category.id, user.id, &conn), Ok(category));
    }

    #[test]
    fn create_category_fails_on_blank_name() {
        let (conn, user) = get_test_connection();

        let result = create_category(Category::build("\n", CategoryKind::Income, user.id), &conn);

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn get_category_of_other_user_is_not_found() {
        let (conn, user) = get_test_connection();
        let other_user = create_user("Other", &conn).unwrap();
        let category =
            create_category(Category::build("Salary", CategoryKind::Income, user.id), &conn)
                .unwrap();

        assert_eq!(
            get_category(category.id, other_user.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_categories_filters_by_kind() {
        let (conn, user) = get_test_connection();
        create_category(Category::build("Salary", CategoryKind::Income, user.id), &conn).unwrap();
        create_category(Category::build("Rent", CategoryKind::Expense, user.id), &conn).unwrap();
        create_category(Category::build("Food", CategoryKind::Expense, user.id), &conn).unwrap();

        let all = get_categories(user.id, None, &conn).unwrap();
        let expenses: Vec<String> = get_categories(user.id, Some(CategoryKind::Expense), &conn)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();

        assert_eq!(all.len(), 3);
        assert_eq!(expenses, vec!["Food", "Rent"]);
    }

    #[test]
    fn update_category_renames() {
        let (conn, user) = get_test_connection();
        let category =
            create_category(Category::build("Food", CategoryKind::Expense, user.id), &conn)
                .unwrap();

        let updated = update_category(category.id, "Dining", user.id, &conn).unwrap();

        assert_eq!(updated.name, "Dining");
        assert_eq!(updated.kind, CategoryKind::Expense);
    }

    #[test]
    fn delete_category_succeeds_once() {
        let (conn, user) = get_test_connection();
        let category =
            create_category(Category::build("Food", CategoryKind::Expense, user.id), &conn)
                .unwrap();

        assert_eq!(delete_category(category.id, user.id, &conn), Ok(()));
        assert_eq!(
            delete_category(category.id, user.id, &conn),
            Err(Error::NotFound)
        );
    }
}
