//! Defines the template model and its database queries.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserID,
    account::get_account,
    category::{CategoryKind, get_category},
    database_id::{AccountID, CategoryID, TemplateID},
    money::{from_cents, to_cents, to_positive_cents},
    template::default::swap_default,
};

// ============================================================================
// MODELS
// ============================================================================

/// What a template prefills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// A template for new incomes.
    Income,
    /// A template for new expenses.
    Expense,
    /// A template for new transfers.
    Transfer,
}

impl TemplateKind {
    /// The value stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TemplateKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TemplateKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(FromSqlError::Other(
                format!("unknown template kind \"{other}\"").into(),
            )),
        }
    }
}

/// The kind of a template together with the accounts and category it prefills.
///
/// Every reference is optional. A reference is cleared when the account it
/// points to is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemplateRefs {
    /// Prefills an income.
    Income {
        /// The account the income goes into.
        account_id: Option<AccountID>,
        /// An income category.
        category_id: Option<CategoryID>,
    },
    /// Prefills an expense.
    Expense {
        /// The account the expense comes out of.
        account_id: Option<AccountID>,
        /// An expense category.
        category_id: Option<CategoryID>,
    },
    /// Prefills a transfer.
    Transfer {
        /// The account the money leaves.
        from_account_id: Option<AccountID>,
        /// The account the money arrives in.
        to_account_id: Option<AccountID>,
    },
}

impl TemplateRefs {
    /// The kind of template these references belong to.
    pub fn kind(&self) -> TemplateKind {
        match self {
            Self::Income { .. } => TemplateKind::Income,
            Self::Expense { .. } => TemplateKind::Expense,
            Self::Transfer { .. } => TemplateKind::Transfer,
        }
    }

    /// The values for the `account_id`, `category_id`, `from_account_id` and
    /// `to_account_id` columns.
    fn columns(&self) -> RefColumns {
        match *self {
            Self::Income {
                account_id,
                category_id,
            }
            | Self::Expense {
                account_id,
                category_id,
            } => (account_id, category_id, None, None),
            Self::Transfer {
                from_account_id,
                to_account_id,
            } => (None, None, from_account_id, to_account_id),
        }
    }
}

type RefColumns = (
    Option<AccountID>,
    Option<CategoryID>,
    Option<AccountID>,
    Option<AccountID>,
);

/// A saved blueprint for a new income, expense or transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// The ID of the template.
    pub id: TemplateID,
    /// The user that owns the template.
    pub user_id: UserID,
    /// The display name of the template.
    pub name: String,
    /// The amount to prefill, if any.
    pub amount: Option<Decimal>,
    /// The description to prefill.
    pub description: String,
    /// The notes to prefill.
    pub notes: Option<String>,
    /// Whether this is the user's default template of its kind.
    pub is_default: bool,
    /// The kind of the template and what it refers to.
    #[serde(flatten)]
    pub refs: TemplateRefs,
}

impl Template {
    /// Create a new template.
    ///
    /// Shortcut for [NewTemplate] for discoverability.
    pub fn build(name: &str, refs: TemplateRefs, user_id: UserID) -> NewTemplate {
        NewTemplate {
            user_id,
            name: name.to_owned(),
            refs,
            amount: None,
            description: String::new(),
            notes: None,
            is_default: false,
        }
    }

    /// The kind of the template.
    pub fn kind(&self) -> TemplateKind {
        self.refs.kind()
    }
}

/// The data needed to create a [Template].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    /// The user that will own the template.
    pub user_id: UserID,
    /// The display name, must not be blank.
    pub name: String,
    /// The kind of the template and what it refers to.
    pub refs: TemplateRefs,
    /// The amount to prefill, must be greater than zero if set.
    pub amount: Option<Decimal>,
    /// The description to prefill.
    pub description: String,
    /// The notes to prefill.
    pub notes: Option<String>,
    /// Whether the new template replaces the current default of its kind.
    pub is_default: bool,
}

impl NewTemplate {
    /// Set the amount to prefill.
    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the description to prefill.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the notes to prefill.
    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_owned());
        self
    }

    /// Make the new template the default of its kind.
    pub fn is_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

/// The user editable fields of a [Template].
///
/// Neither the kind nor the default flag can be changed here. The default is
/// changed with [crate::set_default].
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateUpdate {
    /// The display name, must not be blank.
    pub name: String,
    /// What the template refers to, of the template's current kind.
    pub refs: TemplateRefs,
    /// The amount to prefill, must be greater than zero if set.
    pub amount: Option<Decimal>,
    /// The description to prefill.
    pub description: String,
    /// The notes to prefill.
    pub notes: Option<String>,
}

impl From<Template> for TemplateUpdate {
    fn from(template: Template) -> Self {
        Self {
            name: template.name,
            refs: template.refs,
            amount: template.amount,
            description: template.description,
            notes: template.notes,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub(super) const TEMPLATE_COLUMNS: &str = "id, user_id, kind, name, amount, description, notes, \
    is_default, account_id, category_id, from_account_id, to_account_id";

/// Create the template table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_template_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS template (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('income', 'expense', 'transfer')),
            name TEXT NOT NULL,
            amount INTEGER CHECK (amount IS NULL OR amount > 0),
            description TEXT NOT NULL,
            notes TEXT,
            is_default INTEGER NOT NULL DEFAULT 0 CHECK (is_default IN (0, 1)),
            account_id INTEGER,
            category_id INTEGER,
            from_account_id INTEGER,
            to_account_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(from_account_id) REFERENCES account(id)
                ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_template_user_kind ON template(user_id, kind);",
    )?;

    Ok(())
}

/// Create a template.
///
/// A template created with `is_default` set takes over as the default of its
/// kind in the same database transaction as the insert.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::InvalidAmount] if an amount is given that is not greater than zero,
/// - [Error::NotFound] if a referenced account or category does not belong to the user,
/// - [Error::CategoryKindMismatch] if the category does not match the template kind,
/// - [Error::InvalidAccounts] if a transfer template uses the same account twice,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_template(
    new_template: NewTemplate,
    connection: &Connection,
) -> Result<Template, Error> {
    let name = new_template.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let amount = new_template.amount.map(to_positive_cents).transpose()?;
    let user_id = new_template.user_id;

    let sql_transaction = connection.unchecked_transaction()?;

    check_references(&new_template.refs, user_id, &sql_transaction)?;

    let mut template = insert_template(
        user_id,
        name,
        &new_template.refs,
        amount,
        &new_template.description,
        new_template.notes.as_deref(),
        &sql_transaction,
    )?;

    if new_template.is_default {
        swap_default(user_id, template.kind(), template.id, &sql_transaction)?;
        template.is_default = true;
    }

    sql_transaction.commit()?;

    tracing::info!(
        "created {} template {} for user {user_id}",
        template.kind(),
        template.id
    );

    Ok(template)
}

/// Retrieve a template owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the template does not exist for the user.
pub fn get_template(
    id: TemplateID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Template, Error> {
    connection
        .prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM template WHERE id = ?1 AND user_id = ?2"
        ))?
        .query_row((id, user_id.as_i64()), map_template_row)
        .map_err(|error| error.into())
}

/// Retrieve a user's templates of one kind, ordered by name.
pub fn get_templates(
    user_id: UserID,
    kind: TemplateKind,
    connection: &Connection,
) -> Result<Vec<Template>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM template
             WHERE user_id = ?1 AND kind = ?2
             ORDER BY name ASC, id ASC"
        ))?
        .query_map((user_id.as_i64(), kind), map_template_row)?
        .map(|maybe_template| maybe_template.map_err(|error| error.into()))
        .collect()
}

/// Replace the editable fields of a template.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if there is no template of the kind of `update.refs`
///   with the ID `id` for the user, or a referenced account or category does
///   not belong to the user,
/// - or any of the validation errors of [create_template].
pub fn update_template(
    id: TemplateID,
    update: TemplateUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Template, Error> {
    let name = update.name.trim();

    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let amount = update.amount.map(to_positive_cents).transpose()?;
    let (account_id, category_id, from_account_id, to_account_id) = update.refs.columns();

    let sql_transaction = connection.unchecked_transaction()?;

    check_references(&update.refs, user_id, &sql_transaction)?;

    let template = sql_transaction
        .prepare(&format!(
            "UPDATE template
             SET name = ?1, amount = ?2, description = ?3, notes = ?4,
                 account_id = ?5, category_id = ?6, from_account_id = ?7, to_account_id = ?8
             WHERE id = ?9 AND user_id = ?10 AND kind = ?11
             RETURNING {TEMPLATE_COLUMNS}"
        ))?
        .query_row(
            (
                name,
                amount,
                &update.description,
                &update.notes,
                account_id,
                category_id,
                from_account_id,
                to_account_id,
                id,
                user_id.as_i64(),
                update.refs.kind(),
            ),
            map_template_row,
        )?;

    sql_transaction.commit()?;

    tracing::info!("updated template {id} for user {user_id}");

    Ok(template)
}

/// Copy a template under the name "<name> (copy)".
///
/// The copy is never the default, even when the original is.
///
/// # Errors
/// Returns [Error::NotFound] if the template does not exist for the user.
pub fn duplicate_template(
    id: TemplateID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Template, Error> {
    let original = get_template(id, user_id, connection)?;
    let amount = original.amount.map(to_cents).transpose()?;

    let copy = insert_template(
        user_id,
        &format!("{} (copy)", original.name),
        &original.refs,
        amount,
        &original.description,
        original.notes.as_deref(),
        connection,
    )?;

    tracing::info!("duplicated template {id} as {}", copy.id);

    Ok(copy)
}

/// Delete a template.
///
/// Deleting the default leaves the user without a default of that kind.
///
/// # Errors
/// Returns [Error::NotFound] if the template does not exist for the user.
pub fn delete_template(
    id: TemplateID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM template WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::info!("deleted template {id} for user {user_id}");

    Ok(())
}

/// Insert a template that is not the default.
fn insert_template(
    user_id: UserID,
    name: &str,
    refs: &TemplateRefs,
    amount: Option<i64>,
    description: &str,
    notes: Option<&str>,
    connection: &Connection,
) -> Result<Template, Error> {
    let (account_id, category_id, from_account_id, to_account_id) = refs.columns();

    connection
        .prepare(&format!(
            "INSERT INTO template (user_id, kind, name, amount, description, notes, is_default,
                                   account_id, category_id, from_account_id, to_account_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)
             RETURNING {TEMPLATE_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                refs.kind(),
                name,
                amount,
                description,
                notes,
                account_id,
                category_id,
                from_account_id,
                to_account_id,
            ),
            map_template_row,
        )
        .map_err(|error| error.into())
}

fn check_references(
    refs: &TemplateRefs,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    match *refs {
        TemplateRefs::Income {
            account_id,
            category_id,
        }
        | TemplateRefs::Expense {
            account_id,
            category_id,
        } => {
            if let Some(account_id) = account_id {
                get_account(account_id, user_id, connection)?;
            }

            if let Some(category_id) = category_id {
                let expected = match refs.kind() {
                    TemplateKind::Income => CategoryKind::Income,
                    _ => CategoryKind::Expense,
                };

                if get_category(category_id, user_id, connection)?.kind != expected {
                    return Err(Error::CategoryKindMismatch);
                }
            }
        }
        TemplateRefs::Transfer {
            from_account_id,
            to_account_id,
        } => {
            if from_account_id.is_some() && from_account_id == to_account_id {
                return Err(Error::InvalidAccounts);
            }

            for account_id in [from_account_id, to_account_id].into_iter().flatten() {
                get_account(account_id, user_id, connection)?;
            }
        }
    }

    Ok(())
}

pub(super) fn map_template_row(row: &Row) -> Result<Template, rusqlite::Error> {
    let kind: TemplateKind = row.get(2)?;
    let refs = match kind {
        TemplateKind::Income => TemplateRefs::Income {
            account_id: row.get(8)?,
            category_id: row.get(9)?,
        },
        TemplateKind::Expense => TemplateRefs::Expense {
            account_id: row.get(8)?,
            category_id: row.get(9)?,
        },
        TemplateKind::Transfer => TemplateRefs::Transfer {
            from_account_id: row.get(10)?,
            to_account_id: row.get(11)?,
        },
    };
    let amount: Option<i64> = row.get(4)?;

    Ok(Template {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(3)?,
        amount: amount.map(from_cents),
        description: row.get(5)?,
        notes: row.get(6)?,
        is_default: row.get(7)?,
        refs,
    })
}

// ============================================================================
// TESTS
// ============================================================================
