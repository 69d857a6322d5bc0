//! Keeps at most one default template per user and template kind.
//!
//! For one user and kind, every template is either the default or not. The
//! only transitions are:
//!
//! - clearing the default, which unsets the flag on every template of the kind,
//! - and moving the default to a template, which clears every flag and sets
//!   the target's flag in one database transaction.
//!
//! Templates created as copies are never the default, so copying needs no
//! coordination.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error, UserID,
    database_id::TemplateID,
    template::core::{TEMPLATE_COLUMNS, Template, TemplateKind, get_template, map_template_row},
};

/// What a call to [set_default] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultChange {
    /// The requested state was already in place, nothing was written.
    Unchanged,
    /// The previous default was cleared and no template is the default now.
    Cleared,
    /// The given template is now the default.
    Set(TemplateID),
}

/// Change which template of `kind` is the user's default.
///
/// Passing `None` clears the default. Passing a template that is already the
/// default does nothing. Otherwise the flag is cleared on every template of
/// the kind and then set on the target, and both writes are committed
/// together or not at all.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `template_id` is not a template of `kind` owned by the user,
/// - or [Error::SqlError] if either write fails, in which case neither is applied.
pub fn set_default(
    user_id: UserID,
    kind: TemplateKind,
    template_id: Option<TemplateID>,
    connection: &Connection,
) -> Result<DefaultChange, Error> {
    let Some(template_id) = template_id else {
        let rows_affected = clear_defaults(user_id, kind, connection)?;

        return if rows_affected == 0 {
            Ok(DefaultChange::Unchanged)
        } else {
            tracing::info!("cleared the default {kind} template for user {user_id}");
            Ok(DefaultChange::Cleared)
        };
    };

    let template = get_template(template_id, user_id, connection)?;

    if template.kind() != kind {
        tracing::debug!("template {template_id} is a {} template, not {kind}", template.kind());
        return Err(Error::NotFound);
    }

    if template.is_default {
        tracing::debug!("template {template_id} is already the default {kind} template");
        return Ok(DefaultChange::Unchanged);
    }

    let transaction = connection.unchecked_transaction()?;
    swap_default(user_id, kind, template_id, &transaction)?;
    transaction.commit()?;

    tracing::info!("template {template_id} is now the default {kind} template for user {user_id}");

    Ok(DefaultChange::Set(template_id))
}

/// Retrieve the user's default template of `kind`, if there is one.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_default_template(
    user_id: UserID,
    kind: TemplateKind,
    connection: &Connection,
) -> Result<Option<Template>, Error> {
    let result = connection
        .prepare(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM template
             WHERE user_id = ?1 AND kind = ?2 AND is_default = 1
             ORDER BY id ASC
             LIMIT 1"
        ))?
        .query_row((user_id.as_i64(), kind), map_template_row);

    match result {
        Ok(template) => Ok(Some(template)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Clear every default of `kind` and make `template_id` the default.
///
/// The caller must run this inside a database transaction.
pub(super) fn swap_default(
    user_id: UserID,
    kind: TemplateKind,
    template_id: TemplateID,
    connection: &Connection,
) -> Result<(), Error> {
    let cleared = clear_defaults(user_id, kind, connection)?;

    let rows_affected = connection.execute(
        "UPDATE template SET is_default = 1 WHERE id = ?1 AND user_id = ?2 AND kind = ?3",
        (template_id, user_id.as_i64(), kind),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    tracing::debug!("cleared {cleared} default {kind} templates before setting {template_id}");

    Ok(())
}

fn clear_defaults(
    user_id: UserID,
    kind: TemplateKind,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE template SET is_default = 0
             WHERE user_id = ?1 AND kind = ?2 AND is_default = 1",
            (user_id.as_i64(), kind),
        )
        .map_err(|error| error.into())
}
