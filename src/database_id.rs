//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseID = i64;

/// Database identifier for an account.
pub type AccountID = DatabaseID;

/// Database identifier for a category.
pub type CategoryID = DatabaseID;

/// Database identifier for an income or an expense.
pub type TransactionID = DatabaseID;

/// Database identifier for a transfer.
pub type TransferID = DatabaseID;

/// Database identifier for a template of any kind.
pub type TemplateID = DatabaseID;
