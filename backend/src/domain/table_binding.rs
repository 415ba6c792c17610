//! Explicit entity-to-table bindings and their startup validation.
//!
//! Each persisted entity declares its table and a field-to-column map. At
//! startup the declaration is compared with the live schema so drift between
//! code and migrations fails fast instead of surfacing as a query error.

use std::collections::BTreeMap;

/// One field-to-column entry of a [`TableBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnBinding {
    /// Rust field name on the entity.
    pub field: &'static str,
    /// SQL column name, exactly as stored (case-sensitive).
    pub column: &'static str,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnBinding {
    /// Declare a column mapping.
    #[must_use]
    pub const fn new(field: &'static str, column: &'static str, nullable: bool) -> Self {
        Self {
            field,
            column,
            nullable,
        }
    }
}

/// Declares which table backs an entity type and how its fields map.
pub trait TableBinding {
    /// Table name.
    const TABLE: &'static str;
    /// Every column of the table, one per entity field.
    const COLUMNS: &'static [ColumnBinding];

    /// Table name accessor.
    fn table_name() -> &'static str {
        Self::TABLE
    }

    /// Column bound to `field`, if declared.
    fn column_for(field: &str) -> Option<&'static ColumnBinding> {
        Self::COLUMNS.iter().find(|column| column.field == field)
    }
}

/// A column as reported by the live database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name, case preserved.
    pub name: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl LiveColumn {
    /// Describe one live column.
    #[must_use]
    pub fn new(name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
        }
    }
}

/// Mismatches between a declared binding and the live schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaDriftError {
    /// The bound table is absent.
    #[error("table `{table}` does not exist")]
    MissingTable {
        /// Bound table.
        table: &'static str,
    },
    /// Declared columns are absent from the table.
    #[error("table `{table}` is missing declared columns: {}", columns.join(", "))]
    MissingColumns {
        /// Bound table.
        table: &'static str,
        /// Absent column names.
        columns: Vec<&'static str>,
    },
    /// The table has columns the binding does not declare.
    #[error("table `{table}` has undeclared columns: {}", columns.join(", "))]
    UndeclaredColumns {
        /// Bound table.
        table: &'static str,
        /// Extra column names.
        columns: Vec<String>,
    },
    /// A column's nullability differs from its declaration.
    #[error(
        "column `{table}.{column}` nullability differs: declared {declared}, live {live}"
    )]
    NullabilityMismatch {
        /// Bound table.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// Declared nullability.
        declared: bool,
        /// Live nullability.
        live: bool,
    },
}

/// Check a binding against the columns the database reports for its table.
///
/// An empty `live` slice means the table does not exist.
///
/// # Errors
///
/// Returns the first [`SchemaDriftError`] found, checking in order: missing
/// table, missing columns, undeclared columns, nullability.
///
/// # Examples
///
/// ```
/// use songbook::domain::Song;
/// use songbook::domain::table_binding::{LiveColumn, SchemaDriftError, validate_binding};
///
/// let error = validate_binding::<Song>(&[]).expect_err("no table");
/// assert_eq!(error, SchemaDriftError::MissingTable { table: "songs" });
/// ```
pub fn validate_binding<T: TableBinding>(live: &[LiveColumn]) -> Result<(), SchemaDriftError> {
    let table = T::TABLE;
    if live.is_empty() {
        return Err(SchemaDriftError::MissingTable { table });
    }

    let live_by_name: BTreeMap<&str, &LiveColumn> = live
        .iter()
        .map(|column| (column.name.as_str(), column))
        .collect();

    let missing: Vec<&'static str> = T::COLUMNS
        .iter()
        .filter(|declared| !live_by_name.contains_key(declared.column))
        .map(|declared| declared.column)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaDriftError::MissingColumns {
            table,
            columns: missing,
        });
    }

    let undeclared: Vec<String> = live
        .iter()
        .filter(|column| !T::COLUMNS.iter().any(|declared| declared.column == column.name))
        .map(|column| column.name.clone())
        .collect();
    if !undeclared.is_empty() {
        return Err(SchemaDriftError::UndeclaredColumns {
            table,
            columns: undeclared,
        });
    }

    for declared in T::COLUMNS {
        let Some(column) = live_by_name.get(declared.column) else {
            continue;
        };
        if column.nullable != declared.nullable {
            return Err(SchemaDriftError::NullabilityMismatch {
                table,
                column: declared.column,
                declared: declared.nullable,
                live: column.nullable,
            });
        }
    }

    Ok(())
}
