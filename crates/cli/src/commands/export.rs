//! JSON export of database tables.
//!
//! Each table is written to `<dir>/<table>.json` as a pretty-printed array
//! of row objects. Sessions and password hashes are never exported.

use std::path::Path;

use super::{CommandError, connect};

/// Tables in dependency order. Only these names reach the SQL text.
pub const EXPORTABLE_TABLES: &[&str] = &[
    "categories",
    "products",
    "product_variants",
    "profiles",
    "customers",
    "customer_addresses",
    "orders",
    "order_items",
    "vendors",
    "ingredients",
    "product_recipes",
    "production_batches",
    "delivery_partners",
    "deliveries",
];

/// Resolve requested table names, defaulting to every exportable table.
fn select_tables(requested: &[String]) -> Result<Vec<&'static str>, CommandError> {
    if requested.is_empty() {
        return Ok(EXPORTABLE_TABLES.to_vec());
    }
    requested
        .iter()
        .map(|name| {
            EXPORTABLE_TABLES
                .iter()
                .copied()
                .find(|t| *t == name.as_str())
                .ok_or_else(|| {
                    CommandError::Invalid(format!(
                        "unknown table {name}; exportable: {}",
                        EXPORTABLE_TABLES.join(", ")
                    ))
                })
        })
        .collect()
}

/// Export `tables` (or all) into `dir`.
///
/// # Errors
///
/// Returns an error for an unknown table name, or if a query or file write fails.
pub async fn run(dir: &Path, tables: &[String]) -> Result<(), CommandError> {
    let tables = select_tables(tables)?;
    tokio::fs::create_dir_all(dir).await?;

    let pool = connect().await?;

    for table in tables {
        let rows: serde_json::Value = sqlx::query_scalar(&format!(
            "SELECT COALESCE(json_agg(t), '[]'::json) FROM {table} t"
        ))
        .fetch_one(&pool)
        .await?;

        let count = rows.as_array().map_or(0, Vec::len);
        let path = dir.join(format!("{table}.json"));
        tokio::fs::write(&path, serde_json::to_vec_pretty(&rows)?).await?;
        tracing::info!(table, rows = count, path = %path.display(), "Exported");
    }

    tracing::info!("Export complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_tables() {
        assert_eq!(select_tables(&[]).unwrap(), EXPORTABLE_TABLES);
    }

    #[test]
    fn test_selected_tables_keep_request_order() {
        let tables = select_tables(&["orders".to_string(), "categories".to_string()]).unwrap();
        assert_eq!(tables, ["orders", "categories"]);
    }

    #[test]
    fn test_unknown_table_rejected() {
        assert!(select_tables(&["users".to_string()]).is_err());
        assert!(select_tables(&["orders; DROP TABLE orders".to_string()]).is_err());
    }
}
