//! Key ordering
//!
//! Keyed tables are stably sorted by their composite key so that lookups can
//! binary-search them. Two rows with equal key tuples are an error.

use csvdb_core::{Database, Error, Result, Table};

/// Sort every keyed, non-enum table of the database
pub fn sort_tables(db: &mut Database) -> Result<()> {
    for table in db.tables_mut() {
        if table.is_enum() {
            continue;
        }
        sort_table(table)?;
    }
    Ok(())
}

/// Sort one table by its key columns and reject duplicate keys
pub fn sort_table(table: &mut Table) -> Result<()> {
    if !table.has_key() || table.rows.len() < 2 {
        return Ok(());
    }

    let mut rows = std::mem::take(&mut table.rows);
    rows.sort_by(|a, b| table.compare_keys(a, b));
    table.rows = rows;

    if let Some(pair) = table
        .rows
        .windows(2)
        .find(|pair| table.compare_keys(&pair[0], &pair[1]).is_eq())
    {
        return Err(Error::DuplicateKey {
            table: table.name.clone(),
            line: pair[0].line.max(pair[1].line),
            key: table.describe_key(&pair[1]),
        });
    }

    tracing::debug!(table = %table.name, rows = table.rows.len(), "sorted table");
    Ok(())
}
