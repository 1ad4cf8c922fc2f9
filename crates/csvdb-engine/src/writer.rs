//! Canonical CSV text
//!
//! Renders a validated table back to text: header cells exactly as authored,
//! rows in key order, values in their shortest canonical form and enum cells
//! as declared member names. The source file's line terminator and trailing
//! newline are kept so a canonical file is never rewritten.

use csvdb_core::{Database, Error, Field, Resolution, Result, Table};
use std::path::Path;

/// Render a table to canonical CSV text
pub fn to_csv_string(db: &Database, table: &Table) -> String {
    let newline = table.layout.newline.as_str();
    let mut lines = Vec::with_capacity(table.rows.len() + 1);

    lines.push(
        table
            .columns
            .iter()
            .map(|c| quote(&c.raw_header))
            .collect::<Vec<_>>()
            .join(","),
    );

    let enums: Vec<_> = table
        .columns
        .iter()
        .map(|c| match &c.resolution {
            Resolution::Enum { table } => db.enum_index(table),
            _ => None,
        })
        .collect();

    for row in &table.rows {
        let cells: Vec<String> = row
            .fields
            .iter()
            .zip(&enums)
            .map(|(field, members)| match members.and_then(|m| m.name_of(field)) {
                Some(name) => quote(name),
                None => render(field),
            })
            .collect();
        lines.push(cells.join(","));
    }

    let mut text = lines.join(newline);
    if table.layout.trailing_newline {
        text.push_str(newline);
    }
    text
}

fn render(field: &Field) -> String {
    match field {
        Field::String(s) => quote(s),
        other => other.to_string(),
    }
}

/// Quote a string cell when it would otherwise not read back as one field
pub fn quote(text: &str) -> String {
    if text.contains(|c: char| matches!(c, ',' | '"' | '\r' | '\n')) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Write `contents` to `path` unless the file already holds exactly that
/// text. Returns whether a write happened.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    match std::fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(path, e)),
    }

    std::fs::write(path, contents).map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), "wrote file");
    Ok(true)
}
