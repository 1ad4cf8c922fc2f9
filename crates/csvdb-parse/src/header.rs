//! Header cell grammar
//!
//! `<Name> [type] [key] [ignore] [min=V] [max=V] [+Table|*Table] [// comment]`
//!
//! The name comes first; every other token may appear in any order.

use csvdb_core::{ColumnSpec, Error, FieldType, ForeignLink, Result};

/// Parse one header cell of `table` into a column spec.
///
/// The cell text is kept verbatim in [`ColumnSpec::raw_header`] so the file
/// can be written back exactly as it was authored.
pub fn parse_header(table: &str, cell: &str) -> Result<ColumnSpec> {
    let malformed = |reason: String| Error::MalformedHeader {
        table: table.to_string(),
        header: cell.to_string(),
        reason,
    };

    let (spec, comment) = match cell.split_once("//") {
        Some((spec, comment)) => (spec, Some(comment)),
        None => (cell, None),
    };

    let mut tokens = spec.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| malformed("missing column name".to_string()))?;

    let mut column = ColumnSpec::new(name, cell);
    column.comment = comment.map(str::to_string);

    let mut declared: Option<FieldType> = None;
    let mut ignored = false;

    for token in tokens {
        if let Some(ty) = FieldType::from_keyword(token) {
            if let Some(previous) = declared.replace(ty) {
                return Err(malformed(format!("second type '{}' after '{}'", token, previous)));
            }
            continue;
        }

        match token {
            "key" => column.is_key = true,
            "ignore" => ignored = true,
            _ => {
                if let Some(value) = token.strip_prefix("min=") {
                    set_bound(&mut column.min_value, value, "min").map_err(&malformed)?;
                } else if let Some(value) = token.strip_prefix("max=") {
                    set_bound(&mut column.max_value, value, "max").map_err(&malformed)?;
                } else if let Some(target) = token.strip_prefix('+') {
                    set_link(&mut column.link, ForeignLink::strong(target)).map_err(&malformed)?;
                } else if let Some(target) = token.strip_prefix('*') {
                    set_link(&mut column.link, ForeignLink::weak(target)).map_err(&malformed)?;
                } else {
                    return Err(malformed(format!("unknown tag '{}'", token)));
                }
            }
        }
    }

    column.field_type = declared.unwrap_or(FieldType::String);

    if ignored {
        column.is_ignored = true;
        column.is_key = false;
        column.field_type = FieldType::String;
        column.link = None;
        column.min_value = None;
        column.max_value = None;
        column.comment = None;
    }

    Ok(column)
}

fn set_bound(slot: &mut Option<String>, value: &str, which: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        return Err(format!("empty {} value", which));
    }
    if slot.is_some() {
        return Err(format!("second {}= tag", which));
    }
    *slot = Some(value.to_string());
    Ok(())
}

fn set_link(slot: &mut Option<ForeignLink>, link: ForeignLink) -> std::result::Result<(), String> {
    if link.table.is_empty() {
        return Err("foreign link without a table name".to_string());
    }
    if let Some(previous) = slot {
        return Err(format!(
            "second foreign link '{}' after '{}'",
            link.table, previous.table
        ));
    }
    *slot = Some(link);
    Ok(())
}
