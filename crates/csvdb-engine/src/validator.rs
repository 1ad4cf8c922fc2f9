//! Referential integrity and value ranges
//!
//! Runs after type resolution and sorting. Every link column must point at an
//! existing row of a keyed table, and every cell of a column with `min=` or
//! `max=` must fall inside its bounds.

use csvdb_core::{ColumnSpec, Database, EnumIndex, Error, Field, Resolution, Result, Table};

/// Check every foreign link and value range of the database
pub fn validate(db: &Database) -> Result<()> {
    for table in db.tables() {
        check_links(db, table)?;
        check_ranges(db, table)?;
    }
    Ok(())
}

/// Check that every row's foreign key tuples exist in their linked tables
pub fn check_links(db: &Database, table: &Table) -> Result<()> {
    let mut processed = vec![false; table.columns.len()];

    for (index, column) in table.columns.iter().enumerate() {
        if processed[index] {
            continue;
        }
        let Some(link) = column.link.as_ref() else {
            continue;
        };

        let foreign = db.get(&link.table).ok_or_else(|| Error::MissingForeignTable {
            table: table.name.clone(),
            column: column.name.clone(),
            foreign: link.table.clone(),
        })?;

        // enum cells were checked when their names were substituted
        if foreign.is_enum() {
            processed[index] = true;
            continue;
        }

        if !foreign.has_key() {
            return Err(Error::ForeignTableWithoutKey {
                table: table.name.clone(),
                column: column.name.clone(),
                foreign: foreign.name.clone(),
            });
        }

        let pairing = pair_columns(table, index, foreign)?;
        for &local in &pairing {
            processed[local] = true;
        }

        for row in &table.rows {
            let key: Vec<&Field> = pairing.iter().map(|&c| &row.fields[c]).collect();
            if foreign.find_by_key(&key).is_none() {
                let rendered = foreign
                    .key_columns
                    .iter()
                    .zip(&key)
                    .map(|(&k, value)| format!("{}={}", foreign.columns[k].name, value))
                    .collect::<Vec<_>>()
                    .join(", ");

                return Err(Error::BrokenReference {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    foreign: foreign.name.clone(),
                    line: row.line,
                    key: rendered,
                });
            }
        }

        tracing::debug!(
            table = %table.name,
            column = %column.name,
            foreign = %foreign.name,
            "checked foreign link"
        );
    }

    Ok(())
}

/// Local columns that together reference the key of `foreign`, in the
/// foreign table's key order.
///
/// A link without a `:RemoteKey` suffix to a single-key table pairs with that
/// key alone. Otherwise each key `K` of the foreign table needs a local column
/// named `Base:K` linking to the same table.
pub fn pair_columns(table: &Table, index: usize, foreign: &Table) -> Result<Vec<usize>> {
    let column = &table.columns[index];

    if foreign.key_columns.len() == 1 && column.remote_key().is_none() {
        return Ok(vec![index]);
    }

    let mismatch = |reason: String| Error::CompositeKeyMismatch {
        table: table.name.clone(),
        column: column.name.clone(),
        foreign: foreign.name.clone(),
        reason,
    };

    let base = column.base_name();
    let mut pairing = Vec::with_capacity(foreign.key_columns.len());
    for &key in &foreign.key_columns {
        let wanted = format!("{}:{}", base, foreign.columns[key].name);
        let local = table
            .columns
            .iter()
            .position(|c| c.name == wanted && c.link_table() == Some(foreign.name.as_str()))
            .ok_or_else(|| mismatch(format!("no column '{}' linking to '{}'", wanted, foreign.name)))?;
        pairing.push(local);
    }

    if !pairing.contains(&index) {
        return Err(mismatch(format!(
            "'{}' does not name a key column of '{}'",
            column.remote_key().unwrap_or_default(),
            foreign.name
        )));
    }

    Ok(pairing)
}

/// Check `min=`/`max=` bounds of every column of a table
pub fn check_ranges(db: &Database, table: &Table) -> Result<()> {
    for (index, column) in table.columns.iter().enumerate() {
        if column.min_value.is_none() && column.max_value.is_none() {
            continue;
        }

        let members = match &column.resolution {
            Resolution::Enum { table } => db.enum_index(table),
            _ => None,
        };

        let min = parse_bound(table, column, column.min_value.as_deref(), members)?;
        let max = parse_bound(table, column, column.max_value.as_deref(), members)?;

        for row in &table.rows {
            let value = &row.fields[index];
            let below = min.as_ref().is_some_and(|min| value < min);
            let above = max.as_ref().is_some_and(|max| value > max);

            if below || above {
                let shown = members
                    .and_then(|m| m.name_of(value))
                    .map_or_else(|| value.to_string(), str::to_string);

                return Err(Error::RangeViolation {
                    table: table.name.clone(),
                    column: column.name.clone(),
                    line: row.line,
                    value: shown,
                    min: column.min_value.clone().unwrap_or_else(|| "..".to_string()),
                    max: column.max_value.clone().unwrap_or_else(|| "..".to_string()),
                });
            }
        }
    }

    Ok(())
}

/// Parse a bound into the column's final type; enum columns also accept
/// member names.
fn parse_bound(
    table: &Table,
    column: &ColumnSpec,
    raw: Option<&str>,
    members: Option<&EnumIndex>,
) -> Result<Option<Field>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Some(members) = members {
        if let Some(found) = members.lookup(raw) {
            return Ok(Some(found.value().clone()));
        }
        return members
            .value_type
            .parse(raw)
            .map(Some)
            .ok_or_else(|| Error::UnknownEnumMember {
                table: table.name.clone(),
                column: column.name.clone(),
                enum_table: members.table.clone(),
                line: None,
                value: raw.to_string(),
            });
    }

    column
        .field_type
        .parse(raw)
        .map(Some)
        .ok_or_else(|| Error::InvalidValue {
            table: table.name.clone(),
            column: column.name.clone(),
            line: None,
            value: raw.to_string(),
            expected: column.field_type,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::sorter::sort_tables;
    use crate::test_support::database;

    fn prepared(files: &[(&str, &str)]) -> Database {
        let mut db = database(files);
        resolve(&mut db).unwrap();
        sort_tables(&mut db).unwrap();
        db
    }

    #[test]
    fn valid_single_key_links_pass() {
        let db = prepared(&[
            ("Players", "Name key\nAda\nBob\n"),
            ("Scores", "Player +Players,Points int32\nBob,3\nAda,5\n"),
        ]);
        validate(&db).unwrap();
    }

    #[test]
    fn removed_referenced_row_fails() {
        let db = prepared(&[
            ("Players", "Name key\nAda\n"),
            ("Scores", "Player +Players,Points int32\nAda,5\nBob,3\n"),
        ]);
        match validate(&db).unwrap_err() {
            Error::BrokenReference { table, foreign, line, key, .. } => {
                assert_eq!(table, "Scores");
                assert_eq!(foreign, "Players");
                assert_eq!(line, 3);
                assert_eq!(key, "Name=Bob");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn weak_links_are_validated_too() {
        let db = prepared(&[
            ("Players", "Name key\nAda\n"),
            ("Scores", "Player *Players\nEve\n"),
        ]);
        assert!(matches!(validate(&db).unwrap_err(), Error::BrokenReference { .. }));
    }

    #[test]
    fn composite_links_pair_by_base_name() {
        let db = prepared(&[
            ("Cells", "X key int8,Y key int8\n1,2\n3,4\n"),
            ("Units", "Name,At:Y +Cells,At:X +Cells\nu,2,1\nv,4,3\n"),
        ]);
        validate(&db).unwrap();

        let db = prepared(&[
            ("Cells", "X key int8,Y key int8\n1,2\n3,4\n"),
            ("Units", "Name,At:X +Cells,At:Y +Cells\nu,1,4\n"),
        ]);
        match validate(&db).unwrap_err() {
            Error::BrokenReference { key, .. } => assert_eq!(key, "X=1, Y=4"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn composite_link_missing_partner_fails() {
        let mut db = database(&[
            ("Cells", "X key int8,Y key int8\n1,2\n"),
            ("Units", "At:X +Cells\n1\n"),
        ]);
        resolve(&mut db).unwrap();
        let err = validate(&db).unwrap_err();
        assert!(matches!(err, Error::CompositeKeyMismatch { .. }));
        assert!(err.to_string().contains("At:Y"));
    }

    #[test]
    fn enum_links_are_skipped() {
        let db = prepared(&[
            ("EnumKinds", "Name key,Value uint8,Comment\nA,0,\n"),
            ("Things", "Kind +EnumKinds\nA\n"),
        ]);
        validate(&db).unwrap();
    }

    #[test]
    fn range_violation_reports_bounds() {
        let db = prepared(&[("Weapons", "Name key,Damage uint8 min=1 max=50\nGun,10\nCannon,90\n")]);
        match validate(&db).unwrap_err() {
            Error::RangeViolation { line, value, min, max, .. } => {
                assert_eq!(line, 3);
                assert_eq!(value, "90");
                assert_eq!(min, "1");
                assert_eq!(max, "50");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn open_ended_range() {
        let db = prepared(&[("Weapons", "Damage int32 min=0\n5\n-1\n")]);
        let err = validate(&db).unwrap_err();
        assert!(err.to_string().contains("[0, ..]"));
    }

    #[test]
    fn bound_must_parse_as_column_type() {
        let db = prepared(&[("Weapons", "Damage uint8 max=lots\n5\n")]);
        assert!(matches!(validate(&db).unwrap_err(), Error::InvalidValue { line: None, .. }));
    }

    #[test]
    fn enum_bounds_accept_member_names() {
        let db = prepared(&[
            ("EnumTier", "Name key,Value uint8,Comment\nLow,0,\nMid,1,\nHigh,2,\n"),
            ("Quests", "Tier +EnumTier max=Mid\nLow\nHigh\n"),
        ]);
        match validate(&db).unwrap_err() {
            Error::RangeViolation { value, .. } => assert_eq!(value, "High"),
            other => panic!("unexpected error {other}"),
        }
    }
}
