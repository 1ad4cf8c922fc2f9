//! Name rules
//!
//! Table and column names become type and field names in generated code, so
//! they must be plain identifiers. Column names may carry one `:RemoteKey`
//! suffix for composite key pairing.

use regex::Regex;
use std::sync::OnceLock;

fn table_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"))
}

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(:[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
    })
}

/// Valid table name
pub fn is_table_name(name: &str) -> bool {
    table_pattern().is_match(name)
}

/// Valid column name, optionally `Base:RemoteKey`
pub fn is_column_name(name: &str) -> bool {
    column_pattern().is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names() {
        assert!(is_table_name("Weapons"));
        assert!(is_table_name("EnumWeapon_Types2"));
        assert!(!is_table_name("2Weapons"));
        assert!(!is_table_name("Weapon Types"));
        assert!(!is_table_name(""));
        assert!(!is_table_name("Owner:Id"));
    }

    #[test]
    fn column_names() {
        assert!(is_column_name("Name"));
        assert!(is_column_name("Owner:Id"));
        assert!(!is_column_name("Owner:"));
        assert!(!is_column_name("Owner:Id:Name"));
        assert!(!is_column_name("Max-HP"));
    }
}
