use csvdb_core::Database;
use csvdb_parse::load_table;

/// Build a database from `(table name, csv text)` pairs
pub fn database(files: &[(&str, &str)]) -> Database {
    let mut db = Database::new();
    for (name, text) in files {
        db.insert(load_table(name, text).unwrap()).unwrap();
    }
    db
}
