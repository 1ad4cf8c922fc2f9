//! Code generation over compiled schema directories

use csvdb_codegen::{generate, write_files};
use csvdb_core::{Config, TargetLanguage};
use csvdb_engine::compile_dir;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn weapons_schema() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let files = [
        ("EnumWeaponTypes.csv", "Name key,Value uint8,Comment\nNone,0,\nGun,1,Ranged\n"),
        ("Weapons.csv", "Name key,Type +EnumWeaponTypes,Damage uint8 min=1\nPistol,Gun,10\n"),
        ("Characters.csv", "Name key,Weapon +Weapons,Level int32 // starting level\nAda,Pistol,1\n"),
        ("GlobalNones.csv", "Weapon +Weapons\nPistol\n"),
    ];
    for (name, text) in files {
        fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}

#[test]
fn cpp_artifacts_are_written_once() {
    let dir = weapons_schema();
    let compiled = compile_dir(dir.path()).unwrap();
    let files = generate(&compiled.db, &compiled.order, &Config::default()).unwrap();

    let out = dir.path().join("gen");
    let paths = write_files(&out, &files).unwrap();
    assert_eq!(paths, vec![out.join("DB.h"), out.join("DB.cpp")]);

    let header = fs::read_to_string(out.join("DB.h")).unwrap();
    assert!(header.contains("  // starting level\n  int32_t Level = 0;\n"));
    assert!(header.contains("  Weapons::ID Weapon;\n"));
    assert!(header.contains("  uint8_t Damage = 0;\n"));

    // Row data never ends up in generated code
    assert!(!header.contains("Pistol"));
    assert!(!header.contains("Ada"));

    let again = generate(&compiled.db, &compiled.order, &Config::default()).unwrap();
    assert_eq!(again, files);
}

#[test]
fn rust_artifacts() {
    let dir = weapons_schema();
    let compiled = compile_dir(dir.path()).unwrap();
    let config = Config {
        target: TargetLanguage::Rust,
        ..Config::default()
    };

    let files = generate(&compiled.db, &compiled.order, &config).unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["db_types.rs", "db.rs"]);

    assert!(files[0].contents.contains("    /// Ranged\n    Gun = 1,\n"));
    assert!(files[0].contents.contains("    /// starting level\n    pub level: i32,\n"));
    assert!(files[1].contents.contains("    pub fn find_characters(&self, name: &str) -> Option<Id<Characters>> {\n"));
    assert!(files[1].contents.contains("    pub global_nones: GlobalNones,\n"));
}

#[test]
fn clashing_type_names_fail() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("EnumTier.csv"), "Name key,Value uint8,Comment\nLow,0,\n").unwrap();
    fs::write(dir.path().join("Tier.csv"), "Name key\na\n").unwrap();

    let compiled = compile_dir(dir.path()).unwrap();
    let err = generate(&compiled.db, &compiled.order, &Config::default()).unwrap_err();
    assert!(err.to_string().contains("'Tier'"));
}
