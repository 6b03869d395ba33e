use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

use common::{ADA, WIDGET};

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let catalog = common::catalog_file();
    let orders = common::orders_file(&[&format!("a, {ADA}, {WIDGET}, 1")]);

    let mut cmd = Command::new(cargo_bin!("order-placement"));
    cmd.arg(orders.path())
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--db-path")
        .arg("some_db");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."))
        .stdout(predicate::str::contains("a,placed,"));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let catalog = common::catalog_file();
    let orders = common::orders_file(&[&format!("a, {ADA}, {WIDGET}, 1")]);

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    let mut cmd = Command::new(cargo_bin!("order-placement"));
    cmd.arg(orders.path())
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--db-path")
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not());
}
