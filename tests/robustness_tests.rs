use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

mod common;

use common::{ADA, GADGET, WIDGET};

#[test]
fn test_malformed_row_rejects_its_whole_order() {
    let catalog = common::catalog_file();
    let orders = common::orders_file(&[
        &format!("a, {ADA}, {WIDGET}, 1"),
        &format!("a, {ADA}, {WIDGET}, not_a_number"),
        &format!("b, not-a-uuid, {WIDGET}, 1"),
        &format!("c, {ADA}"),
        &format!("d, {ADA}, {WIDGET}, 2"),
    ]);
    let report = tempfile::NamedTempFile::new().unwrap();

    Command::new(cargo_bin!("order-placement"))
        .arg(orders.path())
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--stock-report")
        .arg(report.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading order line").count(3))
        .stdout(predicate::str::contains("a,invalid_request,,"))
        .stdout(predicate::str::contains("b,invalid_request,,"))
        .stdout(predicate::str::contains("c,invalid_request,,"))
        .stdout(predicate::str::contains("d,placed,"))
        .stdout(predicate::str::contains("a,placed").not());

    let stock = std::fs::read_to_string(report.path()).unwrap();
    assert!(stock.contains(&format!("{WIDGET},Widget,8")));
}

#[test]
fn test_negative_quantity_leaves_other_lines_unplaced() {
    let catalog = common::catalog_file();
    let orders = common::orders_file(&[
        &format!("a, {ADA}, {WIDGET}, 4"),
        &format!("a, {ADA}, {GADGET}, -1"),
    ]);
    let report = tempfile::NamedTempFile::new().unwrap();

    Command::new(cargo_bin!("order-placement"))
        .arg(orders.path())
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--stock-report")
        .arg(report.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Error reading order line: line 3"))
        .stdout(predicate::str::contains("a,invalid_request,,"))
        .stdout(predicate::str::contains("a,placed").not());

    let stock = std::fs::read_to_string(report.path()).unwrap();
    assert!(stock.contains(&format!("{WIDGET},Widget,10")));
    assert!(stock.contains(&format!("{GADGET},Gadget,3")));
}

#[test]
fn test_customer_mismatch_rejects_its_whole_order() {
    let catalog = common::catalog_file();
    let orders = common::orders_file(&[
        &format!("a, {ADA}, {WIDGET}, 1"),
        &format!("a, 1c8d4e9f-7e66-4d5f-8b68-4a2e3c8d9b21, {GADGET}, 1"),
    ]);

    Command::new(cargo_bin!("order-placement"))
        .arg(orders.path())
        .arg("--catalog")
        .arg(catalog.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("already belongs to customer"))
        .stdout(predicate::str::contains("a,invalid_request,,"));
}

#[test]
fn test_invalid_catalog_fails() {
    let mut catalog = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut catalog, b"{ not json").unwrap();
    let orders = common::orders_file(&[]);

    Command::new(cargo_bin!("order-placement"))
        .arg(orders.path())
        .arg("--catalog")
        .arg(catalog.path())
        .assert()
        .failure();
}
