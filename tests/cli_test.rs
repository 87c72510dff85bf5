use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_generate_without_leases_reports_nothing() {
    let mut cmd = Command::new(cargo_bin!("rentflow"));
    cmd.arg("generate");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no active leases"));
}

#[test]
fn test_generate_from_lease_file() {
    let mut leases = tempfile::NamedTempFile::new().unwrap();
    writeln!(leases, "id, tenant_id, unit_id, monthly_rent, service_charge, status").unwrap();
    writeln!(leases, "1, 1, 1, 10000.00, 500.00, active").unwrap();
    writeln!(leases, "2, 2, 2, 5000.00, 0.00, active").unwrap();
    writeln!(leases, "3, 3, 3, 7000.00, 0.00, terminated").unwrap();

    let mut cmd = Command::new(cargo_bin!("rentflow"));
    cmd.arg("generate").arg("--leases").arg(leases.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("generated 2 draft invoices"));
}

#[test]
fn test_import_end_to_end() {
    let mut tenants = tempfile::NamedTempFile::new().unwrap();
    writeln!(tenants, "id, first_name, last_name, phone").unwrap();
    writeln!(tenants, "1, John, Doe, 0712345678").unwrap();
    writeln!(tenants, "2, Jane, Smith,").unwrap();

    let mut feed = tempfile::NamedTempFile::new().unwrap();
    writeln!(feed, "Date,Amount,Payer Name,Phone").unwrap();
    writeln!(feed, "2025-01-15,50000,John Doe,+254712345678").unwrap();
    writeln!(feed, "2025-01-16,-1000,Jane Smith,").unwrap();
    writeln!(feed, "2025-01-17,3000,Total Stranger,").unwrap();

    let mut cmd = Command::new(cargo_bin!("rentflow"));
    cmd.arg("import")
        .arg(feed.path())
        .arg("--tenants")
        .arg(tenants.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 rows, 1 matched, 1 unmatched"))
        .stdout(predicate::str::contains("phone number match"))
        .stdout(predicate::str::contains("Total Stranger"));
}

#[test]
fn test_import_missing_feed_fails() {
    let mut cmd = Command::new(cargo_bin!("rentflow"));
    cmd.arg("import").arg("does-not-exist.csv");

    cmd.assert().failure();
}
