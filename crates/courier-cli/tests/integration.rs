#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_OVERRIDES: &[&str] = &[
    "PORT",
    "APP_URL",
    "PAYPAL_CLIENT_ID",
    "PAYPAL_CLIENT_SECRET",
    "PAYPAL_API_BASE",
    "PAYPAL_WEBHOOK_SECRET",
    "SUPABASE_URL",
    "SUPABASE_KEY",
    "SUPABASE_BUCKET_NAME",
    "AIRTABLE_API_KEY",
    "AIRTABLE_BASE_ID",
];

fn courier(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("courier").unwrap();
    cmd.current_dir(dir.path())
        .env("COURIER_CONFIG", dir.path().join("courier.yaml"));
    for key in ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

fn write_config(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("courier.yaml"), yaml).unwrap();
}

// ---------------------------------------------------------------------------
// courier config init
// ---------------------------------------------------------------------------

#[test]
fn config_init_writes_loadable_defaults() {
    let dir = TempDir::new().unwrap();
    courier(&dir)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote default config"));

    let raw = std::fs::read_to_string(dir.path().join("courier.yaml")).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&raw).unwrap();
    assert_eq!(value["server"]["port"].as_u64(), Some(3001));
    assert_eq!(value["riders"].as_sequence().map(|s| s.len()), Some(3));
}

#[test]
fn config_init_refuses_to_clobber_without_force() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "server:\n  port: 4000\n");

    courier(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    courier(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    let raw = std::fs::read_to_string(dir.path().join("courier.yaml")).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&raw).unwrap();
    assert_eq!(value["server"]["port"].as_u64(), Some(3001));
}

// ---------------------------------------------------------------------------
// courier config show / validate
// ---------------------------------------------------------------------------

#[test]
fn config_show_json_applies_env_and_redacts_secrets() {
    let dir = TempDir::new().unwrap();
    let out = courier(&dir)
        .args(["--json", "config", "show"])
        .env("PORT", "8088")
        .env("PAYPAL_CLIENT_SECRET", "top-secret")
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(!stdout.contains("top-secret"));
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["server"]["port"], 8088);
    assert_eq!(value["payments"]["paypal"]["client_secret"], "********");
}

#[test]
fn config_validate_passes_on_defaults() {
    let dir = TempDir::new().unwrap();
    courier(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_fails_for_paypal_without_credentials() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "payments:\n  gateway: paypal\n");

    courier(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error]"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_accepts_credentials_from_env() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "payments:\n  gateway: paypal\n");

    courier(&dir)
        .args(["config", "validate"])
        .env("PAYPAL_CLIENT_ID", "id")
        .env("PAYPAL_CLIENT_SECRET", "secret")
        .assert()
        .success();
}

#[test]
fn malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "server: [not, a, map\n");

    courier(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

// ---------------------------------------------------------------------------
// courier riders
// ---------------------------------------------------------------------------

#[test]
fn riders_lists_seed_pool() {
    let dir = TempDir::new().unwrap();
    courier(&dir)
        .arg("riders")
        .assert()
        .success()
        .stdout(predicate::str::contains("John Smith"))
        .stdout(predicate::str::contains("Jane Doe"))
        .stdout(predicate::str::contains("Mike Johnson"));
}

#[test]
fn riders_json_reflects_config_file() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "riders:\n  - id: 7\n    name: Ana Lopez\n    phone: \"555-0100\"\n    rating: 4.5\n",
    );

    let out = courier(&dir).args(["riders", "--json"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let riders = value.as_array().unwrap();
    assert_eq!(riders.len(), 1);
    assert_eq!(riders[0]["name"], "Ana Lopez");
    assert_eq!(riders[0]["available"], true);
}

// ---------------------------------------------------------------------------
// courier serve
// ---------------------------------------------------------------------------

#[test]
fn serve_refuses_config_with_errors() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "storage:\n  backend: supabase\n");

    courier(&dir)
        .args(["serve", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config has errors"));
}

#[test]
fn help_lists_commands() {
    let dir = TempDir::new().unwrap();
    courier(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("riders"));
}
