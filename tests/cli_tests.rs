//! End-to-end CLI tests
//!
//! Each test runs the binary against an isolated HOME so the database lands
//! in a throwaway ~/.drift and no user config leaks in.

use anyhow::Result;
use assert_cmd::{cargo, prelude::*};
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;
use tempfile::TempDir;

/// Create a base CLI command with proper environment setup
fn base_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("drift"));
    cmd.env("HOME", home.path());
    cmd.env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd.arg("--no-color");
    cmd
}

fn run_json(home: &TempDir, args: &[&str]) -> Result<Value> {
    let output = base_cmd(home).arg("--json").args(args).output()?;
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Decimals serialize as strings with their natural scale ("10000.0"); read
/// them numerically so assertions don't depend on trailing zeros
fn num(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("numeric string"),
        Value::Number(n) => n.as_f64().expect("number"),
        other => panic!("expected number, got {:?}", other),
    }
}

fn seed_sixty_forty(home: &TempDir) -> Result<()> {
    base_cmd(home)
        .args(["strategy", "create", "60/40", "--threshold", "5"])
        .assert()
        .success();
    base_cmd(home)
        .args(["strategy", "activate", "1"])
        .assert()
        .success();
    base_cmd(home)
        .args(["target", "add-class", "1", "EQUITY", "60"])
        .assert()
        .success();
    base_cmd(home)
        .args(["target", "add-class", "1", "DEBT", "40"])
        .assert()
        .success();
    base_cmd(home)
        .args(["target", "add-sub", "1", "EQUITY", "STOCK", "100"])
        .assert()
        .success();
    base_cmd(home)
        .args(["target", "add-sub", "1", "DEBT", "BOND", "100"])
        .assert()
        .success();
    Ok(())
}

#[test]
fn test_strategy_lifecycle() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args(["strategy", "create", "core", "--threshold", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created strategy"));

    let listed = run_json(&home, &["strategy", "list"])?;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "core");
    assert_eq!(listed[0]["is_active"], false);

    base_cmd(&home)
        .args(["strategy", "activate", "1"])
        .assert()
        .success();

    let listed = run_json(&home, &["strategy", "list"])?;
    assert_eq!(listed[0]["is_active"], true);

    base_cmd(&home)
        .args(["strategy", "delete", "1"])
        .assert()
        .success();
    let listed = run_json(&home, &["strategy", "list"])?;
    assert!(listed.as_array().unwrap().is_empty());

    Ok(())
}

#[test]
fn test_missing_strategy_reports_not_found() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args(["strategy", "show", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    Ok(())
}

#[test]
fn test_invalid_threshold_is_rejected() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args(["strategy", "create", "bad", "--threshold", "75"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation error"));

    Ok(())
}

#[test]
fn test_target_sum_over_100_is_rejected() -> Result<()> {
    let home = TempDir::new()?;
    seed_sixty_forty(&home)?;

    base_cmd(&home)
        .args(["target", "add-class", "1", "LIQUIDITY", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeding 100"));

    Ok(())
}

#[test]
fn test_invalid_sub_class_is_rejected() -> Result<()> {
    let home = TempDir::new()?;
    seed_sixty_forty(&home)?;

    base_cmd(&home)
        .args(["target", "add-sub", "1", "DEBT", "HOUSE", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid sub-class of DEBT"));

    Ok(())
}

#[test]
fn test_allocation_show_reports_drift() -> Result<()> {
    let home = TempDir::new()?;
    seed_sixty_forty(&home)?;

    base_cmd(&home)
        .args(["holdings", "set", "VTI", "EQUITY", "STOCK", "70", "100"])
        .assert()
        .success();
    base_cmd(&home)
        .args(["holdings", "set", "BND", "DEBT", "BOND", "37.5", "80"])
        .assert()
        .success();

    let analysis = run_json(&home, &["allocation", "show"])?;
    assert_eq!(num(&analysis["portfolio_value"]), 10000.0);
    assert_eq!(analysis["overall_status"], "Critical");

    let classes = analysis["classes"].as_array().unwrap();
    assert_eq!(classes[0]["asset_class"], "Equity");
    assert_eq!(num(&classes[0]["drift_percent"]), 10.0);

    Ok(())
}

#[test]
fn test_allocation_suggest_sells_then_buys() -> Result<()> {
    let home = TempDir::new()?;
    seed_sixty_forty(&home)?;

    base_cmd(&home)
        .args(["holdings", "set", "VTI", "EQUITY", "STOCK", "70", "100"])
        .assert()
        .success();
    base_cmd(&home)
        .args(["holdings", "set", "BND", "DEBT", "BOND", "37.5", "80"])
        .assert()
        .success();

    let suggestions = run_json(&home, &["allocation", "suggest"])?;
    let suggestions = suggestions.as_array().unwrap();
    assert_eq!(suggestions.len(), 2);

    assert_eq!(suggestions[0]["action"], "Sell");
    assert_eq!(suggestions[0]["priority"], 1);
    assert_eq!(suggestions[0]["symbol"], "VTI");
    assert_eq!(num(&suggestions[0]["suggested_shares"]), 10.0);

    assert_eq!(suggestions[1]["action"], "Buy");
    assert_eq!(suggestions[1]["priority"], 2);
    assert_eq!(suggestions[1]["symbol"], Value::Null);

    Ok(())
}

#[test]
fn test_never_sell_exclusion_suppresses_sells() -> Result<()> {
    let home = TempDir::new()?;
    seed_sixty_forty(&home)?;

    base_cmd(&home)
        .args(["holdings", "set", "VTI", "EQUITY", "STOCK", "70", "100"])
        .assert()
        .success();
    base_cmd(&home)
        .args(["holdings", "set", "BND", "DEBT", "BOND", "37.5", "80"])
        .assert()
        .success();
    base_cmd(&home)
        .args(["exclude", "add", "1", "VTI", "--never-sell"])
        .assert()
        .success();

    let suggestions = run_json(&home, &["allocation", "suggest"])?;
    let suggestions = suggestions.as_array().unwrap();
    assert!(suggestions.iter().all(|s| s["action"] != "Sell"));

    Ok(())
}

#[test]
fn test_drift_summary_without_strategy() -> Result<()> {
    let home = TempDir::new()?;

    let summary = run_json(&home, &["allocation", "drift"])?;
    assert_eq!(summary["has_active_strategy"], false);
    assert_eq!(summary["overall_status"], "NoStrategy");

    Ok(())
}

#[test]
fn test_allocation_show_without_strategy_fails() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args(["allocation", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no active strategy"));

    Ok(())
}

#[test]
fn test_performance_flow() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args([
            "activity", "add", "BUY", "2023-01-01", "--symbol", "VTI", "--quantity", "10",
            "--price", "100",
        ])
        .assert()
        .success();
    base_cmd(&home)
        .args(["valuation", "add", "2023-01-01", "1000", "--deposits", "1000"])
        .assert()
        .success();
    base_cmd(&home)
        .args(["valuation", "add", "2024-01-01", "1100"])
        .assert()
        .success();

    let perf = run_json(&home, &["performance", "show"])?;
    assert_eq!(num(&perf["current_value"]), 1100.0);
    assert_eq!(perf["irr_converged"], true);

    let irr = perf["irr"].as_f64().unwrap();
    assert!((irr - 0.10).abs() < 1e-2, "irr = {}", irr);
    assert!((num(&perf["ttwror"]) - 0.10).abs() < 1e-6);

    Ok(())
}

#[test]
fn test_holding_show_reports_cost_basis() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args([
            "activity", "add", "BUY", "2022-01-01", "--symbol", "VTI", "--quantity", "10",
            "--price", "100",
        ])
        .assert()
        .success();
    base_cmd(&home)
        .args([
            "activity", "add", "SELL", "2023-01-01", "--symbol", "VTI", "--quantity", "4",
            "--price", "120",
        ])
        .assert()
        .success();

    let holding = run_json(&home, &["holding", "show", "VTI", "--price", "130"])?;
    assert_eq!(num(&holding["total_shares"]), 6.0);
    assert_eq!(num(&holding["total_cost_basis"]), 600.0);
    assert_eq!(num(&holding["realized_gain"]), 80.0);
    assert_eq!(num(&holding["unrealized_gain"]), 180.0);
    assert_eq!(holding["is_long_term"], true);

    Ok(())
}

#[test]
fn test_holding_show_unknown_symbol_fails() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args(["holding", "show", "NONE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    Ok(())
}

#[test]
fn test_activity_validation() -> Result<()> {
    let home = TempDir::new()?;

    // BUY without symbol
    base_cmd(&home)
        .args(["activity", "add", "BUY", "2023-01-01", "--quantity", "10", "--price", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires --symbol"));

    // Unknown type
    base_cmd(&home)
        .args(["activity", "add", "SHORT", "2023-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown activity type"));

    Ok(())
}

#[test]
fn test_holdings_snapshot_round_trip() -> Result<()> {
    let home = TempDir::new()?;

    base_cmd(&home)
        .args(["holdings", "set", "GLD", "PRECIOUS_METALS", "GOLD_ETF", "5", "180"])
        .assert()
        .success();

    let holdings = run_json(&home, &["holdings", "list"])?;
    assert_eq!(holdings.as_array().unwrap().len(), 1);
    assert_eq!(holdings[0]["symbol"], "GLD");
    assert_eq!(num(&holdings[0]["value"]), 900.0);

    base_cmd(&home)
        .args(["holdings", "remove", "GLD"])
        .assert()
        .success();
    let holdings = run_json(&home, &["holdings", "list"])?;
    assert!(holdings.as_array().unwrap().is_empty());

    Ok(())
}
