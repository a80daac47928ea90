//! Command dispatcher that routes parsed CLI commands to their handlers.
//!
//! Every handler opens the store itself (config-resolved path), computes
//! through the engine, and renders either tables or JSON depending on the
//! `--json` flag.

pub mod allocation;
pub mod performance;
pub mod records;
pub mod strategies;

use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::cli::Commands;
use crate::config::Config;
use crate::db::models::{AssetClass, AssetSubClass};
use crate::{config, db, Result};

/// Route a parsed command to its handler
pub async fn dispatch_command(command: Commands, json_output: bool) -> Result<()> {
    match command {
        Commands::Strategy { action } => strategies::dispatch_strategy(action, json_output).await,
        Commands::Target { action } => strategies::dispatch_target(action, json_output).await,
        Commands::Exclude { action } => strategies::dispatch_exclude(action, json_output).await,
        Commands::Allocation { action } => {
            allocation::dispatch_allocation(action, json_output).await
        }
        Commands::Performance { action } => {
            performance::dispatch_performance(action, json_output).await
        }
        Commands::Holding { action } => performance::dispatch_holding(action, json_output).await,
        Commands::Activity { action } => records::dispatch_activity(action, json_output).await,
        Commands::Valuation { action } => records::dispatch_valuation(action, json_output).await,
        Commands::Holdings { action } => records::dispatch_holdings(action, json_output).await,
    }
}

/// Load config, make sure the database exists, and open a connection
pub(crate) fn open_store() -> Result<(Connection, Config)> {
    let config = config::load()?;
    db::init_database(config.database_path.clone())?;
    let conn = db::open_db(config.database_path.clone())?;
    Ok((conn, config))
}

pub(crate) fn parse_decimal_arg(raw: &str, what: &str) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("Invalid {}: '{}'", what, raw))
}

pub(crate) fn parse_date_arg(raw: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} '{}'. Use YYYY-MM-DD format", what, raw))
}

pub(crate) fn parse_class_arg(raw: &str) -> Result<AssetClass> {
    AssetClass::from_str(raw).map_err(|_| {
        anyhow::anyhow!(
            "Unknown asset class '{}'. Valid classes: {}",
            raw,
            AssetClass::all()
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

pub(crate) fn parse_sub_class_arg(raw: &str, class: AssetClass) -> Result<AssetSubClass> {
    AssetSubClass::from_str(raw).map_err(|_| {
        anyhow::anyhow!(
            "Unknown asset sub-class '{}'. Valid sub-classes of {}: {}",
            raw,
            class.as_str(),
            class
                .valid_sub_classes()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}
