//! Activity, valuation, and holdings-snapshot record handlers

use anyhow::bail;
use chrono::Utc;
use colored::Colorize;
use rust_decimal::Decimal;
use std::str::FromStr;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::info;

use crate::cli::{ActivityCommands, HoldingsCommands, ValuationCommands};
use crate::db::models::{Activity, ActivityType, Holding, Valuation};
use crate::error::EngineError;
use crate::utils::format_amount;
use crate::{db, Result};

use super::{
    open_store, parse_class_arg, parse_date_arg, parse_decimal_arg, parse_sub_class_arg,
};

pub async fn dispatch_activity(action: ActivityCommands, json_output: bool) -> Result<()> {
    match action {
        ActivityCommands::Add {
            activity_type,
            date,
            symbol,
            quantity,
            price,
            fee,
            value,
        } => {
            activity_add(
                &activity_type,
                &date,
                symbol.as_deref(),
                &quantity,
                &price,
                &fee,
                value.as_deref(),
                json_output,
            )
            .await
        }
        ActivityCommands::List { from, to } => {
            activity_list(from.as_deref(), to.as_deref(), json_output).await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn activity_add(
    activity_type: &str,
    date: &str,
    symbol: Option<&str>,
    quantity: &str,
    price: &str,
    fee: &str,
    value: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let activity_type = ActivityType::from_str(activity_type).map_err(|_| {
        anyhow::anyhow!(
            "Unknown activity type '{}'. Valid types: BUY, SELL, DIVIDEND, INTEREST, FEE, ITEM, LIABILITY",
            activity_type
        )
    })?;
    let date = parse_date_arg(date, "date")?;
    let quantity = parse_decimal_arg(quantity, "quantity")?;
    let unit_price = parse_decimal_arg(price, "price")?;
    let fee = parse_decimal_arg(fee, "fee")?;
    let value_override = value.map(|v| parse_decimal_arg(v, "value")).transpose()?;

    if quantity < Decimal::ZERO || unit_price < Decimal::ZERO || fee < Decimal::ZERO {
        bail!(EngineError::Validation(
            "quantity, price, and fee must not be negative".to_string()
        ));
    }
    if matches!(activity_type, ActivityType::Buy | ActivityType::Sell) && symbol.is_none() {
        bail!(EngineError::Validation(format!(
            "{} requires --symbol",
            activity_type.as_str()
        )));
    }

    let activity = Activity {
        id: None,
        activity_type,
        date,
        symbol: symbol.map(|s| s.to_string()),
        quantity,
        unit_price,
        fee,
        value_override,
        created_at: Utc::now(),
    };

    let (conn, config) = open_store()?;
    let id = db::insert_activity(&conn, &config.profile, &activity)?;
    info!("Recorded {} activity {}", activity_type.as_str(), id);

    if json_output {
        println!("{}", serde_json::json!({ "id": id }));
        return Ok(());
    }

    println!(
        "\n{} Recorded {} on {} ({})\n",
        "✓".green().bold(),
        activity_type.as_str().bold(),
        date,
        format_amount(activity.value()).cyan()
    );
    Ok(())
}

async fn activity_list(from: Option<&str>, to: Option<&str>, json_output: bool) -> Result<()> {
    let from = from.map(|raw| parse_date_arg(raw, "from date")).transpose()?;
    let to = to.map(|raw| parse_date_arg(raw, "to date")).transpose()?;

    let (conn, config) = open_store()?;
    let activities = db::list_activities(&conn, &config.profile, from, to)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&activities)?);
        return Ok(());
    }

    if activities.is_empty() {
        println!("\n{} No activities recorded\n", "ℹ".blue().bold());
        return Ok(());
    }

    #[derive(Tabled)]
    struct ActivityRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Type")]
        activity_type: String,
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Fee")]
        fee: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows: Vec<ActivityRow> = activities
        .iter()
        .map(|a| ActivityRow {
            date: a.date.to_string(),
            activity_type: a.activity_type.as_str().to_string(),
            symbol: a.symbol.clone().unwrap_or_else(|| "-".to_string()),
            quantity: a.quantity.to_string(),
            price: format_amount(a.unit_price),
            fee: format_amount(a.fee),
            value: format_amount(a.value()),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("\n{}", table);
    println!("\n{} {} activities\n", "✓".green().bold(), activities.len());

    Ok(())
}

pub async fn dispatch_valuation(action: ValuationCommands, json_output: bool) -> Result<()> {
    match action {
        ValuationCommands::Add {
            date,
            total_value,
            deposits,
            withdrawals,
        } => valuation_add(&date, &total_value, &deposits, &withdrawals, json_output).await,
        ValuationCommands::List { from, to } => {
            valuation_list(from.as_deref(), to.as_deref(), json_output).await
        }
    }
}

async fn valuation_add(
    date: &str,
    total_value: &str,
    deposits: &str,
    withdrawals: &str,
    json_output: bool,
) -> Result<()> {
    let valuation = Valuation {
        id: None,
        date: parse_date_arg(date, "date")?,
        total_value: parse_decimal_arg(total_value, "total value")?,
        deposits: parse_decimal_arg(deposits, "deposits")?,
        withdrawals: parse_decimal_arg(withdrawals, "withdrawals")?,
    };

    if valuation.deposits < Decimal::ZERO || valuation.withdrawals < Decimal::ZERO {
        bail!(EngineError::Validation(
            "deposits and withdrawals must not be negative".to_string()
        ));
    }

    let (conn, config) = open_store()?;
    db::upsert_valuation(&conn, &config.profile, &valuation)?;

    if json_output {
        println!("{}", serde_json::json!({ "date": valuation.date.to_string() }));
        return Ok(());
    }

    println!(
        "\n{} Valuation for {} saved ({})\n",
        "✓".green().bold(),
        valuation.date,
        format_amount(valuation.total_value).cyan()
    );
    Ok(())
}

async fn valuation_list(from: Option<&str>, to: Option<&str>, json_output: bool) -> Result<()> {
    let from = from.map(|raw| parse_date_arg(raw, "from date")).transpose()?;
    let to = to.map(|raw| parse_date_arg(raw, "to date")).transpose()?;

    let (conn, config) = open_store()?;
    let valuations = db::list_valuations(&conn, &config.profile, from, to)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&valuations)?);
        return Ok(());
    }

    if valuations.is_empty() {
        println!("\n{} No valuations recorded\n", "ℹ".blue().bold());
        return Ok(());
    }

    #[derive(Tabled)]
    struct ValuationRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Total Value")]
        total_value: String,
        #[tabled(rename = "Deposits")]
        deposits: String,
        #[tabled(rename = "Withdrawals")]
        withdrawals: String,
    }

    let rows: Vec<ValuationRow> = valuations
        .iter()
        .map(|v| ValuationRow {
            date: v.date.to_string(),
            total_value: format_amount(v.total_value),
            deposits: format_amount(v.deposits),
            withdrawals: format_amount(v.withdrawals),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("\n{}", table);
    println!();

    Ok(())
}

pub async fn dispatch_holdings(action: HoldingsCommands, json_output: bool) -> Result<()> {
    match action {
        HoldingsCommands::Set {
            symbol,
            class,
            sub_class,
            quantity,
            price,
            data_source,
            name,
        } => {
            holdings_set(
                &symbol,
                &class,
                &sub_class,
                &quantity,
                &price,
                &data_source,
                name.as_deref(),
                json_output,
            )
            .await
        }
        HoldingsCommands::List => holdings_list(json_output).await,
        HoldingsCommands::Remove {
            symbol,
            data_source,
        } => holdings_remove(&symbol, &data_source, json_output).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn holdings_set(
    symbol: &str,
    class: &str,
    sub_class: &str,
    quantity: &str,
    price: &str,
    data_source: &str,
    name: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let asset_class = parse_class_arg(class)?;
    let asset_sub_class = parse_sub_class_arg(sub_class, asset_class)?;
    let quantity = parse_decimal_arg(quantity, "quantity")?;
    let market_price = parse_decimal_arg(price, "price")?;

    if !asset_sub_class.is_valid_for(asset_class) {
        bail!(EngineError::Validation(format!(
            "{} is not a valid sub-class of {}",
            asset_sub_class.as_str(),
            asset_class.as_str()
        )));
    }

    let holding = Holding {
        symbol: symbol.to_string(),
        data_source: data_source.to_string(),
        name: name.map(|n| n.to_string()),
        asset_class,
        asset_sub_class,
        quantity,
        market_price,
        value: quantity * market_price,
    };

    let (conn, config) = open_store()?;
    db::upsert_holding(&conn, &config.profile, &holding)?;
    info!("Holding {} set to {} shares", symbol, quantity);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&holding)?);
        return Ok(());
    }

    println!(
        "\n{} {} -> {} shares @ {} ({})\n",
        "✓".green().bold(),
        symbol.bold(),
        quantity,
        format_amount(market_price),
        format_amount(holding.value).cyan()
    );
    Ok(())
}

async fn holdings_list(json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    let holdings = db::list_holdings(&conn, &config.profile)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&holdings)?);
        return Ok(());
    }

    if holdings.is_empty() {
        println!(
            "\n{} No holdings. Add one with: drift holdings set <symbol> <class> <sub-class> <qty> <price>\n",
            "ℹ".blue().bold()
        );
        return Ok(());
    }

    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Class")]
        class: String,
        #[tabled(rename = "Sub-class")]
        sub_class: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows: Vec<HoldingRow> = holdings
        .iter()
        .map(|h| HoldingRow {
            symbol: h.symbol.clone(),
            class: h.asset_class.as_str().to_string(),
            sub_class: h.asset_sub_class.as_str().to_string(),
            quantity: h.quantity.to_string(),
            price: format_amount(h.market_price),
            value: format_amount(h.value),
        })
        .collect();

    let total: Decimal = holdings.iter().map(|h| h.value).sum();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("\n{}", table);
    println!(
        "\n{} {}\n",
        "Total:".bold(),
        format_amount(total).cyan().bold()
    );

    Ok(())
}

async fn holdings_remove(symbol: &str, data_source: &str, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    db::delete_holding(&conn, &config.profile, data_source, symbol)?;

    if json_output {
        println!("{}", serde_json::json!({ "symbol": symbol, "deleted": true }));
        return Ok(());
    }

    println!("\n{} Removed {}\n", "✓".green().bold(), symbol);
    Ok(())
}
