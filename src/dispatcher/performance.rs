//! Portfolio and holding performance handlers

use anyhow::bail;
use colored::Colorize;
use rust_decimal::Decimal;
use tracing::info;

use crate::cli::{HoldingCommands, PerformanceCommands};
use crate::engine;
use crate::error::EngineError;
use crate::utils::{format_amount, format_rate, format_signed_percent};
use crate::{db, Result};

use super::{open_store, parse_date_arg, parse_decimal_arg};

pub async fn dispatch_performance(action: PerformanceCommands, json_output: bool) -> Result<()> {
    match action {
        PerformanceCommands::Show { from, to } => {
            performance_show(from.as_deref(), to.as_deref(), json_output).await
        }
    }
}

async fn performance_show(from: Option<&str>, to: Option<&str>, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;

    let activities = db::list_activities(&conn, &config.profile, None, None)?;
    let valuations = db::list_valuations(&conn, &config.profile, None, None)?;

    if activities.is_empty() && valuations.is_empty() {
        if json_output {
            println!("{}", serde_json::json!({ "empty": true }));
        } else {
            println!(
                "\n{} No recorded activities or valuations yet\n",
                "ℹ".blue().bold()
            );
        }
        return Ok(());
    }

    // Window defaults: earliest record through the latest valuation (or the
    // latest activity when no valuations exist)
    let earliest_record = activities
        .first()
        .map(|a| a.date)
        .into_iter()
        .chain(valuations.first().map(|v| v.date))
        .min();
    let latest_record = activities
        .last()
        .map(|a| a.date)
        .into_iter()
        .chain(valuations.last().map(|v| v.date))
        .max();

    let start = match from {
        Some(raw) => parse_date_arg(raw, "from date")?,
        None => earliest_record.expect("non-empty records"),
    };
    let end = match to {
        Some(raw) => parse_date_arg(raw, "to date")?,
        None => latest_record.expect("non-empty records"),
    };
    if start > end {
        bail!(EngineError::Validation(format!(
            "from date {} is after to date {}",
            start, end
        )));
    }

    // Terminal value: last valuation inside the window
    let current_value = valuations
        .iter()
        .filter(|v| v.date >= start && v.date <= end)
        .last()
        .map(|v| v.total_value)
        .unwrap_or(Decimal::ZERO);

    info!(
        "Computing performance {} -> {} over {} activities, {} valuations",
        start,
        end,
        activities.len(),
        valuations.len()
    );

    let perf = engine::calculate_performance(&activities, &valuations, start, end, current_value);

    if json_output {
        let payload = serde_json::json!({
            "start": perf.start.to_string(),
            "end": perf.end.to_string(),
            "current_value": perf.current_value.to_string(),
            "irr": perf.irr.irr,
            "irr_annualized": perf.irr.irr_annualized,
            "irr_converged": perf.irr.converged,
            "ttwror": perf.ttwror.ttwror.to_string(),
            "ttwror_annualized": perf.ttwror.ttwror_annualized,
            "capital_gains": perf.capital_gains.to_string(),
            "dividends": perf.dividends.to_string(),
            "interest": perf.interest.to_string(),
            "fees": perf.fees.to_string(),
            "taxes": perf.taxes.to_string(),
            "absolute_perf": perf.absolute_perf.to_string(),
            "absolute_perf_percent": perf.absolute_perf_percent.to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "\n{} Performance {} -> {}\n",
        "📈".cyan().bold(),
        start,
        end
    );
    println!(
        "  Portfolio value:    {}",
        format_amount(perf.current_value).cyan().bold()
    );

    match perf.irr.irr {
        Some(irr) => {
            let annotation = if perf.irr.converged {
                String::new()
            } else {
                " (did not converge; best effort)".yellow().to_string()
            };
            println!(
                "  IRR:                {} ({} annualized){}",
                format_rate(irr).cyan(),
                format_rate(perf.irr.irr_annualized.unwrap_or(0.0)),
                annotation
            );
        }
        None => println!("  IRR:                {}", "n/a".dimmed()),
    }

    let ttwror_pct = perf.ttwror.ttwror * Decimal::ONE_HUNDRED;
    println!(
        "  TTWROR:             {} ({} annualized)",
        format_signed_percent(ttwror_pct).cyan(),
        format_rate(perf.ttwror.ttwror_annualized)
    );

    println!();
    println!(
        "  Realized gains:     {}",
        format_amount(perf.capital_gains).green()
    );
    println!(
        "  Dividends:          {}",
        format_amount(perf.dividends).green()
    );
    if perf.interest > Decimal::ZERO {
        println!(
            "  Interest:           {}",
            format_amount(perf.interest).green()
        );
    }
    println!("  Fees:               {}", format_amount(perf.fees).red());
    if perf.taxes > Decimal::ZERO {
        println!("  Taxes:              {}", format_amount(perf.taxes).red());
    }

    let perf_str = if perf.absolute_perf >= Decimal::ZERO {
        format_amount(perf.absolute_perf).green().bold()
    } else {
        format_amount(perf.absolute_perf).red().bold()
    };
    println!(
        "\n  {} {} ({})\n",
        "Absolute:".bold(),
        perf_str,
        format_signed_percent(perf.absolute_perf_percent)
    );

    Ok(())
}

pub async fn dispatch_holding(action: HoldingCommands, json_output: bool) -> Result<()> {
    match action {
        HoldingCommands::Show { symbol, price } => {
            holding_show(&symbol, price.as_deref(), json_output).await
        }
    }
}

async fn holding_show(symbol: &str, price: Option<&str>, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;

    let activities = db::list_activities(&conn, &config.profile, None, None)?;
    let has_activity = activities
        .iter()
        .any(|a| a.symbol.as_deref() == Some(symbol));
    if !has_activity {
        bail!(EngineError::NotFound(format!("no activities for {}", symbol)));
    }

    // Price precedence: explicit flag, then the holdings snapshot
    let current_price = match price {
        Some(raw) => parse_decimal_arg(raw, "price")?,
        None => db::list_holdings(&conn, &config.profile)?
            .iter()
            .find(|h| h.symbol == symbol)
            .map(|h| h.market_price)
            .unwrap_or(Decimal::ZERO),
    };

    let end = chrono::Local::now().date_naive();
    let holding = engine::calculate_holding_performance(
        symbol,
        &activities,
        current_price,
        end,
        config.long_term_days,
    );

    if json_output {
        let payload = serde_json::json!({
            "symbol": holding.symbol,
            "current_price": current_price.to_string(),
            "total_shares": holding.cost_basis.total_shares.to_string(),
            "total_cost_basis": holding.cost_basis.total_cost_basis.to_string(),
            "average_cost": holding.cost_basis.average_cost.to_string(),
            "unrealized_gain": holding.cost_basis.unrealized_gain.to_string(),
            "unrealized_gain_percent": holding.cost_basis.unrealized_gain_percent.to_string(),
            "realized_gain": holding.realized_gain.to_string(),
            "dividends": holding.dividends.to_string(),
            "irr": holding.irr.irr,
            "irr_annualized": holding.irr.irr_annualized,
            "oldest_holding_days": holding.oldest_holding_days,
            "is_long_term": holding.is_long_term,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("\n{} {}\n", "💼".cyan().bold(), symbol.bold());
    println!(
        "  Shares held:      {}",
        holding.cost_basis.total_shares.to_string().cyan()
    );
    println!(
        "  Cost basis:       {} (avg {})",
        format_amount(holding.cost_basis.total_cost_basis).cyan(),
        format_amount(holding.cost_basis.average_cost)
    );

    let unrealized_str = if holding.cost_basis.unrealized_gain >= Decimal::ZERO {
        format_amount(holding.cost_basis.unrealized_gain).green()
    } else {
        format_amount(holding.cost_basis.unrealized_gain).red()
    };
    println!(
        "  Unrealized:       {} ({})",
        unrealized_str,
        format_signed_percent(holding.cost_basis.unrealized_gain_percent)
    );
    println!(
        "  Realized:         {}",
        format_amount(holding.realized_gain).green()
    );
    if holding.dividends > Decimal::ZERO {
        println!(
            "  Dividends:        {}",
            format_amount(holding.dividends).green()
        );
    }

    match holding.irr.irr {
        Some(irr) => println!(
            "  IRR:              {} ({} annualized)",
            format_rate(irr).cyan(),
            format_rate(holding.irr.irr_annualized.unwrap_or(0.0))
        ),
        None => println!("  IRR:              {}", "n/a".dimmed()),
    }

    if let Some(days) = holding.oldest_holding_days {
        let flag = if holding.is_long_term {
            "long-term".green().to_string()
        } else {
            "short-term".yellow().to_string()
        };
        println!("  Holding period:   {} days ({})", days, flag);
    }
    println!();

    Ok(())
}
