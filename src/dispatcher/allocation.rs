//! Allocation analysis, suggestion, and drift summary handlers

use anyhow::bail;
use colored::Colorize;
use rusqlite::Connection;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::info;

use crate::allocation::summary::build_summary;
use crate::allocation::suggestions::{self, SuggestionAction};
use crate::allocation::{analyze, AllocationAnalysis, DriftStatus};
use crate::cli::AllocationCommands;
use crate::config::Config;
use crate::db::models::Strategy;
use crate::error::EngineError;
use crate::utils::{format_amount, format_percent, format_signed_percent};
use crate::{db, Result};

use super::open_store;

pub async fn dispatch_allocation(action: AllocationCommands, json_output: bool) -> Result<()> {
    match action {
        AllocationCommands::Show { strategy } => allocation_show(strategy, json_output).await,
        AllocationCommands::Suggest { strategy } => allocation_suggest(strategy, json_output).await,
        AllocationCommands::Drift => allocation_drift(json_output).await,
    }
}

/// Resolve the requested strategy, falling back to the active one
fn resolve_strategy(
    conn: &Connection,
    config: &Config,
    strategy_id: Option<i64>,
) -> Result<Strategy> {
    match strategy_id {
        Some(id) => db::get_strategy(conn, &config.profile, id),
        None => match db::get_active_strategy(conn, &config.profile)? {
            Some(strategy) => Ok(strategy),
            None => bail!(EngineError::NoActiveStrategy),
        },
    }
}

fn run_analysis(
    conn: &Connection,
    config: &Config,
    strategy_id: Option<i64>,
) -> Result<AllocationAnalysis> {
    let strategy = resolve_strategy(conn, config, strategy_id)?;
    let holdings = db::list_holdings(conn, &config.profile)?;
    let exclusions =
        db::list_exclusions(conn, &config.profile, strategy.id)?;

    info!(
        "Analyzing {} holdings against strategy '{}'",
        holdings.len(),
        strategy.name
    );
    Ok(analyze(&strategy, &holdings, &exclusions))
}

fn status_cell(status: DriftStatus) -> String {
    match status {
        DriftStatus::Ok => status.as_str().green().to_string(),
        DriftStatus::Warning => status.as_str().yellow().to_string(),
        DriftStatus::Critical => status.as_str().red().bold().to_string(),
    }
}

async fn allocation_show(strategy_id: Option<i64>, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    let analysis = run_analysis(&conn, &config, strategy_id)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!(
        "\n{} Allocation vs '{}' (threshold {})\n",
        "📊".cyan().bold(),
        analysis.strategy_name.bold(),
        format_percent(analysis.drift_threshold)
    );
    println!(
        "  Portfolio value: {}",
        format_amount(analysis.portfolio_value).cyan()
    );
    if analysis.excluded_value > rust_decimal::Decimal::ZERO {
        println!(
            "  Excluded value:  {}",
            format_amount(analysis.excluded_value).dimmed()
        );
    }
    println!();

    #[derive(Tabled)]
    struct AllocationRow {
        #[tabled(rename = "Class / Sub-class")]
        name: String,
        #[tabled(rename = "Target")]
        target: String,
        #[tabled(rename = "Actual")]
        actual: String,
        #[tabled(rename = "Drift")]
        drift: String,
        #[tabled(rename = "Drift Value")]
        drift_value: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let mut rows = Vec::new();
    for class in &analysis.classes {
        rows.push(AllocationRow {
            name: class.asset_class.as_str().to_string(),
            target: format_percent(class.target_percent),
            actual: format_percent(class.actual_percent),
            drift: format_signed_percent(class.drift_percent),
            drift_value: format_amount(class.drift_value),
            status: status_cell(class.status),
        });
        for sub in &class.sub_classes {
            rows.push(AllocationRow {
                name: format!("  {}", sub.asset_sub_class.as_str()),
                target: format_percent(sub.target_percent_of_total),
                actual: format_percent(sub.actual_percent_of_total),
                drift: format_signed_percent(sub.drift_percent),
                drift_value: format_amount(sub.drift_value),
                status: status_cell(sub.status),
            });
        }
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..5)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    println!(
        "\n  {} max drift {} -> {}\n",
        "Overall:".bold(),
        format_percent(analysis.max_drift),
        status_cell(analysis.overall_status)
    );

    Ok(())
}

async fn allocation_suggest(strategy_id: Option<i64>, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    let strategy = resolve_strategy(&conn, &config, strategy_id)?;
    let holdings = db::list_holdings(&conn, &config.profile)?;
    let exclusions = db::list_exclusions(&conn, &config.profile, strategy.id)?;

    let analysis = analyze(&strategy, &holdings, &exclusions);
    let suggestions = suggestions::generate(&analysis, &holdings, &exclusions);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    if suggestions.is_empty() {
        println!(
            "\n{} Portfolio is within target bands; nothing to rebalance\n",
            "✓".green().bold()
        );
        return Ok(());
    }

    println!(
        "\n{} Rebalancing suggestions for '{}'\n",
        "⚖".cyan().bold(),
        analysis.strategy_name.bold()
    );

    #[derive(Tabled)]
    struct SuggestionRow {
        #[tabled(rename = "#")]
        priority: String,
        #[tabled(rename = "Action")]
        action: String,
        #[tabled(rename = "Class / Sub-class")]
        category: String,
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Shares")]
        shares: String,
    }

    let rows: Vec<SuggestionRow> = suggestions
        .iter()
        .map(|s| SuggestionRow {
            priority: s.priority.to_string(),
            action: match s.action {
                SuggestionAction::Sell => s.action.as_str().red().to_string(),
                SuggestionAction::Buy => s.action.as_str().green().to_string(),
            },
            category: format!("{}/{}", s.asset_class.as_str(), s.asset_sub_class.as_str()),
            symbol: s.symbol.clone().unwrap_or_else(|| "(your choice)".to_string()),
            amount: format_amount(s.suggested_amount),
            shares: s
                .suggested_shares
                .map(|sh| sh.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    println!();
    for suggestion in &suggestions {
        println!("  {}. {}", suggestion.priority, suggestion.reason.dimmed());
    }
    println!();

    Ok(())
}

async fn allocation_drift(json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;

    let analysis = match db::get_active_strategy(&conn, &config.profile)? {
        Some(strategy) => {
            let holdings = db::list_holdings(&conn, &config.profile)?;
            let exclusions = db::list_exclusions(&conn, &config.profile, strategy.id)?;
            Some(analyze(&strategy, &holdings, &exclusions))
        }
        None => None,
    };
    let summary = build_summary(analysis.as_ref(), config.default_drift_threshold);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if !summary.has_active_strategy {
        println!(
            "\n{} No active strategy. Activate one with: drift strategy activate <id>\n",
            "ℹ".blue().bold()
        );
        return Ok(());
    }

    let status = match summary.overall_status {
        crate::allocation::summary::SummaryStatus::Ok => {
            summary.overall_status.as_str().green().to_string()
        }
        crate::allocation::summary::SummaryStatus::Warning => {
            summary.overall_status.as_str().yellow().to_string()
        }
        _ => summary.overall_status.as_str().red().bold().to_string(),
    };

    println!("\n{} Drift summary: {}", "🧭".cyan().bold(), status);
    println!(
        "  Max drift {} against threshold {}",
        format_percent(summary.max_drift),
        format_percent(summary.drift_threshold)
    );

    if summary.categories_over_threshold.is_empty() {
        println!("  All classes within threshold\n");
    } else {
        println!("  Over threshold:");
        for category in &summary.categories_over_threshold {
            println!(
                "    {} {} ({})",
                category.name.bold(),
                format_signed_percent(category.drift_percent),
                category.direction.as_str()
            );
        }
        println!();
    }

    Ok(())
}
