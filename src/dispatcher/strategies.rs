//! Strategy, target, and exclusion command handlers

use colored::Colorize;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::info;

use crate::cli::{ExcludeCommands, StrategyCommands, TargetCommands};
use crate::db::models::Exclusion;
use crate::utils::format_percent;
use crate::{db, Result};

use super::{open_store, parse_class_arg, parse_decimal_arg, parse_sub_class_arg};

pub async fn dispatch_strategy(action: StrategyCommands, json_output: bool) -> Result<()> {
    match action {
        StrategyCommands::List => strategy_list(json_output).await,
        StrategyCommands::Show { id } => strategy_show(id, json_output).await,
        StrategyCommands::Create { name, threshold } => {
            strategy_create(&name, &threshold, json_output).await
        }
        StrategyCommands::Update {
            id,
            name,
            threshold,
        } => strategy_update(id, name.as_deref(), threshold.as_deref(), json_output).await,
        StrategyCommands::Activate { id } => strategy_activate(id, json_output).await,
        StrategyCommands::Delete { id } => strategy_delete(id, json_output).await,
    }
}

async fn strategy_list(json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    let strategies = db::list_strategies(&conn, &config.profile)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&strategies)?);
        return Ok(());
    }

    if strategies.is_empty() {
        println!(
            "\n{} No strategies yet. Create one with: drift strategy create <name>\n",
            "ℹ".blue().bold()
        );
        return Ok(());
    }

    #[derive(Tabled)]
    struct StrategyRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Active")]
        active: String,
        #[tabled(rename = "Threshold")]
        threshold: String,
        #[tabled(rename = "Classes")]
        classes: String,
    }

    let rows: Vec<StrategyRow> = strategies
        .iter()
        .map(|s| StrategyRow {
            id: s.id.unwrap_or_default().to_string(),
            name: s.name.clone(),
            active: if s.is_active { "✓".to_string() } else { String::new() },
            threshold: format_percent(s.drift_threshold),
            classes: s.class_targets.len().to_string(),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("\n{}", table);

    Ok(())
}

async fn strategy_show(id: i64, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    let strategy = db::get_strategy(&conn, &config.profile, id)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&strategy)?);
        return Ok(());
    }

    let active_marker = if strategy.is_active {
        " (active)".green().to_string()
    } else {
        String::new()
    };
    println!(
        "\n{} Strategy {}: {}{}",
        "🎯".cyan().bold(),
        strategy.id.unwrap_or_default(),
        strategy.name.bold(),
        active_marker
    );
    println!(
        "  Drift threshold: {}",
        format_percent(strategy.drift_threshold).cyan()
    );

    if strategy.class_targets.is_empty() {
        println!("\n  No targets yet. Add one with: drift target add-class {} <class> <percent>\n", id);
        return Ok(());
    }

    let total: Decimal = strategy
        .class_targets
        .iter()
        .map(|t| t.target_percent)
        .sum();

    println!();
    for target in &strategy.class_targets {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            target.asset_class.as_str().bold(),
            format_percent(target.target_percent).cyan()
        );
        for sub in &target.sub_targets {
            let of_total = target.target_percent * sub.target_percent / Decimal::ONE_HUNDRED;
            println!(
                "      {} {} of class ({} of total)",
                sub.asset_sub_class.as_str(),
                format_percent(sub.target_percent),
                format_percent(of_total).dimmed()
            );
        }
    }
    println!(
        "\n  {} {}\n",
        "Allocated:".bold(),
        format_percent(total).cyan()
    );

    Ok(())
}

async fn strategy_create(name: &str, threshold: &str, json_output: bool) -> Result<()> {
    let threshold = parse_decimal_arg(threshold, "drift threshold")?;

    let (conn, config) = open_store()?;
    let id = db::create_strategy(&conn, &config.profile, name, threshold)?;
    info!("Created strategy {} ({})", id, name);

    if json_output {
        println!("{}", serde_json::json!({ "id": id, "name": name }));
        return Ok(());
    }

    println!(
        "\n{} Created strategy {} ({})",
        "✓".green().bold(),
        id,
        name.bold()
    );
    println!("  Activate it with: drift strategy activate {}\n", id);
    Ok(())
}

async fn strategy_update(
    id: i64,
    name: Option<&str>,
    threshold: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let threshold = threshold
        .map(|t| parse_decimal_arg(t, "drift threshold"))
        .transpose()?;

    let (conn, config) = open_store()?;
    db::update_strategy(&conn, &config.profile, id, name, threshold)?;

    if json_output {
        println!("{}", serde_json::json!({ "id": id, "updated": true }));
        return Ok(());
    }

    println!("\n{} Strategy {} updated\n", "✓".green().bold(), id);
    Ok(())
}

async fn strategy_activate(id: i64, json_output: bool) -> Result<()> {
    let (mut conn, config) = open_store()?;
    db::activate_strategy(&mut conn, &config.profile, id)?;

    if json_output {
        println!("{}", serde_json::json!({ "id": id, "active": true }));
        return Ok(());
    }

    println!("\n{} Strategy {} is now active\n", "✓".green().bold(), id);
    Ok(())
}

async fn strategy_delete(id: i64, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;
    db::delete_strategy(&conn, &config.profile, id)?;

    if json_output {
        println!("{}", serde_json::json!({ "id": id, "deleted": true }));
        return Ok(());
    }

    println!("\n{} Strategy {} deleted\n", "✓".green().bold(), id);
    Ok(())
}

pub async fn dispatch_target(action: TargetCommands, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;

    match action {
        TargetCommands::AddClass {
            strategy,
            class,
            percent,
        } => {
            let class = parse_class_arg(&class)?;
            let percent = parse_decimal_arg(&percent, "target percent")?;
            db::create_class_target(&conn, &config.profile, strategy, class, percent)?;
            report_target_change(
                json_output,
                strategy,
                &format!("{} -> {}", class.as_str(), format_percent(percent)),
            );
        }
        TargetCommands::SetClass {
            strategy,
            class,
            percent,
        } => {
            let class = parse_class_arg(&class)?;
            let percent = parse_decimal_arg(&percent, "target percent")?;
            db::update_class_target(&conn, &config.profile, strategy, class, percent)?;
            report_target_change(
                json_output,
                strategy,
                &format!("{} -> {}", class.as_str(), format_percent(percent)),
            );
        }
        TargetCommands::RemoveClass { strategy, class } => {
            let class = parse_class_arg(&class)?;
            db::delete_class_target(&conn, &config.profile, strategy, class)?;
            report_target_change(json_output, strategy, &format!("removed {}", class.as_str()));
        }
        TargetCommands::AddSub {
            strategy,
            class,
            sub_class,
            percent,
        } => {
            let class = parse_class_arg(&class)?;
            let sub = parse_sub_class_arg(&sub_class, class)?;
            let percent = parse_decimal_arg(&percent, "target percent")?;
            db::create_sub_class_target(&conn, &config.profile, strategy, class, sub, percent)?;
            report_target_change(
                json_output,
                strategy,
                &format!(
                    "{}/{} -> {} of class",
                    class.as_str(),
                    sub.as_str(),
                    format_percent(percent)
                ),
            );
        }
        TargetCommands::SetSub {
            strategy,
            class,
            sub_class,
            percent,
        } => {
            let class = parse_class_arg(&class)?;
            let sub = parse_sub_class_arg(&sub_class, class)?;
            let percent = parse_decimal_arg(&percent, "target percent")?;
            db::update_sub_class_target(&conn, &config.profile, strategy, class, sub, percent)?;
            report_target_change(
                json_output,
                strategy,
                &format!(
                    "{}/{} -> {} of class",
                    class.as_str(),
                    sub.as_str(),
                    format_percent(percent)
                ),
            );
        }
        TargetCommands::RemoveSub {
            strategy,
            class,
            sub_class,
        } => {
            let class = parse_class_arg(&class)?;
            let sub = parse_sub_class_arg(&sub_class, class)?;
            db::delete_sub_class_target(&conn, &config.profile, strategy, class, sub)?;
            report_target_change(
                json_output,
                strategy,
                &format!("removed {}/{}", class.as_str(), sub.as_str()),
            );
        }
    }

    Ok(())
}

fn report_target_change(json_output: bool, strategy: i64, change: &str) {
    if json_output {
        println!(
            "{}",
            serde_json::json!({ "strategy": strategy, "change": change })
        );
    } else {
        println!("\n{} {}\n", "✓".green().bold(), change);
    }
}

pub async fn dispatch_exclude(action: ExcludeCommands, json_output: bool) -> Result<()> {
    let (conn, config) = open_store()?;

    match action {
        ExcludeCommands::Add {
            strategy,
            symbol,
            data_source,
            exclude_from_calculation,
            never_sell,
            reason,
        } => {
            let exclusion = Exclusion {
                id: None,
                strategy_id: strategy,
                symbol: symbol.clone(),
                data_source,
                exclude_from_calculation,
                never_sell,
                reason,
            };
            db::upsert_exclusion(&conn, &config.profile, &exclusion)?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&exclusion)?);
            } else {
                println!(
                    "\n{} Exclusion saved for {} (exclude: {}, never-sell: {})\n",
                    "✓".green().bold(),
                    symbol.bold(),
                    exclude_from_calculation,
                    never_sell
                );
            }
        }
        ExcludeCommands::Remove {
            strategy,
            symbol,
            data_source,
        } => {
            db::delete_exclusion(&conn, &config.profile, strategy, &data_source, &symbol)?;

            if json_output {
                println!(
                    "{}",
                    serde_json::json!({ "symbol": symbol, "deleted": true })
                );
            } else {
                println!("\n{} Exclusion removed for {}\n", "✓".green().bold(), symbol);
            }
        }
        ExcludeCommands::List { strategy } => {
            let exclusions = db::list_exclusions(&conn, &config.profile, strategy)?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&exclusions)?);
                return Ok(());
            }

            if exclusions.is_empty() {
                println!("\n{} No exclusions\n", "ℹ".blue().bold());
                return Ok(());
            }

            #[derive(Tabled)]
            struct ExclusionRow {
                #[tabled(rename = "Strategy")]
                strategy: String,
                #[tabled(rename = "Symbol")]
                symbol: String,
                #[tabled(rename = "Source")]
                source: String,
                #[tabled(rename = "Excluded")]
                excluded: String,
                #[tabled(rename = "Never Sell")]
                never_sell: String,
                #[tabled(rename = "Reason")]
                reason: String,
            }

            let rows: Vec<ExclusionRow> = exclusions
                .iter()
                .map(|e| ExclusionRow {
                    strategy: e.strategy_id.to_string(),
                    symbol: e.symbol.clone(),
                    source: e.data_source.clone(),
                    excluded: if e.exclude_from_calculation { "✓" } else { "" }.to_string(),
                    never_sell: if e.never_sell { "✓" } else { "" }.to_string(),
                    reason: e.reason.clone().unwrap_or_default(),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("\n{}", table);
        }
    }

    Ok(())
}
