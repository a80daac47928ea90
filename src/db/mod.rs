//! SQLite-backed persistence for strategies, targets, exclusions, and the
//! recorded activity/valuation/holding streams.
//!
//! All rows are user-scoped. Decimal columns are TEXT so money never passes
//! through floating point; dates rely on rusqlite's chrono support.

pub mod models;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::allocation::validation;
use crate::error::EngineError;
use models::{
    Activity, ActivityType, AssetClass, AssetClassTarget, AssetSubClass, AssetSubClassTarget,
    Exclusion, Holding, Strategy, Valuation,
};

const SCHEMA: &str = include_str!("schema.sql");

/// Get the default database path (~/.drift/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let drift_dir = PathBuf::from(home).join(".drift");

    std::fs::create_dir_all(&drift_dir).context("Failed to create .drift directory")?;

    Ok(drift_dir.join("data.db"))
}

/// Create the database file (if needed) and apply the schema
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = Connection::open(&path).context("Failed to open database")?;
    conn.execute_batch(SCHEMA)
        .context("Failed to apply database schema")?;

    Ok(())
}

/// Open a connection with foreign keys enforced
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(p) => p,
        None => get_default_db_path()?,
    };

    let conn = Connection::open(&path).context("Failed to open database")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(conn)
}

/// In-memory database with the schema applied; used by tests
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn parse_decimal(s: &str) -> Decimal {
    s.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

fn conversion_error(what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unknown {}: {}", what, raw).into(),
    )
}

// ============ Strategies ============

pub fn create_strategy(
    conn: &Connection,
    user_id: &str,
    name: &str,
    drift_threshold: Decimal,
) -> Result<i64> {
    validation::validate_threshold(drift_threshold)?;

    conn.execute(
        "INSERT INTO strategies (user_id, name, is_active, drift_threshold, created_at)
         VALUES (?1, ?2, 0, ?3, ?4)",
        params![
            user_id,
            name,
            drift_threshold.to_string(),
            Utc::now().to_rfc3339()
        ],
    )
    .with_context(|| format!("Failed to create strategy '{}'", name))?;

    Ok(conn.last_insert_rowid())
}

pub fn list_strategies(conn: &Connection, user_id: &str) -> Result<Vec<Strategy>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, is_active, drift_threshold, created_at
         FROM strategies WHERE user_id = ?1 ORDER BY id",
    )?;

    let rows = stmt
        .query_map([user_id], map_strategy_row)?
        .collect::<rusqlite::Result<Vec<Strategy>>>()?;

    rows.into_iter()
        .map(|mut strategy| {
            strategy.class_targets = load_class_targets(conn, strategy.id.unwrap_or_default())?;
            Ok(strategy)
        })
        .collect()
}

pub fn get_strategy(conn: &Connection, user_id: &str, strategy_id: i64) -> Result<Strategy> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, is_active, drift_threshold, created_at
         FROM strategies WHERE user_id = ?1 AND id = ?2",
    )?;

    let strategy = stmt
        .query_row(params![user_id, strategy_id], map_strategy_row)
        .optional()?;

    match strategy {
        Some(mut strategy) => {
            strategy.class_targets = load_class_targets(conn, strategy_id)?;
            Ok(strategy)
        }
        None => Err(EngineError::NotFound(format!("strategy {}", strategy_id)).into()),
    }
}

pub fn get_active_strategy(conn: &Connection, user_id: &str) -> Result<Option<Strategy>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, is_active, drift_threshold, created_at
         FROM strategies WHERE user_id = ?1 AND is_active = 1",
    )?;

    let strategy = stmt.query_row([user_id], map_strategy_row).optional()?;

    match strategy {
        Some(mut strategy) => {
            strategy.class_targets = load_class_targets(conn, strategy.id.unwrap_or_default())?;
            Ok(Some(strategy))
        }
        None => Ok(None),
    }
}

pub fn update_strategy(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    name: Option<&str>,
    drift_threshold: Option<Decimal>,
) -> Result<()> {
    // Existence check doubles as the ownership check
    let current = get_strategy(conn, user_id, strategy_id)?;

    if let Some(threshold) = drift_threshold {
        validation::validate_threshold(threshold)?;
    }

    let new_name = name.unwrap_or(&current.name);
    let new_threshold = drift_threshold.unwrap_or(current.drift_threshold);

    conn.execute(
        "UPDATE strategies SET name = ?1, drift_threshold = ?2 WHERE id = ?3 AND user_id = ?4",
        params![new_name, new_threshold.to_string(), strategy_id, user_id],
    )?;

    Ok(())
}

pub fn delete_strategy(conn: &Connection, user_id: &str, strategy_id: i64) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM strategies WHERE id = ?1 AND user_id = ?2",
        params![strategy_id, user_id],
    )?;

    if deleted == 0 {
        return Err(EngineError::NotFound(format!("strategy {}", strategy_id)).into());
    }
    Ok(())
}

/// Make one strategy active; any previously active strategy for the user is
/// deactivated in the same transaction.
pub fn activate_strategy(conn: &mut Connection, user_id: &str, strategy_id: i64) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "UPDATE strategies SET is_active = 0 WHERE user_id = ?1",
        [user_id],
    )?;
    let updated = tx.execute(
        "UPDATE strategies SET is_active = 1 WHERE id = ?1 AND user_id = ?2",
        params![strategy_id, user_id],
    )?;

    if updated == 0 {
        return Err(EngineError::NotFound(format!("strategy {}", strategy_id)).into());
    }

    tx.commit()?;
    info!("Activated strategy {}", strategy_id);
    Ok(())
}

fn map_strategy_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Strategy> {
    let threshold: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(Strategy {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        name: row.get(2)?,
        is_active: row.get::<_, i64>(3)? != 0,
        drift_threshold: parse_decimal(&threshold),
        class_targets: Vec::new(),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn load_class_targets(conn: &Connection, strategy_id: i64) -> Result<Vec<AssetClassTarget>> {
    let mut stmt = conn.prepare(
        "SELECT id, asset_class, target_percent FROM class_targets
         WHERE strategy_id = ?1 ORDER BY id",
    )?;

    let targets = stmt
        .query_map([strategy_id], |row| {
            let class_raw: String = row.get(1)?;
            let percent: String = row.get(2)?;
            Ok(AssetClassTarget {
                id: Some(row.get(0)?),
                asset_class: AssetClass::from_str(&class_raw)
                    .map_err(|_| conversion_error("asset class", &class_raw))?,
                target_percent: parse_decimal(&percent),
                sub_targets: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<AssetClassTarget>>>()?;

    targets
        .into_iter()
        .map(|mut target| {
            target.sub_targets = load_sub_targets(conn, target.id.unwrap_or_default())?;
            Ok(target)
        })
        .collect()
}

fn load_sub_targets(conn: &Connection, class_target_id: i64) -> Result<Vec<AssetSubClassTarget>> {
    let mut stmt = conn.prepare(
        "SELECT id, asset_sub_class, target_percent FROM sub_class_targets
         WHERE class_target_id = ?1 ORDER BY id",
    )?;

    let targets = stmt
        .query_map([class_target_id], |row| {
            let sub_raw: String = row.get(1)?;
            let percent: String = row.get(2)?;
            Ok(AssetSubClassTarget {
                id: Some(row.get(0)?),
                asset_sub_class: AssetSubClass::from_str(&sub_raw)
                    .map_err(|_| conversion_error("asset sub-class", &sub_raw))?,
                target_percent: parse_decimal(&percent),
            })
        })?
        .collect::<rusqlite::Result<Vec<AssetSubClassTarget>>>()?;

    Ok(targets)
}

// ============ Class targets ============

pub fn create_class_target(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    asset_class: AssetClass,
    target_percent: Decimal,
) -> Result<i64> {
    let strategy = get_strategy(conn, user_id, strategy_id)?;
    validation::validate_class_target(&strategy, asset_class, target_percent, None)?;

    conn.execute(
        "INSERT INTO class_targets (strategy_id, asset_class, target_percent)
         VALUES (?1, ?2, ?3)",
        params![strategy_id, asset_class.as_str(), target_percent.to_string()],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn update_class_target(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    asset_class: AssetClass,
    target_percent: Decimal,
) -> Result<()> {
    let strategy = get_strategy(conn, user_id, strategy_id)?;
    let existing = strategy
        .class_targets
        .iter()
        .find(|t| t.asset_class == asset_class)
        .ok_or_else(|| {
            EngineError::NotFound(format!("class target {}", asset_class.as_str()))
        })?;

    validation::validate_class_target(&strategy, asset_class, target_percent, existing.id)?;

    conn.execute(
        "UPDATE class_targets SET target_percent = ?1 WHERE id = ?2",
        params![target_percent.to_string(), existing.id],
    )?;

    Ok(())
}

pub fn delete_class_target(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    asset_class: AssetClass,
) -> Result<()> {
    // Scope check before the delete
    get_strategy(conn, user_id, strategy_id)?;

    let deleted = conn.execute(
        "DELETE FROM class_targets WHERE strategy_id = ?1 AND asset_class = ?2",
        params![strategy_id, asset_class.as_str()],
    )?;

    if deleted == 0 {
        return Err(
            EngineError::NotFound(format!("class target {}", asset_class.as_str())).into(),
        );
    }
    Ok(())
}

// ============ Sub-class targets ============

pub fn create_sub_class_target(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    asset_class: AssetClass,
    asset_sub_class: AssetSubClass,
    target_percent: Decimal,
) -> Result<i64> {
    let strategy = get_strategy(conn, user_id, strategy_id)?;
    let class_target = strategy
        .class_targets
        .iter()
        .find(|t| t.asset_class == asset_class)
        .ok_or_else(|| {
            EngineError::NotFound(format!("class target {}", asset_class.as_str()))
        })?;

    validation::validate_sub_class_target(class_target, asset_sub_class, target_percent, None)?;

    conn.execute(
        "INSERT INTO sub_class_targets (class_target_id, asset_sub_class, target_percent)
         VALUES (?1, ?2, ?3)",
        params![
            class_target.id,
            asset_sub_class.as_str(),
            target_percent.to_string()
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn update_sub_class_target(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    asset_class: AssetClass,
    asset_sub_class: AssetSubClass,
    target_percent: Decimal,
) -> Result<()> {
    let strategy = get_strategy(conn, user_id, strategy_id)?;
    let class_target = strategy
        .class_targets
        .iter()
        .find(|t| t.asset_class == asset_class)
        .ok_or_else(|| {
            EngineError::NotFound(format!("class target {}", asset_class.as_str()))
        })?;
    let existing = class_target
        .sub_targets
        .iter()
        .find(|t| t.asset_sub_class == asset_sub_class)
        .ok_or_else(|| {
            EngineError::NotFound(format!("sub-class target {}", asset_sub_class.as_str()))
        })?;

    validation::validate_sub_class_target(
        class_target,
        asset_sub_class,
        target_percent,
        existing.id,
    )?;

    conn.execute(
        "UPDATE sub_class_targets SET target_percent = ?1 WHERE id = ?2",
        params![target_percent.to_string(), existing.id],
    )?;

    Ok(())
}

pub fn delete_sub_class_target(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    asset_class: AssetClass,
    asset_sub_class: AssetSubClass,
) -> Result<()> {
    let strategy = get_strategy(conn, user_id, strategy_id)?;
    let class_target = strategy
        .class_targets
        .iter()
        .find(|t| t.asset_class == asset_class)
        .ok_or_else(|| {
            EngineError::NotFound(format!("class target {}", asset_class.as_str()))
        })?;

    let deleted = conn.execute(
        "DELETE FROM sub_class_targets WHERE class_target_id = ?1 AND asset_sub_class = ?2",
        params![class_target.id, asset_sub_class.as_str()],
    )?;

    if deleted == 0 {
        return Err(EngineError::NotFound(format!(
            "sub-class target {}",
            asset_sub_class.as_str()
        ))
        .into());
    }
    Ok(())
}

// ============ Exclusions ============

pub fn list_exclusions(
    conn: &Connection,
    user_id: &str,
    strategy_id: Option<i64>,
) -> Result<Vec<Exclusion>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.strategy_id, e.symbol, e.data_source,
                e.exclude_from_calculation, e.never_sell, e.reason
         FROM exclusions e
         JOIN strategies s ON s.id = e.strategy_id
         WHERE s.user_id = ?1 AND (?2 IS NULL OR e.strategy_id = ?2)
         ORDER BY e.id",
    )?;

    let exclusions = stmt
        .query_map(params![user_id, strategy_id], |row| {
            Ok(Exclusion {
                id: Some(row.get(0)?),
                strategy_id: row.get(1)?,
                symbol: row.get(2)?,
                data_source: row.get(3)?,
                exclude_from_calculation: row.get::<_, i64>(4)? != 0,
                never_sell: row.get::<_, i64>(5)? != 0,
                reason: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Exclusion>>>()?;

    Ok(exclusions)
}

pub fn upsert_exclusion(conn: &Connection, user_id: &str, exclusion: &Exclusion) -> Result<i64> {
    // The strategy must exist and belong to the user
    get_strategy(conn, user_id, exclusion.strategy_id)?;

    conn.execute(
        "INSERT INTO exclusions
             (strategy_id, symbol, data_source, exclude_from_calculation, never_sell, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(strategy_id, data_source, symbol) DO UPDATE SET
             exclude_from_calculation = excluded.exclude_from_calculation,
             never_sell = excluded.never_sell,
             reason = excluded.reason",
        params![
            exclusion.strategy_id,
            exclusion.symbol,
            exclusion.data_source,
            exclusion.exclude_from_calculation as i64,
            exclusion.never_sell as i64,
            exclusion.reason,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn delete_exclusion(
    conn: &Connection,
    user_id: &str,
    strategy_id: i64,
    data_source: &str,
    symbol: &str,
) -> Result<()> {
    get_strategy(conn, user_id, strategy_id)?;

    let deleted = conn.execute(
        "DELETE FROM exclusions
         WHERE strategy_id = ?1 AND data_source = ?2 AND symbol = ?3",
        params![strategy_id, data_source, symbol],
    )?;

    if deleted == 0 {
        return Err(EngineError::NotFound(format!("exclusion {}", symbol)).into());
    }
    Ok(())
}

// ============ Activities ============

pub fn insert_activity(conn: &Connection, user_id: &str, activity: &Activity) -> Result<i64> {
    conn.execute(
        "INSERT INTO activities
             (user_id, activity_type, date, symbol, quantity, unit_price, fee,
              value_override, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user_id,
            activity.activity_type.as_str(),
            activity.date,
            activity.symbol,
            activity.quantity.to_string(),
            activity.unit_price.to_string(),
            activity.fee.to_string(),
            activity.value_override.map(|v| v.to_string()),
            activity.created_at.to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn list_activities(
    conn: &Connection,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<Activity>> {
    let mut stmt = conn.prepare(
        "SELECT id, activity_type, date, symbol, quantity, unit_price, fee,
                value_override, created_at
         FROM activities
         WHERE user_id = ?1
           AND (?2 IS NULL OR date >= ?2)
           AND (?3 IS NULL OR date <= ?3)
         ORDER BY date, id",
    )?;

    let activities = stmt
        .query_map(params![user_id, from, to], |row| {
            let type_raw: String = row.get(1)?;
            let quantity: String = row.get(4)?;
            let unit_price: String = row.get(5)?;
            let fee: String = row.get(6)?;
            let value_override: Option<String> = row.get(7)?;
            let created_at: String = row.get(8)?;
            Ok(Activity {
                id: Some(row.get(0)?),
                activity_type: ActivityType::from_str(&type_raw)
                    .map_err(|_| conversion_error("activity type", &type_raw))?,
                date: row.get(2)?,
                symbol: row.get(3)?,
                quantity: parse_decimal(&quantity),
                unit_price: parse_decimal(&unit_price),
                fee: parse_decimal(&fee),
                value_override: value_override.as_deref().map(parse_decimal),
                created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?
        .collect::<rusqlite::Result<Vec<Activity>>>()?;

    Ok(activities)
}

// ============ Valuations ============

pub fn upsert_valuation(conn: &Connection, user_id: &str, valuation: &Valuation) -> Result<()> {
    conn.execute(
        "INSERT INTO valuations (user_id, date, total_value, deposits, withdrawals)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, date) DO UPDATE SET
             total_value = excluded.total_value,
             deposits = excluded.deposits,
             withdrawals = excluded.withdrawals",
        params![
            user_id,
            valuation.date,
            valuation.total_value.to_string(),
            valuation.deposits.to_string(),
            valuation.withdrawals.to_string(),
        ],
    )?;

    Ok(())
}

pub fn list_valuations(
    conn: &Connection,
    user_id: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<Valuation>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, total_value, deposits, withdrawals
         FROM valuations
         WHERE user_id = ?1
           AND (?2 IS NULL OR date >= ?2)
           AND (?3 IS NULL OR date <= ?3)
         ORDER BY date",
    )?;

    let valuations = stmt
        .query_map(params![user_id, from, to], |row| {
            let total_value: String = row.get(2)?;
            let deposits: String = row.get(3)?;
            let withdrawals: String = row.get(4)?;
            Ok(Valuation {
                id: Some(row.get(0)?),
                date: row.get(1)?,
                total_value: parse_decimal(&total_value),
                deposits: parse_decimal(&deposits),
                withdrawals: parse_decimal(&withdrawals),
            })
        })?
        .collect::<rusqlite::Result<Vec<Valuation>>>()?;

    Ok(valuations)
}

// ============ Holdings ============

pub fn upsert_holding(conn: &Connection, user_id: &str, holding: &Holding) -> Result<()> {
    conn.execute(
        "INSERT INTO holdings
             (user_id, symbol, data_source, name, asset_class, asset_sub_class,
              quantity, market_price, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(user_id, data_source, symbol) DO UPDATE SET
             name = excluded.name,
             asset_class = excluded.asset_class,
             asset_sub_class = excluded.asset_sub_class,
             quantity = excluded.quantity,
             market_price = excluded.market_price,
             value = excluded.value",
        params![
            user_id,
            holding.symbol,
            holding.data_source,
            holding.name,
            holding.asset_class.as_str(),
            holding.asset_sub_class.as_str(),
            holding.quantity.to_string(),
            holding.market_price.to_string(),
            holding.value.to_string(),
        ],
    )?;

    Ok(())
}

pub fn delete_holding(
    conn: &Connection,
    user_id: &str,
    data_source: &str,
    symbol: &str,
) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM holdings WHERE user_id = ?1 AND data_source = ?2 AND symbol = ?3",
        params![user_id, data_source, symbol],
    )?;

    if deleted == 0 {
        return Err(EngineError::NotFound(format!("holding {}", symbol)).into());
    }
    Ok(())
}

/// Holdings in insertion order; suggestion priorities are pinned to this
pub fn list_holdings(conn: &Connection, user_id: &str) -> Result<Vec<Holding>> {
    let mut stmt = conn.prepare(
        "SELECT symbol, data_source, name, asset_class, asset_sub_class,
                quantity, market_price, value
         FROM holdings WHERE user_id = ?1 ORDER BY id",
    )?;

    let holdings = stmt
        .query_map([user_id], |row| {
            let class_raw: String = row.get(3)?;
            let sub_raw: String = row.get(4)?;
            let quantity: String = row.get(5)?;
            let market_price: String = row.get(6)?;
            let value: String = row.get(7)?;
            Ok(Holding {
                symbol: row.get(0)?,
                data_source: row.get(1)?,
                name: row.get(2)?,
                asset_class: AssetClass::from_str(&class_raw)
                    .map_err(|_| conversion_error("asset class", &class_raw))?,
                asset_sub_class: AssetSubClass::from_str(&sub_raw)
                    .map_err(|_| conversion_error("asset sub-class", &sub_raw))?,
                quantity: parse_decimal(&quantity),
                market_price: parse_decimal(&market_price),
                value: parse_decimal(&value),
            })
        })?
        .collect::<rusqlite::Result<Vec<Holding>>>()?;

    Ok(holdings)
}
