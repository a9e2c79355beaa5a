//! The dashboard: reads everything the tracker stored, totals it up and prices it with the
//! user's hourly wage. Also owns the two writes the user can make, setting the wage and
//! clearing the history.

pub mod format;
pub mod render;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::store::{
    is_reserved_key, value_as_count, KeyValueStore, HOURLY_WAGE_KEY, SWITCH_COUNT_KEY,
};

use format::calculate_cost;

/// From this many tab switches on, the summary warns about being distracted.
pub const DISTRACTION_THRESHOLD: u64 = 50;

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons?domain=";

pub const NEGATIVE_WAGE_MESSAGE: &str = "시급은 0 이상이어야 합니다.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRow {
    pub domain: String,
    pub seconds: u64,
    /// `None` while no wage is configured.
    pub cost: Option<u64>,
    pub favicon_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub total_seconds: u64,
    /// Sum of the per-domain costs. `None` while no wage is configured.
    pub total_cost: Option<u64>,
    pub switch_count: u64,
    pub hourly_wage: u64,
    pub distracted: bool,
    /// Most time first, ties in alphabetical order.
    pub rows: Vec<DomainRow>,
}

pub fn favicon_url(domain: &str) -> String {
    format!("{FAVICON_SERVICE}{domain}")
}

/// Builds the dashboard out of a full store snapshot.
pub fn build_dashboard(entries: &Map<String, Value>) -> DashboardView {
    let hourly_wage = value_as_count(entries.get(HOURLY_WAGE_KEY));
    let switch_count = value_as_count(entries.get(SWITCH_COUNT_KEY));
    let wage_set = hourly_wage > 0;

    let mut rows = entries
        .iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .filter_map(|(domain, value)| {
            if !value.is_number() {
                warn!("Ignoring {domain}, stored value {value} is not a duration");
                return None;
            }
            let seconds = value_as_count(Some(value));
            Some(DomainRow {
                domain: domain.clone(),
                seconds,
                cost: wage_set.then(|| calculate_cost(seconds, hourly_wage)),
                favicon_url: favicon_url(domain),
            })
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| {
        b.seconds
            .cmp(&a.seconds)
            .then_with(|| a.domain.cmp(&b.domain))
    });

    let total_seconds = rows
        .iter()
        .fold(0u64, |total, row| total.saturating_add(row.seconds));
    let total_cost = wage_set.then(|| {
        rows.iter()
            .filter_map(|row| row.cost)
            .fold(0u64, u64::saturating_add)
    });

    DashboardView {
        total_seconds,
        total_cost,
        switch_count,
        hourly_wage,
        distracted: switch_count >= DISTRACTION_THRESHOLD,
        rows,
    }
}

/// Reads the whole store and aggregates it.
pub async fn load_dashboard(store: &impl KeyValueStore) -> Result<DashboardView> {
    let entries = store.get_all().await.context("Loading stored activity")?;
    debug!("Loaded {} stored entries", entries.len());
    Ok(build_dashboard(&entries))
}

pub async fn load_hourly_wage(store: &impl KeyValueStore) -> Result<u64> {
    Ok(value_as_count(store.get(HOURLY_WAGE_KEY).await?.as_ref()))
}

/// Reads a wage the way a lenient number field does: leading whitespace and a sign are
/// allowed, the leading digits are used and anything else counts as zero. Negative amounts
/// are rejected.
pub fn parse_wage(input: &str) -> Result<u64> {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = rest
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>();
    if digits.is_empty() {
        return Ok(0);
    }

    let wage = digits
        .parse::<u64>()
        .with_context(|| format!("{} is too large for an hourly wage", input.trim()))?;
    if negative && wage > 0 {
        bail!(NEGATIVE_WAGE_MESSAGE);
    }
    Ok(wage)
}

/// Validates and stores the wage. Nothing is written when validation fails.
pub async fn save_hourly_wage(store: &impl KeyValueStore, input: &str) -> Result<u64> {
    let wage = parse_wage(input)?;
    store
        .set(crate::store::entry(HOURLY_WAGE_KEY, wage))
        .await
        .context("Saving hourly wage")?;
    info!("Hourly wage set to {wage}");
    Ok(wage)
}

/// Drops every domain record and the switch count. The wage survives.
pub async fn clear_all_data(store: &impl KeyValueStore) -> Result<()> {
    let wage = load_hourly_wage(store).await?;
    store.clear().await.context("Clearing stored activity")?;

    let mut preserved = Map::new();
    preserved.insert(HOURLY_WAGE_KEY.into(), wage.into());
    preserved.insert(SWITCH_COUNT_KEY.into(), 0.into());
    store
        .set(preserved)
        .await
        .context("Restoring hourly wage after clearing")?;
    info!("Cleared all activity, kept hourly wage {wage}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::{json, Map, Value};

    use crate::store::{entry, memory::MemoryStore, KeyValueStore};

    use super::*;

    fn entries(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test data is always an object"),
        }
    }

    #[test]
    fn test_aggregation() {
        let view = build_dashboard(&entries(json!({
            "a.com": 100,
            "b.com": 300,
            "hourlyWage": 10000,
            "totalSwitchCount": 7,
        })));

        assert_eq!(view.total_seconds, 400);
        assert_eq!(view.total_cost, Some(277 + 833));
        assert_eq!(view.switch_count, 7);
        assert_eq!(view.hourly_wage, 10000);
        assert!(!view.distracted);
        assert_eq!(
            view.rows.iter().map(|r| r.domain.as_str()).collect::<Vec<_>>(),
            vec!["b.com", "a.com"]
        );
        assert_eq!(view.rows[0].cost, Some(833));
        assert_eq!(
            view.rows[0].favicon_url,
            "https://www.google.com/s2/favicons?domain=b.com"
        );
    }

    #[test]
    fn test_aggregation_without_wage() {
        let view = build_dashboard(&entries(json!({
            "a.com": 100,
            "totalSwitchCount": 50,
        })));

        assert_eq!(view.total_cost, None);
        assert_eq!(view.rows[0].cost, None);
        assert!(view.distracted);
    }

    #[test]
    fn test_huge_totals_saturate() {
        let view = build_dashboard(&entries(json!({
            "a.com": u64::MAX,
            "b.com": u64::MAX - 5,
            "hourlyWage": u64::MAX,
        })));
        assert_eq!(view.total_seconds, u64::MAX);
        assert_eq!(view.total_cost, Some(u64::MAX));
        assert_eq!(view.rows[0].domain, "a.com");
        assert_eq!(view.rows[0].cost, Some(u64::MAX));
    }

    #[test]
    fn test_equal_times_sort_alphabetically() {
        let view = build_dashboard(&entries(json!({
            "zeta.io": 10,
            "alpha.io": 10,
            "mid.io": 20,
        })));
        assert_eq!(
            view.rows.iter().map(|r| r.domain.as_str()).collect::<Vec<_>>(),
            vec!["mid.io", "alpha.io", "zeta.io"]
        );
    }

    #[test]
    fn test_empty_and_garbage_entries() {
        let view = build_dashboard(&Map::new());
        assert!(view.rows.is_empty());
        assert_eq!(view.total_seconds, 0);
        assert_eq!(view.switch_count, 0);

        let view = build_dashboard(&entries(json!({
            "a.com": "not a number",
            "b.com": 12.7,
        })));
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].seconds, 12);
    }

    #[test]
    fn test_parse_wage() -> Result<()> {
        assert_eq!(parse_wage("10000")?, 10000);
        assert_eq!(parse_wage("  12000 ")?, 12000);
        assert_eq!(parse_wage("9500won")?, 9500);
        assert_eq!(parse_wage("+15")?, 15);
        assert_eq!(parse_wage("")?, 0);
        assert_eq!(parse_wage("abc")?, 0);
        assert_eq!(parse_wage("-0")?, 0);
        assert!(parse_wage("-5").is_err());
        assert!(parse_wage("99999999999999999999999").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_hourly_wage() -> Result<()> {
        let store = MemoryStore::new();
        assert_eq!(save_hourly_wage(&store, "12000").await?, 12000);
        assert_eq!(load_hourly_wage(&store).await?, 12000);

        let rejected = save_hourly_wage(&store, "-100").await;
        assert_eq!(
            rejected.map_err(|e| e.to_string()),
            Err(NEGATIVE_WAGE_MESSAGE.to_string())
        );
        assert_eq!(load_hourly_wage(&store).await?, 12000);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_all_data_keeps_wage() -> Result<()> {
        let store = MemoryStore::with_entries(entries(json!({
            "a.com": 100,
            "b.com": 300,
            "hourlyWage": 9860,
            "totalSwitchCount": 75,
        })));

        clear_all_data(&store).await?;

        let all = store.get_all().await?;
        assert_eq!(
            all,
            entries(json!({"hourlyWage": 9860, "totalSwitchCount": 0}))
        );
        let view = load_dashboard(&store).await?;
        assert!(view.rows.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_without_wage_stores_zero() -> Result<()> {
        let store = MemoryStore::new();
        store.set(entry("a.com", 5)).await?;
        clear_all_data(&store).await?;
        assert_eq!(
            store.get_all().await?,
            entries(json!({"hourlyWage": 0, "totalSwitchCount": 0}))
        );
        Ok(())
    }
}
