use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Per-day aggregate counters. One row per calendar date.
///
/// Counter maps go label -> running count and only ever grow; deactivating a
/// registration does not roll its day back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventStatistics {
    pub date: NaiveDate,
    pub total_registrations: i32,
    pub registrations_by_event: Json<HashMap<String, i64>>,
    pub registrations_by_age_group: Json<HashMap<String, i64>>,
    pub registrations_by_city: Json<HashMap<String, i64>>,
}

impl EventStatistics {
    /// Most popular event of the day as "key (count)". Tie order is undefined.
    pub fn top_event(&self) -> String {
        top_entry(&self.registrations_by_event)
    }

    /// Most popular age group of the day as "key (count)". Tie order is undefined.
    pub fn top_age_group(&self) -> String {
        top_entry(&self.registrations_by_age_group)
    }
}

fn top_entry(counters: &HashMap<String, i64>) -> String {
    counters
        .iter()
        .max_by_key(|(_, count)| **count)
        .map(|(key, count)| format!("{key} ({count})"))
        .unwrap_or_else(|| "No data".to_string())
}

/// Increment `key` in a counter map, inserting it at 1 when absent.
pub fn bump(counters: &mut HashMap<String, i64>, key: &str) {
    *counters.entry(key.to_string()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_inserts_fresh_key_at_one() {
        let mut counters = HashMap::new();
        bump(&mut counters, "singing");
        assert_eq!(counters["singing"], 1);
    }

    #[test]
    fn test_bump_increments_existing_key() {
        let mut counters = HashMap::new();
        bump(&mut counters, "Pune");
        bump(&mut counters, "Pune");
        bump(&mut counters, "Mumbai");
        assert_eq!(counters["Pune"], 2);
        assert_eq!(counters["Mumbai"], 1);
    }

    #[test]
    fn test_top_entry_picks_maximum() {
        let mut counters = HashMap::new();
        counters.insert("dancing".to_string(), 3);
        counters.insert("singing".to_string(), 7);
        assert_eq!(top_entry(&counters), "singing (7)");
    }

    #[test]
    fn test_top_entry_without_data() {
        assert_eq!(top_entry(&HashMap::new()), "No data");
    }

    #[test]
    fn test_counter_sums_match_total() {
        let mut stats = EventStatistics {
            date: NaiveDate::from_ymd_opt(2025, 8, 6).unwrap(),
            total_registrations: 0,
            registrations_by_event: Json(HashMap::new()),
            registrations_by_age_group: Json(HashMap::new()),
            registrations_by_city: Json(HashMap::new()),
        };
        for event in ["singing", "dancing", "singing", "others"] {
            stats.total_registrations += 1;
            bump(&mut stats.registrations_by_event, event);
        }
        let sum: i64 = stats.registrations_by_event.values().sum();
        assert_eq!(sum, stats.total_registrations as i64);
    }
}
