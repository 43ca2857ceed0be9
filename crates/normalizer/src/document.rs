//! Turns a whole input document into the flat records the normalizer reads.
//!
//! Three layouts are accepted:
//! - an array of records;
//! - an object with a `providers` array of `{name, type, metrics}` entries, where
//!   metrics may also sit directly beside `name` and `type`;
//! - a legacy object keyed by market, each value being a record.

use crate::error::NormalizeError;
use crate::normalizer::RawRecord;
use serde_json::{Map, Value};

/// Country and region used for onchain providers, which operate across borders.
pub const CROSS_BORDER: &str = "Global";

/// Flat provider keys that belong to the `blockchain_metrics` group.
const BLOCKCHAIN_KEYS: [&str; 2] = ["tvl_usd", "daily_volume_usd"];

const TRANSFERS_KEY: &str = "cross_chain_transfers";

/// Provider envelope keys; everything else at the provider level is a metric.
const PROVIDER_KEYS: [&str; 3] = ["name", "type", "metrics"];

pub fn extract_records(document: &Value) -> Result<Vec<RawRecord>, NormalizeError> {
    match document {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_object().cloned().ok_or_else(|| {
                    NormalizeError::InvalidDocument(format!("item #{index} is not an object"))
                })
            })
            .collect(),
        Value::Object(map) => match map.get("providers") {
            Some(Value::Array(providers)) => providers
                .iter()
                .enumerate()
                .map(|(index, provider)| flatten_provider(index, provider))
                .collect(),
            Some(_) => Err(NormalizeError::InvalidDocument(
                "'providers' must be an array".to_string(),
            )),
            None => Ok(map
                .iter()
                .filter_map(|(key, value)| value.as_object().map(|record| legacy_record(key, record)))
                .collect()),
        },
        _ => Err(NormalizeError::InvalidDocument(
            "expected an array of records or an object".to_string(),
        )),
    }
}

fn legacy_record(key: &str, record: &Map<String, Value>) -> RawRecord {
    let mut record = record.clone();
    record
        .entry("market_name")
        .or_insert_with(|| Value::String(key.to_string()));
    record
}

fn flatten_provider(index: usize, provider: &Value) -> Result<RawRecord, NormalizeError> {
    let provider = provider.as_object().ok_or_else(|| {
        NormalizeError::InvalidDocument(format!("provider #{index} is not an object"))
    })?;

    let mut record = provider
        .get("metrics")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for (key, value) in provider {
        if !PROVIDER_KEYS.contains(&key.as_str()) {
            record.entry(key.as_str()).or_insert_with(|| value.clone());
        }
    }

    if let Some(name) = provider.get("name").filter(|v| v.is_string()) {
        record
            .entry("market_name")
            .or_insert_with(|| name.clone());
    }
    let provider_type = provider.get("type").and_then(Value::as_str);
    if let Some(provider_type) = provider_type {
        record
            .entry("provider_type")
            .or_insert_with(|| Value::String(provider_type.to_string()));
    }

    if provider_type.is_some_and(|t| t.eq_ignore_ascii_case("onchain")) {
        for key in ["country", "region"] {
            record
                .entry(key)
                .or_insert_with(|| Value::String(CROSS_BORDER.to_string()));
        }
    }

    lift_flat_onchain_keys(&mut record);
    Ok(record)
}

/// Moves flat provider metrics (`tvl_usd`, `daily_volume_usd`, `apy_avg`,
/// `cross_chain_transfers`) into the onchain groups, without overwriting values
/// already given there.
fn lift_flat_onchain_keys(record: &mut RawRecord) {
    for key in BLOCKCHAIN_KEYS {
        if let Some(value) = record.remove(key) {
            insert_into_group(record, "blockchain_metrics", key, value);
        }
    }
    if let Some(value) = record.remove("apy_avg") {
        insert_into_group(record, "defi_integration", "average_apy_percentage", value);
    }
    if let Some(value) = record.remove(TRANSFERS_KEY) {
        insert_into_group(record, "cross_chain_efficiency", TRANSFERS_KEY, value);
    }
}

fn insert_into_group(record: &mut RawRecord, group: &str, key: &str, value: Value) {
    let entry = record
        .entry(group)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(fields) = entry {
        fields.entry(key).or_insert(value);
    }
}
