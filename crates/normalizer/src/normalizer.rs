use crate::error::NormalizeError;
use crate::outliers::flag_outliers;
use crate::parse::NumericParser;
use crate::quality;
use configuration::NormalizerConfig;
use core_types::{
    AgentNetwork, AnalysisWarning, FieldProvenance, FloatMetrics, GrowthMetrics, MarketRecord,
    OnchainSection, ProviderType, QualityAssessment, TransactionMetrics,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One record as handed over by the external loader: an untyped key-value map.
pub type RawRecord = Map<String, Value>;

/// Placeholder region for records that do not name one.
pub const UNKNOWN_REGION: &str = "Unknown";

/// The output of normalization: typed records plus every soft issue found.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub records: Vec<MarketRecord>,
    pub warnings: Vec<AnalysisWarning>,
}

/// Validates raw records once and turns them into `MarketRecord`s.
#[derive(Debug, Clone, Default)]
pub struct DataNormalizer {
    config: NormalizerConfig,
}

impl DataNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Cleans every record, scores its quality and flags cross-market outliers.
    ///
    /// Record-level problems never abort the batch. Only a record without a
    /// `market_name` or `country` does, with `NormalizeError::MalformedInput`.
    pub fn normalize(&self, raw_records: &[RawRecord]) -> Result<NormalizedBatch, NormalizeError> {
        let mut records = Vec::with_capacity(raw_records.len());
        let mut warnings = Vec::new();

        for (index, raw) in raw_records.iter().enumerate() {
            records.push(self.normalize_record(index, raw, &mut warnings)?);
        }

        flag_outliers(&mut records, self.config.outlier_multiplier, &mut warnings);

        tracing::info!(
            records = records.len(),
            warnings = warnings.len(),
            "Normalization complete."
        );
        Ok(NormalizedBatch { records, warnings })
    }

    fn normalize_record(
        &self,
        index: usize,
        raw: &RawRecord,
        warnings: &mut Vec<AnalysisWarning>,
    ) -> Result<MarketRecord, NormalizeError> {
        let market_name = identity(raw, "market_name").ok_or(NormalizeError::MalformedInput {
            index,
            field: "market_name",
        })?;
        let country = identity(raw, "country").ok_or(NormalizeError::MalformedInput {
            index,
            field: "country",
        })?;
        let region = identity(raw, "region");

        let mut cx = FieldContext::new(&self.config, &market_name);

        let liquidity_sources = cx.liquidity_sources(raw);

        let tx = group(raw, &["transaction_metrics"]);
        let transaction_metrics = TransactionMetrics {
            attempted: cx.count("transaction_metrics.attempted", tx.and_then(|g| g.get("attempted"))),
            successful: cx.count("transaction_metrics.successful", tx.and_then(|g| g.get("successful"))),
            failed: cx.count("transaction_metrics.failed", tx.and_then(|g| g.get("failed"))),
        };

        let float = group(raw, &["float_metrics"]);
        let float_metrics = FloatMetrics {
            total_volume: cx.amount("float_metrics.total_volume", float.and_then(|g| g.get("total_volume"))),
            average_float: cx.amount("float_metrics.average_float", float.and_then(|g| g.get("average_float"))),
        };

        let agents = group(raw, &["agent_network", "agent_network_metrics"]);
        let agent_network = AgentNetwork {
            total: cx.count("agent_network.total", agents.and_then(|g| g.get("total"))),
            active: cx.count("agent_network.active", agents.and_then(|g| g.get("active"))),
            with_liquidity: cx.count("agent_network.with_liquidity", agents.and_then(|g| g.get("with_liquidity"))),
            with_cash: cx.count("agent_network.with_cash", agents.and_then(|g| g.get("with_cash"))),
        };

        let growth = group(raw, &["growth_metrics"]);
        let growth_metrics = GrowthMetrics {
            transaction_growth_rate: cx.rate(
                "growth_metrics.transaction_growth_rate",
                growth.and_then(|g| g.get("transaction_growth_rate")),
            ),
            user_growth_rate: cx.rate(
                "growth_metrics.user_growth_rate",
                growth.and_then(|g| g.get("user_growth_rate")),
            ),
        };

        let onchain = cx.onchain(raw);

        let has_offchain = !liquidity_sources.is_empty()
            || transaction_metrics.attempted.is_some()
            || float_metrics.total_volume.is_some()
            || agent_network.total.is_some();
        let provider_type = cx.provider_type(raw, onchain.is_some(), has_offchain);

        let data_source = ["data_source", "source"]
            .iter()
            .find_map(|key| identity(raw, key));

        let FieldContext {
            provenance,
            mut annotations,
            warnings: field_warnings,
            issues,
            ..
        } = cx;

        // Invariants are checked, reported and left as given.
        if transaction_metrics.is_consistent() == Some(false) {
            annotations.push("successful + failed exceeds attempted".to_string());
            warnings.push(AnalysisWarning::insufficient_data(
                market_name.clone(),
                "transaction counts are inconsistent: successful + failed exceeds attempted",
            ));
        }
        for (sub_count, holds) in agent_network.bound_checks() {
            if !holds {
                annotations.push(format!("agent_network.{sub_count} exceeds total"));
                warnings.push(AnalysisWarning::insufficient_data(
                    market_name.clone(),
                    format!("agent_network.{sub_count} exceeds agent_network.total"),
                ));
            }
        }
        warnings.extend(field_warnings);

        let mut record = MarketRecord {
            market_name,
            country,
            region: region.clone().unwrap_or_else(|| UNKNOWN_REGION.to_string()),
            provider_type,
            liquidity_sources,
            transaction_metrics,
            float_metrics,
            agent_network,
            growth_metrics,
            data_source,
            onchain,
            quality: QualityAssessment::default(),
            provenance,
            outliers: Vec::new(),
            annotations,
        };
        record.quality = quality::assess(&record, region.is_some(), issues, &self.config);

        tracing::debug!(
            market = %record.market_name,
            quality = %record.quality.score,
            provider_type = ?record.provider_type,
            "Record normalized."
        );
        Ok(record)
    }
}

/// Per-record parsing state: provenance, soft issues and annotations collected while
/// the record's fields are read.
struct FieldContext<'a> {
    parser: NumericParser<'a>,
    market: &'a str,
    provenance: BTreeMap<String, FieldProvenance>,
    annotations: Vec<String>,
    warnings: Vec<AnalysisWarning>,
    issues: usize,
}

impl<'a> FieldContext<'a> {
    fn new(config: &'a NormalizerConfig, market: &'a str) -> Self {
        Self {
            parser: NumericParser::new(config),
            market,
            provenance: BTreeMap::new(),
            annotations: Vec::new(),
            warnings: Vec::new(),
            issues: 0,
        }
    }

    fn fail(&mut self, path: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(market = %self.market, field = %path, %reason, "Field could not be parsed.");
        if let Some(entry) = self.provenance.get_mut(path) {
            entry.cleaned = None;
        }
        self.issues += 1;
        self.warnings.push(AnalysisWarning::FieldParse {
            market: self.market.to_string(),
            field: path.to_string(),
            reason,
        });
    }

    /// Parses any numeric field. Absent and null values are `None` without a warning.
    fn number(&mut self, path: &str, raw: Option<&Value>) -> Option<Decimal> {
        let raw = raw.filter(|v| !v.is_null())?;
        let parsed = self.parser.parse(raw);

        if let Value::String(text) = raw {
            let (cleaned, unit, multiplier) = match &parsed {
                Ok(p) => (Some(p.value), p.unit.clone(), p.multiplier),
                Err(_) => (None, None, Decimal::ONE),
            };
            self.provenance.insert(
                path.to_string(),
                FieldProvenance {
                    raw: text.clone(),
                    cleaned,
                    unit,
                    multiplier,
                },
            );
        }

        match parsed {
            Ok(p) => {
                if p.unknown_unit {
                    self.issues += 1;
                    self.warnings.push(AnalysisWarning::UnknownUnit {
                        market: self.market.to_string(),
                        field: path.to_string(),
                        unit: p.unit.unwrap_or_default(),
                    });
                }
                Some(p.value)
            }
            Err(issue) => {
                self.fail(path, issue.to_string());
                None
            }
        }
    }

    /// A non-negative amount (volume, float, TVL).
    fn amount(&mut self, path: &str, raw: Option<&Value>) -> Option<Decimal> {
        let value = self.number(path, raw)?;
        if value.is_sign_negative() && !value.is_zero() {
            self.fail(path, format!("negative value {value}"));
            return None;
        }
        Some(value)
    }

    /// A non-negative whole count. Fractional parts (e.g. "1.25 Million") are truncated.
    fn count(&mut self, path: &str, raw: Option<&Value>) -> Option<u64> {
        let value = self.amount(path, raw)?;
        match value.trunc().to_u64() {
            Some(count) => Some(count),
            None => {
                self.fail(path, format!("{value} does not fit a count"));
                None
            }
        }
    }

    /// A growth rate as a fraction. Bare numbers above 1 in magnitude are read as percent.
    fn rate(&mut self, path: &str, raw: Option<&Value>) -> Option<Decimal> {
        let is_text = matches!(raw, Some(Value::String(_)));
        let value = self.number(path, raw)?;
        let has_unit = is_text
            && self
                .provenance
                .get(path)
                .is_some_and(|p| p.unit.is_some());
        if !has_unit && value.abs() > Decimal::ONE {
            Some(value / dec!(100))
        } else {
            Some(value)
        }
    }

    fn liquidity_sources(&mut self, raw: &RawRecord) -> BTreeMap<String, Decimal> {
        let volumes = raw
            .get("liquidity_volumes")
            .and_then(Value::as_object)
            .or_else(|| raw.get("liquidity_sources").and_then(Value::as_object));

        let mut sources = BTreeMap::new();
        if let Some(volumes) = volumes {
            for (source, value) in volumes {
                let source = source.trim();
                let path = format!("liquidity_sources.{source}");
                if let Some(volume) = self.amount(&path, Some(value)) {
                    sources.insert(source.to_string(), volume);
                }
            }
        }

        if let Some(listed) = raw.get("liquidity_sources").and_then(Value::as_array) {
            for name in listed.iter().filter_map(Value::as_str) {
                if !sources.contains_key(name.trim()) {
                    self.annotations
                        .push(format!("liquidity source '{name}' listed without a volume"));
                }
            }
        }
        sources
    }

    /// Reads the four onchain groups, nested under `onchain` or at the top level.
    fn onchain(&mut self, raw: &RawRecord) -> Option<OnchainSection> {
        let nested = raw.get("onchain").and_then(Value::as_object);
        let container = nested.unwrap_or(raw);

        let mut present = nested.is_some();
        let mut section = OnchainSection::default();
        for (name, target) in [
            ("blockchain_metrics", &mut section.blockchain_metrics),
            ("defi_integration", &mut section.defi_integration),
            ("cross_chain_efficiency", &mut section.cross_chain_efficiency),
            ("smart_contract_performance", &mut section.smart_contract_performance),
        ] {
            let Some(fields) = container.get(name).and_then(Value::as_object) else {
                continue;
            };
            present = true;
            for (key, value) in fields {
                // Flags such as `bug_bounty_active` carry no score.
                if value.is_boolean() {
                    continue;
                }
                if let Some(number) = self.number(&format!("{name}.{key}"), Some(value)) {
                    target.insert(key.clone(), number);
                }
            }
        }
        present.then_some(section)
    }

    fn provider_type(&mut self, raw: &RawRecord, has_onchain: bool, has_offchain: bool) -> ProviderType {
        let declared = ["provider_type", "type"]
            .iter()
            .find_map(|key| raw.get(*key).and_then(Value::as_str));
        if let Some(declared) = declared {
            match declared.parse::<ProviderType>() {
                Ok(provider_type) => return provider_type,
                Err(e) => self.fail("provider_type", e.to_string()),
            }
        }
        match (has_onchain, has_offchain) {
            (true, true) => ProviderType::Hybrid,
            (true, false) => ProviderType::Onchain,
            _ => ProviderType::Offchain,
        }
    }
}

/// A non-empty, trimmed text field.
fn identity(raw: &RawRecord, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// The first of `keys` that holds an object.
fn group<'r>(raw: &'r RawRecord, keys: &[&str]) -> Option<&'r Map<String, Value>> {
    keys.iter().find_map(|key| raw.get(*key).and_then(Value::as_object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    fn normalize(values: Vec<Value>) -> NormalizedBatch {
        let records: Vec<RawRecord> = values.into_iter().map(raw).collect();
        DataNormalizer::default().normalize(&records).unwrap()
    }

    fn kenya() -> Value {
        json!({
            "market_name": "M-Pesa",
            "country": "Kenya",
            "region": "East Africa",
            "data_source": "central_bank",
            "liquidity_volumes": {"commercial_bank": "KShs 45.2 Billion", "agent_network": 1200},
            "transaction_metrics": {"attempted": 100, "successful": 90, "failed": 10},
            "float_metrics": {"total_volume": "2.5 million", "average_float": 250000},
            "agent_network": {"total": 1000, "active": 800, "with_liquidity": 300, "with_cash": 500},
            "growth_metrics": {"transaction_growth_rate": "25%", "user_growth_rate": 15}
        })
    }

    #[test]
    fn test_complete_record_is_cleaned() {
        let batch = normalize(vec![kenya()]);
        let record = &batch.records[0];

        assert_eq!(record.liquidity_sources["commercial_bank"], dec!(45200000000));
        assert_eq!(record.liquidity_sources["agent_network"], dec!(1200));
        assert_eq!(record.float_metrics.total_volume, Some(dec!(2500000)));
        assert_eq!(record.agent_network.active, Some(800));
        assert_eq!(record.growth_metrics.transaction_growth_rate, Some(dec!(0.25)));
        assert_eq!(record.growth_metrics.user_growth_rate, Some(dec!(0.15)));
        assert_eq!(record.provider_type, ProviderType::Offchain);
        assert!(record.onchain.is_none());

        let provenance = &record.provenance["liquidity_sources.commercial_bank"];
        assert_eq!(provenance.raw, "KShs 45.2 Billion");
        assert_eq!(provenance.unit.as_deref(), Some("Billion"));

        // Complete, consistent and from a 0.95 source: 0.4 + 0.35 + 0.2375.
        assert_eq!(record.quality.completeness, Decimal::ONE);
        assert_eq!(record.quality.score, dec!(0.9875));
        assert!(batch.warnings.is_empty());
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        let records = vec![raw(json!({"market_name": "M-Pesa"}))];
        let result = DataNormalizer::default().normalize(&records);
        assert!(matches!(
            result,
            Err(NormalizeError::MalformedInput { index: 0, field: "country" })
        ));
    }

    #[test]
    fn test_scaled_value_beyond_range_is_soft() {
        let batch = normalize(vec![json!({
            "market_name": "Big",
            "country": "X",
            "liquidity_volumes": {
                "commercial_bank": "99999999999999999999 trillion",
                "agent_network": 500
            }
        })]);
        let record = &batch.records[0];

        assert!(!record.liquidity_sources.contains_key("commercial_bank"));
        assert_eq!(record.liquidity_sources["agent_network"], dec!(500));
        assert_eq!(record.provenance["liquidity_sources.commercial_bank"].cleaned, None);
        assert!(batch.warnings.iter().any(|w| matches!(
            w,
            AnalysisWarning::FieldParse { field, reason, .. }
                if field == "liquidity_sources.commercial_bank" && reason.contains("out of range")
        )));
    }

    #[test]
    fn test_unparseable_field_is_soft() {
        let mut value = kenya();
        value["float_metrics"]["average_float"] = json!("n/a");
        let batch = normalize(vec![value]);
        let record = &batch.records[0];

        assert_eq!(record.float_metrics.average_float, None);
        assert_eq!(record.quality.penalty, dec!(0.05));
        assert!(batch.warnings.iter().any(|w| matches!(
            w,
            AnalysisWarning::FieldParse { field, .. } if field == "float_metrics.average_float"
        )));
        assert_eq!(record.provenance["float_metrics.average_float"].cleaned, None);
    }

    #[test]
    fn test_unknown_unit_is_penalised() {
        let mut value = kenya();
        value["agent_network"]["total"] = json!("1,000 outlets");
        let batch = normalize(vec![value]);

        assert_eq!(batch.records[0].agent_network.total, Some(1000));
        assert!(matches!(
            &batch.warnings[0],
            AnalysisWarning::UnknownUnit { unit, .. } if unit == "outlets"
        ));
        assert_eq!(batch.records[0].quality.penalty, dec!(0.05));
    }

    #[test]
    fn test_negative_volume_is_rejected() {
        let mut value = kenya();
        value["liquidity_volumes"]["agent_network"] = json!(-5);
        let batch = normalize(vec![value]);
        assert!(!batch.records[0].liquidity_sources.contains_key("agent_network"));
        assert_eq!(batch.warnings.len(), 1);
    }

    #[test]
    fn test_inconsistent_transactions_are_reported_and_kept() {
        let mut value = kenya();
        value["transaction_metrics"]["successful"] = json!(95);
        let batch = normalize(vec![value]);
        let record = &batch.records[0];

        assert_eq!(record.transaction_metrics.successful, Some(95));
        assert!(record.quality.consistency < Decimal::ONE);
        assert!(batch
            .warnings
            .iter()
            .any(|w| w.kind() == "insufficient_data"));
    }

    #[test]
    fn test_region_defaults_to_unknown() {
        let batch = normalize(vec![json!({"market_name": "Wave", "country": "Senegal"})]);
        let record = &batch.records[0];
        assert_eq!(record.region, UNKNOWN_REGION);
        // Only market_name and country are present.
        assert_eq!(record.quality.completeness, dec!(2) / dec!(13));
    }

    #[test]
    fn test_onchain_groups_make_a_hybrid() {
        let mut value = kenya();
        value["blockchain_metrics"] = json!({"tvl_usd": "$1.2M", "celo_daily_tx": 5000});
        value["smart_contract_performance"] = json!({"audit_passed": true, "execution_success_rate": 0.99});
        let batch = normalize(vec![value]);
        let record = &batch.records[0];

        assert_eq!(record.provider_type, ProviderType::Hybrid);
        let onchain = record.onchain.as_ref().unwrap();
        assert_eq!(onchain.blockchain_metrics["tvl_usd"], dec!(1200000));
        assert!(!onchain.smart_contract_performance.contains_key("audit_passed"));
    }

    #[test]
    fn test_declared_provider_type_wins() {
        let batch = normalize(vec![json!({
            "market_name": "Celo",
            "country": "Global",
            "provider_type": "onchain",
            "onchain": {}
        })]);
        assert_eq!(batch.records[0].provider_type, ProviderType::Onchain);
        assert_eq!(batch.records[0].onchain, Some(OnchainSection::default()));
    }

    #[test]
    fn test_outliers_are_flagged_not_dropped() {
        let mut values = Vec::new();
        for (name, volume) in [("A", 100), ("B", 110), ("C", 90), ("D", 5000)] {
            values.push(json!({
                "market_name": name,
                "country": "X",
                "liquidity_volumes": {"commercial_bank": volume}
            }));
        }
        let batch = normalize(values);
        let flagged = &batch.records[3];

        assert_eq!(flagged.liquidity_sources["commercial_bank"], dec!(5000));
        assert_eq!(flagged.outliers.len(), 1);
        assert_eq!(flagged.outliers[0].median, dec!(105));
        assert!(batch.records[..3].iter().all(|r| r.outliers.is_empty()));
        assert_eq!(batch.warnings.iter().filter(|w| w.kind() == "outlier").count(), 1);
    }
}
