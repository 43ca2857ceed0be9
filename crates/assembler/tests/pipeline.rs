use assembler::{PipelineError, ResearchPipeline};
use chrono::{DateTime, TimeZone, Utc};
use core_types::{FrictionKind, ProviderType};
use normalizer::{NormalizeError, RawRecord};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use sourcing::PrimarySource;

fn raw(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not an object: {other}"),
    }
}

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
}

fn kenya() -> Value {
    json!({
        "market_name": "M-Pesa",
        "country": "Kenya",
        "region": "East Africa",
        "data_source": "central_bank",
        "liquidity_sources": {
            "commercial_bank": 70,
            "agent_network": 30
        },
        "transaction_metrics": {"attempted": 100, "successful": 90, "failed": 10},
        "float_metrics": {"total_volume": "1,000", "average_float": 100},
        "agent_network": {"total": 1000, "active": 800, "with_liquidity": 300, "with_cash": 500},
        "growth_metrics": {"transaction_growth_rate": "30%", "user_growth_rate": 0.1}
    })
}

fn ghana() -> Value {
    json!({
        "market_name": "MTN MoMo",
        "country": "Ghana",
        "region": "West Africa",
        "liquidity_sources": {"commercial_bank": 40, "mobile_network_operator": 60},
        "transaction_metrics": {"attempted": 200, "successful": 196, "failed": 4},
        "float_metrics": {"total_volume": 3000, "average_float": 200},
        "agent_network": {"total": 500, "active": 450, "with_liquidity": 400, "with_cash": 420},
        "growth_metrics": {"transaction_growth_rate": 0.2, "user_growth_rate": 0.05}
    })
}

fn run(values: Vec<Value>) -> assembler::AnalysisReport {
    let records: Vec<RawRecord> = values.into_iter().map(raw).collect();
    ResearchPipeline::default()
        .run_at(&records, fixed_time())
        .unwrap()
}

#[test]
fn test_reference_market_scenario() {
    let report = run(vec![kenya()]);
    let market = report.efficiency_analysis.market("M-Pesa").unwrap();

    assert_eq!(market.dimensions.operational, dec!(0.9));
    assert_eq!(market.dimensions.network, dec!(0.65));
    assert!(market.friction.has(FrictionKind::CashOutRisk));
    assert_eq!(market.friction.liquidity_ratio, Some(dec!(0.375)));
    assert!(report.onchain_analysis.is_none());
}

#[test]
fn test_source_ranking_scenario() {
    let report = run(vec![kenya()]);
    let ranked = &report.sourcing_analysis.ranked_sources;

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].source_type, "commercial_bank");
    assert_eq!(ranked[0].total_volume, dec!(70));
    assert_eq!(ranked[0].percentage, dec!(70));
    assert_eq!(ranked[1].percentage, dec!(30));
    assert_eq!(
        report.sourcing_analysis.primary_source.source_type(),
        Some("commercial_bank")
    );
    assert!(matches!(
        report.sourcing_analysis.primary_source,
        PrimarySource::Identified { .. }
    ));
}

#[test]
fn test_report_layout_without_onchain_data() {
    let report = run(vec![kenya(), ghana()]);

    assert_eq!(report.markets_analyzed, vec!["M-Pesa", "MTN MoMo"]);
    assert_eq!(report.metadata.providers_analyzed, 2);
    assert_eq!(report.metadata.methodology_version, "2.0");
    assert_eq!(report.metadata.research_questions.len(), 3);
    assert!(report.methodology.onchain_integration.is_none());
    assert!(report.conclusions.onchain.is_empty());
    assert_eq!(
        report.findings[0],
        "2 providers analyzed (2 offchain, 0 onchain, 0 hybrid)"
    );

    let sections = report.sections().unwrap();
    assert!(!sections.contains_key("onchain"));
    assert_eq!(
        sections["metadata"]["metadata"]["generated_at"],
        "2025-06-30T12:00:00Z"
    );
    assert!(report.to_value().unwrap()["onchain_analysis"].is_null());
}

#[test]
fn test_onchain_provider_adds_onchain_analysis() {
    let document = json!({
        "providers": [
            kenya(),
            {
                "name": "Celo Wallet",
                "type": "onchain",
                "tvl_usd": 5000000,
                "daily_volume_usd": 250000,
                "apy_avg": 6,
                "blockchain_metrics": {"celo_daily_tx": 12000},
                "defi_integration": {"smart_contract_risk_score": 0.2},
                "cross_chain_efficiency": {"celo_ethereum_success_rate": 0.98},
                "smart_contract_performance": {
                    "execution_success_rate": 0.99,
                    "cost_per_transaction_usd": 0.01
                }
            }
        ]
    });
    let report = ResearchPipeline::default()
        .run_document(&document, fixed_time())
        .unwrap();

    let onchain = report.onchain_analysis.as_ref().unwrap();
    assert_eq!(onchain.markets.len(), 1);
    let celo = onchain.market("Celo Wallet").unwrap();
    assert_eq!(celo.provider_type, ProviderType::Onchain);
    assert!(celo.onchain_score >= Decimal::ZERO && celo.onchain_score <= dec!(100));
    // Pure onchain providers carry no offchain score to blend with.
    assert_eq!(celo.hybrid_score, None);

    assert!(report.metadata.onchain_included);
    assert!(report.methodology.onchain_integration.is_some());
    assert!(!report.conclusions.onchain.is_empty());
    assert!(report.sections().unwrap().contains_key("onchain"));
    assert_eq!(report.markets_analyzed, vec!["M-Pesa", "Celo Wallet"]);
}

#[test]
fn test_same_input_and_time_serialize_identically() {
    let first = serde_json::to_string(&run(vec![kenya(), ghana()])).unwrap();
    let second = serde_json::to_string(&run(vec![kenya(), ghana()])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_inconsistent_counts_are_warned_not_fatal() {
    let mut value = kenya();
    value["transaction_metrics"] = json!({"attempted": 100, "successful": 95, "failed": 10});
    let report = run(vec![value]);

    assert!(report.warnings.iter().any(|w| w.kind() == "insufficient_data"));
    assert!(report.findings.last().unwrap().contains("insufficient_data"));
    assert_eq!(report.efficiency_analysis.markets.len(), 1);
}

#[test]
fn test_missing_identity_aborts_the_run() {
    let records = vec![raw(json!({"country": "Kenya"}))];
    let err = ResearchPipeline::default()
        .run_at(&records, fixed_time())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Normalize(NormalizeError::MalformedInput {
            index: 0,
            field: "market_name"
        })
    ));
}

#[test]
fn test_empty_batch_has_no_usable_records() {
    let err = ResearchPipeline::default()
        .run_at(&[], fixed_time())
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoUsableRecords));
}

fn generated_market(
    index: usize,
    volumes: Vec<u32>,
    attempted: u32,
    success_pct: u32,
    total_agents: u32,
    active_pct: u32,
) -> Value {
    let sources = ["commercial_bank", "agent_network", "mobile_network_operator"];
    let liquidity: serde_json::Map<String, Value> = sources
        .iter()
        .zip(volumes)
        .map(|(name, volume)| (name.to_string(), json!(volume)))
        .collect();
    let successful = attempted * success_pct / 100;
    let active = total_agents * active_pct / 100;
    json!({
        "market_name": format!("Market {index}"),
        "country": format!("Country {index}"),
        "region": if index % 2 == 0 { "East Africa" } else { "West Africa" },
        "liquidity_sources": liquidity,
        "transaction_metrics": {
            "attempted": attempted,
            "successful": successful,
            "failed": attempted - successful
        },
        "float_metrics": {"total_volume": attempted * 10, "average_float": 50 + index},
        "agent_network": {
            "total": total_agents,
            "active": active,
            "with_liquidity": active / 2,
            "with_cash": active / 3
        }
    })
}

fn market_strategy(index: usize) -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(0u32..1_000_000, 1..=3),
        1u32..100_000,
        0u32..=100,
        1u32..10_000,
        0u32..=100,
    )
        .prop_map(move |(volumes, attempted, success, agents, active)| {
            generated_market(index, volumes, attempted, success, agents, active)
        })
}

fn batch_strategy() -> impl Strategy<Value = Vec<Value>> {
    (1usize..6).prop_flat_map(|n| (0..n).map(market_strategy).collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn test_source_percentages_sum_to_one_hundred(batch in batch_strategy()) {
        let report = run(batch);
        let sourcing = &report.sourcing_analysis;
        if sourcing.grand_total > Decimal::ZERO {
            let sum: Decimal = sourcing.ranked_sources.iter().map(|s| s.percentage).sum();
            prop_assert!((sum - dec!(100)).abs() < dec!(0.0001), "sum = {}", sum);
        } else {
            prop_assert!(matches!(sourcing.primary_source, PrimarySource::InsufficientData));
        }
    }

    #[test]
    fn test_composite_scores_stay_in_range(batch in batch_strategy()) {
        let report = run(batch);
        for market in &report.efficiency_analysis.markets {
            prop_assert!(market.composite_score >= Decimal::ZERO);
            prop_assert!(market.composite_score <= dec!(100));
        }
    }
}
