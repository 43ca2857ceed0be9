//! Numeric extraction from noisy raw values.

use configuration::NormalizerConfig;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use std::str::FromStr;
use std::sync::LazyLock;

/// The first number in a string: optional sign, digits with thousands separators,
/// optional fraction.
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?(?:\d[\d,]*(?:\.\d+)?|\.\d+)").expect("static regex")
});

/// A cleaned numeric value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedValue {
    /// The number after the unit multiplier was applied.
    pub value: Decimal,
    pub unit: Option<String>,
    pub multiplier: Decimal,
    /// The unit was not found in the multiplier table; a multiplier of 1 was used.
    pub unknown_unit: bool,
}

/// Why a raw value could not be turned into a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseIssue {
    Empty,
    NoDigits,
    Unparseable(String),
    NotNumeric(&'static str),
    /// The number times its unit multiplier does not fit in a `Decimal`.
    OutOfRange(String),
}

impl std::fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseIssue::Empty => write!(f, "empty value"),
            ParseIssue::NoDigits => write!(f, "no digits found"),
            ParseIssue::Unparseable(text) => write!(f, "'{text}' is not a valid number"),
            ParseIssue::NotNumeric(kind) => write!(f, "expected a number, found {kind}"),
            ParseIssue::OutOfRange(text) => write!(f, "'{text}' is out of range"),
        }
    }
}

/// Splits raw values into number and unit using the configured multiplier table.
pub struct NumericParser<'a> {
    config: &'a NormalizerConfig,
}

impl<'a> NumericParser<'a> {
    pub fn new(config: &'a NormalizerConfig) -> Self {
        Self { config }
    }

    /// Parses a JSON value. Numbers pass through untouched; strings are cleaned.
    pub fn parse(&self, raw: &Value) -> Result<ParsedValue, ParseIssue> {
        match raw {
            Value::Number(n) => {
                let value = if let Some(i) = n.as_i64() {
                    Some(Decimal::from(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Decimal::from(u))
                } else {
                    n.as_f64().and_then(Decimal::from_f64)
                };
                value
                    .map(|value| ParsedValue {
                        value,
                        unit: None,
                        multiplier: Decimal::ONE,
                        unknown_unit: false,
                    })
                    .ok_or_else(|| ParseIssue::Unparseable(n.to_string()))
            }
            Value::String(text) => self.parse_text(text),
            Value::Bool(_) => Err(ParseIssue::NotNumeric("a boolean")),
            Value::Array(_) => Err(ParseIssue::NotNumeric("a list")),
            Value::Object(_) => Err(ParseIssue::NotNumeric("an object")),
            Value::Null => Err(ParseIssue::Empty),
        }
    }

    /// Parses text such as `"KShs 45.2 Billion"`, `"98.5%"` or `"$1,200"`.
    pub fn parse_text(&self, text: &str) -> Result<ParsedValue, ParseIssue> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ParseIssue::Empty);
        }

        let found = NUMBER_RE.find(trimmed).ok_or(ParseIssue::NoDigits)?;
        let digits = found.as_str().replace(',', "");
        let number = Decimal::from_str(&digits)
            .map_err(|_| ParseIssue::Unparseable(found.as_str().to_string()))?;

        // The unit is the word glued to or following the number; anything before the
        // number (currency symbols and codes) is noise.
        let unit: String = trimmed[found.end()..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphabetic() || *c == '%')
            .collect();

        if unit.is_empty() {
            return Ok(ParsedValue {
                value: number,
                unit: None,
                multiplier: Decimal::ONE,
                unknown_unit: false,
            });
        }

        match self.config.multiplier_for(&unit) {
            Some(multiplier) => Ok(ParsedValue {
                value: number
                    .checked_mul(multiplier)
                    .ok_or_else(|| ParseIssue::OutOfRange(trimmed.to_string()))?,
                unit: Some(unit),
                multiplier,
                unknown_unit: false,
            }),
            None => Ok(ParsedValue {
                value: number,
                unit: Some(unit),
                multiplier: Decimal::ONE,
                unknown_unit: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn parse(raw: Value) -> Result<ParsedValue, ParseIssue> {
        let config = NormalizerConfig::default();
        NumericParser::new(&config).parse(&raw)
    }

    #[test]
    fn test_currency_and_unit_are_separated() {
        let parsed = parse(json!("KShs 45.2 Billion")).unwrap();
        assert_eq!(parsed.value, dec!(45200000000));
        assert_eq!(parsed.unit.as_deref(), Some("Billion"));
        assert_eq!(parsed.multiplier, dec!(1000000000));
        assert!(!parsed.unknown_unit);
    }

    #[test]
    fn test_percent_and_separators() {
        assert_eq!(parse(json!("98.5%")).unwrap().value, dec!(0.985));
        assert_eq!(parse(json!("$1,250,000")).unwrap().value, dec!(1250000));
        assert_eq!(parse(json!("USD 3.4M")).unwrap().value, dec!(3400000));
        assert_eq!(parse(json!("  -12.5 ")).unwrap().value, dec!(-12.5));
    }

    #[test]
    fn test_plain_numbers_pass_through() {
        assert_eq!(parse(json!(1200)).unwrap().value, dec!(1200));
        assert_eq!(parse(json!(0.25)).unwrap().value, dec!(0.25));
    }

    #[test]
    fn test_unknown_unit_is_flagged() {
        let parsed = parse(json!("12,000 agents")).unwrap();
        assert_eq!(parsed.value, dec!(12000));
        assert_eq!(parsed.multiplier, Decimal::ONE);
        assert!(parsed.unknown_unit);
    }

    #[test]
    fn test_failures_are_reported() {
        assert_eq!(parse(json!("n/a")), Err(ParseIssue::NoDigits));
        assert_eq!(parse(json!("   ")), Err(ParseIssue::Empty));
        assert_eq!(parse(json!(true)), Err(ParseIssue::NotNumeric("a boolean")));
    }

    #[test]
    fn test_scaled_value_beyond_decimal_range() {
        assert_eq!(
            parse(json!("99999999999999999999 trillion")),
            Err(ParseIssue::OutOfRange("99999999999999999999 trillion".to_string()))
        );
    }
}
