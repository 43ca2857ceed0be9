use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    DimensionWeights, EfficiencyConfig, FrictionThresholds, GradeThresholds, NormalizerConfig,
    OnchainConfig, QualityWeights, ResearchConfig, SubscoreWeights,
};

/// The file `load_config` reads when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "research.toml";

/// Prefix of the environment variables that override file values,
/// e.g. `LAVA__ONCHAIN__OFFCHAIN_BLEND_WEIGHT=0.6`.
pub const ENV_PREFIX: &str = "LAVA";

/// Loads the research configuration from `research.toml` in the working directory.
pub fn load_config() -> Result<ResearchConfig, ConfigError> {
    load_config_from(DEFAULT_CONFIG_FILE)
}

/// Loads the research configuration from the given TOML file.
///
/// The file is optional: any section or field it omits keeps its default. Environment
/// variables prefixed with `LAVA__` are layered on top. The result is validated before
/// it is returned.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<ResearchConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<ResearchConfig>()?;
    config.validate()?;

    tracing::debug!(path = %path.as_ref().display(), "Research configuration loaded.");
    Ok(config)
}

/// Parses a configuration from TOML text. Environment overrides are not applied.
pub fn config_from_toml_str(toml: &str) -> Result<ResearchConfig, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<ResearchConfig>()?;
    config.validate()?;
    Ok(config)
}
