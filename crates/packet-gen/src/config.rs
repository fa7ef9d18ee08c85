use packet_core::assembly::AssemblyConfig;
use packet_core::assembly::arrange::Arranger;
use packet_core::assembly::difficulty::Jitter;
use packet_core::assembly::order::ORDER_STRIDE;
use packet_core::model::category::{Category, CategoryMap};
use packet_core::model::round::RoundLayout;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root generator configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeneratorConfig {
    pub run_id: String,
    pub input: String,
    #[serde(default)]
    pub seed: Option<u64>,
    pub rounds: RoundsConfig,
    /// Pairs per round, keyed by category label.
    pub quotas: BTreeMap<String, usize>,
    #[serde(default)]
    pub arrangement: ArrangementConfig,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GeneratorConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: GeneratorConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        if self.input.trim().is_empty() {
            return Err(ValidationError::field("input", "input path must not be empty"));
        }
        self.rounds.validate()?;
        validate_quotas(&self.quotas)?;
        self.arrangement.validate()?;
        self.difficulty.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    pub fn input_path(&self) -> PathBuf {
        resolve_template(&self.run_id, &self.input)
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            table_csv: resolve_template(&self.run_id, &self.outputs.table_csv),
            table_json: resolve_template(&self.run_id, &self.outputs.table_json),
            rounds_dir: resolve_template(&self.run_id, &self.outputs.rounds_dir),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }

    /// Engine parameters for a validated configuration. Categories without a
    /// quota entry get zero.
    pub fn assembly_config(&self) -> AssemblyConfig {
        let mut quotas: CategoryMap<usize> = CategoryMap::default();
        for (label, &quota) in &self.quotas {
            if let Some(category) = Category::from_label(label) {
                quotas[category] = quota;
            }
        }

        let mut config = AssemblyConfig::new(quotas, self.rounds.count)
            .with_seed(self.seed.unwrap_or(0))
            .with_jitter(Jitter::uniform(self.difficulty.jitter));
        config.layout = RoundLayout {
            round_count: self.rounds.count,
            tiebreak_count: self.rounds.tiebreak_count,
            tiebreak_offset: self.rounds.tiebreak_offset,
        };
        config.arranger = Arranger {
            chunk_size: self.arrangement.chunk_size,
            max_attempts: self.arrangement.max_attempts,
            warn_after: self.arrangement.warn_after,
        };
        config
    }
}

/// Round layout block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RoundsConfig {
    pub count: u32,
    #[serde(default = "default_tiebreak_count")]
    pub tiebreak_count: u32,
    #[serde(default = "default_tiebreak_offset")]
    pub tiebreak_offset: u32,
}

impl RoundsConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::field(
                "rounds.count",
                "number of rounds must be greater than zero",
            ));
        }

        if self.tiebreak_offset < self.count {
            return Err(ValidationError::field(
                "rounds.tiebreak_offset",
                format!(
                    "offset {} overlaps the {} regular rounds",
                    self.tiebreak_offset, self.count
                ),
            ));
        }

        Ok(())
    }
}

fn default_tiebreak_count() -> u32 {
    RoundLayout::DEFAULT_TIEBREAK_COUNT
}

fn default_tiebreak_offset() -> u32 {
    RoundLayout::DEFAULT_TIEBREAK_OFFSET
}

/// Intra-round arrangement block.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ArrangementConfig {
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_warn_after")]
    pub warn_after: usize,
}

impl Default for ArrangementConfig {
    fn default() -> Self {
        Self {
            chunk_size: None,
            max_attempts: default_max_attempts(),
            warn_after: default_warn_after(),
        }
    }
}

impl ArrangementConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.chunk_size == Some(0) {
            return Err(ValidationError::field(
                "arrangement.chunk_size",
                "chunk size must be at least 1",
            ));
        }

        if self.max_attempts == 0 {
            return Err(ValidationError::field(
                "arrangement.max_attempts",
                "max attempts must be at least 1",
            ));
        }

        Ok(())
    }
}

fn default_max_attempts() -> usize {
    Arranger::DEFAULT_MAX_ATTEMPTS
}

fn default_warn_after() -> usize {
    Arranger::DEFAULT_WARN_AFTER
}

/// Difficulty jitter block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DifficultyConfig {
    /// Amplitude of uniform jitter; zero disables it.
    #[serde(default)]
    pub jitter: f64,
}

impl DifficultyConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(ValidationError::field(
                "difficulty.jitter",
                "jitter amplitude must be a non-negative number",
            ));
        }
        Ok(())
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub table_csv: String,
    pub table_json: String,
    pub rounds_dir: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.table_csv", &self.table_csv),
            ("outputs.table_json", &self.table_json),
            ("outputs.rounds_dir", &self.rounds_dir),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::field(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::field(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to human-readable output at `info`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::field("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::field(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn validate_quotas(quotas: &BTreeMap<String, usize>) -> Result<(), ValidationError> {
    let mut seen: CategoryMap<Option<&str>> = CategoryMap::default();
    for (label, &quota) in quotas {
        let Some(category) = Category::from_label(label) else {
            return Err(ValidationError::field(
                format!("quotas.{label}"),
                "not one of Math, Biology, Chemistry, Physics, Earth and Space, Energy",
            ));
        };

        if let Some(previous) = seen[category] {
            return Err(ValidationError::field(
                format!("quotas.{label}"),
                format!("'{previous}' already sets the {category} quota"),
            ));
        }
        seen[category] = Some(label.as_str());

        if quota > ORDER_STRIDE as usize {
            return Err(ValidationError::field(
                format!("quotas.{label}"),
                format!("at most {ORDER_STRIDE} pairs per round are supported, got {quota}"),
            ));
        }
    }

    if quotas.values().all(|&quota| quota == 0) {
        return Err(ValidationError::field(
            "quotas",
            "at least one category needs a non-zero quota",
        ));
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub table_csv: PathBuf,
    pub table_json: PathBuf,
    pub rounds_dir: PathBuf,
    pub summary_md: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
