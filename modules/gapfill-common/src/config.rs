use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::{self, DEFAULT_FLOOR, DEFAULT_LADDER, DEFAULT_THRESHOLD, DEFAULT_YEARS};
use crate::error::GapFillError;
use crate::types::RelationshipSpec;

/// TOML-backed configuration. Every section is optional; a missing file
/// yields the built-in defaults. Credentials stay in env vars.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GapFillConfig {
    pub graph: GraphSettings,
    pub matching: MatchingConfig,
    /// rel_type -> initial threshold, overriding the built-in table.
    pub thresholds: BTreeMap<String, f64>,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GraphSettings {
    pub uri: String,
    pub user: String,
    pub database: Option<String>,
    pub fetch_size: usize,
    pub max_connections: usize,
    pub query_timeout_secs: u64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            database: None,
            fetch_size: 500,
            max_connections: 10,
            query_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MatchingConfig {
    /// Initial threshold for rel types with neither an override nor a tuned value.
    pub default_threshold: f64,
    /// Descending thresholds tried for nodes left unmatched after a pass.
    pub ladder: Vec<f64>,
    pub floor: f64,
    /// Exclude nodes with invalid embeddings before matching instead of
    /// letting them score 0.0.
    pub strict_embeddings: bool,
    /// Expected embedding dimensionality, checked in strict mode.
    pub dimensions: Option<usize>,
}

impl MatchingConfig {
    /// Thresholds the adaptive search actually tries.
    pub fn effective_ladder(&self) -> Vec<f64> {
        effective_ladder(&self.ladder, self.floor)
    }
}

/// Ladder steps at or above `floor`, in order, always ending at `floor`
/// so anything scoring at the floor is still reachable.
pub fn effective_ladder(ladder: &[f64], floor: f64) -> Vec<f64> {
    let mut steps: Vec<f64> = ladder.iter().copied().take_while(|t| *t >= floor).collect();
    if steps.last().map_or(true, |last| *last > floor) {
        steps.push(floor);
    }
    steps
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_THRESHOLD,
            ladder: DEFAULT_LADDER.to_vec(),
            floor: DEFAULT_FLOOR,
            strict_embeddings: false,
            dimensions: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    pub years: Vec<i64>,
    pub output_dir: PathBuf,
    /// Number of (spec, year) tasks processed at once. 1 is fully sequential.
    pub max_concurrent_specs: usize,
    pub max_in_flight_writes: usize,
    /// Log persistence progress every N connections.
    pub progress_every: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            years: DEFAULT_YEARS.to_vec(),
            output_dir: PathBuf::from("."),
            max_concurrent_specs: 1,
            max_in_flight_writes: 8,
            progress_every: 500,
        }
    }
}

impl GapFillConfig {
    /// Load from `path` if it exists, then apply env overrides and validate.
    ///
    /// A missing file is only an error when `required` is set (i.e. the
    /// caller named the file explicitly).
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if path.exists() {
            load_config(path)?
        } else if required {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// `NEO4J_URI`, `NEO4J_USER` and `NEO4J_DATABASE` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(uri) = env::var("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Ok(user) = env::var("NEO4J_USER") {
            self.graph.user = user;
        }
        if let Ok(db) = env::var("NEO4J_DATABASE") {
            self.graph.database = Some(db).filter(|d| !d.is_empty());
        }
    }

    pub fn validate(&self) -> Result<(), GapFillError> {
        let m = &self.matching;
        if m.ladder.is_empty() {
            return Err(GapFillError::Config("matching.ladder must not be empty".into()));
        }
        if !m.ladder.windows(2).all(|w| w[0] > w[1]) {
            return Err(GapFillError::Config(
                "matching.ladder must be strictly descending".into(),
            ));
        }
        check_unit("matching.floor", m.floor)?;
        check_unit("matching.default_threshold", m.default_threshold)?;
        for t in &m.ladder {
            check_unit("matching.ladder", *t)?;
        }
        for (rel, t) in &self.thresholds {
            check_unit(&format!("thresholds.{rel}"), *t)?;
        }
        if m.dimensions == Some(0) {
            return Err(GapFillError::Config("matching.dimensions must be positive".into()));
        }
        if self.run.max_concurrent_specs == 0 || self.run.max_in_flight_writes == 0 {
            return Err(GapFillError::Config(
                "run.max_concurrent_specs and run.max_in_flight_writes must be at least 1".into(),
            ));
        }
        if self.run.progress_every == 0 {
            return Err(GapFillError::Config("run.progress_every must be at least 1".into()));
        }
        if self.run.years.is_empty() {
            return Err(GapFillError::Config("run.years must not be empty".into()));
        }
        Ok(())
    }

    /// Starting threshold for `rel_type`: file override, then tuned table, then default.
    pub fn threshold_for(&self, rel_type: &str) -> f64 {
        self.thresholds
            .get(rel_type)
            .copied()
            .or_else(|| catalog::tuned_threshold(rel_type))
            .unwrap_or(self.matching.default_threshold)
    }

    /// The relationship catalog with thresholds resolved against this config.
    pub fn catalog(&self) -> Vec<RelationshipSpec> {
        catalog::relationship_catalog(|rel| self.threshold_for(rel))
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), GapFillError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GapFillError::Config(format!("{name} must be within [0, 1], got {value}")))
    }
}

/// Load and parse a TOML config file.
pub fn load_config(path: &Path) -> Result<GapFillConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: GapFillConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Graph store credentials, loaded from the environment only.
#[derive(Clone)]
pub struct Credentials {
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, GapFillError> {
        let password = env::var("NEO4J_PASSWORD").map_err(|_| {
            GapFillError::Config("NEO4J_PASSWORD environment variable is required".into())
        })?;
        Ok(Self { password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &redact(&self.password))
            .finish()
    }
}

/// Log the effective graph settings with the secret redacted.
pub fn log_redacted(settings: &GraphSettings, credentials: &Credentials) {
    tracing::info!(
        uri = settings.uri.as_str(),
        user = settings.user.as_str(),
        database = settings.database.as_deref().unwrap_or("<default>"),
        password = redact(&credentials.password).as_str(),
        "Graph store config loaded"
    );
}

fn redact(val: &str) -> String {
    if val.is_empty() {
        "<not set>".to_string()
    } else {
        format!("***({} chars)", val.len())
    }
}
