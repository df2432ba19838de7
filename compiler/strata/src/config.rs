//! Engine configuration.

use std::time::Duration;

use strata_cache::{DEFAULT_GRAMMAR_CAPACITY, DEFAULT_PATH_CAPACITY};
use strata_compose::ScoreBlend;
use strata_repair::{Exclusion, RepairConfig};
use strata_solver::{SearchOptions, DEFAULT_MAX_CANDIDATES, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS};

/// Knobs for one [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub path_cache_capacity: usize,
    pub grammar_cache_capacity: usize,
    pub max_depth: u32,
    pub max_paths: usize,
    pub max_candidates: usize,
    pub max_attempts: u32,
    pub validation_timeout: Duration,
    pub decode_timeout: Duration,
    pub blend: ScoreBlend,
    /// What a type diagnostic excludes on refinement.
    pub exclusion: Exclusion,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            path_cache_capacity: DEFAULT_PATH_CAPACITY,
            grammar_cache_capacity: DEFAULT_GRAMMAR_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
            max_paths: DEFAULT_MAX_PATHS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_attempts: 3,
            validation_timeout: Duration::from_secs(10),
            decode_timeout: Duration::from_secs(30),
            blend: ScoreBlend::DEFAULT,
            exclusion: Exclusion::Offered,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `STRATA_*` environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `STRATA_PATH_CACHE` | `path_cache_capacity` |
    /// | `STRATA_GRAMMAR_CACHE` | `grammar_cache_capacity` |
    /// | `STRATA_MAX_DEPTH` | `max_depth` |
    /// | `STRATA_MAX_PATHS` | `max_paths` |
    /// | `STRATA_MAX_CANDIDATES` | `max_candidates` |
    /// | `STRATA_MAX_ATTEMPTS` | `max_attempts` |
    /// | `STRATA_VALIDATION_TIMEOUT_MS` | `validation_timeout` |
    /// | `STRATA_DECODE_TIMEOUT_MS` | `decode_timeout` |
    /// | `STRATA_SCORE_BLEND` | `blend` |
    /// | `STRATA_REFINE_EXCLUSION` | `exclusion` (`offered` or `used`) |
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlay values looked up by variable name.
    #[must_use]
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).map(|raw| (name.to_owned(), raw));

        if let Some(v) = var("STRATA_PATH_CACHE").and_then(parsed) {
            self.path_cache_capacity = v;
        }
        if let Some(v) = var("STRATA_GRAMMAR_CACHE").and_then(parsed) {
            self.grammar_cache_capacity = v;
        }
        if let Some(v) = var("STRATA_MAX_DEPTH").and_then(parsed) {
            self.max_depth = v;
        }
        if let Some(v) = var("STRATA_MAX_PATHS").and_then(parsed) {
            self.max_paths = v;
        }
        if let Some(v) = var("STRATA_MAX_CANDIDATES").and_then(parsed) {
            self.max_candidates = v;
        }
        if let Some(v) = var("STRATA_MAX_ATTEMPTS").and_then(parsed) {
            self.max_attempts = v;
        }
        if let Some(ms) = var("STRATA_VALIDATION_TIMEOUT_MS").and_then(parsed) {
            self.validation_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = var("STRATA_DECODE_TIMEOUT_MS").and_then(parsed) {
            self.decode_timeout = Duration::from_millis(ms);
        }
        if let Some(blend) = var("STRATA_SCORE_BLEND").and_then(parsed::<f64>) {
            if (0.0..=1.0).contains(&blend) {
                self.blend = ScoreBlend::new(blend);
            } else {
                tracing::warn!(blend, "STRATA_SCORE_BLEND outside [0, 1], ignored");
            }
        }
        if let Some(raw) = lookup("STRATA_REFINE_EXCLUSION") {
            match raw.trim() {
                "offered" => self.exclusion = Exclusion::Offered,
                "used" => self.exclusion = Exclusion::Used,
                other => {
                    tracing::warn!(value = other, "unknown STRATA_REFINE_EXCLUSION, ignored");
                }
            }
        }
        self
    }

    /// Search options for a top-level solve.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            max_paths: self.max_paths,
            max_candidates: self.max_candidates,
            ..SearchOptions::with_max_depth(self.max_depth)
        }
    }

    pub fn repair_config(&self) -> RepairConfig {
        RepairConfig {
            max_attempts: self.max_attempts,
            validation_timeout: self.validation_timeout,
            decode_timeout: self.decode_timeout,
            max_depth: self.max_depth,
            exclusion: self.exclusion,
        }
    }
}

fn parsed<T: std::str::FromStr>((name, raw): (String, String)) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = %name, value = %raw, "invalid configuration value, ignored");
            None
        }
    }
}
