//! Pattern-weight storage.

use std::fmt;

use dashmap::DashMap;

/// Namespace and session a scoring function reads and writes under.
///
/// Weights from different scopes never mix.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct WeightScope {
    pub namespace: String,
    pub session: String,
}

impl WeightScope {
    pub fn new(namespace: impl Into<String>, session: impl Into<String>) -> Self {
        WeightScope {
            namespace: namespace.into(),
            session: session.into(),
        }
    }

    pub fn key(&self, pattern: impl Into<String>) -> PatternKey {
        PatternKey {
            namespace: self.namespace.clone(),
            session: self.session.clone(),
            pattern: pattern.into(),
        }
    }
}

/// Fully qualified key of one learned weight.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatternKey {
    pub namespace: String,
    pub session: String,
    /// `Path::pattern_id` of the pattern.
    pub pattern: String,
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.session, self.pattern)
    }
}

/// Learned weights for path patterns.
///
/// Implementations are injected into a [`ScoringFn`](crate::ScoringFn);
/// nothing in the engine holds a global store.
pub trait PatternWeightStore: Send + Sync {
    /// Current weight in `[0, 1]`, or `None` if the pattern was never seen.
    fn get_weight(&self, key: &PatternKey) -> Option<f64>;

    /// Record an observation in `[0, 1]` (1 = accepted, 0 = rejected).
    fn update_weight(&self, key: &PatternKey, observation: f64);
}

/// Concurrent in-memory store.
///
/// Weights are an exponential moving average of observations. The first
/// observation of a pattern sets its weight directly.
pub struct InMemoryWeights {
    weights: DashMap<PatternKey, f64>,
    rate: f64,
}

impl InMemoryWeights {
    pub const DEFAULT_RATE: f64 = 0.1;

    pub fn new() -> Self {
        InMemoryWeights {
            weights: DashMap::new(),
            rate: Self::DEFAULT_RATE,
        }
    }

    /// Use a different learning rate, clamped to `(0, 1]`.
    #[must_use]
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = if rate.is_finite() && rate > 0.0 {
            rate.min(1.0)
        } else {
            Self::DEFAULT_RATE
        };
        self
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Forget every weight recorded under one session.
    pub fn clear_session(&self, namespace: &str, session: &str) {
        self.weights
            .retain(|key, _| !(key.namespace == namespace && key.session == session));
    }
}

impl Default for InMemoryWeights {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternWeightStore for InMemoryWeights {
    fn get_weight(&self, key: &PatternKey) -> Option<f64> {
        self.weights.get(key).map(|w| *w)
    }

    fn update_weight(&self, key: &PatternKey, observation: f64) {
        if !observation.is_finite() {
            tracing::warn!(%key, observation, "ignoring non-finite weight observation");
            return;
        }
        let observation = observation.clamp(0.0, 1.0);
        let rate = self.rate;
        self.weights
            .entry(key.clone())
            .and_modify(|w| *w += rate * (observation - *w))
            .or_insert(observation);
    }
}

impl fmt::Debug for InMemoryWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryWeights")
            .field("len", &self.weights.len())
            .field("rate", &self.rate)
            .finish()
    }
}
