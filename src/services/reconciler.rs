//! Persona reconciliation engine
//!
//! Owns the collaborators shared by the three periodic jobs. The job bodies
//! live in [`discovery`](super::discovery), [`population`](super::population)
//! and [`pruning`](super::pruning).

use std::fmt;
use std::sync::Arc;

use crate::config::config::{CacheConfig, DiscoveryConfig};
use crate::observability::Metrics;
use crate::services::classifier::PersonaClassifier;
use crate::services::cooldown::CooldownTracker;
use crate::services::snapshot::{LiveSnapshot, SnapshotReader};
use crate::storage::{CacheStore, PersonaRepository};
use crate::upstream::LiveSource;

/// Names of the two cache sets.
#[derive(Debug, Clone)]
pub struct CacheKeys {
    /// known personas
    pub vup_list: String,
    /// excluded personas
    pub black_list: String,
}

impl From<&CacheConfig> for CacheKeys {
    fn from(config: &CacheConfig) -> Self {
        Self {
            vup_list: config.vup_list_key.clone(),
            black_list: config.black_list_key.clone(),
        }
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            vup_list: "vup_list".into(),
            black_list: "vup_black_list".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    Discovery,
    Population,
    Pruning,
}

impl Job {
    pub const ALL: [Job; 3] = [Job::Discovery, Job::Population, Job::Pruning];

    pub fn as_str(&self) -> &'static str {
        match self {
            Job::Discovery => "discovery",
            Job::Population => "population",
            Job::Pruning => "pruning",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Reconciler {
    pub(crate) source: Arc<dyn LiveSource>,
    pub(crate) repo: Arc<dyn PersonaRepository>,
    pub(crate) cache: Arc<dyn CacheStore>,
    pub(crate) keys: CacheKeys,
    pub(crate) classifier: PersonaClassifier,
    pub(crate) cooldown: CooldownTracker,
    pub(crate) snapshot: LiveSnapshot,
    pub(crate) metrics: Arc<Metrics>,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn LiveSource>,
        repo: Arc<dyn PersonaRepository>,
        cache: Arc<dyn CacheStore>,
        keys: CacheKeys,
        config: &DiscoveryConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            source,
            repo,
            cache,
            keys,
            classifier: PersonaClassifier::new(
                config.approved_roles.iter().copied(),
                config.rate_limit_code,
            ),
            cooldown: CooldownTracker::new(config.cooldown()),
            snapshot: LiveSnapshot::new(),
            metrics,
        }
    }

    /// Read-only handle on the latest live snapshot.
    pub fn snapshot(&self) -> SnapshotReader {
        self.snapshot.reader()
    }

    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
