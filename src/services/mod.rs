//! 业务服务模块
//!
//! 虚拟主播发现、缓存补全与缓存清理三个周期任务，以及它们共享的
//! 分类器、冷却表、直播快照与调度器。

pub mod classifier;
pub mod context;
pub mod cooldown;
pub mod discovery;
pub mod population;
pub mod pruning;
pub mod reconciler;
pub mod scheduler;
pub mod snapshot;

pub use classifier::{PersonaClassifier, RoomSignals, Step, TrackedBy, Verdict};
pub use context::JobContext;
pub use cooldown::CooldownTracker;
pub use discovery::DiscoveryReport;
pub use population::PopulationReport;
pub use pruning::{PruneReport, stale_members};
pub use reconciler::{CacheKeys, Job, Reconciler};
pub use scheduler::{JobReport, Scheduler};
pub use snapshot::{LiveSnapshot, SnapshotReader};
