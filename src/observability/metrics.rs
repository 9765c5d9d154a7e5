//! Prometheus 指标

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// 对账引擎指标
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// 任务执行次数（job, outcome）
    pub job_runs: IntCounterVec,
    /// 因上一次仍在执行而跳过的次数（job）
    pub job_skipped: IntCounterVec,
    /// 任务耗时（job）
    pub job_duration: HistogramVec,
    /// 分类结论（verdict）
    pub verdicts: IntCounterVec,
    /// 新插入的虚拟主播
    pub personas_inserted: IntCounter,
    /// 因冲突被忽略的插入行
    pub personas_ignored: IntCounter,
    /// 写入缓存集合的成员（job）
    pub cache_added: IntCounterVec,
    /// 移出缓存集合的成员
    pub cache_removed: IntCounter,
    /// 因黑名单删除的记录
    pub excluded_deleted: IntCounter,
    /// 最近一次快照中的直播间数量
    pub live_rooms: IntGauge,
    /// 冷却中的用户数量
    pub cooldown_entries: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("vup_tracker".into()), None)?;

        let job_runs = IntCounterVec::new(
            Opts::new("job_runs_total", "Reconciliation job runs by outcome"),
            &["job", "outcome"],
        )?;
        let job_skipped = IntCounterVec::new(
            Opts::new("job_skipped_total", "Job launches skipped because a run was in flight"),
            &["job"],
        )?;
        let job_duration = HistogramVec::new(
            HistogramOpts::new("job_duration_seconds", "Reconciliation job duration")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0]),
            &["job"],
        )?;
        let verdicts = IntCounterVec::new(
            Opts::new("classifier_verdicts_total", "Persona classifier verdicts"),
            &["verdict"],
        )?;
        let personas_inserted =
            IntCounter::new("personas_inserted_total", "Personas inserted into the store")?;
        let personas_ignored = IntCounter::new(
            "personas_ignored_total",
            "Persona rows ignored because the uid already existed",
        )?;
        let cache_added = IntCounterVec::new(
            Opts::new("cache_added_total", "Members added to the persona cache set"),
            &["job"],
        )?;
        let cache_removed =
            IntCounter::new("cache_removed_total", "Stale members removed from the cache set")?;
        let excluded_deleted = IntCounter::new(
            "excluded_deleted_total",
            "Persona records deleted because they are black-listed",
        )?;
        let live_rooms = IntGauge::new("live_rooms", "Rooms in the latest live snapshot")?;
        let cooldown_entries =
            IntGauge::new("cooldown_entries", "Identities currently in lookup cooldown")?;

        registry.register(Box::new(job_runs.clone()))?;
        registry.register(Box::new(job_skipped.clone()))?;
        registry.register(Box::new(job_duration.clone()))?;
        registry.register(Box::new(verdicts.clone()))?;
        registry.register(Box::new(personas_inserted.clone()))?;
        registry.register(Box::new(personas_ignored.clone()))?;
        registry.register(Box::new(cache_added.clone()))?;
        registry.register(Box::new(cache_removed.clone()))?;
        registry.register(Box::new(excluded_deleted.clone()))?;
        registry.register(Box::new(live_rooms.clone()))?;
        registry.register(Box::new(cooldown_entries.clone()))?;

        Ok(Self {
            registry,
            job_runs,
            job_skipped,
            job_duration,
            verdicts,
            personas_inserted,
            personas_ignored,
            cache_added,
            cache_removed,
            excluded_deleted,
            live_rooms,
            cooldown_entries,
        })
    }

    /// 生成 Prometheus 文本格式指标
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
