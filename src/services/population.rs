//! 缓存补全任务
//!
//! 把持久化存储中尚未进入缓存集合的虚拟主播加入缓存。只增不减。

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::models::persona::{cache_member, parse_member};
use crate::services::context::JobContext;
use crate::services::reconciler::Reconciler;

/// 一轮缓存补全的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulationReport {
    /// 执行前缓存集合的大小
    pub cached: usize,
    /// 需要补全的数量
    pub missing: usize,
    /// 成功加入的数量
    pub added: usize,
    /// 加入失败的数量
    pub failed: usize,
}

impl Reconciler {
    /// 执行一轮缓存补全
    pub async fn populate_cache(&self, ctx: &JobContext) -> Result<PopulationReport> {
        // 读取缓存失败时按空缓存处理，相当于全量补全
        let cached: Vec<i64> = match ctx
            .io("cache_members", self.cache.members(&self.keys.vup_list))
            .await
        {
            Ok(members) => members.iter().filter_map(|m| parse_member(m)).collect(),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                error!("Failed to read persona cache, repopulating from scratch: {}", e);
                Vec::new()
            }
        };
        debug!(cached = cached.len(), "Read persona cache");

        let missing = ctx
            .io("uids_not_in", self.repo.uids_not_in(&cached))
            .await?;

        let mut report = PopulationReport {
            cached: cached.len(),
            missing: missing.len(),
            ..Default::default()
        };
        debug!(missing = report.missing, "Personas missing from cache");

        for uid in missing {
            let member = cache_member(uid);
            match ctx
                .io("cache_add", self.cache.add(&self.keys.vup_list, &member))
                .await
            {
                Ok(()) => {
                    report.added += 1;
                    debug!(uid, "Added persona to cache from population");
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    report.failed += 1;
                    error!(uid, "Failed to add persona to cache: {}", e);
                }
            }
        }

        self.metrics
            .cache_added
            .with_label_values(&["population"])
            .inc_by(report.added as u64);
        if report.added > 0 {
            info!(added = report.added, failed = report.failed, "Populated persona cache");
        }

        Ok(report)
    }
}
