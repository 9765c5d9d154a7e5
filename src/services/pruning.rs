//! 缓存清理任务
//!
//! 删除黑名单中的记录，并把持久化存储中已不存在的成员移出缓存集合。
//! 移除失败时立即停止，已完成的移除保留，下一轮会继续收敛。

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::models::persona::parse_member;
use crate::services::context::JobContext;
use crate::services::reconciler::Reconciler;

/// 一轮缓存清理的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// 缓存集合的大小
    pub cached: usize,
    /// 因黑名单删除的记录
    pub excluded_deleted: u64,
    /// 仍有记录的成员
    pub still_recorded: usize,
    /// 判定为过期的成员
    pub stale: usize,
    /// 已移出缓存的成员
    pub removed: usize,
}

/// 缓存成员减去仍有记录的 uid；无法解析的成员一律视为过期
pub fn stale_members(cached: &[String], existing: &HashSet<i64>) -> Vec<String> {
    cached
        .iter()
        .filter(|member| match parse_member(member) {
            Some(uid) => !existing.contains(&uid),
            None => true,
        })
        .cloned()
        .collect()
}

impl Reconciler {
    /// 执行一轮缓存清理
    pub async fn prune_cache(&self, ctx: &JobContext) -> Result<PruneReport> {
        let cached = ctx
            .io("cache_members", self.cache.members(&self.keys.vup_list))
            .await?;

        let mut report = PruneReport {
            cached: cached.len(),
            ..Default::default()
        };

        let black_list: Vec<i64> = match ctx
            .io("black_list_members", self.cache.members(&self.keys.black_list))
            .await
        {
            Ok(members) => members.iter().filter_map(|m| parse_member(m)).collect(),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to read black list, skipping excluded deletion: {}", e);
                Vec::new()
            }
        };

        if !black_list.is_empty() {
            report.excluded_deleted = ctx
                .io("delete_excluded", self.repo.delete_by_uids(&black_list))
                .await?;
            if report.excluded_deleted > 0 {
                self.metrics.excluded_deleted.inc_by(report.excluded_deleted);
                info!(
                    deleted = report.excluded_deleted,
                    "Deleted black-listed personas"
                );
            }
        }

        let cached_uids: Vec<i64> = cached.iter().filter_map(|m| parse_member(m)).collect();
        let existing: HashSet<i64> = ctx
            .io("existing_uids", self.repo.existing_uids(&cached_uids))
            .await?
            .into_iter()
            .collect();
        report.still_recorded = existing.len();

        debug!(
            cached = report.cached,
            still_recorded = report.still_recorded,
            "Compared cache with persona store"
        );

        let stale = stale_members(&cached, &existing);
        report.stale = stale.len();

        for member in &stale {
            if let Err(e) = ctx
                .io("cache_remove", self.cache.remove(&self.keys.vup_list, member))
                .await
            {
                if !e.is_cancelled() {
                    error!(member = %member, "Failed to remove stale persona from cache: {}", e);
                }
                self.metrics.cache_removed.inc_by(report.removed as u64);
                return Err(e);
            }
            report.removed += 1;
        }
        self.metrics.cache_removed.inc_by(report.removed as u64);

        if report.removed > 0 {
            info!(removed = report.removed, "Removed stale personas from cache");
        } else {
            debug!("No stale personas in cache");
        }

        Ok(report)
    }
}
