//! 发现任务
//!
//! 拉取正在直播的直播间，对尚未记录的主播进行分类，
//! 把新确认的虚拟主播批量写入持久化存储并加入缓存集合。

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::models::live::{KnownPersonaList, RoomIdentity};
use crate::models::persona::{Persona, cache_member};
use crate::services::classifier::{RoomSignals, Step, Verdict};
use crate::services::context::JobContext;
use crate::services::reconciler::Reconciler;

/// 一轮发现任务的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// 快照中的直播间数量
    pub live_rooms: usize,
    /// 直播间已有记录
    pub recorded: usize,
    /// 已在缓存集合中
    pub existing: usize,
    /// 在黑名单中
    pub excluded: usize,
    /// 不是虚拟主播
    pub not_tracked: usize,
    /// 因限流延后
    pub deferred: usize,
    /// 直播间资讯或身份查询失败
    pub failed: usize,
    /// 待插入的虚拟主播
    pub to_insert: usize,
    /// 实际插入的行数
    pub inserted: u64,
    /// 因已存在被忽略的行数
    pub ignored: u64,
    /// 成功写入缓存集合的数量
    pub cache_added: usize,
}

impl DiscoveryReport {
    fn tally(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Existing => self.existing += 1,
            Verdict::Excluded => self.excluded += 1,
            Verdict::NotTracked => self.not_tracked += 1,
            Verdict::Deferred => self.deferred += 1,
            Verdict::LookupFailed => self.failed += 1,
            Verdict::Tracked(_) => {}
        }
    }
}

impl Reconciler {
    /// 执行一轮发现任务
    ///
    /// 拉取快照与批量查询已记录直播间失败时整轮中止；第三方列表拉取失败时按空列表处理；
    /// 单个直播间的失败只跳过该直播间。
    pub async fn discover(&self, ctx: &JobContext) -> Result<DiscoveryReport> {
        let rooms = ctx.io("live_rooms", self.source.live_rooms()).await?;
        self.snapshot.publish(rooms.clone());
        self.metrics.live_rooms.set(rooms.len() as i64);

        let recorded: HashSet<i64> = ctx
            .io("recorded_rooms", self.repo.recorded_rooms(&rooms))
            .await?
            .into_iter()
            .collect();

        debug!(
            live_rooms = rooms.len(),
            recorded = recorded.len(),
            "Fetched recorded rooms among live rooms"
        );

        let known = match ctx.io("known_personas", self.source.known_personas()).await {
            Ok(list) => list,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to fetch known persona list, classifying without it: {}", e);
                KnownPersonaList::new()
            }
        };

        let mut report = DiscoveryReport {
            live_rooms: rooms.len(),
            ..Default::default()
        };
        let mut batch: HashMap<i64, Persona> = HashMap::new();

        // 只处理尚未记录的直播间
        for &room_id in &rooms {
            if recorded.contains(&room_id) {
                report.recorded += 1;
                continue;
            }

            let identity = match ctx
                .io("room_identity", self.source.room_identity(room_id))
                .await
            {
                Ok(identity) => identity,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    error!(room_id, "Failed to fetch room identity: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            let verdict = self.classify(ctx, &identity, &known).await?;
            self.metrics
                .verdicts
                .with_label_values(&[verdict.as_str()])
                .inc();

            if verdict.is_tracked() {
                debug!(room_id, uid = identity.uid, %verdict, "Persona qualifies");
                batch.insert(identity.uid, Persona::from_identity(&identity));
            } else {
                report.tally(verdict);
            }
        }

        self.metrics.cooldown_entries.set(self.cooldown.len() as i64);

        if batch.is_empty() {
            info!(
                live_rooms = report.live_rooms,
                "Discovery finished, no new personas to insert"
            );
            return Ok(report);
        }

        report.to_insert = batch.len();
        debug!(
            live_rooms = report.live_rooms,
            recorded = report.recorded,
            existing = report.existing,
            not_tracked = report.not_tracked,
            excluded = report.excluded,
            deferred = report.deferred,
            to_insert = report.to_insert,
            "Classification finished"
        );

        let personas: Vec<Persona> = batch.into_values().collect();
        let inserted = ctx
            .io("insert_personas", self.repo.insert_ignore(&personas))
            .await?;
        report.inserted = inserted;
        report.ignored = (personas.len() as u64).saturating_sub(inserted);
        self.metrics.personas_inserted.inc_by(report.inserted);
        self.metrics.personas_ignored.inc_by(report.ignored);

        if report.inserted > 0 {
            info!(
                inserted = report.inserted,
                ignored = report.ignored,
                "Inserted new personas"
            );
        } else {
            debug!(ignored = report.ignored, "All persona rows already existed");
        }

        // 缓存以完整为目标，无论实际插入多少行都写入整批
        for persona in &personas {
            let member = persona.cache_member();
            match ctx
                .io("cache_add", self.cache.add(&self.keys.vup_list, &member))
                .await
            {
                Ok(()) => {
                    report.cache_added += 1;
                    debug!(uid = persona.uid, "Added persona to cache from discovery");
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => error!(uid = persona.uid, "Failed to add persona to cache: {}", e),
            }
        }
        self.metrics
            .cache_added
            .with_label_values(&["discovery"])
            .inc_by(report.cache_added as u64);

        Ok(report)
    }

    /// 对单个直播间的主播分类，只有取消会作为错误返回
    async fn classify(
        &self,
        ctx: &JobContext,
        identity: &RoomIdentity,
        known: &KnownPersonaList,
    ) -> Result<Verdict> {
        let uid = identity.uid;
        let member = cache_member(uid);

        let in_cache = self.is_member(ctx, &self.keys.vup_list, &member).await?;
        let excluded = if in_cache {
            false
        } else {
            self.is_member(ctx, &self.keys.black_list, &member).await?
        };

        let signals = RoomSignals {
            in_cache,
            excluded,
            cooling_down: self.cooldown.has(uid),
        };

        match self.classifier.before_lookup(identity, signals, known) {
            Step::Done(verdict) => Ok(verdict),
            Step::Lookup => {
                let lookup = match ctx
                    .io("lookup_identity", self.source.lookup_identity(uid))
                    .await
                {
                    Ok(lookup) => lookup,
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        error!(
                            room_id = identity.room_id,
                            uid,
                            name = %identity.name,
                            "Failed to look up user identity: {}", e
                        );
                        return Ok(Verdict::LookupFailed);
                    }
                };

                let verdict = self.classifier.after_lookup(identity, &lookup, known);
                if verdict == Verdict::Deferred {
                    self.cooldown.add(uid);
                    warn!(
                        uid,
                        name = %identity.name,
                        cooldown = ?self.cooldown.duration(),
                        "Identity lookup rate limited, added to cooldown"
                    );
                }
                Ok(verdict)
            }
        }
    }

    /// 查询集合成员；缓存出错时记录警告并视为不在集合中
    async fn is_member(&self, ctx: &JobContext, key: &str, member: &str) -> Result<bool> {
        match ctx.io("cache_contains", self.cache.contains(key, member)).await {
            Ok(found) => Ok(found),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!(key, member, "Failed to check cache membership: {}", e);
                Ok(false)
            }
        }
    }
}
