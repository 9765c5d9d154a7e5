//! 虚拟主播分类器
//!
//! 纯判定逻辑，按以下顺序判断一个直播间的主播：
//!
//! 1. 已在缓存集合中 → 已存在
//! 2. 在黑名单中 → 排除
//! 3. 声明的认证角色属于允许集合 → 收录
//! 4. 角色未知且不在冷却中 → 查询用户身份；限流则延后，
//!    认证角色属于允许集合且非机构认证 → 收录
//! 5. 在第三方虚拟主播列表中 → 收录
//! 6. 其他 → 不收录
//!
//! 身份查询本身由调用方执行，分类器只负责判定是否需要查询以及查询后的结论。

use std::collections::HashSet;
use std::fmt;

use crate::models::live::{KnownPersonaList, RoomIdentity, UserLookup};
use crate::models::persona::cache_member;

/// 收录依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedBy {
    /// 直播间资讯中声明的认证角色
    DeclaredRole,
    /// 用户身份查询返回的认证角色
    IdentityLookup,
    /// 第三方虚拟主播列表
    KnownList,
}

/// 分类结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 已在缓存集合中
    Existing,
    /// 在黑名单中
    Excluded,
    /// 收录
    Tracked(TrackedBy),
    /// 身份查询被限流，留待冷却结束后的下一轮
    Deferred,
    /// 身份查询失败，本轮跳过
    LookupFailed,
    /// 不收录
    NotTracked,
}

impl Verdict {
    pub fn is_tracked(&self) -> bool {
        matches!(self, Verdict::Tracked(_))
    }

    /// 指标标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Existing => "existing",
            Verdict::Excluded => "excluded",
            Verdict::Tracked(TrackedBy::DeclaredRole) => "tracked_declared_role",
            Verdict::Tracked(TrackedBy::IdentityLookup) => "tracked_identity_lookup",
            Verdict::Tracked(TrackedBy::KnownList) => "tracked_known_list",
            Verdict::Deferred => "deferred",
            Verdict::LookupFailed => "lookup_failed",
            Verdict::NotTracked => "not_tracked",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 判定所需的外部状态
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomSignals {
    /// uid 已在缓存集合中
    pub in_cache: bool,
    /// uid 在黑名单中
    pub excluded: bool,
    /// uid 正处于限流冷却
    pub cooling_down: bool,
}

/// 第一阶段判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 已得出结论
    Done(Verdict),
    /// 需要查询用户身份后再由 [`PersonaClassifier::after_lookup`] 判定
    Lookup,
}

#[derive(Debug, Clone)]
pub struct PersonaClassifier {
    approved_roles: HashSet<i32>,
    rate_limit_code: i32,
}

impl PersonaClassifier {
    pub fn new(approved_roles: impl IntoIterator<Item = i32>, rate_limit_code: i32) -> Self {
        Self {
            approved_roles: approved_roles.into_iter().collect(),
            rate_limit_code,
        }
    }

    pub fn is_approved(&self, role: i32) -> bool {
        self.approved_roles.contains(&role)
    }

    pub fn is_rate_limited(&self, lookup: &UserLookup) -> bool {
        lookup.rate_limited || lookup.code == self.rate_limit_code
    }

    /// 不需要网络请求的判定
    pub fn before_lookup(
        &self,
        identity: &RoomIdentity,
        signals: RoomSignals,
        known: &KnownPersonaList,
    ) -> Step {
        if signals.in_cache {
            return Step::Done(Verdict::Existing);
        }
        if signals.excluded {
            return Step::Done(Verdict::Excluded);
        }
        if self.is_approved(identity.official_role) {
            return Step::Done(Verdict::Tracked(TrackedBy::DeclaredRole));
        }
        if !identity.role_declared() && !signals.cooling_down {
            return Step::Lookup;
        }
        Step::Done(self.by_known_list(identity.uid, known))
    }

    /// 身份查询之后的判定
    pub fn after_lookup(
        &self,
        identity: &RoomIdentity,
        lookup: &UserLookup,
        known: &KnownPersonaList,
    ) -> Verdict {
        if self.is_rate_limited(lookup) {
            return Verdict::Deferred;
        }
        if lookup.code == 0 && self.is_approved(lookup.role) && !lookup.org_certified {
            return Verdict::Tracked(TrackedBy::IdentityLookup);
        }
        self.by_known_list(identity.uid, known)
    }

    fn by_known_list(&self, uid: i64, known: &KnownPersonaList) -> Verdict {
        if known.contains_key(&cache_member(uid)) {
            Verdict::Tracked(TrackedBy::KnownList)
        } else {
            Verdict::NotTracked
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::live::{KnownPersona, ROLE_UNKNOWN};
    use rstest::rstest;

    fn classifier() -> PersonaClassifier {
        PersonaClassifier::new([1, 2, 3], -412)
    }

    fn identity(uid: i64, role: i32) -> RoomIdentity {
        RoomIdentity {
            room_id: uid * 10,
            uid,
            name: format!("vup-{uid}"),
            user_face: String::new(),
            user_description: String::new(),
            official_role: role,
        }
    }

    fn known(uids: &[i64]) -> KnownPersonaList {
        uids.iter()
            .map(|uid| (uid.to_string(), KnownPersona::default()))
            .collect()
    }

    #[rstest]
    #[case::cached(RoomSignals { in_cache: true, ..Default::default() }, 2, Step::Done(Verdict::Existing))]
    #[case::cached_beats_exclusion(RoomSignals { in_cache: true, excluded: true, ..Default::default() }, 2, Step::Done(Verdict::Existing))]
    #[case::excluded_beats_role(RoomSignals { excluded: true, ..Default::default() }, 1, Step::Done(Verdict::Excluded))]
    #[case::declared_role(RoomSignals::default(), 3, Step::Done(Verdict::Tracked(TrackedBy::DeclaredRole)))]
    #[case::declared_role_while_cooling(RoomSignals { cooling_down: true, ..Default::default() }, 2, Step::Done(Verdict::Tracked(TrackedBy::DeclaredRole)))]
    #[case::unknown_role_needs_lookup(RoomSignals::default(), ROLE_UNKNOWN, Step::Lookup)]
    #[case::cooling_skips_lookup(RoomSignals { cooling_down: true, ..Default::default() }, ROLE_UNKNOWN, Step::Done(Verdict::NotTracked))]
    #[case::declared_unapproved_skips_lookup(RoomSignals::default(), 5, Step::Done(Verdict::NotTracked))]
    fn test_before_lookup(#[case] signals: RoomSignals, #[case] role: i32, #[case] expected: Step) {
        let step = classifier().before_lookup(&identity(100, role), signals, &known(&[]));
        assert_eq!(step, expected);
    }

    #[test]
    fn test_before_lookup_falls_back_to_known_list() {
        let classifier = classifier();
        let list = known(&[100]);

        let cooling = RoomSignals {
            cooling_down: true,
            ..Default::default()
        };
        assert_eq!(
            classifier.before_lookup(&identity(100, ROLE_UNKNOWN), cooling, &list),
            Step::Done(Verdict::Tracked(TrackedBy::KnownList))
        );
        assert_eq!(
            classifier.before_lookup(&identity(100, 6), RoomSignals::default(), &list),
            Step::Done(Verdict::Tracked(TrackedBy::KnownList))
        );
    }

    #[rstest]
    #[case::rate_limited(UserLookup::with_code(-412), &[100], Verdict::Deferred)]
    #[case::transport_rate_limit(UserLookup::rate_limited(-412), &[100], Verdict::Deferred)]
    #[case::approved(UserLookup::ok(1), &[], Verdict::Tracked(TrackedBy::IdentityLookup))]
    #[case::org_certified(UserLookup { org_certified: true, ..UserLookup::ok(3) }, &[], Verdict::NotTracked)]
    #[case::unapproved_role(UserLookup::ok(5), &[], Verdict::NotTracked)]
    #[case::unapproved_but_listed(UserLookup::ok(5), &[100], Verdict::Tracked(TrackedBy::KnownList))]
    #[case::other_error_code(UserLookup::with_code(-404), &[100], Verdict::Tracked(TrackedBy::KnownList))]
    #[case::error_code_ignores_role(UserLookup { code: -400, ..UserLookup::ok(2) }, &[], Verdict::NotTracked)]
    fn test_after_lookup(
        #[case] lookup: UserLookup,
        #[case] listed: &[i64],
        #[case] expected: Verdict,
    ) {
        let verdict =
            classifier().after_lookup(&identity(100, ROLE_UNKNOWN), &lookup, &known(listed));
        assert_eq!(verdict, expected);
    }

    #[test]
    fn test_transport_rate_limit_ignores_configured_code() {
        let classifier = PersonaClassifier::new([1, 2, 3], -352);
        let identity = identity(100, ROLE_UNKNOWN);
        let known = KnownPersonaList::new();

        assert!(classifier.is_rate_limited(&UserLookup::rate_limited(-412)));
        assert_eq!(
            classifier.after_lookup(&identity, &UserLookup::rate_limited(-412), &known),
            Verdict::Deferred
        );
        // a body code only counts when it matches the configured one
        assert_eq!(
            classifier.after_lookup(&identity, &UserLookup::with_code(-412), &known),
            Verdict::NotTracked
        );
        assert_eq!(
            classifier.after_lookup(&identity, &UserLookup::with_code(-352), &known),
            Verdict::Deferred
        );
    }

    #[test]
    fn test_verdict_labels() {
        assert_eq!(Verdict::Deferred.to_string(), "deferred");
        assert!(Verdict::Tracked(TrackedBy::KnownList).is_tracked());
        assert!(!Verdict::Excluded.is_tracked());
    }
}
