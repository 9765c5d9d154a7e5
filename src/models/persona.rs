use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::live::RoomIdentity;

/// 虚拟主播实体
///
/// 持久化存储中的记录，`uid` 为上游分配的自然键。
/// 只由发现任务创建，之后不再被本服务修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    /// 用户 ID
    pub uid: i64,
    /// 显示名称
    pub name: String,
    /// 头像地址
    pub face: String,
    /// 直播间号
    pub room_id: i64,
    /// 个人简介
    pub sign: String,
    /// 首次被监听到的时间
    pub first_listen_at: DateTime<Utc>,
}

impl Persona {
    /// 从直播间资讯创建，首次监听时间为当前时间
    pub fn from_identity(identity: &RoomIdentity) -> Self {
        Self::observed_at(identity, Utc::now())
    }

    pub fn observed_at(identity: &RoomIdentity, at: DateTime<Utc>) -> Self {
        Self {
            uid: identity.uid,
            name: identity.name.clone(),
            face: identity.user_face.clone(),
            room_id: identity.room_id,
            sign: identity.user_description.clone(),
            first_listen_at: at,
        }
    }

    /// 缓存集合中的成员表示
    pub fn cache_member(&self) -> String {
        cache_member(self.uid)
    }
}

/// 用户 ID 在缓存集合中的字符串形式
pub fn cache_member(uid: i64) -> String {
    uid.to_string()
}

/// 解析缓存集合成员，无法解析时返回 `None`
pub fn parse_member(member: &str) -> Option<i64> {
    member.trim().parse().ok()
}
