//! 上游数据源
//!
//! 直播间列表、直播间主播资讯、用户身份查询与第三方虚拟主播列表。

pub mod http;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::live::{KnownPersonaList, RoomIdentity, UserLookup};

pub use http::HttpLiveSource;

/// 远程快照数据源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// 当前正在直播的直播间号
    async fn live_rooms(&self) -> Result<Vec<i64>>;

    /// 直播间的主播资讯
    async fn room_identity(&self, room_id: i64) -> Result<RoomIdentity>;

    /// 用户身份查询，限流时返回对应的响应码而非错误
    async fn lookup_identity(&self, uid: i64) -> Result<UserLookup>;

    /// 第三方虚拟主播列表
    async fn known_personas(&self) -> Result<KnownPersonaList>;
}
