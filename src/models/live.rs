//! 直播相关的上游数据结构

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 未声明认证角色
pub const ROLE_UNKNOWN: i32 = -1;

/// 机构认证的 official type
pub const OFFICIAL_TYPE_ORGANIZATION: i32 = 1;

fn role_unknown() -> i32 {
    ROLE_UNKNOWN
}

/// 监听服务返回的直播间列表
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ListeningStats {
    /// 正在监听的直播间数量
    pub total_listening_count: usize,
    /// 正在监听的直播间号
    pub rooms: Vec<i64>,
}

/// 直播间的主播资讯
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomIdentity {
    pub room_id: i64,
    pub uid: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_face: String,
    #[serde(default)]
    pub user_description: String,
    /// 声明的认证角色，-1 表示未知
    #[serde(default = "role_unknown")]
    pub official_role: i32,
}

impl RoomIdentity {
    pub fn role_declared(&self) -> bool {
        self.official_role != ROLE_UNKNOWN
    }
}

/// 用户资讯接口响应 `{code, message, data}`
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoEnvelope {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<UserInfoData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoData {
    pub mid: i64,
    #[serde(default)]
    pub official: Official,
}

/// 认证信息
#[derive(Debug, Clone, Deserialize)]
pub struct Official {
    #[serde(default = "role_unknown")]
    pub role: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default = "role_unknown", rename = "type")]
    pub kind: i32,
}

impl Default for Official {
    fn default() -> Self {
        Self {
            role: ROLE_UNKNOWN,
            title: String::new(),
            kind: ROLE_UNKNOWN,
        }
    }
}

/// 身份查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLookup {
    /// 接口响应码，0 为成功
    pub code: i32,
    /// 认证角色
    pub role: i32,
    /// 是否为机构认证
    pub org_certified: bool,
    /// 传输层限流（如 HTTP 412），与响应码无关
    pub rate_limited: bool,
}

impl UserLookup {
    pub fn ok(role: i32) -> Self {
        Self {
            code: 0,
            role,
            org_certified: false,
            rate_limited: false,
        }
    }

    pub fn with_code(code: i32) -> Self {
        Self {
            code,
            role: ROLE_UNKNOWN,
            org_certified: false,
            rate_limited: false,
        }
    }

    /// 请求在到达业务层之前被限流
    pub fn rate_limited(code: i32) -> Self {
        Self {
            rate_limited: true,
            ..Self::with_code(code)
        }
    }
}

impl From<UserInfoEnvelope> for UserLookup {
    fn from(envelope: UserInfoEnvelope) -> Self {
        match envelope.data {
            Some(data) if envelope.code == 0 => Self {
                code: 0,
                role: data.official.role,
                org_certified: data.official.kind == OFFICIAL_TYPE_ORGANIZATION,
                rate_limited: false,
            },
            _ => Self::with_code(envelope.code),
        }
    }
}

/// 第三方虚拟主播列表中的条目
///
/// 分类只用到列表的键，条目本身宽松解析：null 或类型不符的字段取零值，
/// 单个坏条目不会让整个列表解析失败。
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct KnownPersona {
    pub name: String,
    pub room_id: Option<i64>,
}

impl KnownPersona {
    fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let room_id = value.get("room_id").and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        Self { name, room_id }
    }
}

impl<'de> Deserialize<'de> for KnownPersona {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// 第三方虚拟主播列表，以 uid 字符串为键
pub type KnownPersonaList = HashMap<String, KnownPersona>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_identity_defaults() {
        let identity: RoomIdentity =
            serde_json::from_str(r#"{"room_id": 10, "uid": 100, "name": "a"}"#).unwrap();
        assert_eq!(identity.official_role, ROLE_UNKNOWN);
        assert!(!identity.role_declared());
        assert!(identity.user_face.is_empty());
    }

    #[test]
    fn test_user_lookup_from_envelope() {
        let envelope: UserInfoEnvelope = serde_json::from_str(
            r#"{"code":0,"message":"0","data":{"mid":1,"official":{"role":2,"title":"UP主","type":0}}}"#,
        )
        .unwrap();
        assert_eq!(UserLookup::from(envelope), UserLookup::ok(2));

        let envelope: UserInfoEnvelope = serde_json::from_str(
            r#"{"code":0,"data":{"mid":1,"official":{"role":3,"type":1}}}"#,
        )
        .unwrap();
        let lookup = UserLookup::from(envelope);
        assert!(lookup.org_certified);
        assert_eq!(lookup.role, 3);
    }

    #[test]
    fn test_user_lookup_rate_limited() {
        let envelope: UserInfoEnvelope =
            serde_json::from_str(r#"{"code":-412,"message":"请求被拦截","data":null}"#).unwrap();
        let lookup = UserLookup::from(envelope);
        assert_eq!(lookup.code, -412);
        assert_eq!(lookup.role, ROLE_UNKNOWN);
    }

    #[test]
    fn test_known_list_tolerates_bad_entries() {
        let list: KnownPersonaList = serde_json::from_str(
            r#"{"100":{"name":null,"room_id":10},"101":{"name":"x","room_id":"11"},"102":null,"103":{"room_id":[1]}}"#,
        )
        .unwrap();
        assert_eq!(list.len(), 4);
        assert_eq!(list["100"], KnownPersona { name: String::new(), room_id: Some(10) });
        assert_eq!(list["101"].room_id, Some(11));
        assert_eq!(list["102"], KnownPersona::default());
        assert_eq!(list["103"].room_id, None);
    }
}
