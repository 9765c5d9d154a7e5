//! 数据模型模块

pub mod live;
pub mod persona;

pub use live::{
    KnownPersona, KnownPersonaList, ListeningStats, RoomIdentity, UserLookup, ROLE_UNKNOWN,
};
pub use persona::{Persona, cache_member, parse_member};
