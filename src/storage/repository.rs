use async_trait::async_trait;

use crate::error::Result;
use crate::models::persona::Persona;

/// 虚拟主播仓储 trait
///
/// 持久化存储是唯一的事实来源，缓存集合可以随时从这里重建。
#[async_trait]
pub trait PersonaRepository: Send + Sync {
    /// 在给定直播间中，返回已有记录的直播间号
    async fn recorded_rooms(&self, rooms: &[i64]) -> Result<Vec<i64>>;

    /// 批量插入，忽略 uid 已存在的行，返回实际插入的行数
    async fn insert_ignore(&self, personas: &[Persona]) -> Result<u64>;

    /// 返回所有不在给定列表中的 uid；列表为空时返回全部
    async fn uids_not_in(&self, uids: &[i64]) -> Result<Vec<i64>>;

    /// 在给定 uid 中，返回仍有记录的 uid
    async fn existing_uids(&self, uids: &[i64]) -> Result<Vec<i64>>;

    /// 删除给定 uid 的记录，返回删除的行数
    async fn delete_by_uids(&self, uids: &[i64]) -> Result<u64>;

    /// 统计数量
    async fn count(&self) -> Result<u64>;
}

#[cfg(feature = "surrealdb")]
pub use surreal_impl::SurrealPersonaRepository;

#[cfg(feature = "surrealdb")]
mod surreal_impl {
    use super::*;
    use crate::storage::surrealdb::SurrealPool;
    use serde::Serialize;
    use surrealdb::sql::Datetime;

    /// 写入行，`id` 使记录 ID 与 uid 一致
    #[derive(Debug, Serialize)]
    struct PersonaRow {
        id: i64,
        uid: i64,
        name: String,
        face: String,
        room_id: i64,
        sign: String,
        /// 以 SurrealDB 原生 datetime 写入
        first_listen_at: Datetime,
    }

    impl From<&Persona> for PersonaRow {
        fn from(persona: &Persona) -> Self {
            Self {
                id: persona.uid,
                uid: persona.uid,
                name: persona.name.clone(),
                face: persona.face.clone(),
                room_id: persona.room_id,
                sign: persona.sign.clone(),
                first_listen_at: Datetime::from(persona.first_listen_at),
            }
        }
    }

    /// 虚拟主播仓储实现
    #[derive(Clone)]
    pub struct SurrealPersonaRepository {
        pool: SurrealPool,
    }

    impl SurrealPersonaRepository {
        pub fn new(pool: SurrealPool) -> Self {
            Self { pool }
        }
    }

    #[async_trait]
    impl PersonaRepository for SurrealPersonaRepository {
        async fn recorded_rooms(&self, rooms: &[i64]) -> Result<Vec<i64>> {
            if rooms.is_empty() {
                return Ok(Vec::new());
            }
            let db = self.pool.inner();
            let result: Vec<i64> = db
                .query("SELECT VALUE room_id FROM vup WHERE room_id INSIDE $rooms")
                .bind(("rooms", rooms.to_vec()))
                .await?
                .take(0)?;
            Ok(result)
        }

        async fn insert_ignore(&self, personas: &[Persona]) -> Result<u64> {
            if personas.is_empty() {
                return Ok(0);
            }
            let uids: Vec<i64> = personas.iter().map(|p| p.uid).collect();
            let rows: Vec<PersonaRow> = personas.iter().map(PersonaRow::from).collect();

            let db = self.pool.inner();
            let mut response = db
                .query("SELECT VALUE uid FROM vup WHERE uid INSIDE $uids")
                .query("INSERT IGNORE INTO vup $rows RETURN NONE")
                .bind(("uids", uids))
                .bind(("rows", rows))
                .await?
                .check()?;
            let existing: Vec<i64> = response.take(0)?;

            Ok(personas.len().saturating_sub(existing.len()) as u64)
        }

        async fn uids_not_in(&self, uids: &[i64]) -> Result<Vec<i64>> {
            let db = self.pool.inner();
            let query = if uids.is_empty() {
                db.query("SELECT VALUE uid FROM vup")
            } else {
                db.query("SELECT VALUE uid FROM vup WHERE uid NOTINSIDE $uids")
                    .bind(("uids", uids.to_vec()))
            };
            let result: Vec<i64> = query.await?.take(0)?;
            Ok(result)
        }

        async fn existing_uids(&self, uids: &[i64]) -> Result<Vec<i64>> {
            if uids.is_empty() {
                return Ok(Vec::new());
            }
            let db = self.pool.inner();
            let result: Vec<i64> = db
                .query("SELECT VALUE uid FROM vup WHERE uid INSIDE $uids")
                .bind(("uids", uids.to_vec()))
                .await?
                .take(0)?;
            Ok(result)
        }

        async fn delete_by_uids(&self, uids: &[i64]) -> Result<u64> {
            if uids.is_empty() {
                return Ok(0);
            }
            let db = self.pool.inner();
            let mut response = db
                .query("SELECT VALUE uid FROM vup WHERE uid INSIDE $uids")
                .query("DELETE vup WHERE uid INSIDE $uids RETURN NONE")
                .bind(("uids", uids.to_vec()))
                .await?
                .check()?;
            let deleted: Vec<i64> = response.take(0)?;
            Ok(deleted.len() as u64)
        }

        async fn count(&self) -> Result<u64> {
            let db = self.pool.inner();
            let result: Vec<serde_json::Value> = db
                .query("SELECT count() FROM vup GROUP ALL")
                .await?
                .take(0)?;
            Ok(result
                .first()
                .and_then(|v| v.get("count"))
                .and_then(|c| c.as_u64())
                .unwrap_or(0))
        }
    }

}
