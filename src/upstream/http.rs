use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::config::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::models::live::{
    KnownPersonaList, ListeningStats, RoomIdentity, UserInfoEnvelope, UserLookup,
};
use crate::upstream::LiveSource;

/// B 站在请求被风控拦截时返回的响应码
const PRECONDITION_FAILED_CODE: i32 = -412;

/// 基于 HTTP 的上游数据源
#[derive(Clone)]
pub struct HttpLiveSource {
    client: Client,
    listening_url: String,
    user_info_url: String,
    vup_list_url: String,
}

impl HttpLiveSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            listening_url: config.listening_url.trim_end_matches('/').to_string(),
            user_info_url: config.user_info_url.clone(),
            vup_list_url: config.vup_list_url.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("{url} returned {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl LiveSource for HttpLiveSource {
    async fn live_rooms(&self) -> Result<Vec<i64>> {
        let url = format!("{}/listening", self.listening_url);
        let stats: ListeningStats = self.get_json(&url).await?;
        Ok(stats.rooms)
    }

    async fn room_identity(&self, room_id: i64) -> Result<RoomIdentity> {
        let url = format!("{}/listening/{}", self.listening_url, room_id);
        self.get_json(&url).await
    }

    async fn lookup_identity(&self, uid: i64) -> Result<UserLookup> {
        let response = self
            .client
            .get(&self.user_info_url)
            .query(&[("mid", uid)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::PRECONDITION_FAILED {
            return Ok(UserLookup::rate_limited(PRECONDITION_FAILED_CODE));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "user info for {uid} returned {status}"
            )));
        }

        let envelope: UserInfoEnvelope = response.json().await?;
        Ok(envelope.into())
    }

    async fn known_personas(&self) -> Result<KnownPersonaList> {
        if self.vup_list_url.is_empty() {
            return Ok(KnownPersonaList::new());
        }
        self.get_json(&self.vup_list_url).await
    }
}
