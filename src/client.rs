//! HTTP implementation of [`BungieApi`].
//!
//! Talks to the Bungie.net platform API with `reqwest`. Every request
//! carries the `X-API-Key` header; bodies are JSON. A request is made once
//! and never retried: network failures, non-2xx statuses and unexpected
//! bodies all come back as an [`ApiError`] for the calling stage to absorb.
//!
//! # Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | search | `POST /Destiny2/SearchDestinyPlayerByBungieName/{platform}/` |
//! | linked profiles | `GET /Destiny2/{type}/Profile/{id}/LinkedProfiles/` |
//! | characters | `GET /Destiny2/{type}/Profile/{id}/?components=100,200` |
//! | history page | `GET /Destiny2/{type}/Account/{id}/Character/{cid}/Stats/Activities/?count=N&page=P` |

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::api::{
    parse_activity_page, parse_linked_profiles, parse_profile_characters, parse_search, BungieApi,
    HistoryEntry, LinkedProfile, UserInfoCard,
};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{CharacterId, MembershipType, PaginationCursor, PlayerHandle, ResolvedIdentity};

/// Profile components requested for character discovery (Profiles, Characters).
const PROFILE_COMPONENTS: &str = "100,200";

pub struct BungieClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BungieClient {
    /// Build a client for `config.base_url` with a per-request timeout.
    pub fn new(config: &ApiConfig, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("d2h/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let resp = req.header("X-API-Key", &self.api_key).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let text = resp.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        self.send(self.http.get(&url)).await
    }
}

#[async_trait]
impl BungieApi for BungieClient {
    async fn search_by_bungie_name(
        &self,
        platform: MembershipType,
        handle: &PlayerHandle,
    ) -> Result<Vec<UserInfoCard>, ApiError> {
        let url = self.url(&format!(
            "/Destiny2/SearchDestinyPlayerByBungieName/{}/",
            platform
        ));
        tracing::debug!(%url, "POST");

        let body = serde_json::json!({
            "displayName": handle.display_name,
            "displayNameCode": handle.display_code,
        });
        parse_search(self.send(self.http.post(&url).json(&body)).await?)
    }

    async fn linked_profiles(
        &self,
        membership_type: MembershipType,
        membership_id: &str,
    ) -> Result<Vec<LinkedProfile>, ApiError> {
        let body = self
            .get(&format!(
                "/Destiny2/{}/Profile/{}/LinkedProfiles/",
                membership_type, membership_id
            ))
            .await?;
        parse_linked_profiles(body)
    }

    async fn profile_characters(
        &self,
        membership_type: MembershipType,
        membership_id: &str,
    ) -> Result<Vec<CharacterId>, ApiError> {
        let body = self
            .get(&format!(
                "/Destiny2/{}/Profile/{}/?components={}",
                membership_type, membership_id, PROFILE_COMPONENTS
            ))
            .await?;
        parse_profile_characters(body)
    }

    async fn activity_page(
        &self,
        identity: &ResolvedIdentity,
        cursor: &PaginationCursor,
        page_size: u32,
    ) -> Result<Vec<HistoryEntry>, ApiError> {
        let body = self
            .get(&format!(
                "/Destiny2/{}/Account/{}/Character/{}/Stats/Activities/?count={}&page={}",
                identity.membership_type,
                identity.membership_id,
                cursor.character_id,
                page_size,
                cursor.page
            ))
            .await?;
        parse_activity_page(body)
    }
}
