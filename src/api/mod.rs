pub mod api_structs;

use crate::{
    api::api_structs::{BeatmapsetPayload, DiscussionsPayload, EventsPayload, OAuthResponse},
    model::{
        constants::{EVENT_PAGES_PER_WINDOW, EVENT_PAGE_COOLDOWN, EVENT_PAGE_LIMIT, MAX_EVENT_PAGES},
        structures::map_event::MapEvent
    },
    utils::progress_utils::indeterminate_bar
};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use reqwest::{header::AUTHORIZATION, Client, ClientBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::RwLock;

/// Event kinds requested when replaying one set's moderation history
const SET_EVENT_TYPES: [&str; 5] = ["qualify", "disqualify", "rank", "nominate", "nomination_reset"];

/// Event kinds walked from the global stream; nominations only matter once
/// a set is being replayed individually
const GLOBAL_EVENT_TYPES: [&str; 3] = ["qualify", "rank", "disqualify"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("api request failed: {0}")]
    ApiFailure(String)
}

/// A client-credentials token. The platform occasionally serves slightly
/// stale expiries, so the token is treated as expired an hour early.
pub struct OsuToken {
    pub value: String,
    pub expires_at: DateTime<Utc>
}

impl OsuToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() + Duration::hours(1) >= self.expires_at
    }
}

pub struct OsuApiClient {
    client: Client,
    api_root: String,
    client_id: String,
    client_secret: String,

    /// Wrapped in RwLock so concurrent fetches share one token refresh
    token: RwLock<Option<OsuToken>>
}

impl OsuApiClient {
    pub fn new(api_root: &str, client_id: &str, client_secret: &str) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .build()
            .map_err(|e| ApiError::ApiFailure(e.to_string()))?;

        Ok(OsuApiClient {
            client,
            api_root: api_root.trim_end_matches('/').to_owned(),
            client_id: client_id.to_owned(),
            client_secret: client_secret.to_owned(),
            token: RwLock::new(None)
        })
    }

    /// Constructs the client from `CLIENT_ID` / `CLIENT_SECRET`, see
    /// `.env.example`
    pub fn new_from_env(api_root: &str) -> Result<Self, ApiError> {
        let client_id = std::env::var("CLIENT_ID")
            .map_err(|_| ApiError::AuthFailure("CLIENT_ID must be set".to_string()))?;
        let client_secret = std::env::var("CLIENT_SECRET")
            .map_err(|_| ApiError::AuthFailure("CLIENT_SECRET must be set".to_string()))?;

        OsuApiClient::new(api_root, &client_id, &client_secret)
    }

    /// Fetches a fresh client-credentials token
    async fn fetch_token(&self) -> Result<OsuToken, ApiError> {
        let response = self
            .client
            .post(format!("{}/oauth/token", self.api_root))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
                ("scope", "public")
            ])
            .send()
            .await
            .map_err(|e| ApiError::AuthFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::AuthFailure(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let payload: OAuthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::AuthFailure(e.to_string()))?;

        Ok(OsuToken {
            // Prefixed once here to save the allocation on every request
            value: format!("Bearer {}", payload.access_token),
            expires_at: Utc::now() + Duration::seconds(payload.expires_in)
        })
    }

    /// Returns a valid bearer token, refreshing through the write lock when
    /// the held one is missing or inside the expiry skew window
    async fn ensure_token(&self) -> Result<String, ApiError> {
        {
            let lock = self.token.read().await;
            if let Some(token) = lock.as_ref() {
                if !token.is_expired() {
                    return Ok(token.value.clone());
                }
            }
        }

        let mut lock = self.token.write().await;

        // Another task may have refreshed while we waited on the lock
        if let Some(token) = lock.as_ref() {
            if !token.is_expired() {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *lock = Some(token);

        Ok(value)
    }

    /// Wrapper for authorized GET requests against the v2 API
    ///
    /// `partial_url` must start with `/` and is appended to the API root
    async fn make_request<T>(&self, partial_url: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned
    {
        let token = self.ensure_token().await?;

        let response = self
            .client
            .get(format!("{}/api/v2{}", self.api_root, partial_url))
            .header(AUTHORIZATION, token)
            .send()
            .await
            .map_err(|e| ApiError::ApiFailure(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::ApiFailure(format!(
                "GET {} returned {}",
                partial_url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::ApiFailure(e.to_string()))?;

        if body.is_empty() {
            return Err(ApiError::ApiFailure(format!("GET {} returned an empty body", partial_url)));
        }

        serde_json::from_slice(&body).map_err(|e| ApiError::ApiFailure(e.to_string()))
    }

    /// Fetches a single beatmap set with its difficulties
    pub async fn get_beatmapset(&self, beatmapset_id: i64) -> Result<BeatmapsetPayload, ApiError> {
        self.make_request(&format!("/beatmapsets/{}", beatmapset_id)).await
    }

    /// Fetches one set's full moderation history, oldest first
    pub async fn get_beatmapset_events(&self, beatmapset_id: i64) -> Result<Vec<MapEvent>, ApiError> {
        let types = SET_EVENT_TYPES.iter().map(|t| format!("types[]={}", t)).join("&");
        let url = format!(
            "/beatmapsets/events?{}&beatmapset_id={}&limit=50",
            types, beatmapset_id
        );

        let payload: EventsPayload = self.make_request(&url).await?;

        let mut events: Vec<MapEvent> = payload
            .events
            .into_iter()
            .filter_map(|e| e.into_map_event())
            .collect();
        events.sort_by_key(|e| (e.created_at, e.id));

        Ok(events)
    }

    /// Walks the global event stream backwards until `last_event_id` is
    /// seen, returning the new events oldest first plus the cursor for the
    /// next cycle (the first event of the first page).
    ///
    /// A cursor of zero bootstraps from the first page only. The walk
    /// pauses for [`EVENT_PAGE_COOLDOWN`] seconds after every
    /// [`EVENT_PAGES_PER_WINDOW`] successful fetches, and gives up with
    /// [`ApiError::ApiFailure`] if the cursor is never reached within
    /// [`MAX_EVENT_PAGES`] pages.
    pub async fn get_recent_events(&self, last_event_id: i64) -> Result<(Vec<MapEvent>, i64), ApiError> {
        let types = GLOBAL_EVENT_TYPES.iter().map(|t| format!("types[]={}", t)).join("&");

        let bar = indeterminate_bar("Walking global event stream".to_string());

        let mut events: Vec<MapEvent> = Vec::new();
        let mut seen_ids: HashSet<i64> = HashSet::new();
        let mut new_cursor = last_event_id;
        let mut cursor_found = false;

        for page in 1..=MAX_EVENT_PAGES {
            let url = format!(
                "/beatmapsets/events?{}&limit={}&page={}",
                types, EVENT_PAGE_LIMIT, page
            );
            let payload: EventsPayload = self.make_request(&url).await?;

            if payload.events.is_empty() {
                return Err(ApiError::ApiFailure(format!(
                    "event stream dried up on page {} before reaching cursor {}",
                    page, last_event_id
                )));
            }

            if page == 1 {
                new_cursor = payload.events[0].id;
            }

            for event in payload.events {
                if event.id == last_event_id {
                    cursor_found = true;
                    break;
                }
                // Pages shift while walking, so the same event can appear twice
                if !seen_ids.insert(event.id) {
                    continue;
                }
                if let Some(event) = event.into_map_event() {
                    events.push(event);
                }
            }

            if let Some(bar) = &bar {
                bar.set_message(format!("[{}] events after page {}", events.len(), page));
                bar.inc(1);
            }

            if cursor_found || last_event_id == 0 {
                break;
            }

            if page % EVENT_PAGES_PER_WINDOW == 0 {
                log::debug!("event walker cooling down after {} pages", page);
                tokio::time::sleep(std::time::Duration::from_secs(EVENT_PAGE_COOLDOWN)).await;
            }
        }

        if let Some(bar) = &bar {
            bar.finish();
        }

        if !cursor_found && last_event_id != 0 {
            return Err(ApiError::ApiFailure(format!(
                "cursor {} not reached within {} pages",
                last_event_id, MAX_EVENT_PAGES
            )));
        }

        events.sort_by_key(|e| (e.created_at, e.id));

        Ok((events, new_cursor))
    }

    /// Ids of qualified sets with outstanding unresolved suggestion or
    /// problem discussions
    pub async fn get_unresolved_beatmapset_ids(&self) -> Result<Vec<i64>, ApiError> {
        let url = "/beatmapsets/discussions?beatmapset_status=qualified\
                   &message_types[]=suggestion&message_types[]=problem\
                   &only_unresolved=true&limit=50";

        let payload: DiscussionsPayload = self.make_request(url).await?;

        Ok(payload.beatmapsets.into_iter().map(|set| set.id).unique().collect())
    }
}
