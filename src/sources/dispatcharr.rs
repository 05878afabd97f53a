//! Dispatcharr REST API client
//!
//! Implements [`ChannelSource`] and [`WriteBackSink`] over the Dispatcharr
//! API. Requests authenticate with a bearer token obtained from
//! `/api/accounts/token/`; the token is cached for `token_ttl`, dropped on a
//! 401 and the request is retried once with a fresh login.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::DispatcharrConfig;
use crate::errors::{ConfigError, SourceError, SourceResult};
use crate::models::{
    ChannelId, ChannelProfile, ChannelRecord, EpgAssignment, EpgSourceKind, ProfileId,
    ProgramWindow, StreamRef,
};
use crate::services::traits::{ChannelSource, WriteBackSink};

const TOKEN_ENDPOINT: &str = "/api/accounts/token/";
const PROFILES_ENDPOINT: &str = "/api/channels/profiles/";
const CHANNELS_ENDPOINT: &str = "/api/channels/channels/";
const GROUPS_ENDPOINT: &str = "/api/channels/groups/";
const STREAMS_ENDPOINT: &str = "/api/channels/streams/";
const EPG_DATA_ENDPOINT: &str = "/api/epg/data/";
const EPG_SOURCES_ENDPOINT: &str = "/api/epg/sources/";
const EPG_PROGRAMS_ENDPOINT: &str = "/api/epg/programs/";
/// Upper bound on `next` links followed for one list request
const MAX_LIST_PAGES: usize = 500;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Option<String>,
}

/// Profile channel membership, either a bare id or an `{id, enabled}` entry
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileChannelRef {
    Id(ChannelId),
    Entry {
        id: ChannelId,
        #[serde(default = "enabled_by_default")]
        enabled: bool,
    },
}

fn enabled_by_default() -> bool {
    true
}

impl ProfileChannelRef {
    fn enabled_id(&self) -> Option<ChannelId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Entry { id, enabled } => enabled.then_some(*id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiProfile {
    id: ProfileId,
    name: String,
    #[serde(default)]
    channels: Vec<ProfileChannelRef>,
}

#[derive(Debug, Deserialize)]
struct ApiChannel {
    id: ChannelId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    channel_number: Option<f64>,
    #[serde(default)]
    channel_group_id: Option<i64>,
    #[serde(default)]
    epg_data_id: Option<i64>,
    #[serde(default)]
    streams: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiGroup {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiStream {
    id: i64,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiEpgData {
    id: i64,
    #[serde(default)]
    epg_source: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiEpgSource {
    id: i64,
    #[serde(default)]
    source_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiProgram {
    #[serde(default, alias = "epg_data")]
    epg: Option<i64>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct DispatcharrClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    token_ttl: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl DispatcharrClient {
    pub fn new(config: &DispatcharrConfig) -> Result<Self, ConfigError> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigError::missing("dispatcharr.url"));
        }
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::invalid("dispatcharr.url", e.to_string()))?;
        if config.username.trim().is_empty() {
            return Err(ConfigError::missing("dispatcharr.username"));
        }
        if config.password.is_empty() {
            return Err(ConfigError::missing("dispatcharr.password"));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::invalid("dispatcharr", format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            username: config.username.trim().to_string(),
            password: config.password.clone(),
            token_ttl: config.token_ttl,
            token: Mutex::new(None),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone())
    }

    fn store_token(&self, value: &str) {
        let mut guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(CachedToken {
            value: value.to_string(),
            expires_at: Instant::now() + self.token_ttl,
        });
    }

    fn invalidate_token(&self) {
        let mut guard = self.token.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    /// Current access token, logging in when the cache is empty or expired
    async fn token(&self) -> SourceResult<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        let token = self.login().await?;
        self.store_token(&token);
        Ok(token)
    }

    async fn login(&self) -> SourceResult<String> {
        let url = self.url(TOKEN_ENDPOINT);
        debug!("Requesting Dispatcharr access token from {}", url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "username": self.username, "password": self.password }))
            .send()
            .await
            .map_err(|e| SourceError::Connection {
                url: self.base_url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::auth_failed("invalid username or password"));
        }
        let body = response.text().await.unwrap_or_default();
        check_status(TOKEN_ENDPOINT, status, &body)?;

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::invalid_response(TOKEN_ENDPOINT, e.to_string()))?;
        match token.access.filter(|t| !t.is_empty()) {
            Some(access) => {
                info!("Obtained Dispatcharr access token");
                Ok(access)
            }
            None => Err(SourceError::invalid_response(
                TOKEN_ENDPOINT,
                "login succeeded but no access token was returned",
            )),
        }
    }

    /// Send an authenticated request, retrying once after an auth failure
    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> SourceResult<String> {
        match self.send_once(method.clone(), endpoint, body).await {
            Err(e) if e.is_auth_failure() => {
                warn!("Access token rejected for {}, logging in again", endpoint);
                self.invalidate_token();
                self.send_once(method, endpoint, body).await
            }
            other => other,
        }
    }

    async fn send_once(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> SourceResult<String> {
        let token = self.token().await?;
        let mut request = self
            .client
            .request(method, self.url(endpoint))
            .bearer_auth(token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| SourceError::Connection {
            url: self.base_url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            SourceError::invalid_response(endpoint, format!("failed to read body: {}", e))
        })?;
        check_status(endpoint, status, &text)?;
        Ok(text)
    }

    /// GET a list endpoint, following `next` links of paginated responses
    pub async fn get_list<T: DeserializeOwned>(&self, endpoint: &str) -> SourceResult<Vec<T>> {
        let mut items: Vec<T> = Vec::new();
        let mut page_endpoint = endpoint.to_string();

        for _ in 0..MAX_LIST_PAGES {
            let body = self.send(Method::GET, &page_endpoint, None).await?;
            let page: ListPage<T> = parse_list(endpoint, &body)?;
            items.extend(page.items);

            match page.next.as_deref().map(next_endpoint) {
                None => {
                    debug!("Fetched {} item(s) from {}", items.len(), endpoint);
                    return Ok(items);
                }
                Some(Some(next)) if next != page_endpoint => page_endpoint = next,
                Some(_) => {
                    warn!(
                        "Unusable next page link from {}, keeping {} item(s)",
                        endpoint,
                        items.len()
                    );
                    return Ok(items);
                }
            }
        }

        warn!(
            "Stopped following {} after {} pages, keeping {} item(s)",
            endpoint,
            MAX_LIST_PAGES,
            items.len()
        );
        Ok(items)
    }

    /// PATCH an endpoint with a JSON payload
    pub async fn patch(&self, endpoint: &str, payload: &Value) -> SourceResult<()> {
        self.send(Method::PATCH, endpoint, Some(payload)).await?;
        Ok(())
    }

    async fn load_epg(
        &self,
        channels: &[ApiChannel],
    ) -> SourceResult<HashMap<i64, EpgAssignment>> {
        let assigned: HashSet<i64> = channels.iter().filter_map(|c| c.epg_data_id).collect();
        if assigned.is_empty() {
            return Ok(HashMap::new());
        }

        let epg_data: Vec<ApiEpgData> = self.get_list(EPG_DATA_ENDPOINT).await?;
        let sources: Vec<ApiEpgSource> = self.get_list(EPG_SOURCES_ENDPOINT).await?;
        let dummy_sources: HashSet<i64> = sources
            .iter()
            .filter(|s| {
                s.source_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("dummy"))
            })
            .map(|s| s.id)
            .collect();

        let mut assignments: HashMap<i64, EpgAssignment> = epg_data
            .iter()
            .filter(|d| assigned.contains(&d.id))
            .map(|d| {
                let source_kind = match d.epg_source {
                    Some(source) if dummy_sources.contains(&source) => EpgSourceKind::Dummy,
                    _ => EpgSourceKind::Stored,
                };
                (
                    d.id,
                    EpgAssignment {
                        id: d.id,
                        source_kind,
                        programs: Vec::new(),
                    },
                )
            })
            .collect();

        // assignments pointing at EPG rows the API no longer lists still count as assigned
        for id in &assigned {
            assignments.entry(*id).or_insert_with(|| EpgAssignment {
                id: *id,
                source_kind: EpgSourceKind::Stored,
                programs: Vec::new(),
            });
        }

        let needs_programs = assignments
            .values()
            .any(|a| a.source_kind == EpgSourceKind::Stored);
        if needs_programs {
            let programs: Vec<ApiProgram> = self.get_list(EPG_PROGRAMS_ENDPOINT).await?;
            for program in programs {
                if let Some(assignment) = program.epg.and_then(|id| assignments.get_mut(&id)) {
                    assignment.programs.push(ProgramWindow {
                        start: program.start_time,
                        end: program.end_time,
                    });
                }
            }
        }

        Ok(assignments)
    }
}

/// Map an HTTP status to the matching source error
fn check_status(endpoint: &str, status: StatusCode, body: &str) -> SourceResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let err = match status {
        StatusCode::UNAUTHORIZED => SourceError::auth_failed("API token expired or invalid"),
        StatusCode::FORBIDDEN => SourceError::Forbidden {
            endpoint: endpoint.to_string(),
        },
        StatusCode::NOT_FOUND => SourceError::NotFound {
            endpoint: endpoint.to_string(),
        },
        _ => SourceError::Http {
            status: status.as_u16(),
            message: crate::utils::text::truncate_chars(body.trim(), 200).to_string(),
        },
    };
    Err(err)
}

/// One list response; `next` is set when the server paginates
#[derive(Debug)]
struct ListPage<T> {
    items: Vec<T>,
    next: Option<String>,
}

/// Parse a list response: a bare array, a `{results: [...]}` page, or an empty body
fn parse_list<T: DeserializeOwned>(endpoint: &str, body: &str) -> SourceResult<ListPage<T>> {
    if body.trim().is_empty() {
        return Ok(ListPage {
            items: Vec::new(),
            next: None,
        });
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| SourceError::invalid_response(endpoint, e.to_string()))?;
    let (items, next) = match value {
        Value::Array(items) => (items, None),
        Value::Object(mut map) => {
            let next = map
                .remove("next")
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|n| !n.is_empty());
            match map.remove("results") {
                Some(Value::Array(items)) => (items, next),
                _ => {
                    return Err(SourceError::invalid_response(
                        endpoint,
                        "expected a list or an object with 'results'",
                    ));
                }
            }
        }
        _ => {
            return Err(SourceError::invalid_response(
                endpoint,
                "expected a list or an object with 'results'",
            ));
        }
    };

    let items = serde_json::from_value(Value::Array(items))
        .map_err(|e| SourceError::invalid_response(endpoint, e.to_string()))?;
    Ok(ListPage { items, next })
}

/// Turn a `next` link (absolute or path-relative) into a path plus query
fn next_endpoint(next: &str) -> Option<String> {
    if next.starts_with('/') {
        return Some(next.to_string());
    }
    let url = url::Url::parse(next).ok()?;
    Some(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

#[async_trait]
impl ChannelSource for DispatcharrClient {
    async fn list_profiles(&self) -> SourceResult<Vec<ChannelProfile>> {
        let profiles: Vec<ApiProfile> = self.get_list(PROFILES_ENDPOINT).await?;
        Ok(profiles
            .into_iter()
            .map(|p| ChannelProfile {
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    async fn list_channels(
        &self,
        profile_ids: &[ProfileId],
        groups: &[String],
    ) -> SourceResult<Vec<ChannelRecord>> {
        let profiles: Vec<ApiProfile> = self.get_list(PROFILES_ENDPOINT).await?;
        let enabled: HashSet<ChannelId> = profiles
            .iter()
            .filter(|p| profile_ids.contains(&p.id))
            .flat_map(|p| p.channels.iter().filter_map(ProfileChannelRef::enabled_id))
            .collect();

        let group_names: HashMap<i64, String> = self
            .get_list::<ApiGroup>(GROUPS_ENDPOINT)
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();

        let wanted_groups: HashSet<String> = groups.iter().map(|g| g.to_lowercase()).collect();
        let channels: Vec<ApiChannel> = self
            .get_list::<ApiChannel>(CHANNELS_ENDPOINT)
            .await?
            .into_iter()
            .filter(|c| {
                wanted_groups.is_empty()
                    || c.channel_group_id
                        .and_then(|id| group_names.get(&id))
                        .is_some_and(|name| wanted_groups.contains(&name.trim().to_lowercase()))
            })
            .collect();

        let stream_names: HashMap<i64, Option<String>> =
            if channels.iter().any(|c| !c.streams.is_empty()) {
                self.get_list::<ApiStream>(STREAMS_ENDPOINT)
                    .await?
                    .into_iter()
                    .map(|s| (s.id, s.name))
                    .collect()
            } else {
                HashMap::new()
            };

        let epg = self.load_epg(&channels).await?;

        let records: Vec<ChannelRecord> = channels
            .into_iter()
            .map(|c| ChannelRecord {
                id: c.id,
                name: c.name.unwrap_or_default(),
                channel_number: c.channel_number,
                group_name: c.channel_group_id.and_then(|id| group_names.get(&id).cloned()),
                epg: c.epg_data_id.and_then(|id| epg.get(&id).cloned()),
                streams: c
                    .streams
                    .iter()
                    .enumerate()
                    .map(|(order, id)| StreamRef {
                        id: *id,
                        name: stream_names.get(id).cloned().flatten(),
                        order: i32::try_from(order).unwrap_or(i32::MAX),
                    })
                    .collect(),
                visible: enabled.contains(&c.id),
            })
            .collect();

        info!("Loaded {} channel(s) from Dispatcharr", records.len());
        Ok(records)
    }
}

#[async_trait]
impl WriteBackSink for DispatcharrClient {
    async fn apply_visibility(
        &self,
        profile_id: ProfileId,
        changes: &[(ChannelId, bool)],
    ) -> SourceResult<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        let payload = json!({
            "channels": changes
                .iter()
                .map(|(channel_id, enabled)| json!({ "channel_id": channel_id, "enabled": enabled }))
                .collect::<Vec<_>>()
        });
        let endpoint = format!("/api/channels/profiles/{}/channels/bulk-update/", profile_id);
        self.patch(&endpoint, &payload).await?;
        Ok(changes.len())
    }

    async fn clear_epg(&self, channel_id: ChannelId) -> SourceResult<()> {
        let endpoint = format!("{}{}/", CHANNELS_ENDPOINT, channel_id);
        self.patch(&endpoint, &json!({ "epg_data_id": null })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> DispatcharrClient {
        let config = DispatcharrConfig {
            url: server.base_url(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            ..DispatcharrConfig::default()
        };
        DispatcharrClient::new(&config).unwrap()
    }

    async fn mock_login<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
        let token = token.to_string();
        server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path(TOKEN_ENDPOINT)
                    .json_body(json!({ "username": "admin", "password": "secret" }));
                then.status(200).json_body(json!({ "access": token }));
            })
            .await
    }

    #[test]
    fn test_config_validation() {
        let missing_url = DispatcharrConfig {
            url: " ".to_string(),
            ..DispatcharrConfig::default()
        };
        assert!(matches!(
            DispatcharrClient::new(&missing_url),
            Err(ConfigError::MissingField { .. })
        ));

        let missing_user = DispatcharrConfig::default();
        assert!(matches!(
            DispatcharrClient::new(&missing_user),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_parse_list_shapes() {
        let bare: ListPage<ApiGroup> = parse_list("/g/", r#"[{"id":1,"name":"PPV"}]"#).unwrap();
        assert_eq!(bare.items.len(), 1);
        assert!(bare.next.is_none());

        let paged: ListPage<ApiGroup> = parse_list(
            "/g/",
            r#"{"count":2,"next":"http://dispatcharr:9191/g/?page=2","results":[{"id":2,"name":"Sports"}]}"#,
        )
        .unwrap();
        assert_eq!(paged.items[0].name, "Sports");
        assert_eq!(paged.next.as_deref(), Some("http://dispatcharr:9191/g/?page=2"));

        let last: ListPage<ApiGroup> =
            parse_list("/g/", r#"{"next":null,"results":[]}"#).unwrap();
        assert!(last.next.is_none());

        let empty: ListPage<ApiGroup> = parse_list("/g/", "  ").unwrap();
        assert!(empty.items.is_empty());

        assert!(parse_list::<ApiGroup>("/g/", r#"{"detail":"x"}"#).is_err());
        assert!(parse_list::<ApiGroup>("/g/", "not json").is_err());
    }

    #[test]
    fn test_next_endpoint() {
        assert_eq!(
            next_endpoint("http://dispatcharr:9191/api/epg/programs/?page=2").as_deref(),
            Some("/api/epg/programs/?page=2")
        );
        assert_eq!(next_endpoint("/g/?page=3").as_deref(), Some("/g/?page=3"));
        assert!(next_endpoint("not a url").is_none());
    }

    #[tokio::test]
    async fn test_get_list_follows_next_pages() {
        let server = MockServer::start_async().await;
        mock_login(&server, "tok").await;
        let second_url = format!("{}/api/channels/groups/?page=2", server.base_url());
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/channels/groups/")
                    .query_param("page", "2");
                then.status(200).json_body(json!({
                    "next": null,
                    "results": [{ "id": 2, "name": "Sports" }]
                }));
            })
            .await;
        server
            .mock_async(move |when, then| {
                when.method(GET)
                    .path("/api/channels/groups/")
                    .query_param_missing("page");
                then.status(200).json_body(json!({
                    "next": second_url,
                    "results": [{ "id": 1, "name": "PPV" }]
                }));
            })
            .await;

        let groups: Vec<ApiGroup> = client_for(&server).get_list(GROUPS_ENDPOINT).await.unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["PPV", "Sports"]);
    }

    #[test]
    fn test_status_mapping() {
        assert!(check_status("/x/", StatusCode::OK, "").is_ok());
        assert!(matches!(
            check_status("/x/", StatusCode::UNAUTHORIZED, ""),
            Err(SourceError::AuthenticationFailed { .. })
        ));
        assert!(matches!(
            check_status("/x/", StatusCode::FORBIDDEN, ""),
            Err(SourceError::Forbidden { .. })
        ));
        assert!(matches!(
            check_status("/x/", StatusCode::NOT_FOUND, ""),
            Err(SourceError::NotFound { .. })
        ));
        assert!(matches!(
            check_status("/x/", StatusCode::BAD_GATEWAY, "upstream down"),
            Err(SourceError::Http { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_token_is_cached_between_requests() {
        let server = MockServer::start_async().await;
        let login = mock_login(&server, "tok-1").await;
        let groups = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(GROUPS_ENDPOINT)
                    .header("Authorization", "Bearer tok-1");
                then.status(200).json_body(json!([{ "id": 1, "name": "PPV" }]));
            })
            .await;

        let client = client_for(&server);
        let first: Vec<ApiGroup> = client.get_list(GROUPS_ENDPOINT).await.unwrap();
        let second: Vec<ApiGroup> = client.get_list(GROUPS_ENDPOINT).await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(login.hits_async().await, 1);
        assert_eq!(groups.hits_async().await, 2);
    }

    #[tokio::test]
    async fn test_auth_failure_retries_once_with_new_login() {
        let server = MockServer::start_async().await;
        let login = mock_login(&server, "stale").await;
        let rejected = server
            .mock_async(|when, then| {
                when.method(GET).path(GROUPS_ENDPOINT);
                then.status(401);
            })
            .await;

        let client = client_for(&server);
        let err = client.get_list::<ApiGroup>(GROUPS_ENDPOINT).await.unwrap_err();

        assert!(err.is_auth_failure());
        assert_eq!(login.hits_async().await, 2);
        assert_eq!(rejected.hits_async().await, 2);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_ENDPOINT);
                then.status(401);
            })
            .await;

        let err = client_for(&server).list_profiles().await.unwrap_err();
        assert!(matches!(err, SourceError::AuthenticationFailed { .. }));
    }

    #[tokio::test]
    async fn test_list_channels_assembles_records() {
        let server = MockServer::start_async().await;
        mock_login(&server, "tok").await;

        let now = Utc::now();
        let soon = (now + chrono::Duration::hours(1)).to_rfc3339();
        let later = (now + chrono::Duration::hours(2)).to_rfc3339();

        server
            .mock_async(|when, then| {
                when.method(GET).path(PROFILES_ENDPOINT);
                then.status(200).json_body(json!([
                    { "id": 1, "name": "Events", "channels": [10] },
                    { "id": 2, "name": "Other", "channels": [{ "id": 11, "enabled": true }] }
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(GROUPS_ENDPOINT);
                then.status(200)
                    .json_body(json!({ "results": [{ "id": 5, "name": "PPV" }, { "id": 6, "name": "News" }] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(CHANNELS_ENDPOINT);
                then.status(200).json_body(json!([
                    { "id": 10, "name": "PPV 1: Fight", "channel_number": 101.0, "channel_group_id": 5, "epg_data_id": 70, "streams": [900, 901] },
                    { "id": 11, "name": "PPV 2", "channel_number": 102.5, "channel_group_id": 5, "epg_data_id": 71, "streams": [] },
                    { "id": 12, "name": "Headlines", "channel_group_id": 6, "streams": [] }
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(STREAMS_ENDPOINT);
                then.status(200).json_body(json!([
                    { "id": 900, "name": "UFC 300: Main Card" },
                    { "id": 901, "name": null }
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(EPG_DATA_ENDPOINT);
                then.status(200).json_body(json!([
                    { "id": 70, "epg_source": 1 },
                    { "id": 71, "epg_source": 2 }
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(EPG_SOURCES_ENDPOINT);
                then.status(200).json_body(json!([
                    { "id": 1, "source_type": "xmltv" },
                    { "id": 2, "source_type": "dummy" }
                ]));
            })
            .await;
        server
            .mock_async(move |when, then| {
                when.method(GET).path(EPG_PROGRAMS_ENDPOINT);
                then.status(200).json_body(json!([
                    { "epg": 70, "start_time": soon, "end_time": later }
                ]));
            })
            .await;

        let client = client_for(&server);
        let channels = client
            .list_channels(&[1], &["ppv".to_string()])
            .await
            .unwrap();

        assert_eq!(channels.len(), 2);
        let fight = &channels[0];
        assert!(fight.visible);
        assert_eq!(fight.group_name.as_deref(), Some("PPV"));
        assert_eq!(fight.streams.len(), 2);
        assert_eq!(fight.streams[0].name.as_deref(), Some("UFC 300: Main Card"));
        assert_eq!(fight.streams[1].order, 1);
        let epg = fight.epg.as_ref().unwrap();
        assert_eq!(epg.source_kind, EpgSourceKind::Stored);
        assert_eq!(epg.programs.len(), 1);

        let second = &channels[1];
        assert!(!second.visible);
        assert_eq!(second.channel_number, Some(102.5));
        assert_eq!(second.epg.as_ref().unwrap().source_kind, EpgSourceKind::Dummy);
    }

    #[tokio::test]
    async fn test_bulk_update_payload() {
        let server = MockServer::start_async().await;
        mock_login(&server, "tok").await;
        let update = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/api/channels/profiles/3/channels/bulk-update/")
                    .json_body(json!({ "channels": [
                        { "channel_id": 10, "enabled": false },
                        { "channel_id": 11, "enabled": true }
                    ]}));
                then.status(200).json_body(json!({ "success": true }));
            })
            .await;
        let clear = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/api/channels/channels/10/")
                    .json_body(json!({ "epg_data_id": null }));
                then.status(200).json_body(json!({ "id": 10 }));
            })
            .await;

        let client = client_for(&server);
        let updated = client
            .apply_visibility(3, &[(10, false), (11, true)])
            .await
            .unwrap();
        client.clear_epg(10).await.unwrap();

        assert_eq!(updated, 2);
        update.assert_async().await;
        clear.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_endpoint_maps_to_not_found() {
        let server = MockServer::start_async().await;
        mock_login(&server, "tok").await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PROFILES_ENDPOINT);
                then.status(404);
            })
            .await;

        let err = client_for(&server).list_profiles().await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }
}
