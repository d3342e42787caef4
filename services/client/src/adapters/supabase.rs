//! services/client/src/adapters/supabase.rs
//!
//! The HTTP plumbing shared by the Supabase adapters: endpoint building, the
//! `apikey`/bearer headers, access token refresh and the mapping of HTTP
//! failures onto `PortError`.

use crate::adapters::session_store::{SessionRecord, SessionStore};
use crate::config::Config;
use note_cycle_core::domain::SessionEventKind;
use note_cycle_core::ports::{PortError, PortResult};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// A handle on the backend shared by the auth, table and storage adapters.
///
/// Cloning is cheap; all clones share one session, so requests made by the
/// table and storage adapters run as the signed-in user.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    anon_key: String,
    timeout: Duration,
    session: Arc<SessionStore>,
}

impl SupabaseClient {
    /// Creates a new `SupabaseClient` from the loaded configuration.
    pub fn new(config: &Config) -> PortResult<Self> {
        let base_url = Url::parse(&config.supabase_url).map_err(|e| {
            PortError::Unexpected(format!("Invalid backend URL '{}': {}", config.supabase_url, e))
        })?;
        let http = Client::builder()
            .timeout(config.backend_timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            anon_key: config.supabase_anon_key.clone(),
            timeout: config.backend_timeout,
            session: Arc::new(SessionStore::new(config.session_file.clone())),
        })
    }

    /// Builds `{base}/{segments...}`, percent-encoding every segment.
    pub(crate) fn endpoint<'a, I>(&self, segments: I) -> PortResult<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request carrying the `apikey` header. The bearer is added on send.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).header("apikey", &self.anon_key)
    }

    pub(crate) fn session(&self) -> &SessionStore {
        &self.session
    }

    pub(crate) fn access_token(&self) -> Option<String> {
        self.session.access_token()
    }

    /// The bearer for the next request: the session's access token, refreshed
    /// first when it is about to expire, or the anon key when signed out.
    async fn bearer(&self) -> String {
        match self.session.current() {
            None => self.anon_key.clone(),
            Some(record) if record.is_fresh() => record.access_token,
            Some(record) => match self.refresh_session(&record).await {
                Ok(fresh) => fresh.access_token,
                Err(e) => {
                    warn!("Could not refresh the session: {}", e);
                    self.access_token().unwrap_or_else(|| self.anon_key.clone())
                }
            },
        }
    }

    /// Exchanges the refresh token of `expired` for a new session.
    ///
    /// Concurrent callers share one exchange. A refused refresh ends the session.
    pub(crate) async fn refresh_session(&self, expired: &SessionRecord) -> PortResult<SessionRecord> {
        let _gate = self.session.refresh_gate().lock().await;
        if let Some(current) = self.session.current() {
            if current.is_fresh() && current.access_token != expired.access_token {
                return Ok(current);
            }
        }

        info!("Access token expired; refreshing the session");
        let request = RefreshRequest {
            refresh_token: &expired.refresh_token,
        };
        match self.token_request("refresh_token", &request).await {
            Ok(record) => {
                let identity = self.session.activate(record.clone()).await;
                self.session.emit(SessionEventKind::TokenRefreshed, Some(identity));
                Ok(record)
            }
            Err(e @ (PortError::Rejected(_) | PortError::NotFound(_))) => {
                warn!("Session refresh refused: {}", e);
                self.session.forget().await;
                self.session.emit(SessionEventKind::SignedOut, None);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Calls `/auth/v1/token` with the given grant.
    pub(crate) async fn token_request<B: Serialize>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> PortResult<SessionRecord> {
        let mut url = self.endpoint(["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self
            .send_anonymous(self.request(Method::POST, url).json(body))
            .await?;
        let record: SessionRecord = self.json(response).await?;
        Ok(record.stamped())
    }

    /// Sends as the signed-in user, refreshing an expired access token first.
    pub(crate) async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let bearer = self.bearer().await;
        self.dispatch(request.bearer_auth(bearer)).await
    }

    /// Sends with the anon key as bearer, for the endpoints that issue sessions.
    pub(crate) async fn send_anonymous(&self, request: RequestBuilder) -> PortResult<Response> {
        self.dispatch(request.bearer_auth(&self.anon_key)).await
    }

    /// Turns transport failures and non-2xx answers into `PortError`s.
    async fn dispatch(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        check_status(response).await
    }

    fn transport_error(&self, e: reqwest::Error) -> PortError {
        if e.is_timeout() {
            PortError::Timeout(self.timeout)
        } else {
            PortError::Unexpected(e.to_string())
        }
    }

    pub(crate) async fn json<T: serde::de::DeserializeOwned>(&self, response: Response) -> PortResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed backend response: {}", e)))
    }
}

/// Maps an error answer onto a `PortError`, keeping the backend's own wording.
async fn check_status(response: Response) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| format!("Request failed with status {}", status));
    Err(match status {
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        _ => PortError::Rejected(message),
    })
}

/// Auth, PostgREST and storage each name their message field differently.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
}
