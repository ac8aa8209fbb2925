//! Resilient client for the gw-light private API. Recovery around auth
//! loss, quota errors and stale api tokens is transparent: callers await
//! one logical call and get either the `results` payload or a terminal
//! error.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::common::errors::ResolveError;

const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";
const API_KEY: &str = "ZAIVAHCEISOHWAICUQUEXAEPICENGUAFAEZAIPHAELEEVAHPHUCUFONGUAPASUAY";

const ARL_LENGTH: usize = 192;

/// Shared hard stop for `VALID_TOKEN_REQUIRED` recovery; the error past
/// this many refreshes is surfaced instead of retried.
const TOKEN_RETRY_CEILING: u32 = 15;
/// Per-call budgets so every path through the state machine terminates.
const AUTH_RETRY_CEILING: u32 = 3;
const QUOTA_RETRY_CEILING: u32 = 5;

const QUOTA_ERROR_CODE: i64 = 4;

/// Jittered delay before resending a quota-limited request.
pub(crate) fn quota_backoff() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(1000..1500))
}

/// Recovery transition chosen from a structured gateway error.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Recovery {
    /// Re-run the ARL login, then resend the original request.
    Reauthenticate,
    /// Sleep `quota_backoff()`, then resend the original request.
    Backoff,
    /// Fetch a fresh api token, then resend the original request.
    RefreshToken,
    /// Token refreshes are exhausted; surface to the caller.
    TokenExhausted,
    /// Unrecognized error; surface to the caller.
    Terminal,
}

/// Maps an error envelope to a transition. Precedence when several keys
/// co-occur: auth demand, then quota, then gateway/stale-token.
pub(crate) fn plan_recovery(error: &Value, token_retries: u32) -> Recovery {
    if error.get("NEED_API_AUTH_REQUIRED").is_some() {
        return Recovery::Reauthenticate;
    }
    if error.get("code").and_then(Value::as_i64) == Some(QUOTA_ERROR_CODE) {
        return Recovery::Backoff;
    }
    let token_invalid = error.get("VALID_TOKEN_REQUIRED").is_some();
    if error.get("GATEWAY_ERROR").is_some() || (token_invalid && token_retries < TOKEN_RETRY_CEILING)
    {
        return Recovery::RefreshToken;
    }
    if token_invalid {
        return Recovery::TokenExhausted;
    }
    Recovery::Terminal
}

/// The gateway reports failures in the body, not via HTTP status. An
/// absent or empty error member means success.
fn envelope_error(response: &Value) -> Option<&Value> {
    match response.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(Value::Array(items)) if items.is_empty() => None,
        Some(error) => Some(error),
    }
}

struct GatewaySession {
    sid: Option<String>,
    api_token: String,
    /// Bumped on every successful recovery so concurrent callers that
    /// raced into the same failure reuse one refresh instead of stacking
    /// their own.
    generation: u64,
}

pub struct GatewayClient {
    http: reqwest::Client,
    arl: String,
    session: Mutex<GatewaySession>,
    token_retries: AtomicU32,
}

impl GatewayClient {
    pub fn new(http: reqwest::Client, arl: &str) -> Result<Self, ResolveError> {
        if arl.len() != ARL_LENGTH {
            return Err(ResolveError::Config(format!(
                "invalid arl: length should be {} characters, you have provided {}",
                ARL_LENGTH,
                arl.len()
            )));
        }

        Ok(Self {
            http,
            arl: arl.to_string(),
            session: Mutex::new(GatewaySession {
                sid: None,
                api_token: "null".to_string(),
                generation: 0,
            }),
            token_retries: AtomicU32::new(0),
        })
    }

    /// Calls a gw-light method and drives recovery until the call either
    /// yields `results` or fails terminally. The resend always carries
    /// the original method and body.
    pub async fn request(&self, method: &str, body: Value) -> Result<Value, ResolveError> {
        let mut auth_retries = 0u32;
        let mut quota_retries = 0u32;

        loop {
            let (api_token, sid, generation) = {
                let session = self.session.lock().await;
                (
                    session.api_token.clone(),
                    session.sid.clone(),
                    session.generation,
                )
            };

            let response = self
                .send_gw(method, &api_token, sid.as_deref(), None)
                .json(&body)
                .send()
                .await?
                .json::<Value>()
                .await?;

            let Some(error) = envelope_error(&response) else {
                return Ok(response.get("results").cloned().unwrap_or(Value::Null));
            };

            match plan_recovery(error, self.token_retries.load(Ordering::Relaxed)) {
                Recovery::Reauthenticate => {
                    if auth_retries >= AUTH_RETRY_CEILING {
                        return Err(ResolveError::Auth(format!(
                            "NEED_API_AUTH_REQUIRED persisted after {} logins",
                            auth_retries
                        )));
                    }
                    auth_retries += 1;
                    warn!("gateway demanded re-auth on {}, logging in again", method);
                    self.reauthenticate(generation).await?;
                }
                Recovery::Backoff => {
                    if quota_retries >= QUOTA_RETRY_CEILING {
                        return Err(ResolveError::RateLimit(quota_retries));
                    }
                    quota_retries += 1;
                    let delay = quota_backoff();
                    debug!("quota error on {}, resending in {:?}", method, delay);
                    tokio::time::sleep(delay).await;
                }
                Recovery::RefreshToken => {
                    self.token_retries.fetch_add(1, Ordering::Relaxed);
                    self.refresh_api_token(generation).await?;
                }
                Recovery::TokenExhausted => {
                    return Err(ResolveError::TokenExhausted(TOKEN_RETRY_CEILING));
                }
                Recovery::Terminal => {
                    return Err(ResolveError::Gateway(error.to_string()));
                }
            }
        }
    }

    /// ARL login via `deezer.ping`; stores the fresh session id and
    /// returns it. Also the lazy bootstrap for the first request.
    pub async fn init_session(&self) -> Result<String, ResolveError> {
        let generation = self.session.lock().await.generation;
        self.reauthenticate(generation).await?;
        let session = self.session.lock().await;
        session
            .sid
            .clone()
            .ok_or_else(|| ResolveError::Auth("login returned no session id".to_string()))
    }

    /// Builds a gw-light request with the fixed client-identification
    /// parameters plus the mutable session pair.
    fn send_gw(
        &self,
        method: &str,
        api_token: &str,
        sid: Option<&str>,
        cookie: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let mut query: Vec<(&str, String)> = vec![
            ("version", "8.32.0".to_string()),
            ("api_key", API_KEY.to_string()),
            ("output", "3".to_string()),
            ("input", "3".to_string()),
            ("buildId", "ios12_universal".to_string()),
            ("screenHeight", "480".to_string()),
            ("screenWidth", "320".to_string()),
            ("lang", "en".to_string()),
            ("method", method.to_string()),
            ("api_version", "1.0".to_string()),
            ("api_token", api_token.to_string()),
        ];
        if let Some(sid) = sid {
            query.push(("sid", sid.to_string()));
        }

        let mut request = self.http.post(GATEWAY_URL).query(&query);
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie.to_string());
        }
        request
    }

    /// Re-runs session initialization with the stored credential. Holding
    /// the session lock across the call serializes concurrent recovery;
    /// a caller that observes a bumped generation skips its own login.
    async fn reauthenticate(&self, observed_generation: u64) -> Result<(), ResolveError> {
        let mut session = self.session.lock().await;
        if session.generation != observed_generation {
            return Ok(());
        }

        let cookie = format!("arl={}", self.arl);
        let response = self
            .send_gw("deezer.ping", "", None, Some(&cookie))
            .send()
            .await?
            .json::<Value>()
            .await?;

        let sid = response
            .pointer("/results/SESSION")
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::Auth("no SESSION in login response".to_string()))?;

        session.sid = Some(sid.to_string());
        session.generation += 1;
        debug!("gateway session re-established");
        Ok(())
    }

    /// Fetches a fresh anonymous api token via `deezer.getUserData`,
    /// updating both the token and the session id. Coalesced the same way
    /// as `reauthenticate`.
    async fn refresh_api_token(&self, observed_generation: u64) -> Result<(), ResolveError> {
        let mut session = self.session.lock().await;
        if session.generation != observed_generation {
            return Ok(());
        }

        let response = self
            .send_gw("deezer.getUserData", "null", session.sid.as_deref(), None)
            .send()
            .await?
            .json::<Value>()
            .await?;

        let api_token = response
            .pointer("/results/checkForm")
            .and_then(Value::as_str)
            .ok_or_else(|| ResolveError::Auth("no checkForm in getUserData response".to_string()))?
            .to_string();
        if let Some(sid) = response.pointer("/results/SESSION_ID").and_then(Value::as_str) {
            session.sid = Some(sid.to_string());
        }

        session.api_token = api_token;
        session.generation += 1;
        debug!("gateway api token refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arl_length_is_validated() {
        let http = crate::common::http::HttpClient::new().expect("client");
        let err = GatewayClient::new(http, "too-short").err().unwrap();
        assert!(matches!(err, ResolveError::Config(_)));

        let http = crate::common::http::HttpClient::new().expect("client");
        assert!(GatewayClient::new(http, &"a".repeat(192)).is_ok());
    }

    #[test]
    fn test_auth_demand_wins_over_other_errors() {
        let error = json!({
            "NEED_API_AUTH_REQUIRED": "login required",
            "code": 4,
            "VALID_TOKEN_REQUIRED": "token"
        });
        assert_eq!(plan_recovery(&error, 0), Recovery::Reauthenticate);
    }

    #[test]
    fn test_quota_code_backs_off() {
        let error = json!({"code": 4, "message": "Quota limit exceeded"});
        assert_eq!(plan_recovery(&error, 0), Recovery::Backoff);
    }

    #[test]
    fn test_gateway_error_refreshes_token() {
        let error = json!({"GATEWAY_ERROR": "upstream"});
        assert_eq!(plan_recovery(&error, 0), Recovery::RefreshToken);
    }

    #[test]
    fn test_token_invalid_stops_at_ceiling() {
        let error = json!({"VALID_TOKEN_REQUIRED": "token"});

        // Attempts 1..=15 each trigger a refresh; the 16th error is final.
        let mut retries = 0u32;
        for _ in 0..15 {
            assert_eq!(plan_recovery(&error, retries), Recovery::RefreshToken);
            retries += 1;
        }
        assert_eq!(retries, 15);
        assert_eq!(plan_recovery(&error, retries), Recovery::TokenExhausted);
    }

    #[test]
    fn test_unknown_error_is_terminal() {
        let error = json!({"DATA_ERROR": "no such song"});
        assert_eq!(plan_recovery(&error, 0), Recovery::Terminal);
    }

    #[test]
    fn test_empty_envelope_means_success() {
        assert!(envelope_error(&json!({"results": {"SNG_ID": "1"}})).is_none());
        assert!(envelope_error(&json!({"error": {}, "results": {}})).is_none());
        assert!(envelope_error(&json!({"error": [], "results": {}})).is_none());
        assert!(envelope_error(&json!({"error": {"code": 4}})).is_some());
    }

    #[test]
    fn test_quota_backoff_stays_in_window() {
        for _ in 0..100 {
            let delay = quota_backoff();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(1500));
        }
    }
}
