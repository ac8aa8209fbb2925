//! ISRC/UPC lookup against the public catalog API, yielding full gw-light
//! records for matches.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::catalog::api::CatalogApi;
use crate::catalog::gateway::quota_backoff;
use crate::catalog::types::{Album, Track};
use crate::common::errors::{FingerprintKind, ResolveError};

const PUBLIC_API_BASE: &str = "https://api.deezer.com";

const QUOTA_ERROR_CODE: i64 = 4;
const QUOTA_RETRY_CEILING: u32 = 5;

/// Next step for a public-API response body.
#[derive(Debug, PartialEq, Eq)]
enum LookupStep {
    /// Not quota-limited; hand the body to the caller as-is.
    Done,
    /// Quota error with budget left; resend the identical request after
    /// the jittered delay.
    Retry,
    /// Quota error past the budget; surfaces as a rate-limit error, never
    /// as a miss.
    Exhausted,
}

fn plan_lookup(body: &Value, quota_retries: u32) -> LookupStep {
    if body.pointer("/error/code").and_then(Value::as_i64) != Some(QUOTA_ERROR_CODE) {
        return LookupStep::Done;
    }
    if quota_retries < QUOTA_RETRY_CEILING {
        LookupStep::Retry
    } else {
        LookupStep::Exhausted
    }
}

/// A catalog miss names the entity and the fingerprint that failed it.
fn miss(display_name: &str, kind: FingerprintKind, code: &str) -> ResolveError {
    ResolveError::NotFound(format!("{} ({}: {})", display_name, kind, code))
}

/// Keeps the trailing 12 characters of over-long, zero-led UPCs, matching
/// the catalog's own representation. Idempotent.
pub fn normalize_upc(upc: &str) -> &str {
    if upc.len() > 12 && upc.starts_with('0') {
        &upc[upc.len() - 12..]
    } else {
        upc
    }
}

pub struct FingerprintResolver {
    http: reqwest::Client,
    api: Arc<CatalogApi>,
}

impl FingerprintResolver {
    pub fn new(http: reqwest::Client, api: Arc<CatalogApi>) -> Self {
        Self { http, api }
    }

    /// Resolves a foreign track by ISRC. `display_name` only feeds the
    /// error messages.
    pub async fn by_isrc(
        &self,
        display_name: &str,
        isrc: Option<&str>,
    ) -> Result<Track, ResolveError> {
        let isrc = isrc
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ResolveError::MissingFingerprint {
                kind: FingerprintKind::Isrc,
                name: display_name.to_string(),
            })?;

        let body = self.lookup(&format!("track/isrc:{}", isrc), &[]).await?;
        if body.get("error").is_some() {
            return Err(miss(display_name, FingerprintKind::Isrc, isrc));
        }

        let id = entity_id(&body).ok_or_else(|| {
            ResolveError::Schema("track/isrc", "match carried no id".to_string())
        })?;
        self.api.get_track(&id).await
    }

    /// Resolves a foreign album by UPC, returning the album plus its full
    /// track list.
    pub async fn by_upc(
        &self,
        display_name: &str,
        upc: Option<&str>,
    ) -> Result<(Album, Vec<Track>), ResolveError> {
        let upc = upc
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ResolveError::MissingFingerprint {
                kind: FingerprintKind::Upc,
                name: display_name.to_string(),
            })?;
        let upc = normalize_upc(upc);

        let body = self.lookup(&format!("album/upc:{}", upc), &[]).await?;
        if body.get("error").is_some() {
            return Err(miss(display_name, FingerprintKind::Upc, upc));
        }

        let id = entity_id(&body)
            .ok_or_else(|| ResolveError::Schema("album/upc", "match carried no id".to_string()))?;
        let album = self.api.get_album(&id).await?;
        let tracks = self.api.get_album_tracks(&id).await?;
        Ok((album, tracks.data))
    }

    /// One public API GET. Quota errors arrive in the body with code 4;
    /// those are resent after the usual jittered delay, same parameters,
    /// and surface as a rate-limit error once the budget is spent.
    pub(crate) async fn lookup(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ResolveError> {
        let url = format!("{}/{}", PUBLIC_API_BASE, path);
        let mut quota_retries = 0u32;

        loop {
            let body = self
                .http
                .get(&url)
                .query(query)
                .send()
                .await?
                .json::<Value>()
                .await?;

            match plan_lookup(&body, quota_retries) {
                LookupStep::Done => return Ok(body),
                LookupStep::Retry => {
                    quota_retries += 1;
                    let delay = quota_backoff();
                    debug!("public api quota error on {}, resending in {:?}", path, delay);
                    tokio::time::sleep(delay).await;
                }
                LookupStep::Exhausted => return Err(ResolveError::RateLimit(quota_retries)),
            }
        }
    }
}

/// The public API returns numeric ids; gw-light wants them as strings.
fn entity_id(body: &Value) -> Option<String> {
    match body.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::gateway::GatewayClient;
    use crate::common::http::HttpClient;
    use serde_json::json;

    fn resolver() -> FingerprintResolver {
        let http = HttpClient::new().expect("client");
        let gateway =
            Arc::new(GatewayClient::new(http.clone(), &"a".repeat(192)).expect("gateway"));
        FingerprintResolver::new(http, Arc::new(CatalogApi::new(gateway)))
    }

    #[test]
    fn test_normalize_upc_truncates_zero_led_long_codes() {
        assert_eq!(normalize_upc("00602567890123"), "602567890123");
        assert_eq!(normalize_upc("0190295851927"), "190295851927");
    }

    #[test]
    fn test_normalize_upc_is_idempotent() {
        let once = normalize_upc("00602567890123");
        assert_eq!(normalize_upc(once), once);
    }

    #[test]
    fn test_normalize_upc_leaves_short_and_nonzero_codes() {
        assert_eq!(normalize_upc("602567890123"), "602567890123");
        assert_eq!(normalize_upc("1902958519270"), "1902958519270");
        assert_eq!(normalize_upc("0601"), "0601");
    }

    #[tokio::test]
    async fn test_missing_isrc_is_distinguished_from_no_match() {
        let err = resolver()
            .by_isrc("Around the World", None)
            .await
            .unwrap_err();
        match err {
            ResolveError::MissingFingerprint { kind, name } => {
                assert_eq!(kind, FingerprintKind::Isrc);
                assert_eq!(name, "Around the World");
            }
            other => panic!("expected MissingFingerprint, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_upc_names_the_album() {
        let err = resolver().by_upc("Discovery", Some("")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "UPC code not found for Discovery"
        );
    }

    #[test]
    fn test_persistent_quota_error_is_rate_limited_not_a_miss() {
        let limited = json!({"error": {"code": 4, "message": "Quota limit exceeded"}});
        assert_eq!(plan_lookup(&limited, 0), LookupStep::Retry);
        assert_eq!(
            plan_lookup(&limited, QUOTA_RETRY_CEILING - 1),
            LookupStep::Retry
        );
        assert_eq!(
            plan_lookup(&limited, QUOTA_RETRY_CEILING),
            LookupStep::Exhausted
        );
    }

    #[test]
    fn test_non_quota_bodies_pass_through() {
        assert_eq!(plan_lookup(&json!({"id": 3135556}), 0), LookupStep::Done);
        // A data error is a miss, not a quota condition; it reaches the
        // caller's error-envelope check.
        assert_eq!(
            plan_lookup(&json!({"error": {"type": "DataException"}}), 0),
            LookupStep::Done
        );
    }

    #[test]
    fn test_lookup_miss_names_entity_and_fingerprint() {
        let err = miss("Around the World", FingerprintKind::Isrc, "GBDUW0000059");
        assert_eq!(
            err.to_string(),
            "no match on deezer for Around the World (ISRC: GBDUW0000059)"
        );

        let err = miss("Discovery", FingerprintKind::Upc, "724384960650");
        assert_eq!(
            err.to_string(),
            "no match on deezer for Discovery (UPC: 724384960650)"
        );
    }

    #[test]
    fn test_entity_id_accepts_numbers_and_strings() {
        assert_eq!(entity_id(&json!({"id": 3135556})), Some("3135556".to_string()));
        assert_eq!(entity_id(&json!({"id": "3135556"})), Some("3135556".to_string()));
        assert_eq!(entity_id(&json!({"id": ""})), None);
        assert_eq!(entity_id(&json!({})), None);
    }
}
