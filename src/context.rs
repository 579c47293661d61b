//! Framework-free capture of one request plus the rules that flatten it
//! into record enrichment.

use std::collections::BTreeMap;

use crate::record::AdditionalInfo;

/// Claim type carrying the authenticated user's identifier.
pub const CLAIM_NAME_IDENTIFIER: &str = "nameidentifier";

/// Claim type carrying the authenticated user's display name.
pub const CLAIM_NAME: &str = "name";

/// Enrichment key holding the verbatim `User-Agent` header.
pub const USER_AGENT_KEY: &str = "UserAgent";

/// Enrichment key holding the verbatim `Accept-Language` header.
pub const LANGUAGES_KEY: &str = "Languages";

/// One assertion from an authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Claim {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Best-effort captured body content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedBody {
    pub bytes: Option<u64>,
    pub content: String,
}

/// Response metadata captured at an HTTP boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCapture {
    pub status_code: u16,
    pub mime_type: Option<String>,
    pub body: Option<CapturedBody>,
}

/// Abstract view of one in-flight request. Callers without a request (for
/// example background jobs) simply build records without a context; every
/// field here is optional and extraction of an absent field is a no-op.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path: Option<String>,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub claims: Vec<Claim>,
    pub client_ip: Option<String>,
    pub method: Option<String>,
    pub referrer: Option<String>,
    pub request_mime: Option<String>,
    pub request_body: Option<CapturedBody>,
    pub response: Option<ResponseCapture>,
    /// Framework-supplied per-request identifier, used as the correlation
    /// fallback when no caller-set value is active.
    pub trace_identifier: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        RequestContext::default()
    }
}

/// Partial enrichment produced from a request context, merged into a record
/// by the builder.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub user_id: String,
    pub user_name: String,
    /// Request path, recorded as the application location.
    pub location: Option<String>,
    pub entries: AdditionalInfo,
}

/// Flatten a request context into enrichment, applying the claim and
/// query-string rules below.
pub fn extract(ctx: &RequestContext) -> Enrichment {
    let mut enrichment = Enrichment::default();
    extract_user_data(ctx, &mut enrichment);
    extract_request_data(ctx, &mut enrichment);
    enrichment
}

/// Claims: the identifier claim maps to `user_id`, the name claim to
/// `user_name`, and every other claim is preserved under
/// `UserClaim-{ordinal}-{type}`. The ordinal starts at 1 and increments only
/// for "other" claims, keeping keys unique when claim types repeat.
fn extract_user_data(ctx: &RequestContext, enrichment: &mut Enrichment) {
    let mut ordinal = 1;
    for claim in &ctx.claims {
        match claim.claim_type.as_str() {
            CLAIM_NAME_IDENTIFIER => enrichment.user_id = claim.value.clone(),
            CLAIM_NAME => enrichment.user_name = claim.value.clone(),
            other => {
                enrichment.entries.insert(
                    format!("UserClaim-{ordinal}-{other}"),
                    serde_json::Value::String(claim.value.clone()),
                );
                ordinal += 1;
            }
        }
    }
}

fn extract_request_data(ctx: &RequestContext, enrichment: &mut Enrichment) {
    enrichment.location = ctx.path.clone();

    if let Some(user_agent) = &ctx.user_agent {
        enrichment.entries.insert(
            USER_AGENT_KEY.to_string(),
            serde_json::Value::String(user_agent.clone()),
        );
    }
    if let Some(languages) = &ctx.accept_language {
        enrichment.entries.insert(
            LANGUAGES_KEY.to_string(),
            serde_json::Value::String(languages.clone()),
        );
    }

    if let Some(query) = &ctx.query {
        for (key, values) in parse_query(query) {
            let value = if values.len() == 1 {
                serde_json::Value::String(values.into_iter().next().unwrap_or_default())
            } else {
                serde_json::Value::Array(
                    values.into_iter().map(serde_json::Value::String).collect(),
                )
            };
            enrichment.entries.insert(format!("QueryString-{key}"), value);
        }
    }
}

/// Parse a raw query string into per-key value lists. Keys and values are
/// percent-decoded best-effort; undecodable components are kept verbatim.
fn parse_query(raw: &str) -> BTreeMap<String, Vec<String>> {
    let mut parsed: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for pair in raw.trim_start_matches('?').split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, value),
            None => (pair, ""),
        };
        let key = decode_component(key);
        if key.is_empty() {
            continue;
        }
        parsed.entry(key).or_default().push(decode_component(value));
    }

    parsed
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_map_to_identity_and_ordinal_keys() {
        let mut ctx = RequestContext::new();
        ctx.claims = vec![
            Claim::new(CLAIM_NAME_IDENTIFIER, "u1"),
            Claim::new(CLAIM_NAME, "Alice"),
            Claim::new("role", "admin"),
        ];

        let enrichment = extract(&ctx);
        assert_eq!(enrichment.user_id, "u1");
        assert_eq!(enrichment.user_name, "Alice");
        assert_eq!(enrichment.entries["UserClaim-1-role"], "admin");
    }

    #[test]
    fn repeated_claim_types_get_distinct_ordinals() {
        let mut ctx = RequestContext::new();
        ctx.claims = vec![
            Claim::new("role", "admin"),
            Claim::new("role", "auditor"),
        ];

        let enrichment = extract(&ctx);
        assert_eq!(enrichment.entries["UserClaim-1-role"], "admin");
        assert_eq!(enrichment.entries["UserClaim-2-role"], "auditor");
    }

    #[test]
    fn query_string_keys_keep_multi_values() {
        let mut ctx = RequestContext::new();
        ctx.query = Some("a=1&a=2&b=3".to_string());

        let enrichment = extract(&ctx);
        assert_eq!(
            enrichment.entries["QueryString-a"],
            serde_json::json!(["1", "2"])
        );
        assert_eq!(enrichment.entries["QueryString-b"], "3");
    }

    #[test]
    fn query_components_are_percent_decoded() {
        let mut ctx = RequestContext::new();
        ctx.query = Some("q=hello%20there&tag=a+b".to_string());

        let enrichment = extract(&ctx);
        assert_eq!(enrichment.entries["QueryString-q"], "hello there");
        assert_eq!(enrichment.entries["QueryString-tag"], "a b");
    }

    #[test]
    fn headers_are_stored_verbatim_under_fixed_keys() {
        let mut ctx = RequestContext::new();
        ctx.user_agent = Some("agent/1.0".to_string());
        ctx.accept_language = Some("en-US,en;q=0.9".to_string());
        ctx.path = Some("/orders".to_string());

        let enrichment = extract(&ctx);
        assert_eq!(enrichment.entries[USER_AGENT_KEY], "agent/1.0");
        assert_eq!(enrichment.entries[LANGUAGES_KEY], "en-US,en;q=0.9");
        assert_eq!(enrichment.location.as_deref(), Some("/orders"));
    }

    #[test]
    fn absent_context_fields_extract_to_nothing() {
        let enrichment = extract(&RequestContext::new());
        assert!(enrichment.entries.is_empty());
        assert!(enrichment.user_id.is_empty());
        assert!(enrichment.location.is_none());
    }
}
