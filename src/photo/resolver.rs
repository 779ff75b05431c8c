use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::upstream::ProfileLookup;

const AVATAR_BASE: &str = "https://ui-avatars.com/api/";
const FALLBACK_NAME: &str = "user";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolverBody {
    Photo { photo_url: String },
    Error { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolverResponse {
    pub status: u16,
    pub body: ResolverBody,
}

impl ResolverResponse {
    fn photo(photo_url: String) -> Self {
        Self {
            status: 200,
            body: ResolverBody::Photo { photo_url },
        }
    }

    fn missing_handle() -> Self {
        Self {
            status: 400,
            body: ResolverBody::Error {
                error: "Handle is required".to_owned(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct PhotoRequest {
    #[serde(default, alias = "username")]
    handle: Option<Value>,
}

pub fn fallback_avatar_url(handle: &str) -> String {
    Url::parse_with_params(AVATAR_BASE, [("name", handle), ("background", "random")])
        .map(|url| url.to_string())
        .unwrap_or_else(|_| format!("{AVATAR_BASE}?name={handle}&background=random"))
}

/// Always yields a usable URL: the upstream image when the lookup works,
/// otherwise a generated avatar for the handle.
pub fn resolve_photo_url(handle: &str, lookup: &dyn ProfileLookup) -> String {
    let handle = handle.replacen('@', "", 1);
    match lookup.profile_image_url(&handle) {
        Ok(Some(url)) => url,
        Ok(None) => {
            debug!(handle = %handle, "profile has no image; using generated avatar");
            fallback_avatar_url(&handle)
        }
        Err(error) => {
            warn!(handle = %handle, %error, "profile lookup failed; using generated avatar");
            fallback_avatar_url(&handle)
        }
    }
}

/// `null`, `false`, zero and the empty string all count as no handle.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Serves one resolver request body. Only a missing handle is reported as a
/// client error; every other problem degrades to a generated avatar.
pub fn handle_request(body: &str, lookup: &dyn ProfileLookup) -> ResolverResponse {
    let request = match serde_json::from_str::<PhotoRequest>(body) {
        Ok(request) => request,
        Err(error) => {
            debug!(%error, "malformed resolver request");
            return ResolverResponse::photo(fallback_avatar_url(FALLBACK_NAME));
        }
    };

    match request.handle {
        None => ResolverResponse::missing_handle(),
        Some(value) if is_blank(&value) => ResolverResponse::missing_handle(),
        Some(Value::String(handle)) => ResolverResponse::photo(resolve_photo_url(&handle, lookup)),
        Some(other) => {
            debug!(kind = ?other, "resolver handle is not a string");
            ResolverResponse::photo(fallback_avatar_url(FALLBACK_NAME))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::super::upstream::LookupError;
    use super::*;

    type Outcome = fn(&str) -> Result<Option<String>, LookupError>;

    struct StubLookup {
        outcome: Outcome,
        seen: Mutex<Vec<String>>,
    }

    impl StubLookup {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProfileLookup for StubLookup {
        fn profile_image_url(&self, handle: &str) -> Result<Option<String>, LookupError> {
            self.seen.lock().unwrap().push(handle.to_owned());
            (self.outcome)(handle)
        }
    }

    fn found(handle: &str) -> Result<Option<String>, LookupError> {
        Ok(Some(format!("https://img.example/{handle}.jpg")))
    }

    fn unauthorized(_: &str) -> Result<Option<String>, LookupError> {
        Err(LookupError::Status(401))
    }

    fn no_image(_: &str) -> Result<Option<String>, LookupError> {
        Ok(None)
    }

    fn photo_url(response: &ResolverResponse) -> &str {
        match &response.body {
            ResolverBody::Photo { photo_url } => photo_url,
            ResolverBody::Error { error } => panic!("expected a photo, got error {error}"),
        }
    }

    #[test]
    fn fallback_url_is_keyed_by_handle() {
        assert_eq!(
            fallback_avatar_url("alice"),
            "https://ui-avatars.com/api/?name=alice&background=random"
        );
        assert_eq!(
            fallback_avatar_url("a b"),
            "https://ui-avatars.com/api/?name=a+b&background=random"
        );
    }

    #[test]
    fn upstream_image_is_passed_through_for_cleaned_handle() {
        let lookup = StubLookup::new(found);
        let response = handle_request(r#"{"handle":"@alice"}"#, &lookup);

        assert_eq!(response.status, 200);
        assert_eq!(photo_url(&response), "https://img.example/alice.jpg");
        assert_eq!(*lookup.seen.lock().unwrap(), vec!["alice".to_owned()]);
    }

    #[test]
    fn username_alias_is_accepted() {
        let lookup = StubLookup::new(found);
        let response = handle_request(r#"{"username":"bob"}"#, &lookup);
        assert_eq!(photo_url(&response), "https://img.example/bob.jpg");
    }

    #[test]
    fn upstream_failure_degrades_to_avatar() {
        for outcome in [unauthorized as Outcome, no_image] {
            let lookup = StubLookup::new(outcome);
            let response = handle_request(r#"{"handle":"carol"}"#, &lookup);
            assert_eq!(response.status, 200);
            assert_eq!(photo_url(&response), fallback_avatar_url("carol"));
        }
    }

    #[test]
    fn missing_handle_is_the_only_client_error() {
        let lookup = StubLookup::new(found);
        for body in [
            "{}",
            r#"{"handle":null}"#,
            r#"{"handle":""}"#,
            r#"{"handle":false}"#,
            r#"{"handle":0}"#,
            r#"{"username":0.0}"#,
        ] {
            let response = handle_request(body, &lookup);
            assert_eq!(response.status, 400);
            assert_eq!(
                serde_json::to_value(&response.body).unwrap(),
                json!({ "error": "Handle is required" })
            );
        }
        assert!(lookup.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_bodies_get_a_generic_avatar() {
        let lookup = StubLookup::new(found);
        for body in ["not json", r#"{"handle":42}"#, r#"{"handle":true}"#, r#"{"handle":[]}"#] {
            let response = handle_request(body, &lookup);
            assert_eq!(response.status, 200);
            assert_eq!(photo_url(&response), fallback_avatar_url("user"));
        }
    }

    #[test]
    fn response_serializes_with_photo_url_field() {
        let response = ResolverResponse::photo("https://img.example/x.jpg".to_owned());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "status": 200, "body": { "photo_url": "https://img.example/x.jpg" } })
        );
    }
}
