use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PROFILE_API: &str = "https://api.twitter.com";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid profile API base {base}: {message}")]
    InvalidBase { base: String, message: String },

    #[error("profile API responded with status {0}")]
    Status(u16),

    #[error("no bearer token configured for the profile API")]
    MissingToken,
}

/// Finds the profile image for an already cleaned handle.
pub trait ProfileLookup: Send + Sync {
    fn profile_image_url(&self, handle: &str) -> Result<Option<String>, LookupError>;
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    data: Option<ProfileData>,
}

#[derive(Debug, Deserialize)]
struct ProfileData {
    #[serde(default)]
    profile_image_url: Option<String>,
}

#[derive(Debug)]
pub struct XProfileClient {
    client: Client,
    api_base: Url,
    bearer_token: Option<String>,
}

impl XProfileClient {
    pub fn new(api_base: &str, bearer_token: Option<String>) -> Result<Self, LookupError> {
        let api_base = Url::parse(api_base).map_err(|error| LookupError::InvalidBase {
            base: api_base.to_owned(),
            message: error.to_string(),
        })?;
        if api_base.cannot_be_a_base() {
            return Err(LookupError::InvalidBase {
                base: api_base.to_string(),
                message: "URL cannot be used as a base".to_owned(),
            });
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_base,
            bearer_token: bearer_token.filter(|token| !token.trim().is_empty()),
        })
    }

    fn user_url(&self, handle: &str) -> Result<Url, LookupError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| LookupError::InvalidBase {
                base: self.api_base.to_string(),
                message: "URL cannot be used as a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(["2", "users", "by", "username", handle]);
        url.query_pairs_mut()
            .append_pair("user.fields", "profile_image_url,name");
        Ok(url)
    }
}

impl ProfileLookup for XProfileClient {
    fn profile_image_url(&self, handle: &str) -> Result<Option<String>, LookupError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or(LookupError::MissingToken)?;
        let url = self.user_url(handle)?;
        debug!(%url, "looking up profile image");

        let response = self.client.get(url).bearer_auth(token).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let envelope: ProfileEnvelope = response.json()?;
        Ok(envelope
            .data
            .and_then(|data| data.profile_image_url)
            .filter(|url| !url.is_empty()))
    }
}
