//! Pocket `v3/add` client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

use super::{check_status, BookmarkStore};
use crate::error::ClientError;
use crate::types::LinkCandidate;

/// Pocket client carrying the static consumer key and access token.
#[derive(Debug, Clone)]
pub struct PocketClient {
    http: Client,
    api_base: String,
    consumer_key: SecretString,
    access_token: SecretString,
}

#[derive(Serialize)]
struct AddRequest<'a> {
    url: &'a str,
    title: &'a str,
    consumer_key: &'a str,
    access_token: &'a str,
}

impl PocketClient {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        consumer_key: SecretString,
        access_token: SecretString,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            consumer_key,
            access_token,
        }
    }
}

#[async_trait]
impl BookmarkStore for PocketClient {
    async fn add(&self, link: &LinkCandidate) -> Result<(), ClientError> {
        let url = format!("{}/add", self.api_base);

        let response = self
            .http
            .post(&url)
            .header("X-Accept", "application/json")
            .json(&AddRequest {
                url: &link.url,
                title: &link.title,
                consumer_key: self.consumer_key.expose_secret(),
                access_token: self.access_token.expose_secret(),
            })
            .send()
            .await?;

        check_status(response).await?;

        info!(url = %link.url, "pocket_link_added");

        Ok(())
    }
}
