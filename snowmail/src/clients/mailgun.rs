//! Mailgun messages API client used to forward mail.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;

use super::{check_status, MailSender};
use crate::dispatch::OutboundMail;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct MailgunClient {
    http: Client,
    api_base: String,
    domain: String,
    api_key: SecretString,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

impl MailgunClient {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        domain: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            domain: domain.into(),
            api_key,
        }
    }

    /// Form fields for the messages endpoint. Custom headers use the `h:` prefix.
    fn form_fields(mail: &OutboundMail) -> Vec<(String, String)> {
        let mut fields = vec![("from".to_string(), mail.from.clone())];

        for to in &mail.to {
            fields.push(("to".to_string(), to.clone()));
        }

        fields.push(("subject".to_string(), mail.subject.clone()));
        fields.push(("text".to_string(), mail.text.clone()));

        if let Some(html) = &mail.html {
            fields.push(("html".to_string(), html.clone()));
        }

        for (name, value) in &mail.headers {
            fields.push((format!("h:{}", name), value.clone()));
        }

        fields
    }
}

#[async_trait]
impl MailSender for MailgunClient {
    async fn send(&self, mail: &OutboundMail) -> Result<(), ClientError> {
        let url = format!("{}/{}/messages", self.api_base, self.domain);

        let response = self
            .http
            .post(&url)
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(&Self::form_fields(mail))
            .send()
            .await?;

        let body: SendResponse = check_status(response).await?.json().await?;

        info!(
            mailgun_id = ?body.id,
            recipients = mail.to.len(),
            "mailgun_message_sent"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields() {
        let mail = OutboundMail {
            from: "alice@example.org".to_string(),
            to: vec!["review@example.com".to_string()],
            subject: "Hello".to_string(),
            text: "hello".to_string(),
            html: None,
            headers: vec![("X-Snowmail-Flagged".to_string(), "false".to_string())],
        };

        let fields = MailgunClient::form_fields(&mail);

        assert!(fields.contains(&("to".to_string(), "review@example.com".to_string())));
        assert!(fields.contains(&("h:X-Snowmail-Flagged".to_string(), "false".to_string())));
        assert!(!fields.iter().any(|(k, _)| k == "html"));
    }
}
