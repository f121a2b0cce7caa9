//! Link extraction through the text-generation service.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::clients::TextGenerator;
use crate::error::{Error, Result, Stage};
use crate::gateway::{first_choice_text, require_content};
use crate::types::LinkCandidate;

const EXTRACT_INSTRUCTION: &str = "You extract links from email content. Find every link in \
the content you are given that looks like an article a reader might want to save and read \
later. Ignore unsubscribe links, tracking pixels, social profiles and images. Respond only \
with a JSON array where each element is an object with a \"url\" field and a \"title\" \
field. Use the link text or the article headline as the title. Respond with [] if there \
are no such links.";

/// Accepted shapes for one element of the generated array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLink {
    Url(String),
    Object {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
}

#[derive(Clone)]
pub struct LinkExtractor {
    generator: Arc<dyn TextGenerator>,
}

impl LinkExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn extract_links(&self, content: &str) -> Result<Vec<LinkCandidate>> {
        require_content(content)?;

        let choices = self
            .generator
            .generate(EXTRACT_INSTRUCTION, content)
            .await
            .map_err(|e| {
                warn!(error = %e, "link_extraction_upstream_failed");
                Error::dependency(Stage::LinkExtraction, e)
            })?;

        let text = first_choice_text(Stage::LinkExtraction, choices)?;
        let links = parse_candidates(&text)?;

        info!(
            content_length = content.len(),
            links_found = links.len(),
            "link_extraction_complete"
        );

        Ok(links)
    }
}

/// Parse generated text into link candidates.
///
/// The text must be a JSON array (a surrounding markdown code fence is
/// tolerated) of URL strings or `{url, title}` objects. Entries that are not
/// http(s) URLs are dropped, and duplicates keep their first position.
pub fn parse_candidates(text: &str) -> Result<Vec<LinkCandidate>> {
    let json = strip_code_fence(text);

    let raw: Vec<RawLink> = serde_json::from_str(json).map_err(|e| {
        let preview: String = json.chars().take(200).collect();
        warn!(
            error = %e,
            response_preview = %preview,
            "link_extraction_parse_failed"
        );
        Error::unexpected(Stage::LinkExtraction, format!("not a JSON link list: {}", e))
    })?;

    let mut links: Vec<LinkCandidate> = Vec::new();

    for entry in raw {
        let (url, title) = match entry {
            RawLink::Url(url) => (url, None),
            RawLink::Object { url, title } => (url, title),
        };

        let url = url.trim();
        if !is_http_url(url) {
            debug!(url = %url, "link_extraction_skipped_non_http");
            continue;
        }

        if links.iter().any(|l| l.url == url) {
            continue;
        }

        links.push(LinkCandidate::new(url, title));
    }

    Ok(links)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop an optional language tag on the opening fence line
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };

    rest.trim_end().trim_end_matches("```").trim()
}

fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fakes::FakeGenerator;

    #[test]
    fn test_parse_objects() {
        let links = parse_candidates(
            r#"[{"url": "https://example.com/post", "title": "A post"},
                {"url": "https://example.com/other"}]"#,
        )
        .unwrap();

        assert_eq!(
            links,
            vec![
                LinkCandidate {
                    url: "https://example.com/post".to_string(),
                    title: "A post".to_string(),
                },
                LinkCandidate {
                    url: "https://example.com/other".to_string(),
                    title: "https://example.com/other".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_plain_strings() {
        let links = parse_candidates(r#"["https://a.example/1", "http://b.example/2"]"#).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "https://a.example/1");
    }

    #[test]
    fn test_parse_code_fence() {
        let text = "```json\n[\"https://example.com/a\"]\n```";
        let links = parse_candidates(text).unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_parse_drops_non_http_and_duplicates() {
        let links = parse_candidates(
            r#"["mailto:bob@example.com", "https://example.com/a", "not a url",
                "https://example.com/a", "ftp://example.com/file"]"#,
        )
        .unwrap();

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/a");
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_candidates("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_failure_is_dependency_error() {
        assert!(matches!(
            parse_candidates("Here are the links: https://example.com"),
            Err(Error::Dependency { stage: Stage::LinkExtraction, .. })
        ));
        assert!(matches!(
            parse_candidates(r#"{"url": "https://example.com"}"#),
            Err(Error::Dependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_extract_links_is_idempotent() {
        let reply = r#"[{"url": "https://example.com/a", "title": "A"}, "https://example.com/b"]"#;
        let generator = Arc::new(FakeGenerator::new());
        generator.push_text(reply);
        generator.push_text(reply);
        let extractor = LinkExtractor::new(generator.clone());

        let first = extractor.extract_links("<a href=...>").await.unwrap();
        let second = extractor.extract_links("<a href=...>").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_extract_links_empty_content() {
        let extractor = LinkExtractor::new(Arc::new(FakeGenerator::new()));
        assert!(matches!(extractor.extract_links("").await, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_extract_links_upstream_failure() {
        let extractor = LinkExtractor::new(Arc::new(FakeGenerator::failing()));
        assert!(matches!(
            extractor.extract_links("content").await,
            Err(Error::Dependency { stage: Stage::LinkExtraction, .. })
        ));
    }
}
