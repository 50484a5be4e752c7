//! HTTP client for the assistant registry.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::a2a::AgentCard;
use crate::config::Settings;
use crate::error::Error;
use crate::Result;

use super::{Assistant, AssistantDirectory};

/// Records requested per page.
pub const PAGE_SIZE: usize = 100;

/// Hard stop for registries that never report a last page.
pub const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct RawAssistant {
    id: Value,
    name: String,
    #[serde(default)]
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    #[serde(default, alias = "current_page")]
    page: Option<usize>,
    #[serde(default, alias = "last_page")]
    total_pages: Option<usize>,
    /// `Some(Value::Null)` when the key is present but null.
    #[serde(default, deserialize_with = "present")]
    next_page: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Page number to request after the one just fetched, or `None` to stop.
///
/// `requested` is the page parameter that was sent (`None` for the first
/// request). The registry's own `pagination` block wins; without one, a full
/// page means there may be more.
fn next_page(
    pagination: Option<&Pagination>,
    requested: Option<usize>,
    zero_based: bool,
    count: usize,
) -> Option<usize> {
    if count == 0 {
        return None;
    }
    let current = pagination
        .and_then(|p| p.page)
        .or(requested)
        .unwrap_or(if zero_based { 0 } else { 1 });

    if let Some(p) = pagination {
        match p.next_page {
            Some(Value::Null) => return None,
            Some(Value::Number(ref n)) => return n.as_u64().map(|n| n as usize),
            Some(_) => return Some(current + 1),
            None => {}
        }
        if let (Some(page), Some(total)) = (p.page, p.total_pages) {
            let last = if zero_based { total.saturating_sub(1) } else { total };
            return (page < last).then_some(page + 1);
        }
    }

    (count == PAGE_SIZE).then_some(current + 1)
}

/// Registry client.
#[derive(Clone)]
pub struct HttpDirectory {
    base_url: String,
    cookies: Option<String>,
    client: Client,
}

impl HttpDirectory {
    pub fn new(base_url: &str, cookies: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookies,
            client,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.upstream_base_url,
            settings.auth_cookies.clone(),
            settings.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.cookies {
            Some(ref cookies) => builder.header(COOKIE, cookies),
            None => builder,
        }
    }

    /// GET `url` and decode the body as JSON, mapping every failure to `Error::Upstream`.
    async fn get_json(&self, builder: RequestBuilder) -> Result<Value> {
        let response = self
            .with_auth(builder.header(ACCEPT, "application/json"))
            .send()
            .await
            .map_err(Error::upstream_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream_status(status.as_u16(), body));
        }

        let text = response.text().await.map_err(Error::upstream_transport)?;
        serde_json::from_str(&text).map_err(|e| Error::invalid_format(format!("{e}: {text}")))
    }

    /// The first request carries only `per_page`; later ones add `page`.
    async fn fetch_page(
        &self,
        page: Option<usize>,
    ) -> Result<(Vec<Assistant>, Option<Pagination>)> {
        let url = format!("{}/assistants", self.base_url);
        let mut builder = self.client.get(&url).query(&[("per_page", PAGE_SIZE)]);
        if let Some(page) = page {
            builder = builder.query(&[("page", page)]);
        }
        let body = self.get_json(builder).await?;

        let data = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::invalid_format("response `data` is not an array"))?;

        let assistants = data
            .iter()
            .map(|record| self.map_record(record))
            .collect::<Result<Vec<_>>>()?;

        let pagination = body
            .get("pagination")
            .and_then(|p| serde_json::from_value::<Pagination>(p.clone()).ok());

        Ok((assistants, pagination))
    }

    fn map_record(&self, record: &Value) -> Result<Assistant> {
        let raw: RawAssistant = serde_json::from_value(record.clone())
            .map_err(|e| Error::invalid_format(format!("bad assistant record {record}: {e}")))?;
        let id = match raw.id {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => return Err(Error::invalid_format(format!("bad assistant id: {other}"))),
        };
        Ok(Assistant::new(
            &self.base_url,
            id,
            raw.name,
            raw.slug.unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl AssistantDirectory for HttpDirectory {
    async fn fetch_assistants(&self) -> Result<Vec<Assistant>> {
        let mut all: Vec<Assistant> = Vec::new();
        let mut seen = HashSet::new();
        let mut page = None;
        let mut zero_based = false;

        for _ in 0..MAX_PAGES {
            let (records, pagination) = self.fetch_page(page).await?;
            let count = records.len();
            let before = all.len();
            all.extend(records.into_iter().filter(|a| seen.insert(a.id.clone())));
            debug!("Fetched page {:?} with {} assistants", page, count);

            // A page with nothing new means the registry ignored `page`.
            if count > 0 && all.len() == before {
                warn!("Registry repeated page {:?}; stopping pagination", page);
                info!("Loaded {} assistants from {}", all.len(), self.base_url);
                return Ok(all);
            }

            if pagination.as_ref().and_then(|p| p.page) == Some(0) {
                zero_based = true;
            }
            match next_page(pagination.as_ref(), page, zero_based, count) {
                Some(next) => page = Some(next),
                None => {
                    info!("Loaded {} assistants from {}", all.len(), self.base_url);
                    return Ok(all);
                }
            }
        }

        warn!(
            "Registry still reports more pages after {}; keeping {} assistants",
            MAX_PAGES,
            all.len()
        );
        Ok(all)
    }

    async fn fetch_agent_card(&self, url: &str) -> Result<AgentCard> {
        let body = self.get_json(self.client.get(url)).await?;
        serde_json::from_value(body)
            .map_err(|e| Error::invalid_format(format!("bad agent card: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn directory(server: &ServerGuard, cookies: Option<&str>) -> HttpDirectory {
        HttpDirectory::new(
            &format!("{}/", server.url()),
            cookies.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    /// The first request carries no `page` parameter.
    fn first_page() -> Matcher {
        Matcher::Exact("per_page=100".to_string())
    }

    fn page_query(page: usize) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("per_page".into(), "100".into()),
            Matcher::UrlEncoded("page".into(), page.to_string()),
        ])
    }

    #[tokio::test]
    async fn test_fetch_maps_every_record() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/assistants")
            .match_query(first_page())
            .with_status(200)
            .with_body(
                json!({
                    "data": [
                        {"id": "X", "name": "Code Reviewer", "slug": "code-reviewer"},
                        {"id": 7, "name": "Translator"},
                        {"id": "Z", "name": "Researcher", "slug": "researcher", "owner": "ignored"}
                    ],
                    "pagination": {"page": 1, "total_pages": 1}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let dir = directory(&server, None);
        let assistants = dir.fetch_assistants().await.unwrap();
        mock.assert_async().await;

        assert_eq!(assistants.len(), 3);
        let base = server.url();
        assert_eq!(assistants[0].name, "Code Reviewer");
        assert_eq!(assistants[0].url, format!("{base}/a2a/assistants/X"));
        assert_eq!(
            assistants[0].agent_card_url,
            format!("{base}/a2a/assistants/X/.well-known/agent.json")
        );
        assert_eq!(assistants[1].id, "7");
        assert_eq!(assistants[1].slug, "");
        assert_eq!(assistants[2].url, format!("{base}/a2a/assistants/Z"));
    }

    #[tokio::test]
    async fn test_non_array_data_is_format_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistants")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": {"id": "X", "name": "Code Reviewer"}}"#)
            .create_async()
            .await;

        let err = directory(&server, None).fetch_assistants().await.unwrap_err();
        match err {
            Error::Upstream { code, .. } => assert_eq!(code.as_deref(), Some("invalid_format")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_record_fails_whole_fetch() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistants")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data": [{"id": "X", "name": "Ok"}, {"id": "Y"}]}"#)
            .create_async()
            .await;

        let err = directory(&server, None).fetch_assistants().await.unwrap_err();
        assert!(matches!(err, Error::Upstream { code: Some(c), .. } if c == "invalid_format"));
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/assistants")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = directory(&server, None).fetch_assistants().await.unwrap_err();
        match err {
            Error::Upstream { status, body, .. } => {
                assert_eq!(status, Some(502));
                assert_eq!(body.as_deref(), Some("bad gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aggregates_pages() {
        let mut server = Server::new_async().await;
        let first: Vec<Value> = (0..PAGE_SIZE)
            .map(|i| json!({"id": format!("a{i}"), "name": format!("Assistant {i}")}))
            .collect();
        let page1 = server
            .mock("GET", "/assistants")
            .match_query(first_page())
            .with_status(200)
            .with_body(
                json!({"data": first, "pagination": {"page": 1, "total_pages": 2}}).to_string(),
            )
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/assistants")
            .match_query(page_query(2))
            .with_status(200)
            .with_body(
                json!({
                    "data": [{"id": "last", "name": "Last One"}],
                    "pagination": {"page": 2, "total_pages": 2}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let assistants = directory(&server, None).fetch_assistants().await.unwrap();
        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(assistants.len(), PAGE_SIZE + 1);
        assert_eq!(assistants.last().unwrap().name, "Last One");
    }

    #[tokio::test]
    async fn test_next_page_null_stops() {
        let mut server = Server::new_async().await;
        let full: Vec<Value> = (0..PAGE_SIZE)
            .map(|i| json!({"id": i, "name": format!("A{i}")}))
            .collect();
        let mock = server
            .mock("GET", "/assistants")
            .match_query(first_page())
            .with_status(200)
            .with_body(json!({"data": full, "pagination": {"next_page": null}}).to_string())
            .expect(1)
            .create_async()
            .await;

        let assistants = directory(&server, None).fetch_assistants().await.unwrap();
        mock.assert_async().await;
        assert_eq!(assistants.len(), PAGE_SIZE);
    }

    fn full_page(prefix: &str) -> Vec<Value> {
        (0..PAGE_SIZE)
            .map(|i| json!({"id": format!("{prefix}{i}"), "name": format!("{prefix} {i}")}))
            .collect()
    }

    #[tokio::test]
    async fn test_without_pagination_full_page_continues() {
        let mut server = Server::new_async().await;
        let page1 = server
            .mock("GET", "/assistants")
            .match_query(first_page())
            .with_status(200)
            .with_body(json!({"data": full_page("a")}).to_string())
            .expect(1)
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/assistants")
            .match_query(page_query(2))
            .with_status(200)
            .with_body(json!({"data": [{"id": "b0", "name": "B"}]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let assistants = directory(&server, None).fetch_assistants().await.unwrap();
        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(assistants.len(), PAGE_SIZE + 1);
    }

    #[tokio::test]
    async fn test_registry_ignoring_page_param_stops_after_repeat() {
        let mut server = Server::new_async().await;
        // Same full page for every query, no pagination block.
        let mock = server
            .mock("GET", "/assistants")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"data": full_page("a")}).to_string())
            .expect(2)
            .create_async()
            .await;

        let assistants = directory(&server, None).fetch_assistants().await.unwrap();
        mock.assert_async().await;
        assert_eq!(assistants.len(), PAGE_SIZE);
        let ids: HashSet<&str> = assistants.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_zero_based_registry_gets_every_page() {
        let mut server = Server::new_async().await;
        let page0 = server
            .mock("GET", "/assistants")
            .match_query(first_page())
            .with_status(200)
            .with_body(
                json!({"data": full_page("a"), "pagination": {"page": 0, "total_pages": 2}})
                    .to_string(),
            )
            .create_async()
            .await;
        let page1 = server
            .mock("GET", "/assistants")
            .match_query(page_query(1))
            .with_status(200)
            .with_body(
                json!({
                    "data": [{"id": "b0", "name": "B"}],
                    "pagination": {"page": 1, "total_pages": 2}
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let assistants = directory(&server, None).fetch_assistants().await.unwrap();
        page0.assert_async().await;
        page1.assert_async().await;
        assert_eq!(assistants.len(), PAGE_SIZE + 1);
    }

    fn pagination(value: Value) -> Pagination {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_next_page_rules() {
        // null next_page ends the fetch even after a full page
        let p = pagination(json!({"next_page": null}));
        assert_eq!(p.next_page, Some(Value::Null));
        assert_eq!(next_page(Some(&p), None, false, PAGE_SIZE), None);

        let p = pagination(json!({"next_page": 3}));
        assert_eq!(next_page(Some(&p), Some(2), false, PAGE_SIZE), Some(3));

        let p = pagination(json!({"current_page": 2, "next_page": "https://registry.test/next"}));
        assert_eq!(next_page(Some(&p), Some(2), false, 1), Some(3));

        let p = pagination(json!({"current_page": 2, "last_page": 2}));
        assert_eq!(next_page(Some(&p), Some(2), false, PAGE_SIZE), None);

        let p = pagination(json!({"page": 1, "total_pages": 2}));
        assert_eq!(next_page(Some(&p), Some(1), true, PAGE_SIZE), None);

        // no usable pagination info: only a full page continues
        assert_eq!(next_page(None, None, false, PAGE_SIZE), Some(2));
        assert_eq!(next_page(None, Some(2), false, PAGE_SIZE), Some(3));
        assert_eq!(next_page(None, None, false, PAGE_SIZE - 1), None);
        assert_eq!(next_page(Some(&pagination(json!({}))), None, false, 0), None);
    }

    #[tokio::test]
    async fn test_cookies_forwarded() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/assistants")
            .match_query(Matcher::Any)
            .match_header("cookie", "CF_Authorization=token")
            .with_status(200)
            .with_body(r#"{"data": []}"#)
            .create_async()
            .await;

        let assistants = directory(&server, Some("CF_Authorization=token"))
            .fetch_assistants()
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(assistants.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_agent_card() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/a2a/assistants/X/.well-known/agent.json")
            .with_status(200)
            .with_body(r#"{"name": "Code Reviewer", "url": "https://agents.test/X", "version": "1.0.0"}"#)
            .create_async()
            .await;

        let dir = directory(&server, None);
        let assistant = Assistant::new(dir.base_url(), "X", "Code Reviewer", "");
        let card = dir.fetch_agent_card(&assistant.agent_card_url).await.unwrap();
        assert_eq!(card.name.as_deref(), Some("Code Reviewer"));
        assert_eq!(card.url.as_deref(), Some("https://agents.test/X"));
    }

    #[tokio::test]
    async fn test_agent_card_not_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/card")
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let dir = directory(&server, None);
        let err = dir
            .fetch_agent_card(&format!("{}/card", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { code: Some(c), .. } if c == "invalid_format"));
    }
}
