//! [`ChannelCatalog`] backed by the YouTube Data API v3.

use crate::error::{Error, Result};
use crate::media::{ChannelCatalog, SearchItem, SearchPage};
use async_trait::async_trait;
use serde::Deserialize;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    id: SearchResultId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: u16,
    message: String,
}

/// The search endpoint returns HTML escaped titles.
fn unescape_title(title: &str) -> String {
    title
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn parse_api_error(body: &str) -> Option<String> {
    let response: ApiErrorResponse = serde_json::from_str(body).ok()?;
    Some(format!("{} {}", response.error.code, response.error.message))
}

fn parse_channel_title(channel_id: &str, body: &str) -> Result<String> {
    let response: ChannelListResponse = serde_json::from_str(body)?;

    response
        .items
        .into_iter()
        .next()
        .map(|item| unescape_title(&item.snippet.title))
        .ok_or_else(|| Error::ChannelNotFound(channel_id.to_string()))
}

fn parse_search_page(body: &str) -> Result<SearchPage> {
    let response: SearchListResponse = serde_json::from_str(body)?;

    let items = response
        .items
        .into_iter()
        .filter_map(|result| {
            result.id.video_id.map(|id| SearchItem {
                id,
                title: unescape_title(&result.snippet.title),
            })
        })
        .collect();

    Ok(SearchPage {
        items,
        next_cursor: response.next_page_token.filter(|token| !token.is_empty()),
    })
}

/// A client of the YouTube Data API authenticated with an API key.
#[derive(Clone, Debug)]
pub struct DataApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DataApi {
    /// Creates a client using the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
        }
    }

    async fn get_api_data(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("Calling {} with {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api(
                parse_api_error(&body).unwrap_or_else(|| format!("{} returned {}", endpoint, status)),
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl ChannelCatalog for DataApi {
    async fn resolve_channel_title(&self, channel_id: &str) -> Result<String> {
        let body = self
            .get_api_data("channels", &[("part", "snippet"), ("id", channel_id)])
            .await
            .map_err(|e| Error::ChannelNotFound(format!("{channel_id}: {e}")))?;

        parse_channel_title(channel_id, &body)
    }

    async fn search_channel_videos(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<SearchPage> {
        let max_results = page_size.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("channelId", channel_id),
            ("type", "video"),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(cursor) = cursor {
            query.push(("pageToken", cursor));
        }

        let body = self.get_api_data("search", &query).await?;
        parse_search_page(&body)
    }
}
