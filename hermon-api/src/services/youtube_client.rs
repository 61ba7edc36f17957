//! YouTube Data API v3 client
//!
//! Search and video detail lookup, plus the pure helpers used when a song
//! is linked to a video (id extraction, thumbnail URL, duration parsing).

use super::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Music category filter for searches
const MUSIC_CATEGORY_ID: &str = "10";

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub channel_title: String,
    pub published_at: String,
    pub youtube_url: String,
}

/// Full video metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub channel_title: String,
    /// ISO-8601 duration as returned by the API (e.g. "PT4M13S")
    pub duration: String,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub youtube_url: String,
}

/// Video metadata source
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<VideoSummary>, ServiceError>;

    async fn details(&self, video_id: &str) -> Result<VideoDetails, ServiceError>;
}

/// Extract the video id from the accepted URL shapes
///
/// Accepted: `youtube.com/watch?v=ID`, `youtu.be/ID`, `youtube.com/embed/ID`,
/// `youtube.com/v/ID`. The id ends at the first `&`, `?`, `#` or newline.
pub fn extract_video_id(url: &str) -> Option<String> {
    const MARKERS: [&str; 4] = [
        "youtube.com/watch?v=",
        "youtu.be/",
        "youtube.com/embed/",
        "youtube.com/v/",
    ];

    MARKERS.iter().find_map(|marker| {
        let start = url.find(marker)? + marker.len();
        let id: String = url[start..]
            .chars()
            .take_while(|c| !matches!(c, '&' | '?' | '#' | '\n'))
            .collect();
        (!id.is_empty()).then_some(id)
    })
}

/// Canonical watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// High-quality thumbnail URL for a video id
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/hqdefault.jpg", video_id)
}

/// Parse an ISO-8601 duration such as `PT1H2M3S` or `P1DT5M` into seconds
pub fn parse_iso8601_duration(value: &str) -> Option<i64> {
    let rest = value.strip_prefix('P')?;
    let mut total: i64 = 0;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_component = false;

    for c in rest.chars() {
        match c {
            'T' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' => number.push(c),
            unit => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                let scale = match (unit, in_time) {
                    ('W', false) => 604_800,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                total = total.checked_add(n.checked_mul(scale)?)?;
                seen_component = true;
            }
        }
    }

    (number.is_empty() && seen_component).then_some(total)
}

// ========================================
// Wire types
// ========================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    channel_title: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Snippet,
    content_details: ContentDetails,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
}

impl Thumbnails {
    fn best(&self, video_id: &str) -> String {
        self.maxres
            .as_ref()
            .or(self.high.as_ref())
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_else(|| thumbnail_url(video_id))
    }
}

/// YouTube Data API client
pub struct YouTubeClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>) -> Result<Self, ServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: YOUTUBE_BASE_URL.to_string(),
        })
    }

    fn key(&self) -> Result<&str, ServiceError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ServiceError::NotConfigured("YouTube API key"))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", self.key()?)])
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl VideoCatalog for YouTubeClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<VideoSummary>, ServiceError> {
        tracing::debug!(query = %query, max_results, "Searching YouTube");

        let response: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("q", query.to_string()),
                    ("type", "video".to_string()),
                    ("maxResults", max_results.to_string()),
                    ("videoCategoryId", MUSIC_CATEGORY_ID.to_string()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoSummary {
                    thumbnail_url: item.snippet.thumbnails.best(&video_id),
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                    published_at: item.snippet.published_at,
                    youtube_url: watch_url(&video_id),
                    video_id,
                })
            })
            .collect())
    }

    async fn details(&self, video_id: &str) -> Result<VideoDetails, ServiceError> {
        let response: VideosResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,contentDetails,statistics".to_string()),
                    ("id", video_id.to_string()),
                ],
            )
            .await?;

        let video = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound("Video not found".to_string()))?;

        tracing::info!(video_id = %video.id, title = %video.snippet.title, "Retrieved video details");

        Ok(VideoDetails {
            thumbnail_url: video.snippet.thumbnails.best(&video.id),
            youtube_url: watch_url(&video.id),
            title: video.snippet.title,
            description: video.snippet.description,
            channel_title: video.snippet.channel_title,
            duration: video.content_details.duration,
            view_count: video.statistics.view_count,
            like_count: video.statistics.like_count,
            video_id: video.id,
        })
    }
}
