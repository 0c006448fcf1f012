//! RuTracker: topic metadata comes from the public JSON API, the
//! description from the (windows-1251 encoded) topic page.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use super::http;
use super::{Source, SourceError, SourceIdentity, SourceOptions};
use crate::torrent::{InfoHash, TorrentRecord};

/// Registry name.
pub const NAME: &str = "rutracker";
/// Storage partition key. Never reuse.
pub const SOURCE_ID: u32 = 1;

const DEFAULT_API_URL: &str = "http://api.rutracker.org/v1";
const DEFAULT_FORUM_URL: &str = "https://rutracker.org/forum";
const FORUM_CHARSET: &str = "windows-1251";

static POST_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table#topic_main div.post_body").unwrap());
static TOPIC_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"viewtopic\.php\?t=(\d+)").unwrap());
static CODE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div class="c-head"[^>]*>.*?</div>"#).unwrap());
static SPOILER_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div class="sp-head[^"]*"[^>]*>(.*?)</div>"#).unwrap());
static VAR_ELEMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<var([^>]*)>.*?</var>").unwrap());
static TITLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"title="([^"]*)""#).unwrap());

pub struct RutrackerSource {
    client: Client,
    api_url: String,
    forum_url: String,
}

impl RutrackerSource {
    pub fn new(options: &SourceOptions) -> Result<Self, SourceError> {
        Self::with_urls(options, DEFAULT_API_URL, DEFAULT_FORUM_URL)
    }

    pub fn with_urls(
        options: &SourceOptions,
        api_url: &str,
        forum_url: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(options)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            forum_url: forum_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Source for RutrackerSource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity {
            id: SOURCE_ID,
            name: NAME.to_string(),
        }
    }

    async fn max_item_id(&self) -> Result<u64, SourceError> {
        let url = format!("{}/index.php", self.forum_url);
        let html = http::get_text(&self.client, &url, FORUM_CHARSET).await?;
        parse_max_topic_id(&html)
    }

    async fn fetch_by_id(&self, id: u64) -> Result<TorrentRecord, SourceError> {
        let api_url = format!(
            "{}/get_tor_topic_data?by=topic_id&val={}",
            self.api_url, id
        );
        debug!(url = %api_url, "Fetching rutracker topic data");
        let json = http::get_text(&self.client, &api_url, "utf-8").await?;
        let topic = parse_topic_data(&json, id)?;

        let page_url = format!("{}/viewtopic.php?t={}", self.forum_url, id);
        let html = http::get_text(&self.client, &page_url, FORUM_CHARSET).await?;
        let body = parse_post_body(&html).map_err(|e| match e {
            SourceError::RemoteFormatChanged(msg) => {
                SourceError::RemoteFormatChanged(format!("rutracker topic {}: {}", id, msg))
            }
            other => other,
        })?;

        Ok(TorrentRecord { body, ..topic })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    result: HashMap<String, Option<TopicData>>,
}

#[derive(Debug, Deserialize)]
struct TopicData {
    info_hash: String,
    size: f64,
    reg_time: i64,
    topic_title: String,
}

/// Parse a `get_tor_topic_data` response into a record without a body.
pub fn parse_topic_data(json: &str, id: u64) -> Result<TorrentRecord, SourceError> {
    let response: ApiResponse = serde_json::from_str(json).map_err(|e| {
        SourceError::RemoteFormatChanged(format!("topic {}: invalid api response: {}", id, e))
    })?;

    let topic = response
        .result
        .get(&id.to_string())
        .and_then(Option::as_ref)
        .ok_or_else(|| SourceError::NotFound(format!("rutracker topic {}", id)))?;

    let info_hash: InfoHash = topic.info_hash.parse().map_err(|e| {
        SourceError::RemoteFormatChanged(format!("topic {}: bad info hash: {}", id, e))
    })?;

    let published_at = Utc
        .timestamp_opt(topic.reg_time, 0)
        .single()
        .ok_or_else(|| {
            SourceError::RemoteFormatChanged(format!(
                "topic {}: bad reg_time {}",
                id, topic.reg_time
            ))
        })?;

    if !topic.size.is_finite() || topic.size < 0.0 {
        return Err(SourceError::RemoteFormatChanged(format!(
            "topic {}: bad size {}",
            id, topic.size
        )));
    }

    Ok(TorrentRecord {
        title: topic.topic_title.trim().to_string(),
        body: String::new(),
        info_hash,
        published_at,
        size_bytes: topic.size as u64,
    })
}

/// First post of a topic page, converted to Markdown.
pub fn parse_post_body(html: &str) -> Result<String, SourceError> {
    let document = Html::parse_document(html);
    let post = document
        .select(&POST_BODY)
        .next()
        .ok_or_else(|| SourceError::RemoteFormatChanged("post body missing".into()))?;

    let cleaned = clean_post_html(&post.inner_html());
    Ok(html2md::rewrite_html(&cleaned, true).trim().to_string())
}

/// Strip code-block captions, promote spoiler titles to headings and turn
/// lazy-loaded images into plain `<img>` tags.
fn clean_post_html(html: &str) -> String {
    let html = CODE_HEADER.replace_all(html, "");
    let html = SPOILER_HEADER.replace_all(&html, "<h3>$1</h3>");
    VAR_ELEMENT
        .replace_all(&html, |caps: &regex_lite::Captures| {
            let attrs = &caps[1];
            match TITLE_ATTR.captures(attrs) {
                Some(title) if attrs.contains("postImg") => {
                    format!(r#"<img src="{}">"#, &title[1])
                }
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Largest topic id linked from the forum index.
pub fn parse_max_topic_id(html: &str) -> Result<u64, SourceError> {
    TOPIC_LINK
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .max()
        .ok_or_else(|| SourceError::RemoteFormatChanged("no topic links on forum index".into()))
}
