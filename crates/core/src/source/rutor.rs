//! Rutor: a plain HTML index where every listing lives at `/torrent/<id>`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::http;
use super::{Source, SourceError, SourceIdentity, SourceOptions};
use crate::torrent::{MagnetLink, TorrentRecord};

/// Registry name.
pub const NAME: &str = "rutor";
/// Storage partition key. Never reuse.
pub const SOURCE_ID: u32 = 2;

const DEFAULT_BASE_URL: &str = "http://new-rutor.org";
const CHARSET: &str = "utf-8";
/// Listing times are published in Moscow time.
const SITE_UTC_OFFSET_SECS: i32 = 3 * 3600;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: Lazy<Selector> = Lazy::new(|| Selector::parse($css).unwrap());
    };
}

selector!(INDEX_LINK, "div#index tr td:nth-child(2) a");
selector!(TITLE, "head > title");
selector!(DETAILS_TABLE, "table#details");
selector!(DETAILS_ROW, "table#details > tbody > tr");
selector!(DOWNLOAD_LINK, "div#download > a");

static TORRENT_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/torrent/(\d+)(?:/|$)").unwrap());
static EXACT_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)\s*Bytes\)").unwrap());

pub struct RutorSource {
    client: Client,
    base_url: String,
}

impl RutorSource {
    pub fn new(options: &SourceOptions) -> Result<Self, SourceError> {
        Self::with_base_url(options, DEFAULT_BASE_URL)
    }

    /// Point the source at a different host (mirrors, tests).
    pub fn with_base_url(options: &SourceOptions, base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::build_client(options)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Source for RutorSource {
    fn identity(&self) -> SourceIdentity {
        SourceIdentity {
            id: SOURCE_ID,
            name: NAME.to_string(),
        }
    }

    async fn max_item_id(&self) -> Result<u64, SourceError> {
        let html = http::get_text(&self.client, &self.base_url, CHARSET).await?;
        parse_max_item_id(&html)
    }

    async fn fetch_by_id(&self, id: u64) -> Result<TorrentRecord, SourceError> {
        let url = format!("{}/torrent/{}", self.base_url, id);
        debug!(url = %url, "Fetching rutor item");
        let html = http::get_text(&self.client, &url, CHARSET).await?;
        parse_item_page(&html).map_err(|e| match e {
            SourceError::NotFound(_) => SourceError::NotFound(format!("rutor item {}", id)),
            SourceError::RemoteFormatChanged(msg) => {
                SourceError::RemoteFormatChanged(format!("rutor item {}: {}", id, msg))
            }
            other => other,
        })
    }
}

/// Largest torrent id linked from the index listing.
pub fn parse_max_item_id(html: &str) -> Result<u64, SourceError> {
    let document = Html::parse_document(html);
    document
        .select(&INDEX_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(torrent_id_from_path)
        .max()
        .ok_or_else(|| SourceError::RemoteFormatChanged("no torrent links on index page".into()))
}

fn torrent_id_from_path(href: &str) -> Option<u64> {
    TORRENT_PATH
        .captures(href)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse a listing page into a record.
pub fn parse_item_page(html: &str) -> Result<TorrentRecord, SourceError> {
    let document = Html::parse_document(html);

    let magnet_href = document
        .select(&DOWNLOAD_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.starts_with("magnet:"));

    if document.select(&DETAILS_TABLE).next().is_none() && magnet_href.is_none() {
        return Err(SourceError::NotFound("no listing on page".into()));
    }

    let title = parse_title(&document)?;
    let magnet_href =
        magnet_href.ok_or_else(|| SourceError::RemoteFormatChanged("magnet link missing".into()))?;
    let info_hash = MagnetLink::parse(magnet_href)
        .and_then(|m| m.info_hash())
        .map_err(|e| SourceError::RemoteFormatChanged(format!("bad magnet link: {}", e)))?;

    let rows: Vec<Vec<ElementRef>> = document.select(&DETAILS_ROW).map(row_cells).collect();

    let body = rows
        .first()
        .and_then(|cells| cells.get(1))
        .map(|cell| html2md::rewrite_html(&cell.inner_html(), true).trim().to_string())
        .ok_or_else(|| SourceError::RemoteFormatChanged("description cell missing".into()))?;

    let published_at = labelled_value(&rows, "Добавлен")
        .ok_or_else(|| SourceError::RemoteFormatChanged("publication time missing".into()))
        .and_then(|text| parse_publication_time(&text))?;

    let size_bytes = labelled_value(&rows, "Размер")
        .ok_or_else(|| SourceError::RemoteFormatChanged("size missing".into()))
        .and_then(|text| parse_size(&text))?;

    Ok(TorrentRecord {
        title,
        body,
        info_hash,
        published_at,
        size_bytes,
    })
}

fn parse_title(document: &Html) -> Result<String, SourceError> {
    let raw = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| SourceError::RemoteFormatChanged("title missing".into()))?;

    // "<site> :: <title>"
    let title = raw
        .split_once(" :: ")
        .map(|(_, title)| title)
        .unwrap_or(&raw)
        .trim()
        .to_string();

    if title.is_empty() {
        return Err(SourceError::RemoteFormatChanged("title is empty".into()));
    }
    Ok(title)
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .collect()
}

fn labelled_value(rows: &[Vec<ElementRef>], label: &str) -> Option<String> {
    rows.iter().find_map(|cells| match cells.as_slice() {
        [name, value, ..] if name.text().collect::<String>().trim() == label => {
            Some(value.text().collect::<String>())
        }
        _ => None,
    })
}

/// `07-02-2020 19:05:55  (10 дней назад)`
fn parse_publication_time(text: &str) -> Result<DateTime<Utc>, SourceError> {
    let stamp = text.split('(').next().unwrap_or_default().trim();
    let naive = NaiveDateTime::parse_from_str(stamp, "%d-%m-%Y %H:%M:%S").map_err(|e| {
        SourceError::RemoteFormatChanged(format!("unexpected time format {:?}: {}", stamp, e))
    })?;
    let offset = FixedOffset::east_opt(SITE_UTC_OFFSET_SECS)
        .ok_or_else(|| SourceError::RemoteFormatChanged("invalid site offset".into()))?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| SourceError::RemoteFormatChanged(format!("ambiguous time {:?}", stamp)))
}

/// `1.46 GB (1568831285 Bytes)`
fn parse_size(text: &str) -> Result<u64, SourceError> {
    EXACT_SIZE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| SourceError::RemoteFormatChanged(format!("unexpected size {:?}", text.trim())))
}
