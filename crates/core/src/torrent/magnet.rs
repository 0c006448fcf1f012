use std::fmt;

use thiserror::Error;

use super::{InfoHash, InfoHashError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MagnetError {
    #[error("not a magnet link")]
    NotMagnet,

    #[error("magnet link has no xt parameter")]
    MissingTopic,

    #[error("exact topic has no urn prefix: {0}")]
    MissingUrnPrefix(String),

    #[error("unsupported urn scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid urn hash: {0}")]
    InvalidHash(String),

    #[error(transparent)]
    InfoHash(#[from] InfoHashError),
}

/// URN namespace of a magnet link's exact topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrnScheme {
    /// BitTorrent info-hash (`urn:btih:`).
    BitTorrent,
}

impl UrnScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrnScheme::BitTorrent => "btih",
        }
    }
}

/// Parsed `magnet:` URI. Only used to derive the info-hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    pub scheme: UrnScheme,
    pub hash: Vec<u8>,
    pub tracker: Option<String>,
}

impl MagnetLink {
    pub fn parse(s: &str) -> Result<Self, MagnetError> {
        let query = s
            .trim()
            .strip_prefix("magnet:?")
            .ok_or(MagnetError::NotMagnet)?;

        let mut topic = None;
        let mut tracker = None;
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            match key {
                "xt" if topic.is_none() => topic = Some(value),
                "tr" if tracker.is_none() => tracker = Some(value),
                _ => {}
            }
        }

        let topic = topic.ok_or(MagnetError::MissingTopic)?;
        let urn = topic
            .strip_prefix("urn:")
            .ok_or_else(|| MagnetError::MissingUrnPrefix(topic.clone()))?;
        let (scheme, hash) = urn
            .split_once(':')
            .ok_or_else(|| MagnetError::MissingUrnPrefix(topic.clone()))?;

        let scheme = match scheme {
            "btih" => UrnScheme::BitTorrent,
            other => return Err(MagnetError::UnsupportedScheme(other.to_string())),
        };
        let hash = hex::decode(hash).map_err(|e| MagnetError::InvalidHash(e.to_string()))?;

        Ok(Self {
            scheme,
            hash,
            tracker,
        })
    }

    /// Tracker-less link for a known info-hash.
    pub fn from_info_hash(info_hash: &InfoHash) -> Self {
        Self {
            scheme: UrnScheme::BitTorrent,
            hash: info_hash.as_bytes().to_vec(),
            tracker: None,
        }
    }

    /// Info-hash of the linked torrent, checked for the scheme's length.
    pub fn info_hash(&self) -> Result<InfoHash, MagnetError> {
        Ok(InfoHash::from_slice(&self.hash)?)
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "magnet:?xt=urn:{}:{}",
            self.scheme.as_str(),
            hex::encode(&self.hash)
        )?;
        if let Some(tracker) = &self.tracker {
            write!(f, "&tr={}", urlencoding::encode(tracker))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_HEX: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

    #[test]
    fn test_from_info_hash_display() {
        let info_hash: InfoHash = HASH_HEX.parse().unwrap();
        let magnet = MagnetLink::from_info_hash(&info_hash);
        assert_eq!(magnet.to_string(), format!("magnet:?xt=urn:btih:{}", HASH_HEX));
        assert_eq!(MagnetLink::parse(&magnet.to_string()).unwrap(), magnet);
    }

    #[test]
    fn test_parse_with_tracker() {
        let link = format!(
            "magnet:?xt=urn:btih:{}&dn=test&tr=udp%3A%2F%2Fopentor.net%3A6969",
            HASH_HEX
        );
        let magnet = MagnetLink::parse(&link).unwrap();
        assert_eq!(magnet.scheme, UrnScheme::BitTorrent);
        assert_eq!(magnet.info_hash().unwrap().to_hex(), HASH_HEX);
        assert_eq!(magnet.tracker.as_deref(), Some("udp://opentor.net:6969"));
    }

    #[test]
    fn test_parse_without_tracker() {
        let magnet = MagnetLink::parse(&format!("magnet:?xt=urn:btih:{}", HASH_HEX)).unwrap();
        assert!(magnet.tracker.is_none());
        assert_eq!(magnet.hash.len(), 20);
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let magnet = MagnetLink {
            scheme: UrnScheme::BitTorrent,
            hash: hex::decode(HASH_HEX).unwrap(),
            tracker: Some("http://bt.example.org/ann".to_string()),
        };
        let rendered = magnet.to_string();
        assert!(rendered.starts_with("magnet:?xt=urn:btih:c9e157"));
        assert_eq!(MagnetLink::parse(&rendered).unwrap(), magnet);
    }

    #[test]
    fn test_parse_rejects_http_url() {
        assert_eq!(
            MagnetLink::parse("http://example.org/file.torrent"),
            Err(MagnetError::NotMagnet)
        );
    }

    #[test]
    fn test_parse_missing_topic() {
        assert_eq!(
            MagnetLink::parse("magnet:?dn=nothing"),
            Err(MagnetError::MissingTopic)
        );
    }

    #[test]
    fn test_parse_missing_urn_prefix() {
        let result = MagnetLink::parse(&format!("magnet:?xt=btih:{}", HASH_HEX));
        assert!(matches!(result, Err(MagnetError::MissingUrnPrefix(_))));
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let result = MagnetLink::parse("magnet:?xt=urn:sha1:abcdef");
        assert_eq!(result, Err(MagnetError::UnsupportedScheme("sha1".to_string())));
    }

    #[test]
    fn test_short_hash_fails_info_hash() {
        let magnet = MagnetLink::parse("magnet:?xt=urn:btih:abcdef").unwrap();
        assert_eq!(
            magnet.info_hash(),
            Err(MagnetError::InfoHash(InfoHashError::InvalidLength(3)))
        );
    }
}
