use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A single astronomical exposure.
/// Pixel values are raw intensities (no normalization, no upper bound).
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Observation metadata from the source file.
    pub header: FrameHeader,
    /// Where the frame was read from.
    pub source: PathBuf,
    /// Observation timestamp as written in the header (`DATE-OBS` / `DATE`).
    pub timestamp: Option<String>,
}

impl Frame {
    pub fn new(data: Array2<f32>) -> Self {
        Self {
            data,
            header: FrameHeader::default(),
            source: PathBuf::new(),
            timestamp: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_header(mut self, header: FrameHeader) -> Self {
        self.timestamp = header
            .get_str("DATE-OBS")
            .or_else(|| header.get_str("DATE"))
            .map(str::to_string);
        self.header = header;
        self
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Bare file name of the source, or an empty string for in-memory frames.
    pub fn file_name(&self) -> String {
        file_name_of(&self.source)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A typed header value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl HeaderValue {
    /// Numeric view. Strings are parsed when they hold a plain number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "T"),
            Self::Bool(false) => write!(f, "F"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Ordered keyword/value header. Keywords are stored upper-case; lookups are
/// case-insensitive. Setting an existing keyword replaces it in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    cards: Vec<(String, HeaderValue)>,
}

impl FrameHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: HeaderValue) {
        let key = key.trim().to_ascii_uppercase();
        match self.cards.iter_mut().find(|(k, _)| *k == key) {
            Some(card) => card.1 = value,
            None => self.cards.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        let key = key.trim().to_ascii_uppercase();
        self.cards.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// First present keyword among `keys`.
    pub fn get_any(&self, keys: &[&str]) -> Option<&HeaderValue> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(HeaderValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(HeaderValue::as_f64)
    }

    pub fn remove(&mut self, key: &str) -> Option<HeaderValue> {
        let key = key.trim().to_ascii_uppercase();
        let idx = self.cards.iter().position(|(k, _)| *k == key)?;
        Some(self.cards.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
