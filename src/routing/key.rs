//! Object key classification.
//!
//! Keys are matched against the recognized shapes in precedence order:
//!
//! 1. `metadata/<date>/silver-ready.json` (readiness marker)
//! 2. `<layer>/<entity>/season=<season>/date=<date>/<file>` (legacy partitions)
//! 3. `<layer>/<entity>/<date>/<file>` (current partitions)
//!
//! The first shape that matches decides the outcome. A matching shape with an
//! unparseable date yields no descriptor.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::season::Season;

/// Rendered file type of readiness markers.
pub const MARKER_FILE_TYPE: &str = "silver-ready-marker";

const MARKER_PREFIX: &str = "metadata";
const MARKER_FILE_NAME: &str = "silver-ready.json";
const SEASON_SEGMENT: &str = "season=";
const DATE_SEGMENT: &str = "date=";

/// Semantic role of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileType {
    /// Sentinel written once the silver layer is complete for a date
    SilverReadyMarker,
    /// Data file for a named entity (e.g. `player-stats`)
    Entity(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::SilverReadyMarker => MARKER_FILE_TYPE,
            FileType::Entity(name) => name,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What a storage key says about the object behind it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StorageEventDescriptor {
    file_type: FileType,
    logical_date: NaiveDate,
    season: String,
    original_key: String,
    is_marker: bool,
}

impl StorageEventDescriptor {
    /// Classify a key. Returns `None` for keys outside every recognized shape.
    pub fn parse(key: &str) -> Option<Self> {
        parse_key(key)
    }

    pub fn file_type(&self) -> &FileType {
        &self.file_type
    }

    pub fn logical_date(&self) -> NaiveDate {
        self.logical_date
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    pub fn original_key(&self) -> &str {
        &self.original_key
    }

    pub fn is_marker(&self) -> bool {
        self.is_marker
    }
}

/// Classify an object key into a descriptor.
pub fn parse_key(key: &str) -> Option<StorageEventDescriptor> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    match segments.as_slice() {
        [MARKER_PREFIX, date, MARKER_FILE_NAME] => {
            let logical_date = parse_iso_date(date)?;
            Some(StorageEventDescriptor {
                file_type: FileType::SilverReadyMarker,
                logical_date,
                season: Season::for_date(logical_date).to_string(),
                original_key: key.to_string(),
                is_marker: true,
            })
        }
        [_layer, entity, season, date, _file]
            if season.starts_with(SEASON_SEGMENT) && date.starts_with(DATE_SEGMENT) =>
        {
            let season = &season[SEASON_SEGMENT.len()..];
            if season.is_empty() {
                return None;
            }
            let logical_date = parse_iso_date(&date[DATE_SEGMENT.len()..])?;
            Some(StorageEventDescriptor {
                file_type: FileType::Entity(entity.to_string()),
                logical_date,
                season: season.to_string(),
                original_key: key.to_string(),
                is_marker: false,
            })
        }
        [_layer, entity, date, _file] => {
            let logical_date = parse_iso_date(date)?;
            Some(StorageEventDescriptor {
                file_type: FileType::Entity(entity.to_string()),
                logical_date,
                season: Season::for_date(logical_date).to_string(),
                original_key: key.to_string(),
                is_marker: false,
            })
        }
        _ => None,
    }
}

/// Parse a strict `YYYY-MM-DD` date with a year from 0001 to 9999.
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits = [0, 1, 2, 3, 5, 6, 8, 9];
    if !digits.iter().all(|&i| bytes[i].is_ascii_digit()) || &bytes[..4] == b"0000" {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
