//! Query description.

use crate::config::QueryConfig;
use crate::error::GalleriaError;
use crate::media::{ImageSize, Shape};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordering applied before filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    Random,
    CreationDate,
    ModifiedDate,
    #[default]
    Name,
}

impl std::str::FromStr for OrderBy {
    type Err = GalleriaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(&['-', '_'][..], "").as_str() {
            "random" => Ok(OrderBy::Random),
            "created" | "creationdate" => Ok(OrderBy::CreationDate),
            "modified" | "modifieddate" => Ok(OrderBy::ModifiedDate),
            "name" => Ok(OrderBy::Name),
            _ => Err(GalleriaError::Validation {
                field: "order_by".into(),
                message: format!("unknown ordering '{}'", s),
            }),
        }
    }
}

/// Optional width/height bounds, all inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DimensionBounds {
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
}

impl DimensionBounds {
    pub fn is_unbounded(&self) -> bool {
        self.min_width.is_none()
            && self.max_width.is_none()
            && self.min_height.is_none()
            && self.max_height.is_none()
    }

    pub fn contains(&self, size: ImageSize) -> bool {
        self.min_width.map_or(true, |min| size.width >= min)
            && self.max_width.map_or(true, |max| size.width <= max)
            && self.min_height.map_or(true, |min| size.height >= min)
            && self.max_height.map_or(true, |max| size.height <= max)
    }
}

/// Inclusive calendar-date range; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether `time` falls in the range. The end is extended by the date
    /// tolerance, which covers the whole end day in UTC and absorbs local
    /// offsets that push a timestamp past midnight.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if time < midnight(start) {
                return false;
            }
        }
        if let Some(end) = self.end {
            let limit = midnight(end)
                + Duration::days(QueryConfig::DATE_RANGE_TOLERANCE_DAYS);
            if time > limit {
                return false;
            }
        }
        true
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

/// Immutable description of a search.
///
/// Empty lists and `None` values do not constrain the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDetails {
    /// Case-insensitive substring of the file name without extension.
    pub name: String,
    pub folders: Vec<String>,
    pub exclude_folders: Vec<String>,
    pub tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub extensions: Vec<String>,
    pub exclude_extensions: Vec<String>,
    pub shape: Option<Shape>,
    pub dimensions: DimensionBounds,
    pub created: DateRange,
    pub modified: DateRange,
    /// Target color as `#rrggbb`.
    pub color: Option<String>,
    pub order_by: OrderBy,
    pub order_increasing: bool,
    /// Front-matter fields that must all be present.
    pub has_fields: Vec<String>,
}

impl Default for QueryDetails {
    fn default() -> Self {
        Self {
            name: String::new(),
            folders: Vec::new(),
            exclude_folders: Vec::new(),
            tags: Vec::new(),
            exclude_tags: Vec::new(),
            extensions: Vec::new(),
            exclude_extensions: Vec::new(),
            shape: None,
            dimensions: DimensionBounds::default(),
            created: DateRange::default(),
            modified: DateRange::default(),
            color: None,
            order_by: OrderBy::Name,
            order_increasing: true,
            has_fields: Vec::new(),
        }
    }
}

impl QueryDetails {
    /// Whether any predicate only applies to images.
    pub fn image_only(&self) -> bool {
        self.shape.is_some() || !self.dimensions.is_unbounded() || self.color.is_some()
    }
}
