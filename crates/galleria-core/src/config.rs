//! Centralized configuration constants for Galleria.
//!
//! User-editable settings live in [`crate::settings`]; the values here are
//! fixed parameters of the index, sidecar format, query engine and analysis.

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Galleria";
    pub const SETTINGS_DIR_NAME: &'static str = "galleria";
    pub const SETTINGS_FILENAME: &'static str = "settings.json";
}

/// Index build and readiness parameters.
pub struct IndexConfig;

impl IndexConfig {
    /// Number of records constructed concurrently during a build.
    pub const BUILD_CONCURRENCY: usize = 16;
}

/// Sidecar naming and reserved front-matter fields.
pub struct SidecarConfig;

impl SidecarConfig {
    /// Suffix appended to a media path to derive its sidecar path.
    pub const SUFFIX: &'static str = ".sidecar.md";
    /// Extension of sidecar documents; never tracked as media.
    pub const DOCUMENT_EXTENSION: &'static str = "md";
    pub const LAST_UPDATED_FIELD: &'static str = "MC-last-updated";
    pub const SIZE_FIELD: &'static str = "MC-size";
    pub const COLORS_FIELD: &'static str = "MC-colors";
    pub const TAGS_FIELD: &'static str = "tags";

    /// Fields owned by the library rather than the user.
    pub const RESERVED_FIELDS: &'static [&'static str] = &[
        Self::LAST_UPDATED_FIELD,
        Self::SIZE_FIELD,
        Self::COLORS_FIELD,
        Self::TAGS_FIELD,
    ];
}

/// Query engine parameters.
pub struct QueryConfig;

impl QueryConfig {
    /// Accumulated weighted HSL distance above which a color match fails.
    pub const COLOR_DISTANCE_THRESHOLD: f64 = 0.5;
    /// Added to the end of date ranges to absorb local/UTC boundary effects.
    pub const DATE_RANGE_TOLERANCE_DAYS: i64 = 1;
}

/// Image analysis parameters.
pub struct AnalysisConfig;

impl AnalysisConfig {
    /// Upper bound on pixels sampled for color extraction.
    pub const MAX_SAMPLED_PIXELS: u32 = 16_000;
    /// Maximum number of dominant colors kept per image.
    pub const MAX_DOMINANT_COLORS: usize = 8;
    /// HSL distance under which two buckets are merged into one color.
    pub const MERGE_DISTANCE: f64 = 0.12;
    /// Clusters covering less than this share of the image are dropped.
    pub const MIN_AREA: f64 = 0.01;
}

/// Domain event channel parameters.
pub struct EventConfig;

impl EventConfig {
    pub const CHANNEL_CAPACITY: usize = 256;
}

/// Extensions decoded as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Extensions tracked when no settings file exists.
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "avif", "webp", "gif"];
