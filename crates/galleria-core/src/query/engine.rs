//! Query evaluation over an index snapshot.

use super::color::matches_color;
use super::details::{OrderBy, QueryDetails};
use super::rules::PrefixRules;
use crate::error::Result;
use crate::index::MediaIndex;
use crate::media::color::hex_to_hsl;
use crate::media::{Hsl, MediaKind, Shape};
use crate::record::MediaRecord;
use crate::sidecar::normalize_tag;
use crate::vault::path;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// A prepared search against a [`MediaIndex`].
pub struct Query {
    index: Arc<MediaIndex>,
    details: QueryDetails,
    folders: PrefixRules,
    tags: PrefixRules,
    extensions: Vec<String>,
    exclude_extensions: Vec<String>,
    name: String,
    color: Option<Hsl>,
}

impl Query {
    /// Prepare a query; fails when the target color cannot be parsed.
    pub fn new(index: Arc<MediaIndex>, details: QueryDetails) -> Result<Self> {
        let color = details.color.as_deref().map(hex_to_hsl).transpose()?;
        let folders = PrefixRules::new(&details.folders, &details.exclude_folders, |folder| {
            Some(path::normalize(folder))
        });
        let tags = PrefixRules::new(&details.tags, &details.exclude_tags, normalize_tag);
        let extensions = normalize_extensions(&details.extensions);
        let exclude_extensions = normalize_extensions(&details.exclude_extensions);
        let name = details.name.trim().to_lowercase();

        Ok(Self {
            index,
            details,
            folders,
            tags,
            extensions,
            exclude_extensions,
            name,
            color,
        })
    }

    pub fn details(&self) -> &QueryDetails {
        &self.details
    }

    /// Order records in place per the configured key and direction.
    pub fn order_records(&self, records: &mut [MediaRecord]) {
        match self.details.order_by {
            OrderBy::Random => records.shuffle(&mut rand::rng()),
            OrderBy::CreationDate => records.sort_by_key(|r| r.created),
            OrderBy::ModifiedDate => records.sort_by_key(|r| r.modified),
            OrderBy::Name => records.sort_by(|a, b| compare_names(a.name(), b.name())),
        }
        if !self.details.order_increasing {
            records.reverse();
        }
    }

    /// Evaluate every predicate against one record, cheapest first.
    pub fn test_record(&self, record: &MediaRecord) -> bool {
        if self.details.image_only() && record.kind != MediaKind::Image {
            return false;
        }

        let extension = record.extension.to_lowercase();
        if !self.extensions.is_empty() && !self.extensions.contains(&extension) {
            return false;
        }
        if self.exclude_extensions.contains(&extension) {
            return false;
        }

        if !self.details.created.contains(record.created)
            || !self.details.modified.contains(record.modified)
        {
            return false;
        }

        if record.kind == MediaKind::Image && !self.test_image(record) {
            return false;
        }

        if !self.name.is_empty() && !record.basename().to_lowercase().contains(&self.name) {
            return false;
        }

        if !self.folders.admits(&record.path) {
            return false;
        }

        if !self
            .tags
            .admits_any(record.tags().iter().map(String::as_str))
        {
            return false;
        }

        self.details
            .has_fields
            .iter()
            .all(|field| record.sidecar.has_field(field))
    }

    fn test_image(&self, record: &MediaRecord) -> bool {
        let dimensions = &self.details.dimensions;
        if !dimensions.is_unbounded() || self.details.shape.is_some() {
            let Some(size) = record.cached_size() else {
                return false;
            };
            if !dimensions.contains(size) {
                return false;
            }
            if let Some(shape) = self.details.shape {
                if Shape::from_size(size) != shape {
                    return false;
                }
            }
        }

        if let Some(target) = &self.color {
            let colors = record.cached_colors().unwrap_or_default();
            if !matches_color(target, &colors) {
                return false;
            }
        }
        true
    }

    /// Wait for the index, snapshot it, order the snapshot and return the
    /// records that pass every predicate, in order.
    pub async fn get_items(&self) -> Result<Vec<MediaRecord>> {
        self.index.await_ready().await?;

        let shared = self.index.records().await;
        let mut records = Vec::with_capacity(shared.len());
        for record in shared {
            records.push(record.read().await.clone());
        }

        self.order_records(&mut records);
        let total = records.len();
        let found: Vec<MediaRecord> = records
            .into_iter()
            .filter(|record| self.test_record(record))
            .collect();

        debug!("Query matched {} of {} records", found.len(), total);
        Ok(found)
    }
}

/// Case-insensitive name order, with the exact spelling breaking ties so
/// the order is total.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{DateRange, DimensionBounds};
    use crate::testing::{test_context, CountingAnalyzer};
    use crate::vault::{MemoryVault, Vault};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    async fn index() -> Arc<MediaIndex> {
        let vault = Arc::new(MemoryVault::new());
        for (path, tags) in [
            ("x/a.png", "[red]"),
            ("x/y/B.png", "[red, big]"),
            ("z/c.jpg", "[]"),
            ("z/d.avif", "[red/dark]"),
        ] {
            vault.put(path, vec![1u8]).await;
            vault
                .create(&format!("{path}.sidecar.md"), &format!("---\ntags: {tags}\n---\n"))
                .await
                .unwrap();
        }
        let day = |d| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap();
        vault.set_times("x/a.png", day(1), day(1)).await.unwrap();
        vault.set_times("x/y/B.png", day(2), day(4)).await.unwrap();
        vault.set_times("z/c.jpg", day(3), day(3)).await.unwrap();
        vault.set_times("z/d.avif", day(4), day(2)).await.unwrap();

        let index = Arc::new(MediaIndex::new(test_context(
            vault,
            Arc::new(CountingAnalyzer::new(40, 20)),
        )));
        index.await_ready().await.unwrap();
        index
    }

    async fn run(index: &Arc<MediaIndex>, details: QueryDetails) -> Vec<String> {
        Query::new(index.clone(), details)
            .unwrap()
            .get_items()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.path)
            .collect()
    }

    #[tokio::test]
    async fn test_default_query_orders_by_name() {
        let index = index().await;
        let paths = run(&index, QueryDetails::default()).await;
        assert_eq!(paths, vec!["x/a.png", "x/y/B.png", "z/c.jpg", "z/d.avif"]);

        let reversed = run(
            &index,
            QueryDetails {
                order_increasing: false,
                ..QueryDetails::default()
            },
        )
        .await;
        let mut expected = paths.clone();
        expected.reverse();
        assert_eq!(reversed, expected);
    }

    #[tokio::test]
    async fn test_date_orderings() {
        let index = index().await;
        let by_created = run(
            &index,
            QueryDetails {
                order_by: OrderBy::CreationDate,
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(by_created, vec!["x/a.png", "x/y/B.png", "z/c.jpg", "z/d.avif"]);

        let by_modified = run(
            &index,
            QueryDetails {
                order_by: OrderBy::ModifiedDate,
                order_increasing: false,
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(by_modified, vec!["x/y/B.png", "z/c.jpg", "z/d.avif", "x/a.png"]);
    }

    #[tokio::test]
    async fn test_random_order_keeps_all_records() {
        let index = index().await;
        let mut paths = run(
            &index,
            QueryDetails {
                order_by: OrderBy::Random,
                ..QueryDetails::default()
            },
        )
        .await;
        paths.sort();
        assert_eq!(paths, vec!["x/a.png", "x/y/B.png", "z/c.jpg", "z/d.avif"]);
    }

    #[tokio::test]
    async fn test_tag_include_and_exclude() {
        let index = index().await;
        let red = run(
            &index,
            QueryDetails {
                tags: vec!["#Red".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(red, vec!["x/a.png", "x/y/B.png", "z/d.avif"]);

        let not_big = run(
            &index,
            QueryDetails {
                tags: vec!["red".into()],
                exclude_tags: vec!["big".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(not_big, vec!["x/a.png", "z/d.avif"]);

        let not_dark = run(
            &index,
            QueryDetails {
                tags: vec!["red".into()],
                exclude_tags: vec!["red/dark".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(not_dark, vec!["x/a.png", "x/y/B.png"]);
    }

    #[tokio::test]
    async fn test_folder_include_and_exclude() {
        let index = index().await;
        let paths = run(
            &index,
            QueryDetails {
                folders: vec!["x/".into()],
                exclude_folders: vec!["x/y".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(paths, vec!["x/a.png"]);

        let excluded = run(
            &index,
            QueryDetails {
                exclude_folders: vec!["z".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(excluded, vec!["x/a.png", "x/y/B.png"]);
    }

    #[tokio::test]
    async fn test_empty_folder_rule_matches_everything() {
        let index = index().await;
        let all = run(&index, QueryDetails::default()).await;
        for root in ["", "/"] {
            let paths = run(
                &index,
                QueryDetails {
                    folders: vec![root.into()],
                    ..QueryDetails::default()
                },
            )
            .await;
            assert_eq!(paths, all);
        }
    }

    #[tokio::test]
    async fn test_name_and_extension_filters() {
        let index = index().await;
        let by_name = run(
            &index,
            QueryDetails {
                name: "b".into(),
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(by_name, vec!["x/y/B.png"]);

        let by_ext = run(
            &index,
            QueryDetails {
                extensions: vec![".PNG".into(), "jpg".into()],
                exclude_extensions: vec!["jpg".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(by_ext, vec!["x/a.png", "x/y/B.png"]);
    }

    #[tokio::test]
    async fn test_image_predicates_exclude_unknown_kinds() {
        let index = index().await;
        let horizontal = run(
            &index,
            QueryDetails {
                shape: Some(Shape::Horizontal),
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(horizontal, vec!["x/a.png", "x/y/B.png", "z/c.jpg"]);

        let square = run(
            &index,
            QueryDetails {
                shape: Some(Shape::Square),
                ..QueryDetails::default()
            },
        )
        .await;
        assert!(square.is_empty());

        let wide = run(
            &index,
            QueryDetails {
                dimensions: DimensionBounds {
                    min_width: Some(41),
                    ..Default::default()
                },
                ..QueryDetails::default()
            },
        )
        .await;
        assert!(wide.is_empty());
    }

    #[tokio::test]
    async fn test_color_filter() {
        let index = index().await;
        let reds = run(
            &index,
            QueryDetails {
                color: Some("#ff0000".into()),
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(reds, vec!["x/a.png", "x/y/B.png", "z/c.jpg"]);

        let cyans = run(
            &index,
            QueryDetails {
                color: Some("#00ffff".into()),
                ..QueryDetails::default()
            },
        )
        .await;
        assert!(cyans.is_empty());

        for bad in ["red", "#€000"] {
            assert!(Query::new(
                index.clone(),
                QueryDetails {
                    color: Some(bad.into()),
                    ..QueryDetails::default()
                }
            )
            .is_err());
        }
    }

    #[tokio::test]
    async fn test_date_ranges() {
        let index = index().await;
        let paths = run(
            &index,
            QueryDetails {
                created: DateRange {
                    start: NaiveDate::from_ymd_opt(2024, 3, 2),
                    end: NaiveDate::from_ymd_opt(2024, 3, 3),
                },
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(paths, vec!["x/y/B.png", "z/c.jpg"]);

        let recent = run(
            &index,
            QueryDetails {
                modified: DateRange {
                    start: Some((Utc::now() + Duration::days(1)).date_naive()),
                    end: None,
                },
                ..QueryDetails::default()
            },
        )
        .await;
        assert!(recent.is_empty());
    }

    #[tokio::test]
    async fn test_has_fields() {
        let index = index().await;
        let paths = run(
            &index,
            QueryDetails {
                has_fields: vec!["MC-size".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert_eq!(paths, vec!["x/a.png", "x/y/B.png", "z/c.jpg"]);

        let none = run(
            &index,
            QueryDetails {
                has_fields: vec!["tags".into(), "author".into()],
                ..QueryDetails::default()
            },
        )
        .await;
        assert!(none.is_empty());
    }

    #[test]
    fn test_compare_names() {
        let mut names = vec!["b.png", "B.png", "a.png", "C.png"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["a.png", "B.png", "b.png", "C.png"]);
    }
}
