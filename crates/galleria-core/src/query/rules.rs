//! Longest-prefix include/exclude rules for folders and tags.

use crate::vault::path::has_segment_prefix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

/// Include and exclude prefixes, matched longest first.
///
/// Rules of equal length keep registration order and includes are
/// registered before excludes, so the first registered rule wins a tie.
/// Matching is per path segment: `x` covers `x` and `x/y`, not `xy`.
#[derive(Debug, Clone, Default)]
pub struct PrefixRules {
    rules: Vec<(String, Polarity)>,
    has_includes: bool,
}

impl PrefixRules {
    pub fn new<F>(includes: &[String], excludes: &[String], normalize: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rules: Vec<(String, Polarity)> = includes
            .iter()
            .filter_map(|rule| normalize(rule).map(|r| (r, Polarity::Include)))
            .chain(
                excludes
                    .iter()
                    .filter_map(|rule| normalize(rule).map(|r| (r, Polarity::Exclude))),
            )
            .collect();
        let has_includes = rules.iter().any(|(_, p)| *p == Polarity::Include);
        // Stable, so ties keep registration order
        rules.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            rules,
            has_includes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_includes(&self) -> bool {
        self.has_includes
    }

    /// Polarity of the longest rule covering `candidate`, if any.
    pub fn decide(&self, candidate: &str) -> Option<Polarity> {
        self.rules
            .iter()
            .find(|(rule, _)| has_segment_prefix(candidate, rule))
            .map(|(_, polarity)| *polarity)
    }

    /// Single-candidate check used for folders: an exclude hit rejects, and
    /// with includes present something must include the candidate.
    pub fn admits(&self, candidate: &str) -> bool {
        match self.decide(candidate) {
            Some(Polarity::Include) => true,
            Some(Polarity::Exclude) => false,
            None => !self.has_includes,
        }
    }

    /// Multi-candidate check used for tags: any excluded candidate rejects;
    /// with includes present at least one candidate must be included.
    pub fn admits_any<'a>(&self, candidates: impl IntoIterator<Item = &'a str>) -> bool {
        if self.is_empty() {
            return true;
        }
        let mut included = false;
        for candidate in candidates {
            match self.decide(candidate) {
                Some(Polarity::Exclude) => return false,
                Some(Polarity::Include) => included = true,
                None => {}
            }
        }
        included || !self.has_includes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(includes: &[&str], excludes: &[&str]) -> PrefixRules {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        PrefixRules::new(&owned(includes), &owned(excludes), |s| Some(s.to_string()))
    }

    #[test]
    fn test_longest_rule_wins() {
        let folders = rules(&["photos"], &["photos/private"]);
        assert!(folders.admits("photos/a.png"));
        assert!(!folders.admits("photos/private/a.png"));
        assert!(!folders.admits("other/a.png"));

        let folders = rules(&["photos/private/ok"], &["photos/private"]);
        assert!(folders.admits("photos/private/ok/a.png"));
        assert!(!folders.admits("photos/private/no/a.png"));
        assert!(!folders.admits("elsewhere/a.png"));
    }

    #[test]
    fn test_segment_matching() {
        let folders = rules(&["x"], &[]);
        assert!(folders.admits("x/a.png"));
        assert!(!folders.admits("xy/a.png"));
    }

    #[test]
    fn test_equal_length_first_registered_wins() {
        let tags = rules(&["red"], &["red"]);
        assert_eq!(tags.decide("red"), Some(Polarity::Include));
    }

    #[test]
    fn test_excludes_only() {
        let folders = rules(&[], &["trash"]);
        assert!(folders.admits("photos/a.png"));
        assert!(!folders.admits("trash/a.png"));
    }

    #[test]
    fn test_admits_any_for_tags() {
        let tags = rules(&["color"], &["color/grey"]);
        assert!(tags.admits_any(["color/red", "big"]));
        assert!(!tags.admits_any(["color/red", "color/grey"]));
        assert!(!tags.admits_any(["big"]));
        assert!(!tags.admits_any(std::iter::empty()));

        let empty = PrefixRules::default();
        assert!(empty.admits_any(std::iter::empty()));
        assert!(empty.admits("anything"));
    }
}
