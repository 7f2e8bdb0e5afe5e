//! Markdown documents with a leading YAML front-matter block.

use crate::config::SidecarConfig;
use crate::error::{GalleriaError, Result};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;

/// Inline `#tag` markers: letters, digits, `_`, `-` and `/` for nesting.
static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([\p{L}\p{N}_/\-]+)").unwrap());

const DELIMITER: &str = "---";

/// A parsed sidecar document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatterDocument {
    pub fields: Mapping,
    pub body: String,
}

impl FrontMatterDocument {
    /// Split `text` into front matter and body.
    ///
    /// A block that is opened but never closed is treated as plain body.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let Some((yaml, body)) = split_block(text) else {
            return Ok(Self {
                fields: Mapping::new(),
                body: text.to_string(),
            });
        };

        let fields = if yaml.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<Value>(yaml)? {
                Value::Mapping(map) => map,
                Value::Null => Mapping::new(),
                other => {
                    return Err(GalleriaError::Validation {
                        field: "front matter".into(),
                        message: format!("expected a mapping, found {:?}", other),
                    })
                }
            }
        };

        Ok(Self {
            fields,
            body: body.to_string(),
        })
    }

    /// Render back to text; the block is omitted when there are no fields.
    pub fn render(&self) -> Result<String> {
        if self.fields.is_empty() {
            return Ok(self.body.clone());
        }
        let yaml = serde_yaml::to_string(&self.fields)?;
        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", self.body))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Tags from the `tags` field followed by inline markers in the body,
    /// normalized and de-duplicated in first-seen order.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let mut push = |raw: &str| {
            if let Some(tag) = normalize_tag(raw) {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        };

        match self.fields.get(SidecarConfig::TAGS_FIELD) {
            Some(Value::Sequence(items)) => {
                for item in items {
                    match item {
                        Value::String(s) => push(s),
                        Value::Number(n) => push(&n.to_string()),
                        _ => {}
                    }
                }
            }
            Some(Value::String(s)) => {
                for part in s.split(|c: char| c == ',' || c.is_whitespace()) {
                    push(part);
                }
            }
            _ => {}
        }

        for capture in INLINE_TAG.captures_iter(&self.body) {
            let tag = &capture[1];
            // Purely numeric markers are not tags
            if tag.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            push(tag);
        }

        tags
    }
}

/// Lowercase, strip leading `#` and whitespace; empty tags are dropped.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches('#').trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

/// Returns `(yaml, body)` when `text` opens with a closed delimiter block.
fn split_block(text: &str) -> Option<(&str, &str)> {
    let first_line_end = text.find('\n')?;
    if text[..first_line_end].trim_end() != DELIMITER {
        return None;
    }
    let yaml_start = first_line_end + 1;

    let mut offset = yaml_start;
    for line in text[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let body_start = offset + line.len();
            return Some((&text[yaml_start..offset], &text[body_start..]));
        }
        offset += line.len();
    }
    None
}
