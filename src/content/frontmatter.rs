//! Front-matter parsing

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::FrontMatterError;
use crate::helpers::{display_date, parse_date_string};

/// Delimiter line that opens and closes the metadata block
const DELIMITER: &str = "---";

/// Front-matter data from a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontMatter {
    pub title: String,
    pub date: String,
    pub cover_image: String,

    /// Additional custom fields, in file order
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let content = content.trim_start_matches(['\n', '\r']);

        let rest = content
            .strip_prefix(DELIMITER)
            .ok_or(FrontMatterError::MissingOpening)?;
        let rest = match rest.find('\n') {
            Some(eol) if rest[..eol].trim().is_empty() => &rest[eol + 1..],
            _ => return Err(FrontMatterError::MissingOpening),
        };

        // Closing delimiter must sit on a line of its own
        let mut offset = 0;
        let mut closing = None;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == DELIMITER {
                closing = Some((offset, offset + line.len()));
                break;
            }
            offset += line.len();
        }
        let (yaml_end, body_start) = closing.ok_or(FrontMatterError::MissingClosing)?;

        let yaml_content = &rest[..yaml_end];
        let remaining = rest[body_start..].trim_start_matches(['\n', '\r']);

        let fm = Self::from_yaml(yaml_content)?;
        Ok((fm, remaining))
    }

    fn from_yaml(yaml_content: &str) -> Result<Self, FrontMatterError> {
        let mapping = match serde_yaml::from_str::<Value>(yaml_content)? {
            Value::Mapping(mapping) => mapping,
            Value::Null => serde_yaml::Mapping::new(),
            _ => return Err(FrontMatterError::NotAMapping),
        };

        let mut extra = IndexMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            let key = match key {
                Value::String(s) => s,
                other => scalar_to_string(&other).ok_or(FrontMatterError::NotAMapping)?,
            };
            extra.insert(key, value);
        }

        let title = take_required(&mut extra, "title")?;
        let date = take_required(&mut extra, "date")?;
        let cover_image = take_required(&mut extra, "cover_image")?;

        Ok(Self {
            title,
            date,
            cover_image,
            extra,
        })
    }

    /// Look up a custom field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Parse the date string into a NaiveDateTime
    pub fn parse_date(&self) -> Option<NaiveDateTime> {
        parse_date_string(&self.date)
    }

    /// Date as shown on the post page
    pub fn display_date(&self) -> String {
        display_date(&self.date)
    }
}

/// Remove a required key and render its scalar value as a string
fn take_required(
    fields: &mut IndexMap<String, Value>,
    key: &'static str,
) -> Result<String, FrontMatterError> {
    let value = fields
        .shift_remove(key)
        .ok_or(FrontMatterError::MissingKey(key))?;
    match value {
        Value::Null => Err(FrontMatterError::MissingKey(key)),
        other => scalar_to_string(&other).ok_or(FrontMatterError::NotScalar(key)),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        _ => None,
    }
}
