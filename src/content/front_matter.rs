use std::fmt;
use std::fmt::{Display, Formatter};

use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontMatterFormat {
    Yaml,
    Toml,
}

impl FrontMatterFormat {
    fn from_delimiter(line: &str) -> Option<FrontMatterFormat> {
        match line {
            "---" => Some(FrontMatterFormat::Yaml),
            "+++" => Some(FrontMatterFormat::Toml),
            _ => None,
        }
    }

    pub fn delimiter(&self) -> &'static str {
        match self {
            FrontMatterFormat::Yaml => "---",
            FrontMatterFormat::Toml => "+++",
        }
    }
}

/// Why a segment has no usable front matter.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatterError {
    NoOpeningDelimiter,
    Unterminated(FrontMatterFormat),
    Invalid(FrontMatterFormat, String),
    NotAMapping(FrontMatterFormat),
}

impl Display for FrontMatterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterError::NoOpeningDelimiter => write!(f, "segment does not start with a front matter block"),
            FrontMatterError::Unterminated(format) => write!(f, "closing '{}' not found", format.delimiter()),
            FrontMatterError::Invalid(FrontMatterFormat::Yaml, e) => write!(f, "invalid YAML: {}", e),
            FrontMatterError::Invalid(FrontMatterFormat::Toml, e) => write!(f, "invalid TOML: {}", e),
            FrontMatterError::NotAMapping(_) => write!(f, "front matter is not a key/value map"),
        }
    }
}

pub struct FrontMatterBlock<'a> {
    pub format: FrontMatterFormat,
    pub raw: &'a str,
    pub body: &'a str,
}

/// Finds the leading front matter block of a segment.
/// Blank lines and a byte order mark before the opening delimiter are ignored.
pub fn split_front_matter(segment: &str) -> Result<FrontMatterBlock<'_>, FrontMatterError> {
    let text = segment.strip_prefix('\u{feff}').unwrap_or(segment);
    let mut offset = segment.len() - text.len();
    let mut lines = text.split_inclusive('\n');

    let format = loop {
        let Some(line) = lines.next() else {
            return Err(FrontMatterError::NoOpeningDelimiter);
        };
        offset += line.len();

        let line = line.trim();
        // Empty lines are ok
        if line.is_empty() {
            continue;
        }

        match FrontMatterFormat::from_delimiter(line) {
            Some(format) => break format,
            None => return Err(FrontMatterError::NoOpeningDelimiter),
        }
    };

    let raw_start = offset;
    for line in lines {
        if line.trim_end() == format.delimiter() {
            let raw = &segment[raw_start..offset];
            let body = &segment[offset + line.len()..];
            return Ok(FrontMatterBlock { format, raw, body });
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated(format))
}

/// Parses the leading front matter block into an ordered map and returns
/// the body that follows it.
pub fn parse_front_matter(segment: &str) -> Result<(Mapping, &str), FrontMatterError> {
    let block = split_front_matter(segment)?;
    let mapping = match block.format {
        FrontMatterFormat::Yaml => parse_yaml(block.raw)?,
        FrontMatterFormat::Toml => parse_toml(block.raw)?,
    };
    Ok((mapping, block.body))
}

fn parse_yaml(raw: &str) -> Result<Mapping, FrontMatterError> {
    let value: Value = serde_yaml::from_str(raw)
        .map_err(|e| FrontMatterError::Invalid(FrontMatterFormat::Yaml, e.to_string()))?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(FrontMatterError::NotAMapping(FrontMatterFormat::Yaml)),
    }
}

fn parse_toml(raw: &str) -> Result<Mapping, FrontMatterError> {
    let table: toml::Table = toml::from_str(raw)
        .map_err(|e| FrontMatterError::Invalid(FrontMatterFormat::Toml, e.message().to_string()))?;
    Ok(toml_table_to_mapping(table))
}

fn toml_table_to_mapping(table: toml::Table) -> Mapping {
    table.into_iter()
        .map(|(key, value)| (Value::String(key), toml_to_yaml(value)))
        .collect()
}

// TOML dates have no YAML counterpart; they become strings, which is
// how YAML front matter carries them anyway.
fn toml_to_yaml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => Value::Mapping(toml_table_to_mapping(table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_yaml() {
        let segment = "\n\n---\ntitle: Hello\n---\n# Body\ntext\n";
        let block = split_front_matter(segment).unwrap();
        assert_eq!(block.format, FrontMatterFormat::Yaml);
        assert_eq!(block.raw, "title: Hello\n");
        assert_eq!(block.body, "# Body\ntext\n");
    }

    #[test]
    fn test_split_keeps_dashes_in_body() {
        let segment = "---\ntitle: a\n---\nintro\n---\nafter rule\n";
        let block = split_front_matter(segment).unwrap();
        assert_eq!(block.raw, "title: a\n");
        assert_eq!(block.body, "intro\n---\nafter rule\n");
    }

    #[test]
    fn test_split_crlf_and_bom() {
        let segment = "\u{feff}---\r\ntitle: a\r\n---\r\nbody";
        let block = split_front_matter(segment).unwrap();
        assert_eq!(block.raw, "title: a\r\n");
        assert_eq!(block.body, "body");
    }

    #[test]
    fn test_split_errors() {
        assert_eq!(split_front_matter("").err(), Some(FrontMatterError::NoOpeningDelimiter));
        assert_eq!(split_front_matter("# Just a heading\n").err(), Some(FrontMatterError::NoOpeningDelimiter));
        assert_eq!(split_front_matter("---\ntitle: a\nbody\n").err(),
                   Some(FrontMatterError::Unterminated(FrontMatterFormat::Yaml)));
    }

    #[test]
    fn test_parse_yaml_preserves_order() {
        let (mapping, body) = parse_front_matter("---\nzeta: 1\nalpha: 2\ntitle: t\n---\nbody").unwrap();
        let keys: Vec<&str> = mapping.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha", "title"]);
        assert_eq!(body, "body");
    }

    #[test]
    fn test_parse_empty_yaml() {
        let (mapping, _) = parse_front_matter("---\n---\nbody").unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse_front_matter("---\ntitle: [unclosed\n---\n").err().unwrap();
        assert!(matches!(err, FrontMatterError::Invalid(FrontMatterFormat::Yaml, _)));

        let err = parse_front_matter("---\n- a\n- b\n---\n").err().unwrap();
        assert_eq!(err, FrontMatterError::NotAMapping(FrontMatterFormat::Yaml));
    }

    #[test]
    fn test_parse_toml() {
        let segment = "+++\ntitle = \"Docker mounts\"\ndate = 2023-06-01T10:00:00Z\ntags = [\"docker\"]\n+++\nbody";
        let (mapping, body) = parse_front_matter(segment).unwrap();
        assert_eq!(mapping.get("title").and_then(Value::as_str), Some("Docker mounts"));
        assert_eq!(mapping.get("date").and_then(Value::as_str), Some("2023-06-01T10:00:00Z"));
        assert!(mapping.get("tags").unwrap().is_sequence());
        assert_eq!(body, "body");
    }
}
