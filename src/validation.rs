use std::collections::HashSet;
use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::post::{FrontMatterField, Post, PostPath};
use crate::text_utils::{has_utc_offset, parse_date_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    Categories,
    Tags,
}

impl Display for Taxonomy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Taxonomy::Categories => write!(f, "categories"),
            Taxonomy::Tags => write!(f, "tags"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind")]
pub enum IssueKind {
    /// The segment has no parseable front matter and was skipped.
    MissingFrontMatter { reason: String },
    /// The file could not be read at all.
    Unreadable { reason: String },
    SchemaError { field: String, message: String },
    DuplicateTaxonomyEntry { taxonomy: Taxonomy, value: String },
    UnknownField { field: String },
    DanglingLink { target: String },
    DuplicateSlug { slug: String, other: String },
    /// The date parses but carries no UTC offset.
    DateWithoutOffset { date: String },
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::MissingFrontMatter { .. }
            | IssueKind::Unreadable { .. }
            | IssueKind::SchemaError { .. } => Severity::Error,
            IssueKind::DuplicateTaxonomyEntry { .. }
            | IssueKind::UnknownField { .. }
            | IssueKind::DanglingLink { .. }
            | IssueKind::DuplicateSlug { .. }
            | IssueKind::DateWithoutOffset { .. } => Severity::Warning,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::MissingFrontMatter { reason } => write!(f, "missing front matter: {}", reason),
            IssueKind::Unreadable { reason } => write!(f, "unreadable: {}", reason),
            IssueKind::SchemaError { field, message } => write!(f, "schema error in '{}': {}", field, message),
            IssueKind::DuplicateTaxonomyEntry { taxonomy, value } => write!(f, "duplicate {} entry '{}'", taxonomy, value),
            IssueKind::UnknownField { field } => write!(f, "unknown field '{}'", field),
            IssueKind::DanglingLink { target } => write!(f, "dangling link to '{}'", target),
            IssueKind::DuplicateSlug { slug, other } => write!(f, "slug '{}' is also used by {}", slug, other),
            IssueKind::DateWithoutOffset { date } => write!(f, "date '{}' has no UTC offset, read as UTC", date),
        }
    }
}

/// One reported defect, tied to the post (or file) it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationError {
    pub path: PostPath,
    #[serde(flatten)]
    pub kind: IssueKind,
    pub severity: Severity,
}

impl ValidationError {
    pub fn new(path: PostPath, kind: IssueKind) -> Self {
        let severity = kind.severity();
        ValidationError { path, kind, severity }
    }

    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

fn schema_error(post: &Post, field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(post.path.clone(), IssueKind::SchemaError {
        field: field.to_string(),
        message: message.into(),
    })
}

/// Runs every schema check on a post. Checks are independent: a post with
/// no title and a bad date gets both errors. An empty result means valid.
pub fn validate(post: &Post) -> Vec<ValidationError> {
    let mut errors = vec![];

    let mut malformed = HashSet::new();
    for field in &post.fields {
        if let FrontMatterField::Malformed { name, expected, .. } = field {
            errors.push(schema_error(post, name, format!("expected {}", expected)));
            malformed.insert(name.as_str());
        }
    }

    if !malformed.contains("title") {
        match post.title.as_deref() {
            None => errors.push(schema_error(post, "title", "required field is missing")),
            Some(title) if title.trim().is_empty() => errors.push(schema_error(post, "title", "must not be empty")),
            Some(_) => {}
        }
    }

    if !malformed.contains("date") {
        match post.date_raw.as_deref() {
            None => errors.push(schema_error(post, "date", "required field is missing")),
            Some(raw) => match parse_date_time(raw) {
                Err(e) => errors.push(schema_error(post, "date", e)),
                Ok(_) if !has_utc_offset(raw) => {
                    errors.push(ValidationError::new(post.path.clone(), IssueKind::DateWithoutOffset {
                        date: raw.to_string(),
                    }));
                }
                Ok(_) => {}
            },
        }
    }

    if !malformed.contains("authors") && !post.authors.iter().any(|a| !a.trim().is_empty()) {
        errors.push(schema_error(post, "authors", "at least one non-empty author is required"));
    }

    errors.extend(duplicate_entries(post, Taxonomy::Categories, &post.categories));
    errors.extend(duplicate_entries(post, Taxonomy::Tags, &post.tags));

    errors
}

/// One warning per value that repeats, compared case-insensitively.
/// `["AI", "ai", "Ai"]` yields a single warning.
fn duplicate_entries(post: &Post, taxonomy: Taxonomy, entries: &[String]) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut warnings = vec![];

    for entry in entries {
        let key = entry.trim().to_lowercase();
        if !seen.insert(key.clone()) && reported.insert(key) {
            warnings.push(ValidationError::new(post.path.clone(), IssueKind::DuplicateTaxonomyEntry {
                taxonomy,
                value: entry.clone(),
            }));
        }
    }

    warnings
}
