use std::cmp::Ordering;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use serde_yaml::{Mapping, Value};

use crate::text_utils::parse_date_time;

/// Locates one logical post: a file and the segment inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostPath {
    pub file: PathBuf,
    /// Zero-based segment index.
    pub segment: usize,
    /// Number of segments the file was split into.
    pub segments: usize,
}

impl PostPath {
    pub fn new(file: PathBuf, segment: usize, segments: usize) -> Self {
        PostPath { file, segment, segments }
    }

    /// Path of a whole file, used for issues that are not tied to a segment.
    pub fn whole_file(file: PathBuf) -> Self {
        PostPath { file, segment: 0, segments: 1 }
    }
}

impl Display for PostPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.segments > 1 {
            write!(f, "{}#{}", self.file.display(), self.segment + 1)
        } else {
            write!(f, "{}", self.file.display())
        }
    }
}

impl Ord for PostPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file.cmp(&other.file)
            .then(self.segment.cmp(&other.segment))
    }
}

impl PartialOrd for PostPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for PostPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A front matter entry the schema knows about, already typed.
#[derive(Debug, Clone, PartialEq)]
pub enum KnownField {
    Title(String),
    Date(String),
    Draft(bool),
    Authors(Vec<String>),
    Categories(Vec<String>),
    Tags(Vec<String>),
    Summary(String),
    Description(String),
    ReadTime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatterField {
    Known(KnownField),
    Unknown { name: String, raw: Value },
    /// A known key whose value has the wrong shape. The raw value is kept.
    Malformed { name: String, raw: Value, expected: &'static str },
}

impl FrontMatterField {
    pub fn name(&self) -> &str {
        match self {
            FrontMatterField::Known(field) => field.name(),
            FrontMatterField::Unknown { name, .. } => name,
            FrontMatterField::Malformed { name, .. } => name,
        }
    }

    /// Classifies one front matter entry by key.
    pub fn classify(name: &str, raw: Value) -> FrontMatterField {
        let known = match name {
            "title" => scalar_string(&raw).map(KnownField::Title).ok_or("a string"),
            "date" => scalar_string(&raw).map(KnownField::Date).ok_or("a timestamp string"),
            "draft" => boolean(&raw).map(KnownField::Draft).ok_or("a boolean"),
            "authors" => string_list(&raw).map(KnownField::Authors).ok_or("a list of strings"),
            "categories" => string_list(&raw).map(KnownField::Categories).ok_or("a list of strings"),
            "tags" => string_list(&raw).map(KnownField::Tags).ok_or("a list of strings"),
            "summary" => scalar_string(&raw).map(KnownField::Summary).ok_or("a string"),
            "description" => scalar_string(&raw).map(KnownField::Description).ok_or("a string"),
            "readTime" => scalar_string(&raw).map(KnownField::ReadTime).ok_or("a string"),
            _ => return FrontMatterField::Unknown { name: name.to_string(), raw },
        };

        match known {
            Ok(field) => FrontMatterField::Known(field),
            Err(expected) => FrontMatterField::Malformed { name: name.to_string(), raw, expected },
        }
    }
}

impl KnownField {
    pub fn name(&self) -> &'static str {
        match self {
            KnownField::Title(_) => "title",
            KnownField::Date(_) => "date",
            KnownField::Draft(_) => "draft",
            KnownField::Authors(_) => "authors",
            KnownField::Categories(_) => "categories",
            KnownField::Tags(_) => "tags",
            KnownField::Summary(_) => "summary",
            KnownField::Description(_) => "description",
            KnownField::ReadTime(_) => "readTime",
        }
    }
}

// Numbers and booleans are accepted where a string is expected: `title: 2024`
// is a title, not a type error.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_string(&tagged.value),
        _ => None,
    }
}

fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

// A single string counts as a one-element list, as Hugo does for taxonomies.
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Sequence(items) => items.iter().map(scalar_string).collect(),
        Value::Null => Some(vec![]),
        other => scalar_string(other).map(|s| vec![s]),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub path: PostPath,
    pub slug: String,
    pub title: Option<String>,
    /// Date as written in the front matter.
    pub date_raw: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub draft: bool,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub read_time: Option<String>,
    /// Every entry in source order, known or not.
    pub fields: Vec<FrontMatterField>,
    pub body: String,
}

impl Post {
    /// Builds a post from a parsed front matter map. Known fields fill the
    /// typed members; everything is also kept in `fields`.
    pub fn from_front_matter(path: PostPath, slug: &str, front_matter: Mapping, body: &str) -> Post {
        let mut post = Post {
            path,
            slug: slug.to_string(),
            title: None,
            date_raw: None,
            date: None,
            draft: false,
            authors: vec![],
            categories: vec![],
            tags: vec![],
            summary: None,
            description: None,
            read_time: None,
            fields: vec![],
            body: body.to_string(),
        };

        for (key, value) in front_matter {
            let name = match key {
                Value::String(s) => s,
                other => match scalar_string(&other) {
                    Some(s) => s,
                    None => continue,
                },
            };

            let field = FrontMatterField::classify(&name, value);
            if let FrontMatterField::Known(ref known) = field {
                post.apply(known.clone());
            }
            post.fields.push(field);
        }

        post
    }

    fn apply(&mut self, field: KnownField) {
        match field {
            KnownField::Title(title) => self.title = Some(title),
            KnownField::Date(date) => {
                self.date = parse_date_time(&date).ok();
                self.date_raw = Some(date);
            }
            KnownField::Draft(draft) => self.draft = draft,
            KnownField::Authors(authors) => self.authors = authors,
            KnownField::Categories(categories) => self.categories = categories,
            KnownField::Tags(tags) => self.tags = tags,
            KnownField::Summary(summary) => self.summary = Some(summary),
            KnownField::Description(description) => self.description = Some(description),
            KnownField::ReadTime(read_time) => self.read_time = Some(read_time),
        }
    }

    pub fn unknown_fields(&self) -> impl Iterator<Item=(&str, &Value)> {
        self.fields.iter().filter_map(|field| match field {
            FrontMatterField::Unknown { name, raw } => Some((name.as_str(), raw)),
            _ => None,
        })
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "path={}, slug={}, date={}, authors={}\ntitle={}",
               self.path,
               self.slug,
               self.date_raw.as_deref().unwrap_or(""),
               self.authors.join(", "),
               self.title.as_deref().unwrap_or(""),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_post_path_display() {
        let single = PostPath::new(PathBuf::from("posts/a.md"), 0, 1);
        assert_eq!(single.to_string(), "posts/a.md");
        let second = PostPath::new(PathBuf::from("posts/b.md"), 1, 2);
        assert_eq!(second.to_string(), "posts/b.md#2");
    }

    #[test]
    fn test_from_front_matter() {
        let fm = mapping(r#"
title: "Scaling pods with HPA"
date: 2024-03-02T09:15:00+08:00
draft: true
authors: ["yen", "mo"]
categories: [Kubernetes]
tags: [k8s, autoscaling]
summary: How the autoscaler decides
readTime: "16 min"
"#);
        let post = Post::from_front_matter(PostPath::whole_file(PathBuf::from("hpa.md")), "hpa", fm, "Body\n");
        assert_eq!(post.title.as_deref(), Some("Scaling pods with HPA"));
        assert_eq!(post.date_raw.as_deref(), Some("2024-03-02T09:15:00+08:00"));
        assert!(post.date.is_some());
        assert!(post.draft);
        assert_eq!(post.authors, ["yen", "mo"]);
        assert_eq!(post.categories, ["Kubernetes"]);
        assert_eq!(post.tags, ["k8s", "autoscaling"]);
        assert_eq!(post.summary.as_deref(), Some("How the autoscaler decides"));
        assert_eq!(post.read_time.as_deref(), Some("16 min"));
        assert_eq!(post.body, "Body\n");
        assert_eq!(post.fields.len(), 8);
        assert_eq!(post.unknown_fields().count(), 0);
        assert_eq!(post.to_string(), "path=hpa.md, slug=hpa, date=2024-03-02T09:15:00+08:00, authors=yen, mo\ntitle=Scaling pods with HPA");
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let fm = mapping("title: x\nweight: 10\nseries:\n  - cdk\n");
        let post = Post::from_front_matter(PostPath::whole_file(PathBuf::from("x.md")), "x", fm, "");
        let unknown: Vec<_> = post.unknown_fields().collect();
        assert_eq!(unknown.len(), 2);
        assert_eq!(unknown[0].0, "weight");
        assert_eq!(unknown[0].1, &Value::from(10));
        assert_eq!(unknown[1].0, "series");
        assert!(unknown[1].1.is_sequence());
    }

    #[test]
    fn test_classify_coercions() {
        assert_eq!(FrontMatterField::classify("title", Value::from(2024)),
                   FrontMatterField::Known(KnownField::Title("2024".to_string())));
        assert_eq!(FrontMatterField::classify("tags", Value::from("rust")),
                   FrontMatterField::Known(KnownField::Tags(vec!["rust".to_string()])));
        assert_eq!(FrontMatterField::classify("tags", Value::Null),
                   FrontMatterField::Known(KnownField::Tags(vec![])));
        assert_eq!(FrontMatterField::classify("draft", Value::from("False")),
                   FrontMatterField::Known(KnownField::Draft(false)));
    }

    #[test]
    fn test_classify_malformed() {
        let field = FrontMatterField::classify("draft", Value::from("maybe"));
        assert!(matches!(field, FrontMatterField::Malformed { expected: "a boolean", .. }));

        let field = FrontMatterField::classify("tags", Value::Mapping(mapping("a: 1")));
        assert!(matches!(field, FrontMatterField::Malformed { expected: "a list of strings", .. }));
        assert_eq!(field.name(), "tags");
    }
}
