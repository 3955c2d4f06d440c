use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::cross_links::resolve_cross_links;
use crate::loader::LoadOutcome;
use crate::text_utils::now;
use crate::validation::{validate, ValidationError};

pub const EXIT_OK: i32 = 0;
pub const EXIT_HARD_ERRORS: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human readable listing
    Text,
    /// The whole report as one JSON document
    Json,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub segments: usize,
    pub posts: usize,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub files: usize,
    pub segments: usize,
    pub posts: usize,
    pub valid_posts: usize,
    pub drafts: usize,
    pub errors: usize,
    pub warnings: usize,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub root: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub summary: Summary,
    pub files: Vec<FileReport>,
    /// Resolved cross links, by post path.
    pub links: BTreeMap<String, Vec<String>>,
}

impl Report {
    /// Validates every loaded post, resolves cross links and groups every
    /// issue under the file it belongs to.
    pub fn build(root: &Path, outcome: LoadOutcome) -> Report {
        let mut summary = Summary {
            files: outcome.files.len(),
            segments: outcome.segment_count(),
            cancelled: outcome.cancelled,
            ..Summary::default()
        };

        let mut posts = vec![];
        let mut files = vec![];
        let mut file_index = HashMap::new();

        for file in outcome.files {
            let mut issues = file.issues;
            for post in &file.posts {
                let post_issues = validate(post);
                if !post_issues.iter().any(ValidationError::is_hard) {
                    summary.valid_posts += 1;
                }
                if post.draft {
                    summary.drafts += 1;
                }
                issues.extend(post_issues);
            }

            summary.posts += file.posts.len();
            file_index.insert(file.file.clone(), files.len());
            files.push((FileReport {
                file: file.file,
                segments: file.segments,
                posts: file.posts.len(),
                errors: vec![],
                warnings: vec![],
            }, issues));
            posts.extend(file.posts);
        }

        let cross_links = resolve_cross_links(&posts);
        for issue in cross_links.issues {
            if let Some(&index) = file_index.get(&issue.path.file) {
                files[index].1.push(issue);
            }
        }

        let files: Vec<FileReport> = files.into_iter()
            .map(|(mut report, issues)| {
                let (errors, warnings): (Vec<_>, Vec<_>) = issues.into_iter().partition(ValidationError::is_hard);
                report.errors = errors;
                report.warnings = warnings;
                report
            })
            .collect();

        summary.errors = files.iter().map(|f| f.errors.len()).sum();
        summary.warnings = files.iter().map(|f| f.warnings.len()).sum();

        let links = cross_links.links.into_iter()
            .map(|(path, targets)| (path.to_string(), targets.iter().map(ToString::to_string).collect()))
            .collect();

        Report {
            root: root.to_path_buf(),
            generated_at: now(),
            summary,
            files,
            links,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// 1 when any hard error was found. Warnings only count with `deny_warnings`.
    pub fn exit_code(&self, deny_warnings: bool) -> i32 {
        if self.has_errors() || (deny_warnings && self.summary.warnings > 0) {
            EXIT_HARD_ERRORS
        } else {
            EXIT_OK
        }
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => serde_json::to_string_pretty(self),
        }
    }

    pub fn render_text(&self) -> String {
        let mut buf = String::new();

        for file in &self.files {
            let file_name = file.file.strip_prefix(&self.root).unwrap_or(&file.file);
            let _ = writeln!(&mut buf, "{}: {} of {} segments loaded", file_name.display(), file.posts, file.segments);
            for error in &file.errors {
                let _ = writeln!(&mut buf, "  error    {}", error);
            }
            for warning in &file.warnings {
                let _ = writeln!(&mut buf, "  warning  {}", warning);
            }
        }

        let s = &self.summary;
        let _ = writeln!(&mut buf);
        let _ = writeln!(&mut buf, "{} files, {} segments: {} posts ({} valid, {} drafts), {} errors, {} warnings",
                         s.files, s.segments, s.posts, s.valid_posts, s.drafts, s.errors, s.warnings);
        if s.cancelled {
            let _ = writeln!(&mut buf, "Run cancelled, results are partial");
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::Result;

    use crate::loader::{load_all, LoadOptions};
    use crate::test_data::{missing_front_matter_post, valid_post, SEPARATOR};
    use crate::validation::IssueKind;

    use super::*;

    fn build_report(root: &Path) -> Result<Report> {
        let outcome = load_all(root, &LoadOptions::default())?;
        Ok(Report::build(root, outcome))
    }

    #[test]
    fn test_end_to_end_scenario() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join("a.md"), "---\ntitle: \"Hello\"\ndate: 2024-01-01T00:00:00Z\nauthors: [\"yen\"]\n---\nHi\n")?;
        fs::write(root.path().join("b.md"), [valid_post("First"), missing_front_matter_post()].join(SEPARATOR))?;

        let report = build_report(root.path())?;
        assert_eq!(report.summary.posts, 2);
        assert_eq!(report.summary.valid_posts, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 0);
        assert_eq!(report.exit_code(false), EXIT_HARD_ERRORS);

        let b = &report.files[1];
        assert_eq!(b.segments, 2);
        assert_eq!(b.posts, 1);
        assert!(matches!(b.errors[0].kind, IssueKind::MissingFrontMatter { .. }));
        Ok(())
    }

    #[test]
    fn test_warnings_do_not_fail() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join("a.md"), "---\ntitle: A\ndate: 2024-01-01T00:00:00Z\nauthors: [yen]\ntags: [AI, ai]\nweight: 1\n---\nSee [b](/b).\n")?;

        let report = build_report(root.path())?;
        assert_eq!(report.summary.errors, 0);
        assert_eq!(report.summary.warnings, 3);
        assert_eq!(report.exit_code(false), EXIT_OK);
        assert_eq!(report.exit_code(true), EXIT_HARD_ERRORS);

        let kinds: Vec<_> = report.files[0].warnings.iter().map(|w| &w.kind).collect();
        assert!(kinds.contains(&&IssueKind::UnknownField { field: "weight".to_string() }));
        assert!(kinds.contains(&&IssueKind::DanglingLink { target: "b".to_string() }));
        Ok(())
    }

    #[test]
    fn test_schema_error_keeps_post() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join("a.md"), "---\ntitle: \"\"\ndate: 2024-01-01T00:00:00Z\nauthors: [yen]\ndraft: true\n---\n")?;

        let report = build_report(root.path())?;
        assert_eq!(report.summary.posts, 1);
        assert_eq!(report.summary.valid_posts, 0);
        assert_eq!(report.summary.drafts, 1);
        assert_eq!(report.summary.errors, 1);
        Ok(())
    }

    #[test]
    fn test_links_in_report() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join("a.md"), "---\ntitle: A\ndate: 2024-01-01T00:00:00Z\nauthors: [yen]\n---\nSee [b](/b/).\n")?;
        fs::write(root.path().join("b.md"), "---\ntitle: B\ndate: 2024-01-01T00:00:00Z\nauthors: [yen]\n---\n")?;

        let report = build_report(root.path())?;
        let a = root.path().join("a.md").display().to_string();
        let b = root.path().join("b.md").display().to_string();
        assert_eq!(report.links.get(&a), Some(&vec![b]));
        Ok(())
    }

    #[test]
    fn test_render_text_and_json() -> Result<()> {
        let root = tempfile::tempdir()?;
        fs::write(root.path().join("b.md"), [valid_post("First"), missing_front_matter_post()].join(SEPARATOR))?;

        let report = build_report(root.path())?;
        let text = report.render(ReportFormat::Text)?;
        assert!(text.starts_with("b.md: 1 of 2 segments loaded\n"));
        assert!(text.contains("  error    "));
        assert!(text.contains("b.md#2: missing front matter"));
        assert!(text.contains("1 files, 2 segments: 1 posts (1 valid, 0 drafts), 1 errors, 0 warnings"));

        let json: serde_json::Value = serde_json::from_str(&report.render(ReportFormat::Json)?)?;
        assert_eq!(json["summary"]["errors"], 1);
        let error = &json["files"][0]["errors"][0];
        assert_eq!(error["kind"], "MissingFrontMatter");
        assert_eq!(error["severity"], "error");
        assert!(error["path"].as_str().unwrap().ends_with("b.md#2"));
        Ok(())
    }
}
