use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use spdlog::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::content::content_file::ContentFile;
use crate::content::front_matter::parse_front_matter;
use crate::content::separator::Separator;
use crate::post::{Post, PostPath};
use crate::post_list::PostList;
use crate::validation::{IssueKind, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub separator: Separator,
    /// Keys kept as unknown fields without a warning.
    pub extra_fields: HashSet<String>,
}

impl LoadOptions {
    pub fn from_config(config: &Config) -> Result<LoadOptions> {
        let separator = Separator::new(&config.separator.pattern)
            .with_context(|| format!("Invalid separator pattern {}", config.separator.pattern))?;
        let extra_fields = config.schema.extra_fields.iter().cloned().collect();
        debug!("Separator pattern {}", separator.as_str());
        Ok(LoadOptions { separator, extra_fields })
    }
}

/// Everything loaded from one physical file.
#[derive(Debug)]
pub struct FileOutcome {
    pub file: PathBuf,
    pub segments: usize,
    pub posts: Vec<Post>,
    pub issues: Vec<ValidationError>,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub files: Vec<FileOutcome>,
    /// Set when the run stopped before every file was dispatched.
    pub cancelled: bool,
}

impl LoadOutcome {
    pub fn posts(&self) -> impl Iterator<Item=&Post> {
        self.files.iter().flat_map(|f| f.posts.iter())
    }

    pub fn issues(&self) -> impl Iterator<Item=&ValidationError> {
        self.files.iter().flat_map(|f| f.issues.iter())
    }

    pub fn segment_count(&self) -> usize {
        self.files.iter().map(|f| f.segments).sum()
    }

}

/// Shared stop flag for a concurrent load.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Splits a file into segments and parses each one on its own. A segment
/// without front matter is reported and skipped; its siblings still load.
pub fn load_content(content_file: &ContentFile, options: &LoadOptions) -> FileOutcome {
    let segments = options.separator.split(&content_file.raw_content);
    let segment_count = segments.len();

    let mut posts = vec![];
    let mut issues = vec![];

    for (index, segment) in segments.into_iter().enumerate() {
        let path = PostPath::new(content_file.file_path.clone(), index, segment_count);
        match parse_front_matter(segment) {
            Ok((front_matter, body)) => {
                let post = Post::from_front_matter(path, &content_file.slug, front_matter, body);
                for (name, _) in post.unknown_fields() {
                    if !options.extra_fields.contains(name) {
                        issues.push(ValidationError::new(post.path.clone(), IssueKind::UnknownField {
                            field: name.to_string(),
                        }));
                    }
                }
                posts.push(post);
            }
            Err(e) => {
                debug!("Skipping {}: {}", path, e);
                issues.push(ValidationError::new(path, IssueKind::MissingFrontMatter {
                    reason: e.to_string(),
                }));
            }
        }
    }

    debug!("Loaded {} of {} segments from {}", posts.len(), segment_count, content_file.file_path.display());

    FileOutcome {
        file: content_file.file_path.clone(),
        segments: segment_count,
        posts,
        issues,
    }
}

pub fn load_file(path: &Path, options: &LoadOptions) -> FileOutcome {
    match ContentFile::from_file(path.to_path_buf()) {
        Ok(content_file) => load_content(&content_file, options),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            FileOutcome {
                file: path.to_path_buf(),
                segments: 0,
                posts: vec![],
                issues: vec![ValidationError::new(PostPath::whole_file(path.to_path_buf()), IssueKind::Unreadable {
                    reason: e.to_string(),
                })],
            }
        }
    }
}

fn list_sources(root: &Path) -> Result<Vec<PathBuf>> {
    PostList::new(root).retrieve_all()
        .with_context(|| format!("Could not read posts directory {}", root.display()))
}

/// Loads every post under `root`, one file after the other.
pub fn load_all(root: &Path, options: &LoadOptions) -> Result<LoadOutcome> {
    let files: Vec<FileOutcome> = list_sources(root)?
        .iter()
        .map(|path| load_file(path, options))
        .collect();

    let outcome = LoadOutcome { files, cancelled: false };
    info!("Loaded {} posts from {} files", outcome.posts().count(), outcome.files.len());
    Ok(outcome)
}

/// Loads every post under `root` on up to `jobs` blocking workers.
///
/// Results are merged in discovery order, so the outcome matches
/// [`load_all`]. Once `cancel` is tripped no further file is dispatched and
/// whatever already finished is returned.
pub async fn load_all_concurrent(root: &Path, options: Arc<LoadOptions>, jobs: usize, cancel: Cancellation) -> Result<LoadOutcome> {
    let sources = list_sources(root)?;
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();
    let mut cancelled = false;

    for (index, path) in sources.into_iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let permit = semaphore.clone().acquire_owned().await
            .context("Loader worker pool closed")?;

        // The wait for a permit may have outlived a cancellation
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        let options = options.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            (index, load_file(&path, &options))
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined.context("Loader worker failed")?);
    }
    results.sort_by_key(|(index, _)| *index);

    if cancelled {
        warn!("Load cancelled after {} files", results.len());
    }

    let outcome = LoadOutcome {
        files: results.into_iter().map(|(_, file)| file).collect(),
        cancelled,
    };
    info!("Loaded {} posts from {} files", outcome.posts().count(), outcome.files.len());
    Ok(outcome)
}
