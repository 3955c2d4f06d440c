use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

pub const DEFAULT_SEPARATOR: &str = r"<\|RELATED_DOC_SEP[^|>]*\|>";
pub const DEFAULT_POSTS_DIR: &str = "content/posts";

#[derive(Deserialize, Default)]
pub struct Paths {
    pub posts_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
pub struct Separator {
    #[serde(default = "default_separator")]
    pub pattern: String,
}

impl Default for Separator {
    fn default() -> Self {
        Separator { pattern: default_separator() }
    }
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

/// Front matter keys accepted on top of the built-in schema.
/// They are kept as unknown fields but never reported.
#[derive(Deserialize, Default)]
pub struct Schema {
    #[serde(default)]
    pub extra_fields: Vec<String>,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Default)]
pub struct Run {
    pub jobs: Option<usize>,
}

#[derive(Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub separator: Separator,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub run: Run,
    pub log: Option<Log>,
}

fn parse_path(path: PathBuf) -> PathBuf {
    if !path.starts_with("${exe_dir}") {
        return path;
    }

    let exe_dir = env::current_exe().ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    match (exe_dir, path.to_str()) {
        (Some(exe_dir), Some(str_path)) => {
            PathBuf::from(str_path.replace("${exe_dir}", &exe_dir.to_string_lossy()))
        }
        _ => path,
    }
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.paths.posts_dir = cfg.paths.posts_dir.map(parse_path);
    if let Some(ref mut log) = cfg.log {
        log.location = log.location.take().map(parse_path);
    }

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}
