use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use contentcheck::config::{read_config, Config};

use crate::CFG_FILE_NAME;

fn get_config_path() -> Option<PathBuf> {
    let exe_dir = env::current_exe().ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()));
    let cur_dir = env::current_dir().ok();
    let cfg_dir = dirs::config_dir().map(|dir| dir.join("contentcheck"));

    [exe_dir, cur_dir, cfg_dir].into_iter()
        .flatten()
        .map(|dir| dir.join(CFG_FILE_NAME))
        .find(|path| path.exists())
}

/// Reads the explicit config file, or the first one found next to the
/// executable, in the current directory or in the user config directory.
/// Running without any config file is fine.
pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    let config_path = match cfg_path.or_else(get_config_path) {
        None => return Ok((Config::default(), None)),
        Some(path) => path,
    };

    let mut config = read_config(&config_path)
        .with_context(|| format!("Could not load configuration {}", config_path.display()))?;

    if let Some(ref mut log) = config.log {
        if log.location.is_none() && !log.log_to_console {
            log.location = dirs::cache_dir()
                .map(|dir| dir.join("contentcheck").join("log").join("contentcheck.log"));
        }
    }

    Ok((config, Some(config_path)))
}
