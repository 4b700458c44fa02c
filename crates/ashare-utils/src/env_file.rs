//! `KEY=VALUE` env file handling
//!
//! The analyst keeps its API key in `config/.env`. Values are read with
//! `dotenvy` but never exported into the process environment; lookups check
//! the real environment first and fall back to the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while reading or writing an env file
#[derive(Error, Debug)]
pub enum EnvFileError {
    #[error("Failed to parse env file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Failed to write env file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An env file on disk together with the values it held when loaded
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    vars: HashMap<String, String>,
}

impl EnvFile {
    /// Load the file at `path`; a missing file yields an empty set of values
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, EnvFileError> {
        let path = path.into();
        let mut vars = HashMap::new();

        if path.exists() {
            let iter = dotenvy::from_path_iter(&path).map_err(|source| EnvFileError::Parse {
                path: path.clone(),
                source,
            })?;
            for item in iter {
                let (key, value) = item.map_err(|source| EnvFileError::Parse {
                    path: path.clone(),
                    source,
                })?;
                vars.insert(key, value);
            }
            debug!(path = %path.display(), count = vars.len(), "Loaded env file");
        } else {
            debug!(path = %path.display(), "Env file not found, starting empty");
        }

        Ok(Self { path, vars })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value from the process environment, else from the file
    pub fn get(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| self.get_from_file(key).map(str::to_string))
    }

    /// Value as written in the file, ignoring the process environment
    pub fn get_from_file(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set `key` to `value` in the file, keeping every other line intact
    ///
    /// An existing assignment is replaced in place; otherwise the assignment
    /// is appended. Parent directories are created when needed.
    pub fn upsert(&mut self, key: &str, value: &str) -> Result<(), EnvFileError> {
        let write_err = |source| EnvFileError::Write {
            path: self.path.clone(),
            source,
        };

        let existing = if self.path.exists() {
            fs::read_to_string(&self.path).map_err(write_err)?
        } else {
            String::new()
        };

        let assignment = format!("{key}={value}");
        let mut replaced = false;
        let mut lines: Vec<String> = existing
            .lines()
            .map(|line| {
                if !replaced && assigns(line, key) {
                    replaced = true;
                    assignment.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();
        if !replaced {
            lines.push(assignment);
        }

        let mut content = lines.join("\n");
        content.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&self.path, content).map_err(write_err)?;

        self.vars.insert(key.to_string(), value.to_string());
        info!(path = %self.path.display(), key = key, "Saved value to env file");
        Ok(())
    }
}

/// Whether `line` assigns `key`, allowing an `export` prefix
fn assigns(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed).trim_start();
    trimmed
        .strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}
