//! Command-line configuration (`config.toml`) and default file locations.

use directories::ProjectDirs;
use serde::Deserialize;
use sheetlisp_engine::engine::{EvalOptions, MAX_EVAL_DEPTH, ParserOptions};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library files evaluated into the shared environment at startup.
    pub prelude: Vec<PathBuf>,
    /// Default tracing filter, e.g. "info" or "sheetlisp_core=debug".
    pub log_level: Option<String>,
    pub extra_quote: Option<QuoteConfig>,
    pub max_depth: Option<usize>,
}

/// An additional quote character, e.g. `{ char = "~", name = "seq" }`.
#[derive(Debug, Deserialize)]
pub struct QuoteConfig {
    pub char: String,
    pub name: String,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "sheetlisp", "sheetlisp")
}

pub fn default_config_path() -> Option<PathBuf> {
    let proj = project_dirs()?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

pub fn default_prelude_path() -> Option<PathBuf> {
    let proj = project_dirs()?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("default.lisp");
    Some(path)
}

impl Config {
    pub fn from_toml(content: &str, path: &Path) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })?;
        config.parser_options()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// The user's config file if it exists, otherwise defaults.
    pub fn load_default() -> Result<Config, ConfigError> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn parser_options(&self) -> Result<ParserOptions, ConfigError> {
        let Some(quote) = &self.extra_quote else {
            return Ok(ParserOptions::default());
        };
        let mut chars = quote.char.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(ParserOptions::with_quote(c, quote.name.clone())),
            _ => Err(ConfigError::QuoteChar(quote.char.clone())),
        }
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            max_depth: self.max_depth.unwrap_or(MAX_EVAL_DEPTH),
        }
    }

    /// Library files to load: the default prelude (if present and wanted)
    /// followed by the configured ones.
    pub fn prelude_files(&self, include_default: bool) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if include_default
            && let Some(path) = default_prelude_path()
            && path.is_file()
        {
            files.push(path);
        }
        files.extend(self.prelude.iter().cloned());
        files
    }
}
