use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, Map};
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "clin_extract";
const ENV_PREFIX: &str = "CLIN";

/// Run settings. Built once in `main` and passed down explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory scanned for contract files.
    pub input_dir: PathBuf,
    /// Aggregated CSV destination.
    pub output: PathBuf,
    pub debug: bool,
    pub debug_log: PathBuf,
    /// File extensions to pick up, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Worker threads; 0 lets rayon decide.
    pub jobs: usize,
}

/// Values given on the command line; each one beats the config file and env.
#[derive(Debug, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub debug: bool,
    pub debug_log: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub jobs: Option<usize>,
}

impl Settings {
    /// Defaults, then `clin_extract.toml` (or `file`), then `CLIN_*` env vars.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_from(file, None)
    }

    /// `env` replaces the process environment when given.
    fn load_from(file: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        Config::builder()
            .set_default("input_dir", "Contracts")?
            .set_default("output", "output.csv")?
            .set_default("debug", false)?
            .set_default("debug_log", "debug_log.txt")?
            .set_default("extensions", vec!["pdf"])?
            .set_default("jobs", 0)?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extensions")
                    .source(env),
            )
            .build()
            .context("loading settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    pub fn apply(mut self, o: Overrides) -> Self {
        if let Some(dir) = o.input_dir {
            self.input_dir = dir;
        }
        if let Some(output) = o.output {
            self.output = output;
        }
        if let Some(log) = o.debug_log {
            self.debug_log = log;
            self.debug = true;
        }
        if o.debug {
            self.debug = true;
        }
        if !o.extensions.is_empty() {
            self.extensions = o.extensions;
        }
        if let Some(jobs) = o.jobs {
            self.jobs = jobs;
        }
        self
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}
