use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.5 Safari/605.1.15";

/// Run settings. Layered: defaults, `verbes.toml`, `VERBES_*` env vars, CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub infinitives_file: PathBuf,
    pub database: PathBuf,
    pub base_url: String,
    pub user_agent: String,
    pub jsession_id: Option<String>,
    pub max_retry: u32,
    /// Milliseconds between requests.
    pub requests_delay: u64,
    pub max_threads: usize,
    pub ignore_cache: bool,
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub user_agent: Option<String>,
    pub jsession_id: Option<String>,
    pub max_retry: Option<u32>,
    pub requests_delay: Option<u64>,
    pub max_threads: Option<usize>,
    pub ignore_cache: bool,
}

impl Settings {
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("verbes.toml"), overrides)
    }

    pub fn load_from(file: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("output_dir", "./output")?
            .set_default("cache_dir", "./output/cache")?
            .set_default("infinitives_file", "./infinitives.txt")?
            .set_default("database", "./output/verbs.db")?
            .set_default("base_url", "https://dictionnaire-academie.fr/")?
            .set_default("user_agent", DEFAULT_USER_AGENT)?
            .set_default("max_retry", 5)?
            .set_default("requests_delay", 500)?
            .set_default("max_threads", 4)?
            .set_default("ignore_cache", false)?
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix("VERBES").try_parsing(true))
            .set_override_option("user_agent", overrides.user_agent.clone())?
            .set_override_option("jsession_id", overrides.jsession_id.clone())?
            .set_override_option("max_retry", overrides.max_retry.map(u64::from))?
            .set_override_option("requests_delay", overrides.requests_delay)?
            .set_override_option("max_threads", overrides.max_threads.map(|n| n as u64))?;
        let builder = if overrides.ignore_cache {
            builder.set_override("ignore_cache", true)?
        } else {
            builder
        };

        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.max_threads < 1 {
            return Err(ConfigError::Message("max_threads must be at least 1".into()));
        }
        Ok(settings)
    }

    pub fn verbs_json(&self) -> PathBuf {
        self.output_dir.join("verbs.json")
    }

    pub fn verbs_min_json(&self) -> PathBuf {
        self.output_dir.join("verbs.min.json")
    }

    pub fn legacy_tsv(&self) -> PathBuf {
        self.output_dir.join("verbs.legacy.tsv")
    }

    pub fn report(&self) -> PathBuf {
        self.output_dir.join("report.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load_from(&dir.path().join("missing.toml"), &Overrides::default()).unwrap();
        assert_eq!(s.cache_dir, PathBuf::from("./output/cache"));
        assert_eq!(s.database, PathBuf::from("./output/verbs.db"));
        assert_eq!(s.max_retry, 5);
        assert_eq!(s.requests_delay, 500);
        assert!(s.jsession_id.is_none());
        assert_eq!(s.verbs_json(), PathBuf::from("./output/verbs.json"));
    }

    #[test]
    fn file_then_cli_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verbes.toml");
        std::fs::write(&path, "max_retry = 2\nmax_threads = 8\noutput_dir = \"/tmp/out\"\n").unwrap();

        let overrides = Overrides {
            max_threads: Some(3),
            ignore_cache: true,
            ..Overrides::default()
        };
        let s = Settings::load_from(&path, &overrides).unwrap();
        assert_eq!(s.max_retry, 2);
        assert_eq!(s.max_threads, 3);
        assert!(s.ignore_cache);
        assert_eq!(s.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn zero_threads_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            max_threads: Some(0),
            ..Overrides::default()
        };
        assert!(Settings::load_from(&dir.path().join("none.toml"), &overrides).is_err());
    }
}
