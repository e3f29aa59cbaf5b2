use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub tmdb: TmdbConfig,

    pub guardian: GuardianConfig,

    pub claude: ClaudeConfig,

    pub recommendations: RecommendationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// User id assumed by the CLI when none is given explicitly.
    pub default_user: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/watchnext.db".to_string(),
            log_level: "info".to_string(),
            suppress_connection_errors: false,
            default_user: "local".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// Overridable via the `WATCHNEXT_TMDB_API_KEY` environment variable.
    pub api_key: String,

    pub base_url: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardianConfig {
    /// The content API accepts the literal key "test" for low-volume use.
    /// Overridable via the `WATCHNEXT_GUARDIAN_API_KEY` environment variable.
    pub api_key: String,

    pub base_url: String,
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            api_key: "test".to_string(),
            base_url: "https://content.guardianapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeConfig {
    /// Overridable via the `WATCHNEXT_ANTHROPIC_API_KEY` environment variable.
    pub api_key: String,

    pub base_url: String,

    pub model: String,

    pub max_tokens: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            max_tokens: 2048,
        }
    }
}

/// Every threshold of the recommendation pipeline in one place, so the strict
/// quality-gated behavior is configuration rather than a parallel code path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationsConfig {
    /// Recently watched 4-5 star titles used as similarity seeds.
    pub seed_titles: usize,

    /// Similar titles taken per seed.
    pub similar_per_seed: usize,

    /// Discovery pages fetched per run.
    pub discover_pages: u32,

    /// Discovery only considers releases within this many years.
    pub discovery_window_years: i32,

    /// Candidates below this catalog rating are dropped before enrichment.
    pub min_popularity: f64,

    /// Candidates below this vote count are dropped before enrichment.
    pub min_vote_count: u32,

    /// Upper bound on candidates entering the enrichment stage.
    pub max_enrichment_pool: usize,

    /// Films need a review rating at or above this to pass the quality gate.
    pub min_review_rating: i32,

    /// Series need a catalog rating at or above this to pass the quality gate.
    pub min_series_popularity: f64,

    /// Releases within this many years earn a recency score bonus.
    pub recency_window_years: i32,

    /// Candidates handed to the ranking model after heuristic scoring.
    pub max_ranked_candidates: usize,

    pub prompt_history_items: usize,

    pub prompt_watchlist_items: usize,

    pub prompt_dismissed_items: usize,

    /// Recommendations returned when the caller does not pass a limit.
    pub default_limit: usize,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            seed_titles: 3,
            similar_per_seed: 5,
            discover_pages: 3,
            discovery_window_years: 5,
            min_popularity: 6.5,
            min_vote_count: 50,
            max_enrichment_pool: 100,
            min_review_rating: 4,
            min_series_popularity: 7.5,
            recency_window_years: 3,
            max_ranked_candidates: 40,
            prompt_history_items: 15,
            prompt_watchlist_items: 10,
            prompt_dismissed_items: 10,
            default_limit: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            tmdb: TmdbConfig::default(),
            guardian: GuardianConfig::default(),
            claude: ClaudeConfig::default(),
            recommendations: RecommendationsConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("watchnext").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".watchnext").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("WATCHNEXT_TMDB_API_KEY")
            && !key.is_empty()
        {
            self.tmdb.api_key = key;
        }

        if let Ok(key) = std::env::var("WATCHNEXT_GUARDIAN_API_KEY")
            && !key.is_empty()
        {
            self.guardian.api_key = key;
        }

        if let Ok(key) = std::env::var("WATCHNEXT_ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            self.claude.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let rec = &self.recommendations;

        if rec.discover_pages == 0 {
            anyhow::bail!("Discovery page count must be > 0");
        }

        if !(1..=5).contains(&rec.min_review_rating) {
            anyhow::bail!("Minimum review rating must be between 1 and 5");
        }

        if !(0.0..=10.0).contains(&rec.min_popularity)
            || !(0.0..=10.0).contains(&rec.min_series_popularity)
        {
            anyhow::bail!("Popularity thresholds must be between 0 and 10");
        }

        if rec.max_ranked_candidates == 0 || rec.default_limit == 0 {
            anyhow::bail!("Candidate and result limits must be > 0");
        }

        if self.claude.max_tokens == 0 {
            anyhow::bail!("Claude max_tokens must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.recommendations.seed_titles, 3);
        assert_eq!(config.recommendations.min_review_rating, 4);
        assert!((config.recommendations.min_series_popularity - 7.5).abs() < f64::EPSILON);
        assert_eq!(config.claude.model, "claude-3-haiku-20240307");
        assert_eq!(config.guardian.api_key, "test");
        config.validate().unwrap();
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[tmdb]"));
        assert!(toml_str.contains("[recommendations]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [recommendations]
            default_limit = 10
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.recommendations.default_limit, 10);

        assert_eq!(config.tmdb.base_url, "https://api.themoviedb.org/3");
    }

    #[test]
    fn test_validate_rejects_out_of_range_gate() {
        let mut config = Config::default();
        config.recommendations.min_review_rating = 7;
        assert!(config.validate().is_err());
    }
}
