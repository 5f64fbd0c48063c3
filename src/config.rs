use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;
use crate::query::SubjectCategories;

pub const DEFAULT_CONFIG_FILE: &str = "plant-harvest.json";
pub const DEFAULT_OUTPUT_ROOT: &str = "Plant_Disease_Images";
pub const DEFAULT_LEDGER_FILE: &str = "image_sources.csv";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
    #[serde(default)]
    pub images_per_category: Option<u64>,
    #[serde(default)]
    pub output_root: Option<String>,
    #[serde(default)]
    pub ledger_path: Option<String>,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SubjectEntry {
    Shorthand(String),
    Detailed(SubjectEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubjectEntryObject {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
    pub qualifier: String,
    pub include_subject: bool,
    pub thumbnail_selector: String,
    pub full_image_selector: String,
    pub settle_ms: u64,
    pub scroll_pause_ms: u64,
    pub max_idle_passes: u32,
    pub max_scroll_passes: u32,
    pub max_session_secs: u64,
    pub action_timeout_secs: u64,
    pub headless: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://www.google.com/search".to_string(),
            params: BTreeMap::from([("tbm".to_string(), "isch".to_string())]),
            qualifier: "plante".to_string(),
            include_subject: false,
            thumbnail_selector: "img.Q4LuWd".to_string(),
            full_image_selector: "img.n3VNCb".to_string(),
            settle_ms: 1_000,
            scroll_pause_ms: 2_000,
            max_idle_passes: 3,
            max_scroll_passes: 50,
            max_session_secs: 600,
            action_timeout_secs: 30,
            headless: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    /// Fixed pause between image downloads; 0 disables it.
    pub delay_between_ms: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            delay_between_ms: 0,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub endpoint: Url,
    pub params: Vec<(String, String)>,
    pub qualifier: String,
    pub include_subject: bool,
    pub thumbnail_selector: String,
    pub full_image_selector: String,
    pub settle: Duration,
    pub scroll_pause: Duration,
    pub max_idle_passes: u32,
    pub max_scroll_passes: u32,
    pub max_session: Duration,
    pub action_timeout: Duration,
    pub headless: bool,
}

impl SearchOptions {
    pub fn search_url(&self, text: &str) -> String {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.params {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("q", text);
        }
        url.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub delay_between: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        resolve_fetch(FetchSettings::default())
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub subjects: Vec<SubjectCategories>,
    pub images_per_category: u64,
    pub output_root: Utf8PathBuf,
    pub ledger_path: Utf8PathBuf,
    pub search: SearchOptions,
    pub fetch: FetchOptions,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads an explicit path, or `plant-harvest.json` when present.
    pub fn load(path: Option<&str>) -> Result<Config, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(HarvestError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| HarvestError::ConfigParse(err.to_string()))
    }

    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        Self::resolve_config(Self::load(path)?)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HarvestError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let subjects = config
            .subjects
            .into_iter()
            .map(|entry| match entry {
                SubjectEntry::Shorthand(value) => SubjectCategories::parse_shorthand(&value),
                SubjectEntry::Detailed(obj) => {
                    if obj.name.trim().is_empty() {
                        return Err(HarvestError::InvalidSubject(obj.name));
                    }
                    Ok(SubjectCategories::new(obj.name, obj.categories))
                }
            })
            .collect::<Result<Vec<_>, HarvestError>>()?;

        let images_per_category = config.images_per_category.unwrap_or(10);
        if images_per_category == 0 {
            return Err(HarvestError::InvalidTargetCount(images_per_category));
        }

        Ok(ResolvedConfig {
            schema_version,
            subjects,
            images_per_category,
            output_root: Utf8PathBuf::from(
                config
                    .output_root
                    .unwrap_or_else(|| DEFAULT_OUTPUT_ROOT.to_string()),
            ),
            ledger_path: Utf8PathBuf::from(
                config
                    .ledger_path
                    .unwrap_or_else(|| DEFAULT_LEDGER_FILE.to_string()),
            ),
            search: resolve_search(config.search)?,
            fetch: resolve_fetch(config.fetch),
        })
    }
}

fn resolve_search(settings: SearchSettings) -> Result<SearchOptions, HarvestError> {
    let endpoint = Url::parse(&settings.endpoint)
        .map_err(|err| HarvestError::InvalidEndpoint(format!("{}: {err}", settings.endpoint)))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(HarvestError::InvalidEndpoint(settings.endpoint));
    }
    Ok(SearchOptions {
        endpoint,
        params: settings.params.into_iter().collect(),
        qualifier: settings.qualifier,
        include_subject: settings.include_subject,
        thumbnail_selector: settings.thumbnail_selector,
        full_image_selector: settings.full_image_selector,
        settle: Duration::from_millis(settings.settle_ms),
        scroll_pause: Duration::from_millis(settings.scroll_pause_ms),
        max_idle_passes: settings.max_idle_passes.max(1),
        max_scroll_passes: settings.max_scroll_passes.max(1),
        max_session: Duration::from_secs(settings.max_session_secs),
        action_timeout: Duration::from_secs(settings.action_timeout_secs.max(1)),
        headless: settings.headless,
    })
}

fn resolve_fetch(settings: FetchSettings) -> FetchOptions {
    FetchOptions {
        timeout: Duration::from_secs(settings.timeout_secs.max(1)),
        delay_between: Duration::from_millis(settings.delay_between_ms),
        user_agent: settings
            .user_agent
            .unwrap_or_else(|| format!("plant-harvest/{}", env!("CARGO_PKG_VERSION"))),
    }
}
