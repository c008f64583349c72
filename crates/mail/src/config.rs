//! Configuration loading for the inbox
//!
//! Settings are resolved in order of priority:
//! 1. Environment variables (`UNIBOX_API_URL`, `UNIBOX_PAGE_SIZE`)
//! 2. JSON file (~/.config/unibox/unibox.json)
//! 3. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings filename in the Unibox config directory
const SETTINGS_FILE: &str = "unibox.json";

/// Tunables for the backend connection and the inbox coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxSettings {
    /// Backend root URL
    pub api_url: String,
    /// Messages per inbox page
    pub page_size: usize,
    /// Quiescence window before a typed query is searched
    pub search_debounce_ms: u64,
    /// Queries shorter than this (in characters, after trimming) never search
    pub min_query_len: usize,
    /// Messages requested per server page during a search pass
    pub search_page_size: usize,
    /// Server pages fetched per search pass at most
    pub search_max_pages: usize,
    /// Stop paging once this many messages are aggregated
    pub search_max_items: usize,
}

impl Default for InboxSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            page_size: 10,
            search_debounce_ms: 500,
            min_query_len: 2,
            search_page_size: 100,
            search_max_pages: 2,
            search_max_items: 150,
        }
    }
}

impl InboxSettings {
    /// Load settings using the following priority:
    /// 1. Runtime environment variables
    /// 2. JSON file (~/.config/unibox/unibox.json)
    /// 3. Defaults
    pub fn load() -> Result<Self> {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };

        settings.with_env_overrides()
    }

    /// Load settings from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Self = config::load_json_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Apply `UNIBOX_API_URL` and `UNIBOX_PAGE_SIZE` if set
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(
            std::env::var("UNIBOX_API_URL").ok(),
            std::env::var("UNIBOX_PAGE_SIZE").ok(),
        )
    }

    fn with_overrides(mut self, api_url: Option<String>, page_size: Option<String>) -> Result<Self> {
        if let Some(url) = api_url.filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
        if let Some(size) = page_size {
            self.page_size = size
                .trim()
                .parse()
                .with_context(|| format!("UNIBOX_PAGE_SIZE is not a number: {:?}", size))?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.page_size > 0, "page_size must be at least 1");
        anyhow::ensure!(self.search_page_size > 0, "search_page_size must be at least 1");
        anyhow::ensure!(self.search_max_pages > 0, "search_max_pages must be at least 1");
        Ok(())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Get the default settings file path (~/.config/unibox/unibox.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }
}
