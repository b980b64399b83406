use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use taskdeck_core::{CategoryFilter, SortKey, StatusFilter, ViewOptions};

use crate::state::ensure_taskdeck_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub view: ViewSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    /// Project URL, e.g. https://abcd.supabase.co
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            table: default_table(),
        }
    }
}

fn default_table() -> String {
    "todos".to_string()
}

/// Default selectors for `list` and the TUI filter bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSection {
    pub status: String,
    pub category: String,
    pub sort: String,
}

impl Default for ViewSection {
    fn default() -> Self {
        Self {
            status: "all".to_string(),
            category: "all".to_string(),
            sort: "date".to_string(),
        }
    }
}

impl Config {
    /// Apply `TASKDECK_URL` / `TASKDECK_ANON_KEY` on top of the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("TASKDECK_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("TASKDECK_ANON_KEY") {
            self.backend.anon_key = key;
        }
        self
    }

    pub fn require_backend(&self) -> Result<&BackendSection> {
        if self.backend.url.trim().is_empty() || self.backend.anon_key.trim().is_empty() {
            bail!(
                "backend is not configured.\n\
Run: taskdeck config init, then set [backend] url and anon_key in {}\n\
(or export TASKDECK_URL and TASKDECK_ANON_KEY)",
                config_path()?.display()
            );
        }
        Ok(&self.backend)
    }

    pub fn view_options(&self) -> Result<ViewOptions> {
        Ok(ViewOptions {
            status: self.view.status.parse::<StatusFilter>().context("config view.status")?,
            category: self.view.category.parse::<CategoryFilter>().context("config view.category")?,
            sort: self.view.sort.parse::<SortKey>().context("config view.sort")?,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_taskdeck_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default().with_env_overrides());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    let cfg: Config = toml::from_str(&s).context("parse config.toml")?;
    Ok(cfg.with_env_overrides())
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::Category;

    #[test]
    fn parses_partial_file_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[backend]
url = "https://demo.supabase.co"
anon_key = "anon"

[view]
status = "pending"
category = "work"
sort = "priority"
"#,
        )
        .unwrap();
        assert_eq!(cfg.backend.table, "todos");
        let v = cfg.view_options().unwrap();
        assert_eq!(v.status, StatusFilter::Pending);
        assert_eq!(v.category, CategoryFilter::Only(Category::Work));
        assert_eq!(v.sort, SortKey::Priority);
    }

    #[test]
    fn empty_file_is_default() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.view_options().unwrap(), ViewOptions::default());
        assert!(cfg.backend.url.is_empty());
    }

    #[test]
    fn bad_selector_is_reported() {
        let mut cfg = Config::default();
        cfg.view.sort = "soonest".to_string();
        assert!(cfg.view_options().is_err());
    }
}
