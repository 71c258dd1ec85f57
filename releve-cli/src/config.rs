use anyhow::{Context, Result, bail};
use releve_finance::{Granularity, GroupingPreset, PresetCatalog, RuleStore, load_vendor_rules};
use releve_ingest::IngestConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::state::{ensure_parent, read_text, resolve_config_path};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub rules: RulesSection,
    pub report: ReportSection,
    /// Extra presets, appended to (or replacing) the built-ins by name
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<GroupingPreset>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Vendor rule CSV. Relative paths are resolved against the config file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub preset: String,
    /// 0 keeps every month
    pub months: u32,
    pub granularity: Granularity,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            preset: "default".to_string(),
            months: 12,
            granularity: Granularity::Monthly,
        }
    }
}

/// A config plus where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    pub exists: bool,
}

impl LoadedConfig {
    pub fn vendor_csv(&self) -> Option<PathBuf> {
        let csv = self.config.rules.vendor_csv.as_ref()?;
        if csv.is_absolute() {
            return Some(csv.clone());
        }
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(csv))
    }

    pub fn rule_store(&self) -> Result<RuleStore> {
        match self.vendor_csv() {
            Some(path) => {
                let vendor = load_vendor_rules(&path)?;
                info!(path = %path.display(), rules = vendor.len(), "loaded vendor rules");
                Ok(RuleStore::with_vendor_rules(vendor))
            }
            None => Ok(RuleStore::default()),
        }
    }

    pub fn presets(&self) -> PresetCatalog {
        PresetCatalog::builtin().with_presets(self.config.presets.iter().cloned())
    }
}

pub fn parse_config(text: &str) -> Result<Config> {
    toml::from_str(text).context("parse config.toml")
}

/// Missing default files yield defaults; a missing file the user named is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let (path, named) = resolve_config_path(explicit)?;
    if !path.exists() {
        if named {
            bail!("config not found: {}", path.display());
        }
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(LoadedConfig {
            config: Config::default(),
            path,
            exists: false,
        });
    }
    let text = read_text(&path)?;
    let config = parse_config(&text).with_context(|| format!("in {}", path.display()))?;
    debug!(path = %path.display(), "loaded config");
    Ok(LoadedConfig {
        config,
        path,
        exists: true,
    })
}

pub fn render_config(cfg: &Config) -> Result<String> {
    toml::to_string_pretty(cfg).context("serialize config")
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, render_config(cfg)?).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(explicit: Option<&Path>) -> Result<()> {
    let (path, _) = resolve_config_path(explicit)?;
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(&path, &Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn show_config(explicit: Option<&Path>) -> Result<()> {
    let loaded = load_config(explicit)?;
    if loaded.exists {
        println!("# {}", loaded.path.display());
    } else {
        println!("# {} (not found, showing defaults)", loaded.path.display());
    }
    print!("{}", render_config(&loaded.config)?);
    Ok(())
}
