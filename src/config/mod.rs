use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::catalog::Catalog;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "Blogdeck";
const APP_NAME: &str = "blogdeck";

pub const CONFIG_ENV: &str = "BLOGDECK_CONFIG";
pub const DATA_ENV: &str = "BLOGDECK_DATA";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let database_path = data_dir.join("comments.db");

        Ok(Self {
            config_dir,
            config_file,
            data_dir,
            database_path,
        })
    }

    /// Lays every path out under one directory.
    pub fn rooted(root: &Path) -> Self {
        let config_dir = root.join("config");
        let data_dir = root.join("data");
        Self {
            config_file: config_dir.join("config.toml"),
            database_path: data_dir.join("comments.db"),
            config_dir,
            data_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub page: PageOptions,
    pub notifications: NotificationOptions,
    pub storage: StorageOptions,
    pub catalog: CatalogOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page: PageOptions::default(),
            notifications: NotificationOptions::default(),
            storage: StorageOptions::default(),
            catalog: CatalogOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        if let Some(path) = self.catalog.path.as_mut() {
            if path.is_relative() {
                *path = paths.config_dir.join(&*path);
            }
        }
        if self.notifications.lifetime.is_zero() {
            tracing::warn!("notification lifetime of 0ms in config, using the default");
            self.notifications.lifetime = NotificationOptions::default().lifetime;
        }
        Ok(())
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog.path {
            Some(path) => Catalog::load(path)
                .with_context(|| format!("loading catalog override {}", path.display())),
            None => Ok(Catalog::builtin()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    /// Address shared by the social links.
    pub url: String,
    pub title: String,
    /// Viewport width (px) above which the mobile menu is closed on resize.
    pub mobile_breakpoint: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            url: "https://example.com/blog/".into(),
            title: "My Blog".into(),
            mobile_breakpoint: 768,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationOptions {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "lifetime_ms")]
    pub lifetime: Duration,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Sqlite
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    pub backend: StorageBackend,
    pub wal_autocheckpoint: u32,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            wal_autocheckpoint: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// TOML file with a `[[posts]]` array replacing the built-in posts.
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(ConfigPaths::rooted(temp.path()));
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.notifications.lifetime, Duration::from_secs(3));
        assert_eq!(cfg.page.mobile_breakpoint, 768);

        let reloaded = loader.load()?;
        assert_eq!(reloaded.storage.backend, StorageBackend::Sqlite);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_and_resolves_catalog_path() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[notifications]\nlifetime_ms = 1500\n\n[catalog]\npath = \"posts.toml\"\n",
        )?;
        let cfg = ConfigLoader::with_paths(paths.clone()).load()?;
        assert_eq!(cfg.notifications.lifetime, Duration::from_millis(1500));
        assert_eq!(cfg.page.title, "My Blog");
        assert_eq!(cfg.catalog.path, Some(paths.config_dir.join("posts.toml")));
        Ok(())
    }
}
