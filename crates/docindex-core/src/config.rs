//! Layered configuration and path helpers.
//!
//! Figment merges built-in defaults, `config.toml`, `config.<env>.toml` and
//! `APP_*` env vars (nested keys split on `__`). `~` and `${VAR}` in paths
//! are expanded, relative paths resolve against a base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedderKind {
    Hash,
    BgeM3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    pub dir: String,
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderSettings {
    pub kind: EmbedderKind,
    pub dim: usize,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub index: IndexSettings,
    pub embedder: EmbedderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index: IndexSettings { dir: "index".to_string(), top_k: 3 },
            embedder: EmbedderSettings {
                kind: EmbedderKind::Hash,
                dim: 1024,
                model_dir: None,
                max_len: 256,
                batch_size: 32,
            },
        }
    }
}

impl Settings {
    /// Index root with `~`/`${VAR}` expanded, relative to `base`.
    pub fn index_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.index.dir)
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.index.top_k == 0 {
            return Err(Error::InvalidConfig("index.top_k must be at least 1".to_string()));
        }
        if settings.embedder.dim == 0 {
            return Err(Error::InvalidConfig("embedder.dim must be at least 1".to_string()));
        }
        if settings.embedder.batch_size == 0 {
            return Err(Error::InvalidConfig("embedder.batch_size must be at least 1".to_string()));
        }
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_files() {
        Jail::expect_with(|_jail| {
            let settings = Config::load_for_env("dev").expect("load").settings().expect("settings");
            assert_eq!(settings.index.top_k, 3);
            assert_eq!(settings.embedder.kind, EmbedderKind::Hash);
            assert_eq!(settings.embedder.dim, 1024);
            Ok(())
        });
    }

    #[test]
    fn env_file_overrides_base_and_env_vars_override_files() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[index]\ndir = \"base\"\ntop_k = 5\n")?;
            jail.create_file("config.prod.toml", "[index]\ndir = \"prod\"\n")?;
            jail.set_env("APP_EMBEDDER__KIND", "bge-m3");

            let config = Config::load_for_env("prod").expect("load");
            let settings = config.settings().expect("settings");
            assert_eq!(settings.index.dir, "prod");
            assert_eq!(settings.index.top_k, 5);
            assert_eq!(settings.embedder.kind, EmbedderKind::BgeM3);
            assert_eq!(config.get::<usize>("embedder.max_len").expect("max_len"), 256);
            Ok(())
        });
    }

    #[test]
    fn zero_top_k_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[index]\ntop_k = 0\n")?;
            assert!(matches!(Config::load_for_env("dev"), Err(Error::InvalidConfig(_))));
            Ok(())
        });
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/docindex");
        assert_eq!(resolve_with_base(base, "index"), PathBuf::from("/srv/docindex/index"));
        assert_eq!(resolve_with_base(base, "/abs/index"), PathBuf::from("/abs/index"));
    }
}
