//! Layered configuration for shoebox.
//!
//! Values are merged (lowest to highest priority) from built-in defaults, the
//! platform configuration file, an optional explicit file and finally
//! `SHOEBOX_`-prefixed environment variables. Nested keys use a double
//! underscore in the environment, e.g. `SHOEBOX_TOOLS__EXIFTOOL`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "SHOEBOX_";
const CONFIG_FILE_NAME: &str = "shoebox.toml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the output directory created directly under the source root.
    pub result_dir: String,
    /// Append-only diagnostics log. Must live outside the result tree.
    pub error_log: PathBuf,
    pub tools: ToolsConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            result_dir: "result".to_string(),
            error_log: PathBuf::from("logs").join("error.log"),
            tools: ToolsConfig::default(),
        }
    }
}

/// Locations of, and time limits for, the external binaries.
///
/// Any binary left as `None` is searched for on `PATH` when first needed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub exiftool: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub magick: Option<PathBuf>,
    pub probe_timeout_secs: u64,
    pub convert_timeout_secs: u64,
    pub rewrite_timeout_secs: u64,
}
impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            exiftool: None,
            ffmpeg: None,
            ffprobe: None,
            magick: None,
            probe_timeout_secs: 10,
            convert_timeout_secs: 30,
            rewrite_timeout_secs: 60,
        }
    }
}
impl ToolsConfig {
    /// Time limit for reading metadata (ExifTool/ffprobe).
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Time limit for an image conversion.
    pub fn convert_timeout(&self) -> Duration {
        Duration::from_secs(self.convert_timeout_secs)
    }

    /// Time limit for rewriting a file's metadata (ExifTool write, ffmpeg remux).
    pub fn rewrite_timeout(&self) -> Duration {
        Duration::from_secs(self.rewrite_timeout_secs)
    }
}

impl Config {
    /// Loads the configuration from every layer, with `explicit` (if any)
    /// taking priority over the platform configuration file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let platform = ProjectDirs::from("", "", "shoebox").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME));
        if let Some(path) = &platform {
            tracing::debug!(path = %path.display(), "Looking for platform configuration file");
        }
        Self::load_from(platform.as_deref(), explicit)
    }

    fn load_from(platform: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = platform
            && path.is_file()
        {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        let config: Config =
            figment.merge(Env::prefixed(ENV_PREFIX).split("__")).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make a run misbehave rather than fail.
    pub fn validate(&self) -> Result<()> {
        let mut components = Path::new(&self.result_dir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {},
            _ => exn::bail!(ErrorKind::Invalid {
                field: "result_dir",
                reason: format!("`{}` must be a single directory name", self.result_dir),
            }),
        }
        let timeouts = [
            ("tools.probe_timeout_secs", self.tools.probe_timeout_secs),
            ("tools.convert_timeout_secs", self.tools.convert_timeout_secs),
            ("tools.rewrite_timeout_secs", self.tools.rewrite_timeout_secs),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                exn::bail!(ErrorKind::Invalid { field, reason: "timeout must be at least one second".to_string() });
            }
        }
        Ok(())
    }
}
