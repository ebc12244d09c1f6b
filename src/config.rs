use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Thumbnailer configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub tools: ToolsConfig,
    pub limits: LimitsConfig,
}

/// Icon resolution configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of member references followed from `.DirIcon`
    pub max_hops: usize,
    /// Look up the `.desktop` file's `Icon=` key when `.DirIcon` is missing
    pub desktop_fallback: bool,
}

/// Paths to external extraction tools. Unset entries are searched for
/// next to the executable and then in `$PATH`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ToolsConfig {
    pub unsquashfs: Option<PathBuf>,
    pub dwarfsextract: Option<PathBuf>,
    pub seven_zip: Option<PathBuf>,
}

/// Resource limits
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest archive member that will be read into memory
    pub max_member_size: ByteSize,
    /// Largest accepted thumbnail edge (in pixels)
    pub max_size: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_hops: 32,
            desktop_fallback: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_member_size: ByteSize::mib(32),
            max_size: 4096,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            resolver: ResolverConfig::default(),
            tools: ToolsConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "appimage-thumbnailer")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from file, or return defaults if file doesn't exist
    ///
    /// A config that cannot be read or parsed never stops a thumbnail from
    /// being produced; it is reported and the defaults are used.
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<Config>(&contents) {
                        Ok(config) => {
                            log::debug!("loaded config from {}", path.display());
                            return config;
                        }
                        Err(e) => {
                            log::warn!("failed to parse config file {}: {}", path.display(), e);
                            log::warn!("using default configuration");
                        }
                    },
                    Err(e) => {
                        log::warn!("failed to read config file {}: {}", path.display(), e);
                        log::warn!("using default configuration");
                    }
                }
            }
        }
        Config::default()
    }
}
