use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;

/// Suffixes skipped by the scanner without creating a record.
pub const DEFAULT_IGNORE_SUFFIXES: &[&str] = &[
    ".DS_Store",
    "desktop.ini",
    ".plist",
    "db_errlog",
    ".strings",
    ".pdf",
    ".png",
    ".gif",
];

/// Extensions (lowercase, with the dot) the classifier accepts as music.
pub const DEFAULT_MUSIC_EXTENSIONS: &[&str] = &[".mp3", ".m4a", ".m4r"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Location of the SQLite index.
    pub db_path: String,
    /// Number of scanner workers.
    pub readers: usize,
    /// Capacity of the queue between the directory walk and the workers.
    pub queue_capacity: usize,
    pub ignore_suffixes: Vec<String>,
    /// Glob patterns; matching files are skipped like ignored suffixes.
    pub ignore_patterns: Vec<String>,
    pub music_extensions: Vec<String>,
    /// Also drop keepers from the active set after dedup (physical dedup mode).
    pub prune_keepers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "music.db".to_string(),
            readers: 10,
            queue_capacity: 16,
            ignore_suffixes: DEFAULT_IGNORE_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            music_extensions: DEFAULT_MUSIC_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            prune_keepers: false,
        }
    }
}

/// Load `Config.toml` (optional) overlaid with `MUSIC_DUPER_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from("Config")
}

pub fn load_configuration_from(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("MUSIC_DUPER")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_suffixes")
                .with_list_parse_key("ignore_patterns")
                .with_list_parse_key("music_extensions"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    /// Music extension check; `extension` is expected lowercase with its dot.
    pub fn is_music_extension(&self, extension: &str) -> bool {
        self.music_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
