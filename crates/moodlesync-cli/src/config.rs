//! Client configuration.
//!
//! Settings come from the YAML file given with `--config`, merged over
//! built-in defaults: mappings merge recursively, file values win, and keys
//! this program does not know are kept so `config dump` shows them. Without
//! `--config` the defaults are used as they are.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use moodlesync_engine::{
    DEFAULT_CALENDAR_NAME, DEFAULT_MONTHS, SyncSettings, default_lock_dir,
};
use moodlesync_providers::moodle::DEFAULT_MOODLE_URL;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::cli::SyncArgs;
use crate::error::{ClientError, ClientResult};

/// Configuration for the moodlesync client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google OAuth client credentials file.
    pub google_api_path: PathBuf,

    /// Google authorized-user token file.
    pub google_token_path: PathBuf,

    /// Existing MoodleSession cookie.
    pub moodle_session_id: Option<String>,

    /// `{username, password}` JSON file.
    pub moodle_cred_path: Option<PathBuf>,

    /// Log in with `moodle_session_id` instead of the credentials file.
    pub login_with_token: bool,

    /// Number of months to sync.
    pub num_of_months: u32,

    /// Site root.
    pub moodle_url: String,

    /// Summary of the target calendar.
    pub calendar_name: String,

    /// Skip assignment pages missing a required element.
    pub skip_unparsable_assignments: bool,

    /// Directory of the per-calendar run lock.
    pub lock_dir: Option<PathBuf>,

    /// Keys not used by this program, passed through unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            google_api_path: PathBuf::from("api_credentials.json"),
            google_token_path: PathBuf::from("token.json"),
            moodle_session_id: None,
            moodle_cred_path: Some(PathBuf::from("moodle_credentials.json")),
            login_with_token: false,
            num_of_months: DEFAULT_MONTHS,
            moodle_url: DEFAULT_MOODLE_URL.to_string(),
            calendar_name: DEFAULT_CALENDAR_NAME.to_string(),
            skip_unparsable_assignments: false,
            lock_dir: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration.
    ///
    /// An explicit `path` must exist. Without one, the built-in defaults
    /// are used and no file is read.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                debug!("no config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        if !path.exists() {
            return Err(ClientError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content)
            .map_err(|e| ClientError::config(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses a YAML document and merges it over the defaults.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let overlay: Value =
            serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {}", e))?;
        let overlay = match overlay {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => return Err("top level must be a mapping".to_string()),
        };

        let mut merged = serde_yaml::to_value(Self::default())
            .map_err(|e| format!("failed to serialize defaults: {}", e))?;
        merge(&mut merged, Value::Mapping(overlay));
        serde_yaml::from_value(merged).map_err(|e| format!("invalid config: {}", e))
    }

    /// Applies command-line overrides of the `sync` command.
    ///
    /// `--session-id` also switches to session-id login.
    pub fn apply_sync_args(&mut self, args: &SyncArgs) {
        if let Some(ref session_id) = args.session_id {
            self.moodle_session_id = Some(session_id.clone());
            self.login_with_token = true;
        }
        if let Some(months) = args.months {
            self.num_of_months = months;
        }
    }

    /// Builds the engine settings.
    pub fn to_settings(&self) -> SyncSettings {
        SyncSettings {
            moodle_url: self.moodle_url.clone(),
            moodle_session_id: self.moodle_session_id.clone(),
            moodle_cred_path: self.moodle_cred_path.clone(),
            login_with_token: self.login_with_token,
            google_api_path: self.google_api_path.clone(),
            google_token_path: self.google_token_path.clone(),
            calendar_name: self.calendar_name.clone(),
            num_of_months: self.num_of_months,
            skip_unparsable_assignments: self.skip_unparsable_assignments,
            lock_dir: self.lock_dir.clone().unwrap_or_else(default_lock_dir),
        }
    }
}

/// Merges `overlay` into `base`.
///
/// Mappings merge key by key, recursively. Any other overlay value replaces
/// the base value.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => merge_mappings(base, overlay),
        (base, overlay) => *base = overlay,
    }
}

fn merge_mappings(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match base.get_mut(&key) {
            Some(existing) => merge(existing, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}
