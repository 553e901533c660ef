//! Configuration
//!
//! Built once in `main` from defaults, an optional TOML file and the
//! environment (later sources win), then handed to each component.

pub mod repository;

use chrono_tz::Tz;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::resilience::{ResilienceConfig, ResilienceSettings};
use crate::api::sheets::{ServiceAccountKey, SheetTarget};
use crate::error::{SyncError, SyncResult};
use crate::models::EntityType;
use crate::services::distribution::{ZoneRule, default_zone_rules};
use crate::sync::{ConflictPolicy, SyncOptions};

pub const APP_DIR: &str = "estate-sync";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

pub const ENV_STORE_URL: &str = "ESTATE_STORE_URL";
pub const ENV_STORE_KEY: &str = "ESTATE_STORE_KEY";
pub const ENV_SELLER_SHEET_ID: &str = "ESTATE_SELLER_SHEET_ID";
pub const ENV_BUYER_SHEET_ID: &str = "ESTATE_BUYER_SHEET_ID";
pub const ENV_PROPERTY_SHEET_ID: &str = "ESTATE_PROPERTY_SHEET_ID";
pub const ENV_SERVICE_ACCOUNT_JSON: &str = "GOOGLE_SERVICE_ACCOUNT_JSON";
pub const ENV_SERVICE_ACCOUNT_PATH: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_TIMEZONE: &str = "ESTATE_TIMEZONE";
pub const ENV_STATE_DB: &str = "ESTATE_STATE_DB";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub range: String,
}

impl SheetConfig {
    fn named(sheet_name: &str) -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: sheet_name.to_string(),
            range: String::new(),
        }
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self::named("")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub seller: SheetConfig,
    pub buyer: SheetConfig,
    pub property: SheetConfig,
    /// Inline service-account JSON
    pub credentials_json: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            seller: SheetConfig::named("売主リスト"),
            buyer: SheetConfig::named("買主リスト"),
            property: SheetConfig::named("物件"),
            credentials_json: None,
            credentials_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub conflict_policy: ConflictPolicy,
    /// A row with any invalid field fails instead of syncing without it
    pub strict_validation: bool,
    /// Rows a batch sync works on at once
    pub max_parallel_rows: Option<usize>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Overwrite,
            strict_validation: true,
            max_parallel_rows: None,
        }
    }
}

/// Shape of the TOML file; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreConfig,
    sheets: Option<SheetsFile>,
    sync: SyncSettings,
    resilience: ResilienceSettings,
    zones: Vec<ZoneRule>,
    timezone: Option<String>,
    state_db: Option<PathBuf>,
}

/// Partial `[sheets]` so a file naming only one sheet keeps the other defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SheetsFile {
    seller: Option<SheetConfig>,
    buyer: Option<SheetConfig>,
    property: Option<SheetConfig>,
    credentials_json: Option<String>,
    credentials_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub sheets: SheetsConfig,
    pub sync: SyncSettings,
    pub resilience: ResilienceSettings,
    pub zones: Vec<ZoneRule>,
    pub timezone: Tz,
    pub state_db: PathBuf,
    /// File the settings were read from, if any
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sheets: SheetsConfig::default(),
            sync: SyncSettings::default(),
            resilience: ResilienceSettings::default(),
            zones: default_zone_rules(),
            timezone: DEFAULT_TIMEZONE,
            state_db: default_state_db(),
            source: None,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_state_db() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("state.db")
}

fn parse_timezone(name: &str) -> SyncResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SyncError::Config(format!("unknown timezone '{}'", name)))
}

impl Config {
    /// Defaults, then the TOML file, then the process environment
    ///
    /// An explicit `path` must exist. Without one the per-user config file is
    /// read when present.
    pub fn load(path: Option<&Path>) -> SyncResult<Self> {
        let mut config = Config::default();

        let file = match path {
            Some(path) if !path.exists() => {
                return Err(SyncError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(file) = file {
            debug!("Reading config from {}", file.display());
            let text = std::fs::read_to_string(&file)?;
            config.apply_toml(&text)?;
            config.source = Some(file);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_toml(&mut self, text: &str) -> SyncResult<()> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| SyncError::Config(format!("invalid config file: {}", e)))?;

        if file.store.url.is_some() {
            self.store.url = file.store.url;
        }
        if file.store.key.is_some() {
            self.store.key = file.store.key;
        }
        if let Some(sheets) = file.sheets {
            if let Some(seller) = sheets.seller {
                self.sheets.seller = merge_sheet(&self.sheets.seller, seller);
            }
            if let Some(buyer) = sheets.buyer {
                self.sheets.buyer = merge_sheet(&self.sheets.buyer, buyer);
            }
            if let Some(property) = sheets.property {
                self.sheets.property = merge_sheet(&self.sheets.property, property);
            }
            if sheets.credentials_json.is_some() {
                self.sheets.credentials_json = sheets.credentials_json;
            }
            if sheets.credentials_path.is_some() {
                self.sheets.credentials_path = sheets.credentials_path;
            }
        }
        self.sync = file.sync;
        self.resilience = file.resilience;
        if !file.zones.is_empty() {
            self.zones = file.zones;
        }
        if let Some(tz) = file.timezone {
            self.timezone = parse_timezone(&tz)?;
        }
        if let Some(state_db) = file.state_db {
            self.state_db = state_db;
        }
        Ok(())
    }

    /// Overlay environment variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> SyncResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_STORE_URL) {
            self.store.url = Some(url);
        }
        if let Some(key) = get(ENV_STORE_KEY) {
            self.store.key = Some(key);
        }
        if let Some(id) = get(ENV_SELLER_SHEET_ID) {
            self.sheets.seller.spreadsheet_id = id;
        }
        if let Some(id) = get(ENV_BUYER_SHEET_ID) {
            self.sheets.buyer.spreadsheet_id = id;
        }
        if let Some(id) = get(ENV_PROPERTY_SHEET_ID) {
            self.sheets.property.spreadsheet_id = id;
        }
        if let Some(json) = get(ENV_SERVICE_ACCOUNT_JSON) {
            self.sheets.credentials_json = Some(json);
        }
        if let Some(path) = get(ENV_SERVICE_ACCOUNT_PATH) {
            self.sheets.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(tz) = get(ENV_TIMEZONE) {
            self.timezone = parse_timezone(&tz)?;
        }
        if let Some(path) = get(ENV_STATE_DB) {
            self.state_db = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn sheet_target(&self, entity: EntityType) -> SheetTarget {
        let sheet = match entity {
            EntityType::Seller => &self.sheets.seller,
            EntityType::Buyer => &self.sheets.buyer,
            EntityType::Property => &self.sheets.property,
        };
        SheetTarget::new(&sheet.spreadsheet_id, &sheet.sheet_name, &sheet.range)
    }

    /// Target for the Sheets API, which needs a spreadsheet id
    pub fn remote_sheet_target(&self, entity: EntityType) -> SyncResult<SheetTarget> {
        let target = self.sheet_target(entity);
        if target.spreadsheet_id.is_empty() {
            let var = match entity {
                EntityType::Seller => ENV_SELLER_SHEET_ID,
                EntityType::Buyer => ENV_BUYER_SHEET_ID,
                EntityType::Property => ENV_PROPERTY_SHEET_ID,
            };
            return Err(SyncError::Config(format!(
                "no spreadsheet id for {} sheets; set {} or [sheets.{}] spreadsheet_id",
                entity, var, entity
            )));
        }
        Ok(target)
    }

    /// Store URL and key, both required
    pub fn store_credentials(&self) -> SyncResult<(String, String)> {
        match (&self.store.url, &self.store.key) {
            (Some(url), Some(key)) => Ok((url.clone(), key.clone())),
            _ => Err(SyncError::Config(format!(
                "store not configured; set {} and {}",
                ENV_STORE_URL, ENV_STORE_KEY
            ))),
        }
    }

    /// Inline JSON wins over a key file
    pub fn service_account_key(&self) -> SyncResult<ServiceAccountKey> {
        if let Some(json) = &self.sheets.credentials_json {
            return ServiceAccountKey::from_json(json);
        }
        if let Some(path) = &self.sheets.credentials_path {
            return ServiceAccountKey::from_file(path);
        }
        Err(SyncError::Config(format!(
            "no service-account credential; set {} or {}",
            ENV_SERVICE_ACCOUNT_JSON, ENV_SERVICE_ACCOUNT_PATH
        )))
    }

    pub fn resilience_config(&self) -> ResilienceConfig {
        ResilienceConfig::from_settings(&self.resilience)
    }

    /// Batch row parallelism from `[sync]`, never zero
    pub fn max_parallel_rows(&self) -> usize {
        self.sync
            .max_parallel_rows
            .unwrap_or(SyncOptions::default().max_parallel_rows)
            .max(1)
    }
}

fn merge_sheet(current: &SheetConfig, overlay: SheetConfig) -> SheetConfig {
    SheetConfig {
        spreadsheet_id: if overlay.spreadsheet_id.is_empty() {
            current.spreadsheet_id.clone()
        } else {
            overlay.spreadsheet_id
        },
        sheet_name: if overlay.sheet_name.is_empty() {
            current.sheet_name.clone()
        } else {
            overlay.sheet_name
        },
        range: if overlay.range.is_empty() {
            current.range.clone()
        } else {
            overlay.range
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.sync.conflict_policy, ConflictPolicy::Overwrite);
        assert!(config.sync.strict_validation);
        assert_eq!(config.sheet_target(EntityType::Seller).sheet_name, "売主リスト");
        assert!(!config.zones.is_empty());
        assert!(config.store_credentials().is_err());
        assert_eq!(config.max_parallel_rows(), SyncOptions::default().max_parallel_rows);
    }

    #[test]
    fn test_zero_parallel_rows_runs_one_at_a_time() {
        let mut config = Config::default();
        config.apply_toml("[sync]\nmax_parallel_rows = 0\n").unwrap();
        assert_eq!(config.max_parallel_rows(), 1);
    }

    #[test]
    fn test_toml_overlay() {
        let mut config = Config::default();
        config
            .apply_toml(
                r#"
                timezone = "UTC"

                [store]
                url = "https://project.example.co"

                [sheets.property]
                spreadsheet_id = "sheet-123"
                range = "A1:AZ"

                [sync]
                conflict_policy = "preserve"
                strict_validation = false
                max_parallel_rows = 2

                [[zones]]
                pattern = "Takasaki"
                label = "Takasaki zone"
                "#,
            )
            .unwrap();

        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.store.url.as_deref(), Some("https://project.example.co"));
        let target = config.sheet_target(EntityType::Property);
        assert_eq!(target.spreadsheet_id, "sheet-123");
        assert_eq!(target.sheet_name, "物件");
        assert_eq!(target.range, "A1:AZ");
        assert_eq!(config.sheet_target(EntityType::Buyer).sheet_name, "買主リスト");
        assert_eq!(config.sync.conflict_policy, ConflictPolicy::Preserve);
        assert!(!config.sync.strict_validation);
        assert_eq!(config.max_parallel_rows(), 2);
        assert_eq!(config.zones, vec![ZoneRule::new("Takasaki", "Takasaki zone")]);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::default();
        config
            .apply_toml("[store]\nurl = \"https://from-file\"\nkey = \"file-key\"\n")
            .unwrap();
        config
            .apply_env(env(&[
                (ENV_STORE_URL, "https://from-env"),
                (ENV_SELLER_SHEET_ID, "seller-sheet"),
                (ENV_STATE_DB, "/tmp/state.db"),
                (ENV_STORE_KEY, "  "),
            ]))
            .unwrap();

        let (url, key) = config.store_credentials().unwrap();
        assert_eq!(url, "https://from-env");
        // Blank values are ignored
        assert_eq!(key, "file-key");
        assert_eq!(
            config.remote_sheet_target(EntityType::Seller).unwrap().spreadsheet_id,
            "seller-sheet"
        );
        assert_eq!(config.state_db, PathBuf::from("/tmp/state.db"));
    }

    #[test]
    fn test_missing_spreadsheet_id_names_variable() {
        let config = Config::default();
        match config.remote_sheet_target(EntityType::Buyer) {
            Err(SyncError::Config(message)) => assert!(message.contains(ENV_BUYER_SHEET_ID)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bad_timezone() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[(ENV_TIMEZONE, "Mars/Olympus")])).is_err());
        assert!(config.apply_toml("timezone = \"Nowhere\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/estate.toml"))).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_missing_credentials() {
        assert!(matches!(
            Config::default().service_account_key(),
            Err(SyncError::Config(_))
        ));
    }
}
