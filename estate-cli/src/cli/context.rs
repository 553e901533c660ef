//! Wiring of configured components for the command handlers

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use log::debug;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::http_client;
use crate::api::sheets::{
    ServiceAccountAuth, SheetSource, SheetTarget, SheetsClient, load_csv, load_workbook,
};
use crate::api::store::{RecordStore, RestStore};
use crate::config::Config;
use crate::config::repository::open_state_pool;
use crate::models::EntityType;
use crate::services::DistributionAreaCalculator;
use crate::sync::{FieldMapper, SyncOptions, SyncService};

pub struct AppContext {
    pub config: Config,
    /// Local export read instead of the Sheets API
    pub workbook: Option<PathBuf>,
    pub dry_run: bool,
}

impl AppContext {
    pub fn new(config: Config, workbook: Option<PathBuf>, dry_run: bool) -> Self {
        Self {
            config,
            workbook,
            dry_run,
        }
    }

    pub fn areas(&self) -> DistributionAreaCalculator {
        DistributionAreaCalculator::new(self.config.zones.clone())
    }

    pub fn mapper(&self) -> FieldMapper {
        FieldMapper::new(self.config.timezone, self.areas())
    }

    /// Today's date in the office timezone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.config.timezone).date_naive()
    }

    fn http(&self) -> Result<reqwest::Client> {
        http_client(&self.config.resilience_config()).context("Failed to build HTTP client")
    }

    pub fn sheet_target(&self, entity: EntityType) -> Result<SheetTarget> {
        if self.workbook.is_some() {
            return Ok(self.config.sheet_target(entity));
        }
        self.config
            .remote_sheet_target(entity)
            .context("Spreadsheet not configured")
    }

    pub fn sheet_source(&self) -> Result<Arc<dyn SheetSource>> {
        if let Some(path) = &self.workbook {
            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            let source = if is_csv {
                load_csv(path)
            } else {
                load_workbook(path)
            }
            .with_context(|| format!("Failed to load {}", path.display()))?;
            debug!("Reading sheets from {}", path.display());
            return Ok(Arc::new(source));
        }

        let key = self
            .config
            .service_account_key()
            .context("Failed to load service-account credential")?;
        let http = self.http()?;
        let auth = Arc::new(ServiceAccountAuth::new(key, http.clone()));
        debug!("Reading sheets as {}", auth.client_email());
        Ok(Arc::new(SheetsClient::new(
            auth,
            http,
            &self.config.resilience_config(),
        )))
    }

    pub fn store(&self) -> Result<Arc<dyn RecordStore>> {
        let (url, key) = self.config.store_credentials()?;
        Ok(Arc::new(RestStore::new(
            url,
            key,
            self.http()?,
            &self.config.resilience_config(),
        )))
    }

    /// Sync options from the config file, before command-line overrides
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            force: false,
            dry_run: self.dry_run,
            conflict_policy: self.config.sync.conflict_policy,
            strict_validation: self.config.sync.strict_validation,
            max_parallel_rows: self.config.max_parallel_rows(),
        }
    }

    /// Fully wired service for one entity
    pub async fn sync_service(&self, entity: EntityType, options: SyncOptions) -> Result<SyncService> {
        let target = self.sheet_target(entity)?;
        let state = open_state_pool(&self.config.state_db)
            .await
            .with_context(|| {
                format!(
                    "Failed to open sync state database {}",
                    self.config.state_db.display()
                )
            })?;

        Ok(SyncService::new(
            self.sheet_source()?,
            self.store()?,
            state,
            self.mapper(),
            HashMap::from([(entity, target)]),
            options,
        ))
    }
}
