use crate::auth::AuthService;
use crate::config::Config;
use crate::error::AppResult;
use crate::views::Views;
use catalog::Catalog;
use data_pipeline::UploadPolicy;
use scenario_editor::ScenarioEditor;
use scenario_store::ScenarioStore;
use std::time::Duration;
use tracing::info;

pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    pub store: ScenarioStore,
    pub views: Views,
    pub auth: AuthService,
    pub upload_policy: UploadPolicy,
}

impl AppState {
    /// Load catalogs, seed the store and prepare templates and users.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let catalog = match &config.assets_dir {
            Some(dir) => Catalog::from_dir(dir)?,
            None => Catalog::embedded()?,
        };
        let forecaster = catalog.forecaster();
        let store = catalog.seed_store(&forecaster)?;
        store.validate_all()?;
        let views = Views::new()?;
        let auth = AuthService::with_builtin_users(
            Duration::from_secs(config.auth.session_ttl_secs),
            Duration::from_secs(config.auth.remember_ttl_secs),
        )?;
        let upload_policy = UploadPolicy::with_max_bytes(config.upload.max_bytes);
        info!(
            scenarios = store.summaries().len(),
            items = catalog.historical.items.len(),
            "application state ready"
        );
        Ok(Self {
            config,
            catalog,
            store,
            views,
            auth,
            upload_policy,
        })
    }

    /// Fresh editor for a new session, seeded with the preset scenarios.
    pub fn new_editor(&self) -> AppResult<ScenarioEditor> {
        let presets = self
            .catalog
            .editor_presets()
            .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
        Ok(ScenarioEditor::new(presets)?)
    }
}
