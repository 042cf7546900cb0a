use crate::config::GatewayConfig;
use pnp_cache::{CategoryTtls, StateCache};
use pnp_controller::ControllerClient;
use pnp_core::{CommandTranslator, SafetyManager, TranslatorConfig, ValidatorRegistry};
use pnp_security::{AuthLog, CredentialRegistry};
use pnp_tasks::{RampRegistry, TaskSupervisor};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Everything the Dispatcher touches, owned for the process lifetime (spec
/// §3, "Ownership"). Cheap to clone: every field is already `Arc`-backed or
/// internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub context: Arc<Mutex<pnp_core::MotionContext>>,
    pub safety: Arc<SafetyManager>,
    pub translator: Arc<CommandTranslator>,
    pub credentials: Arc<CredentialRegistry>,
    pub auth_log: Arc<AuthLog>,
    pub cache: Arc<StateCache<Value>>,
    pub tasks: Arc<TaskSupervisor>,
    pub ramps: Arc<RampRegistry>,
    pub controller: Arc<dyn ControllerClient>,
}

impl AppState {
    pub fn new(config: GatewayConfig, controller: Arc<dyn ControllerClient>) -> Result<Self, String> {
        let validators = default_validators(&config);
        let safety = SafetyManager::new(config.safety_limits.clone().into());
        let translator = CommandTranslator::new(validators, TranslatorConfig { vacuum_zero_is_off: config.vacuum_zero_is_off });

        let credentials = match &config.credentials_store_path {
            Some(path) => CredentialRegistry::with_persistence(path).map_err(|e| e.to_string())?,
            None => CredentialRegistry::new(),
        };

        let ttls: CategoryTtls = config.cache_ttls_per_category.into();

        Ok(Self {
            config: Arc::new(config.clone()),
            context: Arc::new(Mutex::new(pnp_core::MotionContext::new())),
            safety: Arc::new(safety),
            translator: Arc::new(translator),
            credentials: Arc::new(credentials),
            auth_log: Arc::new(AuthLog::new(config.auth_failure_window())),
            cache: Arc::new(StateCache::new(ttls)),
            tasks: Arc::new(TaskSupervisor::new(config.task_preemption_grace())),
            ramps: Arc::new(RampRegistry::new()),
            controller,
        })
    }
}

fn default_validators(config: &GatewayConfig) -> ValidatorRegistry {
    let mut validators = ValidatorRegistry::new();
    validators.register_range("feedrate", 0.0, config.safety_limits.max_feedrate);
    validators
}
