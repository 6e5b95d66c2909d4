// src/config/config_manager.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::info;

use crate::model::adapters::ConfigAdapter;
use crate::model::remote_config::RemoteConfigResponse;

/// **运行时配置**
///
/// kill switch 每次调用都会读取；其余字段来自远程配置，供渲染层使用。
pub struct ConfigManager {
    kill_switch: AtomicBool,
    remote: RwLock<RemoteConfigResponse>,
    adapter: Option<Box<dyn ConfigAdapter>>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            kill_switch: AtomicBool::new(false),
            remote: RwLock::new(RemoteConfigResponse::default()),
            adapter: None,
        }
    }

    /// 从持久化的上次远程配置恢复状态
    pub fn with_adapter(adapter: Box<dyn ConfigAdapter>) -> Self {
        let mut manager = Self::new();
        if let Some(persisted) = adapter.load_remote_config() {
            manager.apply(&persisted);
        }
        manager.adapter = Some(adapter);
        manager
    }

    pub fn is_kill_switch_enabled(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }

    pub fn set_kill_switch(&self, enabled: bool) {
        self.kill_switch.store(enabled, Ordering::SeqCst);
    }

    /// 应用远程配置，缺失字段保持原值，并持久化合并后的结果
    pub fn refresh(&self, response: &RemoteConfigResponse) {
        let merged = self.apply(response);
        if let Some(adapter) = &self.adapter {
            adapter.store_remote_config(&merged);
        }
        info!(kill_switch = self.is_kill_switch_enabled(), "remote config refreshed");
    }

    pub fn remote_config(&self) -> RemoteConfigResponse {
        match self.remote.read() {
            Ok(remote) => remote.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn apply(&self, response: &RemoteConfigResponse) -> RemoteConfigResponse {
        let mut remote = match self.remote.write() {
            Ok(remote) => remote,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(kill_switch) = response.kill_switch {
            remote.kill_switch = Some(kill_switch);
            self.set_kill_switch(kill_switch);
        }
        if response.display_url_macro.is_some() {
            remote.display_url_macro = response.display_url_macro.clone();
        }
        if response.ad_tag_url_mode.is_some() {
            remote.ad_tag_url_mode = response.ad_tag_url_mode.clone();
        }
        if response.ad_tag_data_macro.is_some() {
            remote.ad_tag_data_macro = response.ad_tag_data_macro.clone();
        }
        if response.ad_tag_data_mode.is_some() {
            remote.ad_tag_data_mode = response.ad_tag_data_mode.clone();
        }
        if response.csm_enabled.is_some() {
            remote.csm_enabled = response.csm_enabled;
        }
        remote.clone()
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ad_unit::AdUnit;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryAdapter {
        stored: Arc<Mutex<Option<RemoteConfigResponse>>>,
    }

    impl ConfigAdapter for MemoryAdapter {
        fn load_remote_config(&self) -> Option<RemoteConfigResponse> {
            self.stored.lock().unwrap().clone()
        }

        fn store_remote_config(&self, config: &RemoteConfigResponse) {
            *self.stored.lock().unwrap() = Some(config.clone());
        }

        fn get_ad_units(&self) -> Vec<AdUnit> {
            Vec::new()
        }
    }

    #[test]
    fn refresh_keeps_fields_missing_from_the_response() {
        let config = ConfigManager::new();
        config.refresh(&RemoteConfigResponse {
            kill_switch: Some(true),
            display_url_macro: Some("%%url%%".into()),
            ..Default::default()
        });
        assert!(config.is_kill_switch_enabled());

        config.refresh(&RemoteConfigResponse::default());
        assert!(config.is_kill_switch_enabled());
        assert_eq!(config.remote_config().display_url_macro.as_deref(), Some("%%url%%"));

        config.refresh(&RemoteConfigResponse { kill_switch: Some(false), ..Default::default() });
        assert!(!config.is_kill_switch_enabled());
    }

    #[test]
    fn kill_switch_is_restored_from_adapter() {
        let stored = Arc::new(Mutex::new(None));
        let first = ConfigManager::with_adapter(Box::new(MemoryAdapter { stored: stored.clone() }));
        assert!(!first.is_kill_switch_enabled());
        first.refresh(&RemoteConfigResponse { kill_switch: Some(true), ..Default::default() });

        let second = ConfigManager::with_adapter(Box::new(MemoryAdapter { stored }));
        assert!(second.is_kill_switch_enabled());
    }
}
