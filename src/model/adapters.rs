// src/model/adapters.rs

use crate::model::ad_unit::AdUnit;
use crate::model::remote_config::RemoteConfigResponse;
use serde_json::Result as JsonResult;
use std::fs;
use tracing::warn;

/// 配置持久化适配器：上次的远程配置（保证 kill switch 跨重启生效）和预取广告位列表
pub trait ConfigAdapter: Send + Sync {
    fn load_remote_config(&self) -> Option<RemoteConfigResponse>;
    fn store_remote_config(&self, config: &RemoteConfigResponse);
    fn get_ad_units(&self) -> Vec<AdUnit>;
}

pub struct FileConfigAdapter {
    pub remote_config_file: String,
    pub ad_units_file: String,
}

impl FileConfigAdapter {
    pub fn new(remote_config_file: &str, ad_units_file: &str) -> Self {
        Self {
            remote_config_file: remote_config_file.to_string(),
            ad_units_file: ad_units_file.to_string(),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load_remote_config(&self) -> Option<RemoteConfigResponse> {
        let content = fs::read_to_string(&self.remote_config_file).ok()?;
        let config: JsonResult<RemoteConfigResponse> = serde_json::from_str(&content);
        config
            .map_err(|e| warn!("ignoring unreadable {}: {}", self.remote_config_file, e))
            .ok()
    }

    fn store_remote_config(&self, config: &RemoteConfigResponse) {
        let result = serde_json::to_string(config)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.remote_config_file, json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            warn!("failed to persist remote config to {}: {}", self.remote_config_file, e);
        }
    }

    fn get_ad_units(&self) -> Vec<AdUnit> {
        let content = fs::read_to_string(&self.ad_units_file).unwrap_or_else(|_| "[]".to_string());
        let units: JsonResult<Vec<AdUnit>> = serde_json::from_str(&content);
        units.unwrap_or_default()
    }
}
