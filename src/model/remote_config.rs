// src/model/remote_config.rs

use serde::{Serialize, Deserialize};

/// 远程配置请求参数
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfigRequest {
    pub cp_id: String,
    pub bundle_id: String,
    pub sdk_version: String,
}

/// 远程配置响应，所有字段可缺省，未知字段忽略
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RemoteConfigResponse {
    #[serde(rename = "killSwitch", skip_serializing_if = "Option::is_none")]
    pub kill_switch: Option<bool>,
    #[serde(rename = "AndroidDisplayUrlMacro", skip_serializing_if = "Option::is_none")]
    pub display_url_macro: Option<String>,
    #[serde(rename = "AndroidAdTagUrlMode", skip_serializing_if = "Option::is_none")]
    pub ad_tag_url_mode: Option<String>,
    #[serde(rename = "AndroidAdTagDataMacro", skip_serializing_if = "Option::is_none")]
    pub ad_tag_data_macro: Option<String>,
    #[serde(rename = "AndroidAdTagDataMode", skip_serializing_if = "Option::is_none")]
    pub ad_tag_data_mode: Option<String>,
    #[serde(rename = "csmEnabled", skip_serializing_if = "Option::is_none")]
    pub csm_enabled: Option<bool>,
}
