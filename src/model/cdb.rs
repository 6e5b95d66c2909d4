// src/model/cdb.rs

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::model::ad_unit::{AdUnitType, CacheKey};

/// CDB 竞价请求
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CdbRequest {
    pub id: String,
    pub publisher: Publisher,
    pub sdk_version: String,
    pub profile_id: i32,
    pub slots: Vec<CdbRequestSlot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub cp_id: String,
    pub bundle_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CdbRequestSlot {
    pub imp_id: String,
    pub placement_id: String,
    pub sizes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_native: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interstitial: Option<bool>,
}

impl CdbRequest {
    /// 根据一组缓存键构造请求，每个键对应一个 slot
    pub fn new(publisher: Publisher, sdk_version: &str, profile_id: i32, keys: &[CacheKey]) -> Self {
        let slots = keys
            .iter()
            .map(|key| CdbRequestSlot {
                imp_id: Uuid::new_v4().simple().to_string(),
                placement_id: key.placement_id().to_string(),
                sizes: vec![key.size().to_string()],
                is_native: (key.ad_unit_type() == AdUnitType::Native).then_some(true),
                interstitial: (key.ad_unit_type() == AdUnitType::Interstitial).then_some(true),
            })
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            publisher,
            sdk_version: sdk_version.to_string(),
            profile_id,
            slots,
        }
    }

    pub fn placement_ids(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.placement_id.as_str()).collect()
    }
}

/// CDB 竞价响应
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CdbResponse {
    #[serde(default)]
    pub slots: Vec<CdbSlot>,
    /// 下次调用前需等待的秒数，<= 0 表示不限制
    #[serde(default, deserialize_with = "lenient_i64")]
    pub time_to_next_call: i64,
}

/// cpm 在 CDB 中通常是字符串（"1.50"），也兼容数字
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CpmValue {
    Number(f64),
    Text(String),
}

/// 宽松的整数字段：小数截断、数字字符串照常解析，其他值按 0 处理，
/// 单个字段格式不对不会让整个响应解析失败
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let value = match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Int(value)) => value,
        // `as` 会饱和截断，NaN 得到 0
        Some(Lenient::Float(value)) => value as i64,
        Some(Lenient::Text(raw)) => raw.trim().parse::<f64>().map(|value| value as i64).unwrap_or(0),
        Some(Lenient::Other(_)) | None => 0,
    };
    Ok(value)
}

/// 响应中的单个 slot，字段保持线上格式，转换为 `BidSlot` 时才校验
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CdbSlot {
    pub placement_id: Option<String>,
    pub imp_id: Option<String>,
    pub cpm: Option<CpmValue>,
    pub currency: Option<String>,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ttl: i64,
    pub display_url: Option<String>,
    /// 原始 JSON，解析失败时视为没有 native 素材
    pub native: Option<serde_json::Value>,
}
