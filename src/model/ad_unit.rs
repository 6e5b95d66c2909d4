// src/model/ad_unit.rs

use serde::{Serialize, Deserialize};
use std::convert::TryFrom;
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum AdUnitType {
    Banner = 1,
    Interstitial = 2,
    Native = 3,
}

impl TryFrom<u8> for AdUnitType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AdUnitType::Banner),
            2 => Ok(AdUnitType::Interstitial),
            3 => Ok(AdUnitType::Native),
            _ => Err(format!("Invalid value for AdUnitType: {}", value)),
        }
    }
}

impl From<AdUnitType> for u8 {
    fn from(ad: AdUnitType) -> Self {
        ad as u8
    }
}

/// 广告位尺寸（宽 × 高）
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdSize {
    pub width: i32,
    pub height: i32,
}

impl AdSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// CDB 请求中尺寸的格式，例如 `320x50`
impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// **调用方描述的广告位**（未经校验）
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdUnit {
    Banner { placement_id: String, size: AdSize },
    Interstitial { placement_id: String },
    Native { placement_id: String },
}

impl AdUnit {
    pub fn placement_id(&self) -> &str {
        match self {
            AdUnit::Banner { placement_id, .. }
            | AdUnit::Interstitial { placement_id }
            | AdUnit::Native { placement_id } => placement_id,
        }
    }

    pub fn ad_unit_type(&self) -> AdUnitType {
        match self {
            AdUnit::Banner { .. } => AdUnitType::Banner,
            AdUnit::Interstitial { .. } => AdUnitType::Interstitial,
            AdUnit::Native { .. } => AdUnitType::Native,
        }
    }
}

/// **缓存键**：广告位 ID + 尺寸 + 类型，按值比较与哈希，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    placement_id: String,
    size: AdSize,
    ad_unit_type: AdUnitType,
}

impl CacheKey {
    pub fn new(placement_id: impl Into<String>, size: AdSize, ad_unit_type: AdUnitType) -> Self {
        Self {
            placement_id: placement_id.into(),
            size,
            ad_unit_type,
        }
    }

    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    pub fn size(&self) -> AdSize {
        self.size
    }

    pub fn ad_unit_type(&self) -> AdUnitType {
        self.ad_unit_type
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{:?}", self.placement_id, self.size, self.ad_unit_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn cache_keys_compare_by_value() {
        let a = CacheKey::new("home", AdSize::new(320, 50), AdUnitType::Banner);
        let b = CacheKey::new(String::from("home"), AdSize::new(320, 50), AdUnitType::Banner);
        let c = CacheKey::new("home", AdSize::new(320, 50), AdUnitType::Interstitial);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn ad_unit_type_uses_numeric_wire_value() {
        assert_eq!(serde_json::to_string(&AdUnitType::Native).unwrap(), "3");
        assert_eq!(
            serde_json::from_str::<AdUnitType>("2").unwrap(),
            AdUnitType::Interstitial
        );
        assert!(serde_json::from_str::<AdUnitType>("9").is_err());
    }

    #[test]
    fn ad_unit_is_read_from_tagged_json() {
        let json = r#"[
            {"type": "banner", "placement_id": "home", "size": {"width": 320, "height": 50}},
            {"type": "native", "placement_id": "feed"}
        ]"#;
        let units: Vec<AdUnit> = serde_json::from_str(json).unwrap();

        assert_eq!(units[0].ad_unit_type(), AdUnitType::Banner);
        assert_eq!(units[1].placement_id(), "feed");
    }
}
