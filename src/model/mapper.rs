// src/model/mapper.rs

use std::collections::HashSet;
use tracing::warn;

use crate::model::ad_unit::{AdSize, AdUnit, AdUnitType, CacheKey};
use crate::model::slot::BidSlot;

/// 单个 CDB 请求最多携带的广告位数量
pub const MAX_AD_UNITS_PER_BID_REQUEST: usize = 8;

/// 原生广告位在 CDB 中使用的固定尺寸
const NATIVE_SIZE: AdSize = AdSize { width: 2, height: 2 };

/// 设备屏幕信息，插屏广告位以屏幕尺寸作为缓存键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub portrait: AdSize,
    pub landscape: AdSize,
    pub is_landscape: bool,
}

impl DeviceInfo {
    pub fn portrait(width: i32, height: i32) -> Self {
        Self {
            portrait: AdSize::new(width, height),
            landscape: AdSize::new(height, width),
            is_landscape: false,
        }
    }

    pub fn current_screen_size(&self) -> AdSize {
        if self.is_landscape {
            self.landscape
        } else {
            self.portrait
        }
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        DeviceInfo::portrait(360, 640)
    }
}

/// **AdUnit → CacheKey 映射**
#[derive(Debug, Clone, Default)]
pub struct AdUnitMapper {
    device: DeviceInfo,
}

impl AdUnitMapper {
    pub fn new(device: DeviceInfo) -> Self {
        Self { device }
    }

    /// 非法广告位（placement 为空、尺寸非正）返回 None
    pub fn map(&self, ad_unit: Option<&AdUnit>) -> Option<CacheKey> {
        let ad_unit = ad_unit?;
        let key = match ad_unit {
            AdUnit::Banner { placement_id, size } => {
                CacheKey::new(placement_id.as_str(), *size, AdUnitType::Banner)
            }
            AdUnit::Interstitial { placement_id } => CacheKey::new(
                placement_id.as_str(),
                self.device.current_screen_size(),
                AdUnitType::Interstitial,
            ),
            AdUnit::Native { placement_id } => {
                CacheKey::new(placement_id.as_str(), NATIVE_SIZE, AdUnitType::Native)
            }
        };

        if key.placement_id().trim().is_empty() || !key.size().is_positive() {
            warn!(placement_id = %ad_unit.placement_id(), "invalid ad unit ignored");
            return None;
        }
        Some(key)
    }

    /// 映射并去重（保留首次出现的顺序），按 `MAX_AD_UNITS_PER_BID_REQUEST` 切块
    pub fn map_to_chunks(&self, ad_units: &[AdUnit]) -> Vec<Vec<CacheKey>> {
        let mut seen = HashSet::new();
        let keys: Vec<CacheKey> = ad_units
            .iter()
            .filter_map(|ad_unit| self.map(Some(ad_unit)))
            .filter(|key| seen.insert(key.clone()))
            .collect();

        keys.chunks(MAX_AD_UNITS_PER_BID_REQUEST)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// CDB 返回的 slot 写入缓存时使用的键
    pub fn key_for_slot(&self, slot: &BidSlot) -> CacheKey {
        let ad_unit_type = if slot.is_native() {
            AdUnitType::Native
        } else if slot.size == self.device.portrait || slot.size == self.device.landscape {
            AdUnitType::Interstitial
        } else {
            AdUnitType::Banner
        };
        CacheKey::new(slot.placement_id.as_str(), slot.size, ad_unit_type)
    }
}
