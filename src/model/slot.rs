// src/model/slot.rs

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::error::SlotError;
use crate::model::ad_unit::AdSize;
use crate::model::cdb::{CdbSlot, CpmValue};
use crate::model::native::NativeAssets;

/// 立即出价（cpm > 0 且 ttl = 0）被赋予的默认 TTL：15 分钟
pub const DEFAULT_TTL_IN_SECONDS: i64 = 15 * 60;

const SECOND_TO_MILLI: i64 = 1000;

/// **可渲染的素材**：展示 URL 与原生素材互斥
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    DisplayUrl(String),
    Native(NativeAssets),
}

/// 由 cpm/ttl 推导出的三种类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClass {
    /// cpm = 0, ttl = 0，不进入缓存
    NoBid,
    /// cpm = 0, ttl > 0，只占位，充当"勿重试"窗口
    Silent,
    /// cpm > 0
    Valid,
}

/// **缓存中的竞价结果**
#[derive(Debug, Clone, PartialEq)]
pub struct BidSlot {
    pub placement_id: String,
    pub impression_id: Option<String>,
    pub price: f64,
    pub currency: Option<String>,
    pub size: AdSize,
    pub ttl_seconds: i64,
    pub payload: Payload,
    /// 写入缓存时由引擎设置（毫秒）
    pub download_timestamp: i64,
}

impl BidSlot {
    pub fn is_native(&self) -> bool {
        matches!(self.payload, Payload::Native(_))
    }

    pub fn classify(&self) -> SlotClass {
        if self.price > 0.0 {
            SlotClass::Valid
        } else if self.ttl_seconds > 0 {
            SlotClass::Silent
        } else {
            SlotClass::NoBid
        }
    }

    /// 线上的 ttl 可能极大，溢出时取 i64::MAX，视为永不过期
    pub fn expires_at(&self) -> i64 {
        self.download_timestamp
            .saturating_add(self.ttl_seconds.saturating_mul(SECOND_TO_MILLI))
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at() <= now_millis
    }

    /// 价格非负，且为原生素材或展示 URL 格式合法
    pub fn is_valid(&self) -> bool {
        if !self.price.is_finite() || self.price < 0.0 {
            return false;
        }
        match &self.payload {
            Payload::Native(_) => true,
            Payload::DisplayUrl(url) => is_valid_url(url),
        }
    }

    /// 能否写入缓存：合法且不是 no-bid
    pub fn validate(&self) -> Result<(), SlotError> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(SlotError::NegativeCpm(self.price));
        }
        if let Payload::DisplayUrl(url) = &self.payload {
            if !is_valid_url(url) {
                return Err(SlotError::InvalidDisplayUrl(url.clone()));
            }
        }
        if self.classify() == SlotClass::NoBid {
            return Err(SlotError::NoBid);
        }
        Ok(())
    }

    /// 立即出价补上默认 TTL，否则写入即过期
    pub fn promote_default_ttl(&mut self) {
        if self.price > 0.0 && self.ttl_seconds == 0 {
            self.ttl_seconds = DEFAULT_TTL_IN_SECONDS;
        }
    }
}

fn is_valid_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

fn parse_cpm(cpm: Option<&CpmValue>) -> Result<f64, SlotError> {
    match cpm {
        None => Ok(0.0),
        Some(CpmValue::Number(value)) => Ok(*value),
        Some(CpmValue::Text(raw)) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| SlotError::UnparsableCpm(raw.clone())),
    }
}

impl TryFrom<CdbSlot> for BidSlot {
    type Error = SlotError;

    fn try_from(raw: CdbSlot) -> Result<Self, Self::Error> {
        let price = parse_cpm(raw.cpm.as_ref())?;

        let native = raw.native.and_then(|value| {
            serde_json::from_value::<NativeAssets>(value)
                .map_err(|e| debug!("ignoring malformed native assets: {}", e))
                .ok()
        });
        let payload = match (native, raw.display_url) {
            (Some(assets), _) => Payload::Native(assets),
            (None, Some(url)) => Payload::DisplayUrl(url),
            (None, None) => return Err(SlotError::MissingPayload),
        };

        Ok(BidSlot {
            placement_id: raw.placement_id.unwrap_or_default(),
            impression_id: raw.imp_id,
            price,
            currency: raw.currency,
            size: AdSize::new(raw.width, raw.height),
            ttl_seconds: raw.ttl.max(0),
            payload,
            download_timestamp: 0,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn display_slot(placement_id: &str, price: f64, ttl_seconds: i64) -> BidSlot {
        BidSlot {
            placement_id: placement_id.to_string(),
            impression_id: Some(format!("imp-{}", placement_id)),
            price,
            currency: Some("USD".to_string()),
            size: AdSize::new(320, 50),
            ttl_seconds,
            payload: Payload::DisplayUrl("https://cdn.example.com/ad.js".to_string()),
            download_timestamp: 0,
        }
    }

    #[test]
    fn classification_follows_price_and_ttl() {
        assert_eq!(display_slot("a", 0.0, 0).classify(), SlotClass::NoBid);
        assert_eq!(display_slot("a", 0.0, 300).classify(), SlotClass::Silent);
        assert_eq!(display_slot("a", 1.5, 60).classify(), SlotClass::Valid);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let mut slot = display_slot("a", 1.5, 60);
        slot.download_timestamp = 10_000;

        assert!(!slot.is_expired(10_000 + 59_999));
        assert!(slot.is_expired(10_000 + 60_000));
    }

    #[test]
    fn validation_rejects_bad_display_url_and_no_bid() {
        let mut slot = display_slot("a", 1.0, 60);
        slot.payload = Payload::DisplayUrl("not a url".into());
        assert!(!slot.is_valid());
        assert_eq!(slot.validate(), Err(SlotError::InvalidDisplayUrl("not a url".into())));

        let no_bid = display_slot("a", 0.0, 0);
        assert!(no_bid.is_valid());
        assert_eq!(no_bid.validate(), Err(SlotError::NoBid));

        assert!(display_slot("a", -1.0, 60).validate().is_err());
    }

    #[test]
    fn huge_ttl_saturates_instead_of_wrapping() {
        let mut slot = display_slot("a", 1.5, i64::MAX / 10);
        slot.download_timestamp = 10_000;

        assert_eq!(slot.expires_at(), i64::MAX);
        assert!(!slot.is_expired(10_000));
    }

    #[test]
    fn immediate_bid_gets_default_ttl() {
        let mut slot = display_slot("a", 2.0, 0);
        slot.promote_default_ttl();
        assert_eq!(slot.ttl_seconds, 900);

        let mut silent = display_slot("a", 0.0, 0);
        silent.promote_default_ttl();
        assert_eq!(silent.ttl_seconds, 0);
    }

    #[test]
    fn wire_slot_conversion() {
        let raw = CdbSlot {
            placement_id: Some("home".into()),
            cpm: Some(CpmValue::Text("1.20".into())),
            ttl: 60,
            width: 300,
            height: 250,
            display_url: Some("https://x.example/ad".into()),
            ..Default::default()
        };
        let slot = BidSlot::try_from(raw).unwrap();
        assert_eq!(slot.price, 1.2);
        assert_eq!(slot.size, AdSize::new(300, 250));

        let garbage = CdbSlot {
            cpm: Some(CpmValue::Text("abc".into())),
            display_url: Some("https://x.example/ad".into()),
            ..Default::default()
        };
        assert_eq!(BidSlot::try_from(garbage), Err(SlotError::UnparsableCpm("abc".into())));

        let absent = CdbSlot { ttl: 30, display_url: Some("https://x".into()), ..Default::default() };
        assert_eq!(BidSlot::try_from(absent).unwrap().classify(), SlotClass::Silent);

        assert_eq!(BidSlot::try_from(CdbSlot::default()), Err(SlotError::MissingPayload));
    }

    #[test]
    fn malformed_native_falls_back_to_display_url() {
        let raw = CdbSlot {
            cpm: Some(CpmValue::Number(1.0)),
            native: Some(serde_json::json!({"products": "nope"})),
            display_url: Some("https://x.example/ad".into()),
            ..Default::default()
        };
        let slot = BidSlot::try_from(raw).unwrap();
        assert!(!slot.is_native());
    }
}
