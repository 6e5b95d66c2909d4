// src/model/token.rs

use serde::{Serialize, Deserialize};
use std::fmt;
use uuid::Uuid;

use crate::model::ad_unit::AdUnitType;
use crate::model::slot::{BidSlot, Payload};

/// 不透明的一次性令牌，in-house 接入方用它换取素材
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct BidToken(Uuid);

impl BidToken {
    pub fn random() -> Self {
        BidToken(Uuid::new_v4())
    }
}

impl fmt::Display for BidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for BidToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(BidToken)
    }
}

/// 令牌对应的素材，过期时间由原始 slot 推导
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenValue {
    pub price: f64,
    pub payload: Payload,
    pub ad_unit_type: AdUnitType,
    pub expires_at: i64,
}

impl TokenValue {
    pub fn from_slot(slot: &BidSlot, ad_unit_type: AdUnitType) -> Self {
        Self {
            price: slot.price,
            payload: slot.payload.clone(),
            ad_unit_type,
            expires_at: slot.expires_at(),
        }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }
}
