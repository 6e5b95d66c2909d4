// src/bidding/in_house.rs

use serde::{Serialize, Deserialize};
use std::sync::Arc;
use tracing::debug;

use crate::bidding::engine::BidManager;
use crate::bidding::token_cache::TokenCache;
use crate::model::ad_unit::{AdUnit, AdUnitType};
use crate::model::native::NativeAssets;
use crate::model::slot::Payload;
use crate::model::token::{BidToken, TokenValue};

/// **in-house 接入的竞价结果**：价格 + 换取素材用的令牌
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InHouseBidResponse {
    pub price: f64,
    pub token: Option<BidToken>,
    pub is_bid_success: bool,
}

impl InHouseBidResponse {
    pub fn no_bid() -> Self {
        Self {
            price: 0.0,
            token: None,
            is_bid_success: false,
        }
    }
}

pub struct InHouse {
    bid_manager: Arc<BidManager>,
    token_cache: Arc<TokenCache>,
}

impl InHouse {
    pub fn new(bid_manager: Arc<BidManager>, token_cache: Arc<TokenCache>) -> Self {
        Self {
            bid_manager,
            token_cache,
        }
    }

    /// 消费一个 bid 并为其签发令牌；没有可用 bid 时返回 `no_bid`
    pub fn get_bid_response(&self, ad_unit: Option<&AdUnit>) -> InHouseBidResponse {
        let Some(ad_unit) = ad_unit else {
            return InHouseBidResponse::no_bid();
        };
        let Some(slot) = self.bid_manager.get_bid_and_trigger_refill(Some(ad_unit)) else {
            return InHouseBidResponse::no_bid();
        };

        let token = self
            .token_cache
            .mint(TokenValue::from_slot(&slot, ad_unit.ad_unit_type()));
        debug!(%token, placement_id = %slot.placement_id, price = slot.price, "in-house bid token minted");

        InHouseBidResponse {
            price: slot.price,
            token: Some(token),
            is_bid_success: true,
        }
    }

    pub fn get_token_value(&self, token: Option<&BidToken>, ad_unit_type: AdUnitType) -> Option<TokenValue> {
        self.token_cache.resolve(token, ad_unit_type)
    }

    /// banner / 插屏令牌对应的展示 URL
    pub fn get_display_url(&self, token: Option<&BidToken>, ad_unit_type: AdUnitType) -> Option<String> {
        match self.token_cache.resolve(token, ad_unit_type)?.payload {
            Payload::DisplayUrl(url) => Some(url),
            Payload::Native(_) => None,
        }
    }

    pub fn get_native_token_value(&self, token: Option<&BidToken>) -> Option<NativeAssets> {
        match self.token_cache.resolve(token, AdUnitType::Native)?.payload {
            Payload::Native(assets) => Some(assets),
            Payload::DisplayUrl(_) => None,
        }
    }
}
