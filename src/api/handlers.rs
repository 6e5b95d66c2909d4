use axum::{extract::State, http::StatusCode, Json};
use serde::{Serialize, Deserialize};
use serde_json::json;
use std::sync::Arc;

use crate::api::AppState;
use crate::bidding::in_house::InHouseBidResponse;
use crate::model::ad_unit::{AdUnit, AdUnitType};
use crate::model::token::{BidToken, TokenValue};

/// 用令牌换取素材的请求体
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenQuery {
    pub token: BidToken,
    pub ad_unit_type: AdUnitType,
}

/// **处理 in-house 竞价请求**：命中缓存时返回价格与令牌，否则 `is_bid_success = false`
pub async fn handle_inhouse_bid(
    State(state): State<Arc<AppState>>,
    Json(ad_unit): Json<AdUnit>,
) -> Json<InHouseBidResponse> {
    let response = state.in_house.get_bid_response(Some(&ad_unit));

    if let Some(runtime_logger) = &state.runtime_logger {
        let event = if response.is_bid_success { "inhouse_bid_success" } else { "inhouse_no_bid" };
        runtime_logger
            .log(
                "INFO",
                &json!({
                    "event": event,
                    "placement_id": ad_unit.placement_id(),
                    "price": response.price,
                })
                .to_string(),
            )
            .await;
    }

    Json(response)
}

/// **令牌换素材**：未知、过期、已使用或类型不匹配的令牌返回 204
pub async fn handle_token_value(
    State(state): State<Arc<AppState>>,
    Json(query): Json<TokenQuery>,
) -> Result<Json<TokenValue>, StatusCode> {
    match state.in_house.get_token_value(Some(&query.token), query.ad_unit_type) {
        Some(value) => Ok(Json(value)),
        None => {
            if let Some(runtime_logger) = &state.runtime_logger {
                runtime_logger
                    .log("WARN", &json!({ "event": "token_rejected", "token": query.token.to_string() }).to_string())
                    .await;
            }
            Err(StatusCode::NO_CONTENT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::clock::SystemClock;
    use crate::bidding::engine::BidManager;
    use crate::bidding::in_house::InHouse;
    use crate::bidding::listener::LoggingLifecycleListener;
    use crate::bidding::sender::{BidRequestSender, CdbCallListener};
    use crate::bidding::token_cache::{TokenCache, TokenRetention};
    use crate::config::ConfigManager;
    use crate::model::ad_unit::{AdSize, CacheKey};
    use crate::model::mapper::AdUnitMapper;

    /// 从不返回的 sender：缓存永远是空的
    struct SilentSender;

    impl BidRequestSender for SilentSender {
        fn send_bid_request(&self, _keys: Vec<CacheKey>, _listener: Arc<dyn CdbCallListener>) {}
        fn send_remote_config_request(&self, _config: Arc<ConfigManager>) {}
        fn cancel_all_pending_tasks(&self) {}
    }

    fn state() -> Arc<AppState> {
        let clock = Arc::new(SystemClock);
        let manager = BidManager::new(
            Arc::new(ConfigManager::new()),
            clock.clone(),
            AdUnitMapper::default(),
            Arc::new(SilentSender),
            Arc::new(LoggingLifecycleListener::default()),
        );
        let token_cache = TokenCache::new(clock, TokenRetention::SingleUse);
        Arc::new(AppState {
            in_house: Arc::new(InHouse::new(Arc::new(manager), Arc::new(token_cache))),
            runtime_logger: None,
        })
    }

    #[tokio::test]
    async fn empty_cache_answers_no_bid() {
        let ad_unit = AdUnit::Banner { placement_id: "home".into(), size: AdSize::new(320, 50) };
        let Json(response) = handle_inhouse_bid(State(state()), Json(ad_unit)).await;

        assert_eq!(response, InHouseBidResponse::no_bid());
    }

    #[tokio::test]
    async fn unknown_token_is_no_content() {
        let query = TokenQuery { token: BidToken::random(), ad_unit_type: AdUnitType::Banner };
        let result = handle_token_value(State(state()), Json(query)).await;

        assert_eq!(result.err(), Some(StatusCode::NO_CONTENT));
    }

    #[test]
    fn token_query_wire_format() {
        let query: TokenQuery = serde_json::from_str(
            r#"{"token":"67e55044-10b1-426f-9247-bb680e5fe0c8","ad_unit_type":3}"#,
        )
        .unwrap();
        assert_eq!(query.ad_unit_type, AdUnitType::Native);
    }
}
