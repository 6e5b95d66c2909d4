// src/bidding/token_cache.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::bidding::clock::Clock;
use crate::model::ad_unit::AdUnitType;
use crate::model::token::{BidToken, TokenValue};

/// 令牌被解析之后是否保留
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenRetention {
    /// 第一次成功解析即移除（默认）
    #[default]
    SingleUse,
    /// 保留到素材自身过期，允许重复渲染
    UntilExpiry,
}

/// **令牌缓存**：in-house 接入路径中，令牌 → 获胜 bid 的素材
pub struct TokenCache {
    tokens: Mutex<HashMap<BidToken, TokenValue>>,
    clock: Arc<dyn Clock>,
    retention: TokenRetention,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>, retention: TokenRetention) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            clock,
            retention,
        }
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<BidToken, TokenValue>> {
        match self.tokens.lock() {
            Ok(tokens) => tokens,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// 生成新令牌并保存对应素材，顺带清掉已过期、未被兑换的令牌
    pub fn mint(&self, value: TokenValue) -> BidToken {
        let token = BidToken::random();
        let now = self.clock.now_millis();
        let mut tokens = self.tokens();
        let before = tokens.len();
        tokens.retain(|_, entry| !entry.is_expired(now));
        if tokens.len() < before {
            debug!(purged = before - tokens.len(), "expired tokens purged");
        }
        tokens.insert(token, value);
        token
    }

    /// 类型不匹配时返回 None 且保留条目；过期的条目会被清掉
    pub fn resolve(&self, token: Option<&BidToken>, expected: AdUnitType) -> Option<TokenValue> {
        let token = token?;
        let mut tokens = self.tokens();
        let (actual, expired) = tokens
            .get(token)
            .map(|value| (value.ad_unit_type, value.is_expired(self.clock.now_millis())))?;

        if actual != expected {
            debug!(%token, ?expected, ?actual, "token type mismatch");
            return None;
        }
        if expired {
            tokens.remove(token);
            return None;
        }

        match self.retention {
            TokenRetention::SingleUse => tokens.remove(token),
            TokenRetention::UntilExpiry => tokens.get(token).cloned(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::clock::tests::ManualClock;
    use crate::model::slot::Payload;

    fn value(ad_unit_type: AdUnitType, expires_at: i64) -> TokenValue {
        TokenValue {
            price: 1.5,
            payload: Payload::DisplayUrl("https://cdn.example.com/ad.js".into()),
            ad_unit_type,
            expires_at,
        }
    }

    fn cache(retention: TokenRetention) -> (TokenCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at(1_000));
        (TokenCache::new(clock.clone(), retention), clock)
    }

    #[test]
    fn minted_tokens_are_unique() {
        let (cache, _) = cache(TokenRetention::SingleUse);
        let a = cache.mint(value(AdUnitType::Banner, 60_000));
        let b = cache.mint(value(AdUnitType::Banner, 60_000));

        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn type_mismatch_never_leaks_payload() {
        let (cache, _) = cache(TokenRetention::SingleUse);
        let token = cache.mint(value(AdUnitType::Banner, 60_000));

        assert!(cache.resolve(Some(&token), AdUnitType::Interstitial).is_none());
        assert!(cache.resolve(Some(&token), AdUnitType::Native).is_none());
        // 类型不匹配不会消耗令牌
        assert!(cache.resolve(Some(&token), AdUnitType::Banner).is_some());
    }

    #[test]
    fn single_use_tokens_resolve_once() {
        let (cache, _) = cache(TokenRetention::SingleUse);
        let token = cache.mint(value(AdUnitType::Banner, 60_000));

        assert_eq!(cache.resolve(Some(&token), AdUnitType::Banner), Some(value(AdUnitType::Banner, 60_000)));
        assert!(cache.resolve(Some(&token), AdUnitType::Banner).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn retained_tokens_resolve_until_expiry() {
        let (cache, clock) = cache(TokenRetention::UntilExpiry);
        let token = cache.mint(value(AdUnitType::Native, 60_000));

        assert!(cache.resolve(Some(&token), AdUnitType::Native).is_some());
        assert!(cache.resolve(Some(&token), AdUnitType::Native).is_some());

        clock.set(60_000);
        assert!(cache.resolve(Some(&token), AdUnitType::Native).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn unredeemed_tokens_are_purged_once_expired() {
        for retention in [TokenRetention::SingleUse, TokenRetention::UntilExpiry] {
            let (cache, clock) = cache(retention);
            for _ in 0..1_000 {
                cache.mint(value(AdUnitType::Banner, 2_000));
            }
            let fresh = cache.mint(value(AdUnitType::Banner, 5_000));
            assert_eq!(cache.len(), 1_001);

            clock.set(1_000_000_000);
            let latest = cache.mint(value(AdUnitType::Banner, 2_000_000_000));

            assert_eq!(cache.len(), 1);
            assert!(cache.resolve(Some(&fresh), AdUnitType::Banner).is_none());
            assert!(cache.resolve(Some(&latest), AdUnitType::Banner).is_some());
        }
    }

    #[test]
    fn unknown_or_missing_token_resolves_to_none() {
        let (cache, _) = cache(TokenRetention::SingleUse);

        assert!(cache.resolve(None, AdUnitType::Banner).is_none());
        assert!(cache.resolve(Some(&BidToken::random()), AdUnitType::Banner).is_none());
    }
}
