// src/bidding/cache.rs

use std::collections::HashMap;

use crate::model::ad_unit::CacheKey;
use crate::model::slot::BidSlot;

/// **竞价缓存**
///
/// 每个键最多一个 slot，没有后台淘汰：过期只在读取时判断，
/// 过期的 slot 会一直留着直到被读者消费。不自带锁，由 `BidManager` 统一加锁。
#[derive(Debug, Default)]
pub struct BidCache {
    slots: HashMap<CacheKey, BidSlot>,
}

impl BidCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖写入，后到者胜出
    pub fn upsert(&mut self, key: CacheKey, slot: BidSlot) {
        self.slots.insert(key, slot);
    }

    pub fn peek(&self, key: &CacheKey) -> Option<&BidSlot> {
        self.slots.get(key)
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<BidSlot> {
        self.slots.remove(key)
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }
}
