// src/bidding/engine.rs

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

use crate::bidding::cache::BidCache;
use crate::bidding::clock::Clock;
use crate::bidding::listener::BidLifecycleListener;
use crate::bidding::sender::{BidRequestSender, CdbCallListener};
use crate::config::ConfigManager;
use crate::error::CdbError;
use crate::model::ad_unit::{AdUnit, CacheKey};
use crate::model::cdb::{CdbRequest, CdbResponse};
use crate::model::mapper::AdUnitMapper;
use crate::model::slot::{BidSlot, SlotClass};

/// 缓存、backoff 与会话编号共用一把锁
#[derive(Debug, Default)]
struct CacheState {
    cache: BidCache,
    /// 服务端下发的 backoff：在此时间（毫秒）之前不发起补货请求，所有键共享
    next_call_not_before: i64,
    /// `on_application_stopped` 每调用一次加一，旧会话的回调一律丢弃
    session: u64,
}

impl CacheState {
    fn may_call(&self, now_millis: i64) -> bool {
        now_millis >= self.next_call_not_before
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// **竞价缓存与补货引擎**
///
/// 读取是破坏性的：命中即从缓存移除，同时按 backoff 异步补货。
/// 锁只覆盖 peek → 分类 → 移除/写入 这段同步逻辑，网络请求在锁外发出。
pub struct BidManager {
    state: Arc<Mutex<CacheState>>,
    config: Arc<ConfigManager>,
    clock: Arc<dyn Clock>,
    mapper: AdUnitMapper,
    sender: Arc<dyn BidRequestSender>,
    lifecycle: Arc<dyn BidLifecycleListener>,
}

impl BidManager {
    pub fn new(
        config: Arc<ConfigManager>,
        clock: Arc<dyn Clock>,
        mapper: AdUnitMapper,
        sender: Arc<dyn BidRequestSender>,
        lifecycle: Arc<dyn BidLifecycleListener>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            config,
            clock,
            mapper,
            sender,
            lifecycle,
        }
    }

    /// 返回上次拉取到的 bid，并为下一次调用异步补货。
    ///
    /// 以下情况返回 None：kill switch 打开、广告位非法、缓存中没有 bid、
    /// bid 是未过期的静默 bid、bid 已过期。返回值只能使用一次，
    /// 紧接着的第二次调用在补货完成前都会得到 None。
    pub fn get_bid_and_trigger_refill(&self, ad_unit: Option<&AdUnit>) -> Option<BidSlot> {
        if self.kill_switch_engaged() {
            return None;
        }
        let Some(key) = self.mapper.map(ad_unit) else {
            error!("Valid AdUnit is required.");
            return None;
        };

        let (consumed, refill) = {
            let mut state = lock(&self.state);
            let now = self.clock.now_millis();
            let peeked = state.cache.peek(&key).map(|slot| (slot.classify(), slot.is_expired(now)));

            match peeked {
                None => (None, state.may_call(now).then_some(state.session)),
                // 静默窗口内：不消费、不补货，缓存条目本身就是 backoff
                Some((SlotClass::Silent, false)) => return None,
                Some((class, expired)) => {
                    let slot = state.cache.remove(&key);
                    let refill = state.may_call(now).then_some(state.session);
                    (slot.map(|slot| (slot, class == SlotClass::Valid && !expired)), refill)
                }
            }
        };

        if let Some((slot, _)) = &consumed {
            self.lifecycle.on_bid_consumed(&key, slot);
        }
        if let Some(session) = refill {
            self.send_bid_request(vec![key], session);
        }

        let (slot, usable) = consumed?;
        usable.then_some(slot)
    }

    /// 预热：先刷新一次远程配置，再按块发起请求，不受 backoff 限制
    pub fn prefetch(&self, ad_units: &[AdUnit]) {
        let chunks = self.mapper.map_to_chunks(ad_units);

        self.sender.send_remote_config_request(self.config.clone());

        let session = lock(&self.state).session;
        for chunk in chunks {
            self.send_bid_request(chunk, session);
        }
    }

    /// 取消所有进行中的请求，之后到达的响应不会再修改缓存。可重复调用
    ///
    /// 取消在持锁期间完成：释放锁之后发出的补货属于新会话，不会被这次取消误杀。
    pub fn on_application_stopped(&self) {
        let mut state = lock(&self.state);
        state.session += 1;
        self.sender.cancel_all_pending_tasks();
    }

    pub fn cached_slot_count(&self) -> usize {
        lock(&self.state).cache.count()
    }

    pub fn next_call_not_before(&self) -> i64 {
        lock(&self.state).next_call_not_before
    }

    pub fn mapper(&self) -> &AdUnitMapper {
        &self.mapper
    }

    fn kill_switch_engaged(&self) -> bool {
        self.config.is_kill_switch_enabled()
    }

    fn send_bid_request(&self, keys: Vec<CacheKey>, session: u64) {
        if self.kill_switch_engaged() {
            return;
        }
        let listener = Arc::new(CdbListener {
            state: self.state.clone(),
            clock: self.clock.clone(),
            mapper: self.mapper.clone(),
            lifecycle: self.lifecycle.clone(),
            session,
        });
        self.sender.send_bid_request(keys, listener);
    }
}

/// 单个补货请求的回调，记住发起时的会话编号
struct CdbListener {
    state: Arc<Mutex<CacheState>>,
    clock: Arc<dyn Clock>,
    mapper: AdUnitMapper,
    lifecycle: Arc<dyn BidLifecycleListener>,
    session: u64,
}

impl CdbListener {
    fn is_stale(&self) -> bool {
        lock(&self.state).session != self.session
    }
}

impl CdbCallListener for CdbListener {
    fn on_request_started(&self, request: &CdbRequest) {
        if self.is_stale() {
            return;
        }
        self.lifecycle.on_cdb_call_started(request);
    }

    fn on_response_received(&self, request: &CdbRequest, response: &CdbResponse) {
        {
            let mut state = lock(&self.state);
            if state.session != self.session {
                debug!(request_id = %request.id, "dropping cdb response of a stopped session");
                return;
            }
            let now = self.clock.now_millis();

            for raw in &response.slots {
                let slot = BidSlot::try_from(raw.clone()).and_then(|slot| slot.validate().map(|()| slot));
                match slot {
                    Ok(mut slot) => {
                        slot.promote_default_ttl();
                        slot.download_timestamp = now;
                        let key = self.mapper.key_for_slot(&slot);
                        state.cache.upsert(key, slot);
                    }
                    Err(e) => debug!(request_id = %request.id, "slot rejected: {}", e),
                }
            }

            if response.time_to_next_call > 0 {
                state.next_call_not_before = now.saturating_add(response.time_to_next_call.saturating_mul(1000));
            }
        }
        self.lifecycle.on_cdb_call_finished(request, response);
    }

    fn on_request_failed(&self, request: &CdbRequest, error: &CdbError) {
        if self.is_stale() {
            return;
        }
        self.lifecycle.on_cdb_call_failed(request, error);
    }
}
