// src/bidding/listener.rs

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::CdbError;
use crate::logging::bid_log::BidEventLog;
use crate::logging::runtime_logger::RuntimeLogger;
use crate::model::ad_unit::CacheKey;
use crate::model::cdb::{CdbRequest, CdbResponse};
use crate::model::slot::BidSlot;

/// **竞价生命周期通知**，只用于观测，不影响引擎流程
pub trait BidLifecycleListener: Send + Sync {
    fn on_cdb_call_started(&self, request: &CdbRequest);
    fn on_cdb_call_finished(&self, request: &CdbRequest, response: &CdbResponse);
    fn on_cdb_call_failed(&self, request: &CdbRequest, error: &CdbError);
    fn on_bid_consumed(&self, key: &CacheKey, slot: &BidSlot);
}

/// 默认实现：输出 tracing 事件，挂载了 RuntimeLogger 时同时写运行日志
#[derive(Default)]
pub struct LoggingLifecycleListener {
    runtime_logger: Option<Arc<RuntimeLogger>>,
}

impl LoggingLifecycleListener {
    pub fn new(runtime_logger: Option<Arc<RuntimeLogger>>) -> Self {
        Self { runtime_logger }
    }

    fn emit(&self, level: &str, log: BidEventLog) {
        if let Some(logger) = &self.runtime_logger {
            logger.log_nowait(level, &log.to_json());
        }
    }
}

impl BidLifecycleListener for LoggingLifecycleListener {
    fn on_cdb_call_started(&self, request: &CdbRequest) {
        debug!(request_id = %request.id, slots = request.slots.len(), "cdb call started");
        self.emit(
            "DEBUG",
            BidEventLog::new("cdb_call_started").with_request(&request.id, request.placement_ids()),
        );
    }

    fn on_cdb_call_finished(&self, request: &CdbRequest, response: &CdbResponse) {
        info!(
            request_id = %request.id,
            slots = response.slots.len(),
            time_to_next_call = response.time_to_next_call,
            "cdb call finished"
        );
        self.emit(
            "INFO",
            BidEventLog::new("cdb_call_finished")
                .with_request(&request.id, request.placement_ids())
                .with_response(response.slots.len(), response.time_to_next_call),
        );
    }

    fn on_cdb_call_failed(&self, request: &CdbRequest, error: &CdbError) {
        warn!(request_id = %request.id, error = %error, "cdb call failed");
        self.emit(
            "ERROR",
            BidEventLog::new("cdb_call_failed")
                .with_request(&request.id, request.placement_ids())
                .with_error(&error.to_string()),
        );
    }

    fn on_bid_consumed(&self, key: &CacheKey, slot: &BidSlot) {
        debug!(cache_key = %key, price = slot.price, "bid consumed");
        self.emit(
            "INFO",
            BidEventLog::new("bid_consumed").with_consumed(key.placement_id(), slot.price),
        );
    }
}
