// src/bidding/sender.rs

use std::sync::Arc;

use crate::config::ConfigManager;
use crate::error::CdbError;
use crate::model::ad_unit::CacheKey;
use crate::model::cdb::{CdbRequest, CdbResponse};

/// **单个 CDB 请求的回调**
///
/// 每个请求先 `on_request_started`，之后 `on_response_received` 与
/// `on_request_failed` 二者恰好触发其一（请求被取消时都不触发）。
pub trait CdbCallListener: Send + Sync {
    fn on_request_started(&self, request: &CdbRequest);
    fn on_response_received(&self, request: &CdbRequest, response: &CdbResponse);
    fn on_request_failed(&self, request: &CdbRequest, error: &CdbError);
}

/// **远程竞价客户端**，所有方法都不阻塞调用方
pub trait BidRequestSender: Send + Sync {
    /// 为一组缓存键发起一次异步竞价请求
    fn send_bid_request(&self, keys: Vec<CacheKey>, listener: Arc<dyn CdbCallListener>);

    /// 拉取远程配置，成功后写回 `config`
    fn send_remote_config_request(&self, config: Arc<ConfigManager>);

    /// 取消所有进行中和排队的请求
    ///
    /// 引擎会在持有缓存锁时调用，实现里不能同步回调 `CdbCallListener`
    fn cancel_all_pending_tasks(&self);
}
