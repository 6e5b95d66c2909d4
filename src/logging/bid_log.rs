// src/logging/bid_log.rs

use serde::{Serialize, Deserialize};
use chrono::Utc;

/// **竞价生命周期日志**
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BidEventLog {
    pub timestamp: String,             // 记录时间
    pub log_type: String,              // 日志类型，如 "cdb_call_started"
    pub request_id: Option<String>,    // CDB 请求 ID
    pub placement_ids: Vec<String>,    // 涉及的广告位
    pub slot_count: usize,             // 响应中的 slot 数量
    pub price: Option<f64>,            // 被消费 bid 的价格
    pub time_to_next_call: Option<i64>,
    pub error: Option<String>,
}

impl BidEventLog {
    /// **创建生命周期日志**
    pub fn new(log_type: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            log_type: log_type.to_string(),
            request_id: None,
            placement_ids: Vec::new(),
            slot_count: 0,
            price: None,
            time_to_next_call: None,
            error: None,
        }
    }

    pub fn with_request(mut self, request_id: &str, placement_ids: Vec<&str>) -> Self {
        self.request_id = Some(request_id.to_string());
        self.placement_ids = placement_ids.into_iter().map(String::from).collect();
        self
    }

    pub fn with_response(mut self, slot_count: usize, time_to_next_call: i64) -> Self {
        self.slot_count = slot_count;
        self.time_to_next_call = Some(time_to_next_call);
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// **记录被消费的 bid**
    pub fn with_consumed(mut self, placement_id: &str, price: f64) -> Self {
        self.placement_ids = vec![placement_id.to_string()];
        self.price = Some(price);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
