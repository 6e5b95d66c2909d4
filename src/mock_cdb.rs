use axum::{extract::State, routing::{get, post}, Json, Router};
use rand::Rng;
use serde_json::json;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};
use tracing::info;

use crate::model::cdb::{CdbRequest, CdbRequestSlot, CdbResponse, CdbSlot, CpmValue};
use crate::model::remote_config::RemoteConfigResponse;

/// Mock CDB 的行为参数
#[derive(Debug, Clone)]
pub struct MockCdbOptions {
    /// 出价范围（min..max），相等时为固定出价
    pub cpm_range: (f64, f64),
    pub ttl: i64,
    pub time_to_next_call: i64,
    /// 模拟处理延迟范围（毫秒）
    pub delay_ms: (u64, u64),
    pub kill_switch: bool,
}

impl Default for MockCdbOptions {
    fn default() -> Self {
        Self {
            cpm_range: (0.5, 3.0),
            ttl: 300,
            time_to_next_call: 0,
            delay_ms: (100, 300),
            kill_switch: false,
        }
    }
}

fn pick_f64(rng: &mut impl Rng, (min, max): (f64, f64)) -> f64 {
    if min < max {
        rng.gen_range(min..max)
    } else {
        min
    }
}

fn pick_u64(rng: &mut impl Rng, (min, max): (u64, u64)) -> u64 {
    if min < max {
        rng.gen_range(min..max)
    } else {
        min
    }
}

/// 解析 "320x50" 形式的尺寸
fn parse_size(size: &str) -> (i32, i32) {
    size.split_once('x')
        .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
        .unwrap_or((0, 0))
}

fn mock_native_assets(imp_id: &str) -> serde_json::Value {
    json!({
        "products": [{
            "title": "Mock Native Ad",
            "description": "Served by the mock CDB",
            "price": "$10",
            "clickUrl": format!("http://cdb-tracker.local/click?imp={}", imp_id),
            "callToAction": "Install",
            "image": {"url": "http://example.com/native.jpg", "height": 400, "width": 400}
        }],
        "advertiser": {
            "description": "Mock Advertiser",
            "domain": "example.com",
            "logo": {"url": "http://example.com/logo.png", "height": 50, "width": 50},
            "logoClickUrl": "http://example.com"
        },
        "privacy": {
            "optoutClickUrl": "http://example.com/privacy",
            "optoutImageUrl": "http://example.com/privacy.png",
            "longLegalText": ""
        },
        "impressionPixels": [{"url": format!("http://cdb-tracker.local/impression?imp={}", imp_id)}]
    })
}

/// 根据请求的 slot 生成出价：原生广告返回 native 素材，其余返回展示 URL
fn build_slot(options: &MockCdbOptions, slot: &CdbRequestSlot) -> CdbSlot {
    let mut rng = rand::thread_rng();
    let (width, height) = slot.sizes.first().map(|s| parse_size(s)).unwrap_or((0, 0));
    let cpm = pick_f64(&mut rng, options.cpm_range);
    let is_native = slot.is_native.unwrap_or(false);

    CdbSlot {
        placement_id: Some(slot.placement_id.clone()),
        imp_id: Some(slot.imp_id.clone()),
        cpm: Some(CpmValue::Text(format!("{:.2}", cpm))),
        currency: Some("USD".to_string()),
        width,
        height,
        ttl: options.ttl,
        display_url: (!is_native).then(|| format!("http://cdb-tracker.local/ad.js?imp={}", slot.imp_id)),
        native: is_native.then(|| mock_native_assets(&slot.imp_id)),
    }
}

/// 模拟 CDB 竞价响应
async fn handle_cdb_bid(
    State(options): State<Arc<MockCdbOptions>>,
    Json(request): Json<CdbRequest>,
) -> Json<CdbResponse> {
    info!(
        "Mock CDB received CdbRequest: id={}, slot_count={}",
        request.id,
        request.slots.len()
    );

    let delay_ms = pick_u64(&mut rand::thread_rng(), options.delay_ms);
    sleep(Duration::from_millis(delay_ms)).await;

    let slots = request.slots.iter().map(|slot| build_slot(&options, slot)).collect();
    Json(CdbResponse {
        slots,
        time_to_next_call: options.time_to_next_call,
    })
}

async fn handle_remote_config(State(options): State<Arc<MockCdbOptions>>) -> Json<RemoteConfigResponse> {
    Json(RemoteConfigResponse {
        kill_switch: Some(options.kill_switch),
        csm_enabled: Some(false),
        ..Default::default()
    })
}

pub fn router(options: MockCdbOptions) -> Router {
    Router::new()
        .route("/inapp/v2", post(handle_cdb_bid))
        .route("/v1.0/api/config", get(handle_remote_config))
        .with_state(Arc::new(options))
}

/// 在已绑定的 listener 上运行 Mock CDB
pub async fn serve_mock_cdb(listener: TcpListener, options: MockCdbOptions) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Mock CDB running at http://{}", addr);
    }
    axum::serve(listener, router(options)).await
}

/// 启动 Mock CDB 服务
/// 服务监听指定端口（例如 9001），路由为 `/inapp/v2` 与 `/v1.0/api/config`
pub async fn start_mock_cdb_server(port: u16, options: MockCdbOptions) -> io::Result<()> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    serve_mock_cdb(listener, options).await
}
