// tests/refill_flow.rs

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Handle;

use inapp_bidcache::bidding::cdb_client::{HttpBidRequestSender, SenderSettings};
use inapp_bidcache::bidding::clock::SystemClock;
use inapp_bidcache::bidding::engine::BidManager;
use inapp_bidcache::bidding::listener::LoggingLifecycleListener;
use inapp_bidcache::config::ConfigManager;
use inapp_bidcache::mock_cdb::{serve_mock_cdb, MockCdbOptions};
use inapp_bidcache::model::ad_unit::{AdSize, AdUnit};
use inapp_bidcache::model::mapper::AdUnitMapper;

async fn start_mock(options: MockCdbOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_mock_cdb(listener, options));
    format!("http://{}", addr)
}

fn bid_manager(base_url: &str, config: Arc<ConfigManager>) -> Arc<BidManager> {
    let settings = SenderSettings {
        cdb_url: format!("{}/inapp/v2", base_url),
        config_url: format!("{}/v1.0/api/config", base_url),
        timeout: Duration::from_secs(5),
        ..SenderSettings::default()
    };
    Arc::new(BidManager::new(
        config,
        Arc::new(SystemClock),
        AdUnitMapper::default(),
        Arc::new(HttpBidRequestSender::new(settings, Handle::current())),
        Arc::new(LoggingLifecycleListener::default()),
    ))
}

fn fixed_bid(cpm: f64) -> MockCdbOptions {
    MockCdbOptions {
        cpm_range: (cpm, cpm),
        delay_ms: (0, 0),
        ..MockCdbOptions::default()
    }
}

fn banner() -> AdUnit {
    AdUnit::Banner { placement_id: "home_banner".into(), size: AdSize::new(320, 50) }
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn prefetched_bid_is_consumed_once_and_refilled() {
    let base_url = start_mock(fixed_bid(1.5)).await;
    let manager = bid_manager(&base_url, Arc::new(ConfigManager::new()));

    manager.prefetch(&[banner()]);
    assert!(wait_until(|| manager.cached_slot_count() == 1).await);

    let slot = manager.get_bid_and_trigger_refill(Some(&banner())).unwrap();
    assert_eq!(slot.price, 1.5);
    assert_eq!(slot.placement_id, "home_banner");

    // 补货完成后可以再次拿到
    assert!(wait_until(|| manager.cached_slot_count() == 1).await);
    assert!(manager.get_bid_and_trigger_refill(Some(&banner())).is_some());
}

#[tokio::test]
async fn remote_kill_switch_blocks_bids() {
    let base_url = start_mock(MockCdbOptions { kill_switch: true, ..fixed_bid(2.0) }).await;
    let config = Arc::new(ConfigManager::new());
    let manager = bid_manager(&base_url, config.clone());

    manager.prefetch(&[banner()]);
    assert!(wait_until(|| config.is_kill_switch_enabled()).await);

    assert!(manager.get_bid_and_trigger_refill(Some(&banner())).is_none());
}

#[tokio::test]
async fn responses_after_stop_are_dropped() {
    let options = MockCdbOptions { delay_ms: (300, 300), ..fixed_bid(1.0) };
    let base_url = start_mock(options).await;
    let manager = bid_manager(&base_url, Arc::new(ConfigManager::new()));

    manager.prefetch(&[banner(), AdUnit::Native { placement_id: "feed_native".into() }]);
    manager.on_application_stopped();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(manager.cached_slot_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumers_share_a_single_bid() {
    // 补货响应慢于所有消费者，避免第二个 bid 提前入缓存
    let base_url = start_mock(MockCdbOptions { delay_ms: (500, 500), ..fixed_bid(1.0) }).await;
    let manager = bid_manager(&base_url, Arc::new(ConfigManager::new()));

    manager.prefetch(&[banner()]);
    assert!(wait_until(|| manager.cached_slot_count() == 1).await);

    let consumers = (0..8).map(|_| {
        let manager = manager.clone();
        tokio::task::spawn_blocking(move || manager.get_bid_and_trigger_refill(Some(&banner())))
    });
    let winners = join_all(consumers)
        .await
        .into_iter()
        .map(|result| result.unwrap())
        .filter(Option::is_some)
        .count();

    assert_eq!(winners, 1);
}
