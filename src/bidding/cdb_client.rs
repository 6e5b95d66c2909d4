// src/bidding/cdb_client.rs

use std::future::Future;
use std::sync::{Arc, Mutex};
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::bidding::sender::{BidRequestSender, CdbCallListener};
use crate::config::ConfigManager;
use crate::error::CdbError;
use crate::model::ad_unit::CacheKey;
use crate::model::cdb::{CdbRequest, CdbResponse, Publisher};
use crate::model::remote_config::{RemoteConfigRequest, RemoteConfigResponse};

/// CDB 与远程配置服务的连接参数
#[derive(Debug, Clone)]
pub struct SenderSettings {
    pub cdb_url: String,
    pub config_url: String,
    pub cp_id: String,
    pub bundle_id: String,
    pub sdk_version: String,
    pub profile_id: i32,
    /// 单个请求的超时
    pub timeout: Duration,
}

impl SenderSettings {
    pub fn publisher(&self) -> Publisher {
        Publisher {
            cp_id: self.cp_id.clone(),
            bundle_id: self.bundle_id.clone(),
        }
    }
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            cdb_url: "http://localhost:9001/inapp/v2".to_string(),
            config_url: "http://localhost:9001/v1.0/api/config".to_string(),
            cp_id: "B-000000".to_string(),
            bundle_id: "com.example.app".to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            profile_id: 235,
            timeout: Duration::from_secs(60),
        }
    }
}

/// **基于 reqwest 的 CDB 客户端**
///
/// 每个请求是 `runtime` 上的一个任务，统一放在 `JoinSet` 中以便整体取消。
pub struct HttpBidRequestSender {
    client: Client,
    settings: Arc<SenderSettings>,
    runtime: Handle,
    tasks: Mutex<JoinSet<()>>,
}

impl HttpBidRequestSender {
    pub fn new(settings: SenderSettings, runtime: Handle) -> Self {
        Self {
            client: Client::new(),
            settings: Arc::new(settings),
            runtime,
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // 回收已经结束的任务
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(task, &self.runtime);
    }

    pub fn pending_task_count(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or(0)
    }

    async fn fetch_bids(
        client: &Client,
        settings: &SenderSettings,
        request: &CdbRequest,
    ) -> Result<CdbResponse, CdbError> {
        let response = client.post(&settings.cdb_url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CdbError::Status(status.as_u16()));
        }
        let mut body = response.bytes().await?.to_vec();
        if body.is_empty() {
            return Ok(CdbResponse::default());
        }
        Ok(simd_json::serde::from_slice::<CdbResponse>(&mut body)?)
    }

    async fn fetch_config(
        client: &Client,
        settings: &SenderSettings,
    ) -> Result<RemoteConfigResponse, CdbError> {
        let query = RemoteConfigRequest {
            cp_id: settings.cp_id.clone(),
            bundle_id: settings.bundle_id.clone(),
            sdk_version: settings.sdk_version.clone(),
        };
        let response = client.get(&settings.config_url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CdbError::Status(status.as_u16()));
        }
        let mut body = response.bytes().await?.to_vec();
        if body.is_empty() {
            return Ok(RemoteConfigResponse::default());
        }
        Ok(simd_json::serde::from_slice::<RemoteConfigResponse>(&mut body)?)
    }
}

impl BidRequestSender for HttpBidRequestSender {
    fn send_bid_request(&self, keys: Vec<CacheKey>, listener: Arc<dyn CdbCallListener>) {
        let request = CdbRequest::new(
            self.settings.publisher(),
            &self.settings.sdk_version,
            self.settings.profile_id,
            &keys,
        );
        let client = self.client.clone();
        let settings = self.settings.clone();

        self.spawn(async move {
            listener.on_request_started(&request);
            let result = timeout(settings.timeout, Self::fetch_bids(&client, &settings, &request))
                .await
                .unwrap_or(Err(CdbError::Timeout));
            match result {
                Ok(response) => listener.on_response_received(&request, &response),
                Err(e) => listener.on_request_failed(&request, &e),
            }
        });
    }

    fn send_remote_config_request(&self, config: Arc<ConfigManager>) {
        let client = self.client.clone();
        let settings = self.settings.clone();

        self.spawn(async move {
            let result = timeout(settings.timeout, Self::fetch_config(&client, &settings))
                .await
                .unwrap_or(Err(CdbError::Timeout));
            match result {
                Ok(response) => config.refresh(&response),
                Err(e) => warn!("Unable to process request to remote config: {}", e),
            }
        });
    }

    fn cancel_all_pending_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            debug!(pending = tasks.len(), "cancelling pending cdb tasks");
            tasks.abort_all();
        }
    }
}
