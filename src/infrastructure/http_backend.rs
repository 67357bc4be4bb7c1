// HTTP backend implementation
use crate::application::backend::{
    BackendDefaults, ConfigUpdate, DownloadKind, ExportRange, FetchError, HistoryBatch,
    MonitorBackend, ScoreQuery,
};
use crate::domain::telemetry::{MonitorMode, ScoredSample};
use crate::infrastructure::wire::{config_body, format_contamination, RowsPayload, WireConfig};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    /// Cache-busting parameter, matching what browsers would send
    fn cache_buster() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn score_params(query: &ScoreQuery) -> String {
        format!(
            "n={}&c={}&model={}",
            query.n,
            format_contamination(query.contamination),
            urlencoding::encode(&query.model)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = request.send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, FetchError> {
        let url = self.url(path_and_query);
        let request = self.client.get(&url).header("Accept", "application/json");
        let response = self.send(request, &url).await?;

        response.json::<T>().await.map_err(|e| FetchError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })
    }

    async fn post(&self, path: &str, body: Option<serde_json::Value>) -> Result<(), FetchError> {
        let url = self.url(path);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request, &url).await?;
        Ok(())
    }

    fn decode_error(url: String) -> impl FnOnce(String) -> FetchError {
        move |message| FetchError::Decode { url, message }
    }
}

#[async_trait]
impl MonitorBackend for HttpBackend {
    async fn history(&self, n: u32) -> Result<HistoryBatch, FetchError> {
        let path = format!("/history?n={}&_t={}", n, Self::cache_buster());
        let payload: RowsPayload = self.get_json(&path).await?;
        payload.into_history().map_err(Self::decode_error(self.url(&path)))
    }

    async fn scores_for_window(&self, query: &ScoreQuery) -> Result<Vec<ScoredSample>, FetchError> {
        let path = format!(
            "/scores_for_window?{}&_t={}",
            Self::score_params(query),
            Self::cache_buster()
        );
        let payload: RowsPayload = self.get_json(&path).await?;
        payload.into_scored().map_err(Self::decode_error(self.url(&path)))
    }

    async fn anomalies(&self, query: &ScoreQuery) -> Result<Vec<ScoredSample>, FetchError> {
        let path = format!(
            "/anomalies?{}&_t={}",
            Self::score_params(query),
            Self::cache_buster()
        );
        let payload: RowsPayload = self.get_json(&path).await?;
        payload.into_scored().map_err(Self::decode_error(self.url(&path)))
    }

    async fn defaults(&self) -> Result<BackendDefaults, FetchError> {
        let path = format!("/config?_t={}", Self::cache_buster());
        let wire: WireConfig = self.get_json(&path).await?;
        Ok(wire.into())
    }

    async fn persist_config(&self, update: &ConfigUpdate) -> Result<(), FetchError> {
        self.post("/config", Some(config_body(update))).await
    }

    async fn set_mode(&self, mode: MonitorMode) -> Result<(), FetchError> {
        self.post("/mode", Some(json!({ "mode": mode.as_str() }))).await
    }

    async fn replay_step(&self, delta: i64) -> Result<(), FetchError> {
        self.post("/replay/step", Some(json!({ "delta": delta }))).await
    }

    async fn replay_reset(&self) -> Result<(), FetchError> {
        self.post("/replay/reset", None).await
    }

    async fn replay_seek(&self, ts: DateTime<Utc>) -> Result<(), FetchError> {
        let path = format!("/replay/seek?ts={}", urlencoding::encode(&iso_utc(ts)));
        let url = self.url(&path);
        self.send(self.client.get(&url), &url).await?;
        Ok(())
    }

    async fn download(
        &self,
        kind: DownloadKind,
        range: &ExportRange,
        query: &ScoreQuery,
    ) -> Result<Bytes, FetchError> {
        let range_params = match range {
            ExportRange::Last(n) => format!("n={}", n),
            ExportRange::Between { from, to } => format!(
                "from={}&to={}",
                urlencoding::encode(&iso_utc(*from)),
                urlencoding::encode(&iso_utc(*to))
            ),
        };
        let path = format!(
            "{}?{}&c={}&model={}",
            kind.path(),
            range_params,
            format_contamination(query.contamination),
            urlencoding::encode(&query.model)
        );
        let url = self.url(&path);
        let response = self.send(self.client.get(&url), &url).await?;

        response.bytes().await.map_err(|e| FetchError::Transport {
            url,
            message: e.to_string(),
        })
    }
}

fn iso_utc(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
