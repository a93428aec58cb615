//! REST client for the trading journal backend.
//!
//! Thin wrappers over the endpoints the chart pages call. Non-2xx responses
//! become [`AnnotatorError::Server`] carrying the backend's `detail` text.

use crate::error::{AnnotatorError, AnnotatorResult};
use crate::overlay::{AiAnalysis, LessonRecord, TeachingBackend};
use crate::persistence::{AnnotationRecord, AnnotationStore, first_record};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Trade {
    pub id: i64,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub r_multiple: Option<f64>,
    #[serde(default)]
    pub setup_id: Option<i64>,
    #[serde(default)]
    pub entry_method_id: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A setup or entry method as listed by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NamedItem {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeQuery {
    pub limit: u32,
    pub offset: u32,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDir>,
    pub filters: Vec<(String, String)>,
}

impl Default for TradeQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            sort_by: None,
            sort_dir: None,
            filters: Vec::new(),
        }
    }
}

impl TradeQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = vec![
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ];
        if let Some(sort_by) = &self.sort_by {
            q.push(("sort_by".to_string(), sort_by.clone()));
        }
        if let Some(dir) = self.sort_dir {
            q.push(("sort_dir".to_string(), dir.as_str().to_string()));
        }
        q.extend(self.filters.iter().cloned());
        q
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsView {
    Overview,
    EntryMethods,
    TimePatterns,
    DirectionPatterns,
}

impl AnalyticsView {
    pub fn path(&self) -> &'static str {
        match self {
            AnalyticsView::Overview => "/analytics/overview",
            AnalyticsView::EntryMethods => "/analytics/entry-methods",
            AnalyticsView::TimePatterns => "/analytics/time-patterns",
            AnalyticsView::DirectionPatterns => "/analytics/direction-patterns",
        }
    }
}

/// Query for `/trades/{id}/link-setup`. Both keys are always present; a
/// missing id is sent as an empty value, which the backend reads as unlink.
pub fn link_setup_query(setup_id: Option<i64>, entry_method_id: Option<i64>) -> [(&'static str, String); 2] {
    let value = |id: Option<i64>| id.map(|v| v.to_string()).unwrap_or_default();
    [("setup_id", value(setup_id)), ("entry_method_id", value(entry_method_id))]
}

/// Pull a human-readable message out of an error body.
///
/// Handles `{"detail": "..."}`, validation lists of `{"msg": ...}`, and plain
/// text.
pub fn extract_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(s)) => return s.clone(),
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Accepts either a bare analysis or one wrapped under `annotations`.
pub fn parse_analysis(value: Value) -> AnnotatorResult<AiAnalysis> {
    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string);
    let mut analysis: AiAnalysis = match value.get("annotations") {
        Some(inner) if inner.is_object() => serde_json::from_value(inner.clone())?,
        _ => serde_json::from_value(value)?,
    };
    if analysis.reasoning.is_none() {
        analysis.reasoning = reasoning;
    }
    Ok(analysis)
}

#[derive(Clone)]
pub struct JournalClient {
    base_url: String,
    http: reqwest::Client,
}

impl JournalClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> AnnotatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn chart_url(&self, trade_id: i64) -> String {
        self.url(&format!("/charts/by-trade/{trade_id}"))
    }

    async fn check(resp: reqwest::Response) -> AnnotatorResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AnnotatorError::Server {
            status: status.as_u16(),
            detail: extract_detail(&body),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> AnnotatorResult<T> {
        debug!("GET {path}");
        let resp = self.http.get(self.url(path)).query(query).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn get_trade(&self, trade_id: i64) -> AnnotatorResult<Trade> {
        self.get_json(&format!("/trades/{trade_id}"), &[]).await
    }

    pub async fn list_trades(&self, query: &TradeQuery) -> AnnotatorResult<Value> {
        self.get_json("/trades", &query.to_query()).await
    }

    pub async fn list_setups(&self) -> AnnotatorResult<Vec<NamedItem>> {
        self.get_json("/setups", &[]).await
    }

    pub async fn list_entry_methods(&self) -> AnnotatorResult<Vec<NamedItem>> {
        self.get_json("/entry-methods", &[]).await
    }

    /// Link a setup and entry method. Both parameters are always sent; an
    /// empty value unlinks.
    pub async fn link_setup(
        &self,
        trade_id: i64,
        setup_id: Option<i64>,
        entry_method_id: Option<i64>,
    ) -> AnnotatorResult<Value> {
        let query = link_setup_query(setup_id, entry_method_id);
        let resp = self
            .http
            .post(self.url(&format!("/trades/{trade_id}/link-setup")))
            .query(&query)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn chart_bytes(&self, trade_id: i64) -> AnnotatorResult<Vec<u8>> {
        let resp = self.http.get(self.chart_url(trade_id)).send().await?;
        Ok(Self::check(resp).await?.bytes().await?.to_vec())
    }

    pub async fn analytics(&self, view: AnalyticsView) -> AnnotatorResult<Value> {
        self.get_json(view.path(), &[]).await
    }

    /// The trade's annotation record, if one exists. The endpoint may answer
    /// with a bare record or a list.
    pub async fn get_annotation(&self, trade_id: i64) -> AnnotatorResult<Option<AnnotationRecord>> {
        let resp = self
            .http
            .get(self.url(&format!("/annotations/trade/{trade_id}")))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value: Value = Self::check(resp).await?.json().await?;
        first_record(value)
    }

    pub async fn create_annotation(&self, record: &AnnotationRecord) -> AnnotatorResult<AnnotationRecord> {
        info!("POST /annotations for trade {}", record.trade_id);
        let resp = self.http.post(self.url("/annotations")).json(record).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    pub async fn update_annotation(
        &self,
        id: i64,
        record: &AnnotationRecord,
    ) -> AnnotatorResult<AnnotationRecord> {
        info!("PUT /annotations/{id} for trade {}", record.trade_id);
        let resp = self
            .http
            .put(self.url(&format!("/annotations/{id}")))
            .json(record)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}

#[async_trait]
impl AnnotationStore for JournalClient {
    async fn fetch(&self, trade_id: i64) -> AnnotatorResult<Option<AnnotationRecord>> {
        self.get_annotation(trade_id).await
    }

    async fn create(&self, record: &AnnotationRecord) -> AnnotatorResult<AnnotationRecord> {
        self.create_annotation(record).await
    }

    async fn update(&self, id: i64, record: &AnnotationRecord) -> AnnotatorResult<AnnotationRecord> {
        self.update_annotation(id, record).await
    }
}

#[async_trait]
impl TeachingBackend for JournalClient {
    async fn analyze_chart(&self, trade_id: i64) -> AnnotatorResult<AiAnalysis> {
        info!("Requesting AI analysis for trade {trade_id}");
        let form = reqwest::multipart::Form::new().text("trade_id", trade_id.to_string());
        let resp = self
            .http
            .post(self.url("/ai/analyze-chart"))
            .multipart(form)
            .send()
            .await?;
        let value: Value = Self::check(resp).await?.json().await?;
        parse_analysis(value)
    }

    async fn submit_lesson(&self, lesson: &LessonRecord) -> AnnotatorResult<Value> {
        info!(
            "Submitting {} correction(s) for trade {}",
            lesson.corrections.len(),
            lesson.trade_id
        );
        let resp = self.http.post(self.url("/ai/lessons")).json(lesson).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }
}
