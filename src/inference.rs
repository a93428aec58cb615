//! Client for the local vision inference server.

use crate::client::extract_detail;
use crate::config::InferenceConfig;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::memory::HistoryTurn;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An answer plus the wall-clock time the request took.
#[derive(Debug, Clone)]
pub struct TimedAnswer {
    pub response: AskResponse,
    pub latency: Duration,
}

impl TimedAnswer {
    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else {
        "image/png"
    }
}

#[derive(Clone)]
pub struct InferenceClient {
    base_url: String,
    http: reqwest::Client,
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig, timeout_secs: u64) -> AnnotatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn ask(
        &self,
        screenshot: Vec<u8>,
        file_name: &str,
        question: &str,
        history: &[HistoryTurn],
    ) -> AnnotatorResult<TimedAnswer> {
        let image = Part::bytes(screenshot)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;
        let form = Form::new()
            .part("image", image)
            .text("question", question.to_string())
            .text("history", serde_json::to_string(history)?);

        debug!("POST {}/ask with {} history turn(s)", self.base_url, history.len());
        let started = Instant::now();
        let resp = self
            .http
            .post(format!("{}/ask", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnnotatorError::Server {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }
        let response: AskResponse = resp.json().await?;
        let latency = started.elapsed();
        info!("Inference answered in {} ms", latency.as_millis());
        Ok(TimedAnswer { response, latency })
    }
}
