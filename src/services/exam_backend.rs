use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::core::config::Settings;
use crate::schemas::exam::{ExamDefinition, ExamSummary};
use crate::schemas::submission::{GradingResponse, SubmissionRequest};
use crate::session::error::{FetchFailure, SubmitFailure};

/// Source of exam definitions.
#[async_trait]
pub(crate) trait ExamSource: Send + Sync {
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamDefinition, FetchFailure>;

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, FetchFailure>;
}

/// Accepts answers and returns a score in `0..=100`.
#[async_trait]
pub(crate) trait GradingService: Send + Sync {
    async fn submit_exam(&self, request: &SubmissionRequest) -> Result<GradingResponse, SubmitFailure>;
}

/// Exam store and grading service behind one HTTP base URL.
#[derive(Debug, Clone)]
pub(crate) struct HttpExamBackend {
    client: Client,
    base_url: Url,
}

impl HttpExamBackend {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = settings.backend();
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(backend.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Self::new(client, &backend.base_url)
    }

    pub(crate) fn new(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid exam backend URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Exam backend URL cannot be used as a base: {base_url}");
        }

        Ok(Self { client, base_url })
    }

    /// Appends path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl ExamSource for HttpExamBackend {
    async fn fetch_exam(&self, exam_id: &str) -> Result<ExamDefinition, FetchFailure> {
        let url = self.endpoint(&["api", "student", "exam", exam_id]);
        tracing::debug!(exam_id, url = %url, "Fetching exam definition");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchFailure::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        response.json().await.map_err(|err| FetchFailure::Decode(err.to_string()))
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, FetchFailure> {
        let url = self.endpoint(&["api", "student", "available-exams"]);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchFailure::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        response.json().await.map_err(|err| FetchFailure::Decode(err.to_string()))
    }
}

#[async_trait]
impl GradingService for HttpExamBackend {
    async fn submit_exam(&self, request: &SubmissionRequest) -> Result<GradingResponse, SubmitFailure> {
        let url = self.endpoint(&["api", "student", "submit-exam"]);

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| SubmitFailure::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitFailure::Status(status.as_u16()));
        }

        response.json().await.map_err(|err| SubmitFailure::Decode(err.to_string()))
    }
}
