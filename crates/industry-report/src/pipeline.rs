/// Report pipeline: load document → summarize five topics → extract the median multiple.
///
/// A run either yields a complete `IndustryReport` or a single `AppError`; there is no
/// partial result and nothing is retried. The pipeline owns no mutable state, so any number
/// of requests may share one instance.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AppError;
use crate::extractor::extract_ev_ebitda_median;
use crate::loader::DocumentLoader;
use crate::model::{Document, IndustryReport, Topic};
use crate::ranker::{rank_paragraphs, TOP_K};
use crate::summarizer::{SummarizeError, Summarizer};

const REPORT_EXTENSION: &str = "docx";

#[derive(Clone)]
pub struct ReportPipeline {
    loader: Arc<dyn DocumentLoader>,
    summarizer: Arc<dyn Summarizer>,
    report_dir: PathBuf,
    max_tokens: u32,
    summary_timeout: Duration,
}

impl ReportPipeline {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        summarizer: Arc<dyn Summarizer>,
        report_dir: impl Into<PathBuf>,
        max_tokens: u32,
        summary_timeout: Duration,
    ) -> Self {
        Self {
            loader,
            summarizer,
            report_dir: report_dir.into(),
            max_tokens,
            summary_timeout,
        }
    }

    /// Path of the report for `industry`, after validating the identifier.
    pub fn report_path(&self, industry: &str) -> Result<PathBuf, AppError> {
        let industry = industry.trim();
        if industry.is_empty() {
            return Err(AppError::MissingParameter(
                "industry is required; specify an industry name".to_string(),
            ));
        }
        if industry.contains(['/', '\\', '\0']) || industry.contains("..") {
            return Err(AppError::InvalidParameter(format!(
                "industry must be a plain name: {industry}"
            )));
        }
        Ok(self
            .report_dir
            .join(format!("{industry}.{REPORT_EXTENSION}")))
    }

    pub async fn run(&self, industry: &str) -> Result<IndustryReport, AppError> {
        let path = self.report_path(industry)?;
        info!(industry, path = %path.display(), stage = "not_started", "report requested");

        let loader = Arc::clone(&self.loader);
        let load_path = path.clone();
        let document = tokio::task::spawn_blocking(move || loader.load(&load_path))
            .await
            .map_err(|e| AppError::Internal(format!("document loader task failed: {e}")))??;
        info!(
            industry,
            paragraphs = document.paragraphs.len(),
            tables = document.tables.len(),
            stage = "document_loaded",
            "document loaded"
        );
        if document.paragraphs.is_empty() {
            warn!(industry, "document has no body paragraphs; summaries get no context");
        }

        let (
            current_situation,
            future_outlook,
            investment_advantages,
            investment_disadvantages,
            value_up_hypothesis,
        ) = futures::try_join!(
            self.summarize_topic(Topic::CurrentSituation, &document),
            self.summarize_topic(Topic::FutureOutlook, &document),
            self.summarize_topic(Topic::InvestmentAdvantages, &document),
            self.summarize_topic(Topic::InvestmentDisadvantages, &document),
            self.summarize_topic(Topic::ValueUpHypothesis, &document),
        )?;
        info!(
            industry,
            topics = Topic::ALL.len(),
            stage = "summaries_collected",
            "all topics summarized"
        );

        let ev_ebitda_median =
            extract_ev_ebitda_median(&document).ok_or(AppError::MetricNotFound)?;
        info!(
            industry,
            ev_ebitda_median = %ev_ebitda_median,
            stage = "metric_extracted",
            "metric extracted"
        );

        let report = IndustryReport {
            current_situation,
            future_outlook,
            investment_advantages,
            investment_disadvantages,
            value_up_hypothesis,
            ev_ebitda_median,
        };
        info!(industry, stage = "completed", "report completed");
        Ok(report)
    }

    async fn summarize_topic(&self, topic: Topic, document: &Document) -> Result<String, AppError> {
        let question = topic.question();
        let passages = rank_paragraphs(question, &document.paragraphs, TOP_K);
        let context = passages.join("\n");

        let call = self.summarizer.summarize(&context, question, self.max_tokens);
        let answer = match tokio::time::timeout(self.summary_timeout, call).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(SummarizeError::Service(message))) => {
                warn!(topic = topic.key(), error = %message, "summarization failed");
                return Err(AppError::Summarization {
                    topic: topic.key(),
                    message,
                });
            }
            Ok(Err(SummarizeError::Timeout(limit))) => {
                warn!(
                    topic = topic.key(),
                    timeout_ms = limit.as_millis(),
                    "summarization request timed out"
                );
                return Err(AppError::SummarizationTimeout {
                    topic: topic.key(),
                    timeout: limit,
                });
            }
            Err(_) => {
                warn!(
                    topic = topic.key(),
                    timeout_ms = self.summary_timeout.as_millis(),
                    "summarization timed out"
                );
                return Err(AppError::SummarizationTimeout {
                    topic: topic.key(),
                    timeout: self.summary_timeout,
                });
            }
        };

        Ok(answer.trim().to_string())
    }
}
