use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use report_common::openai::{ChatCompletionRequest, Message, OpenAiClient};
use tracing::debug;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SummarizeError {
    #[error("{0}")]
    Service(String),

    /// The request was cut off after the given limit.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Condenses retrieved passages into a short answer to a question.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        context: &str,
        question: &str,
        max_tokens: u32,
    ) -> Result<String, SummarizeError>;
}

/// Prompt sent for every topic: the passages, then the question and the token budget.
pub fn build_prompt(context: &str, question: &str, max_tokens: u32) -> String {
    format!(
        "{context}\n\n上記の内容を要約し、以下の質問に回答してください：{question} トークン数は{max_tokens}以内でお願いします。"
    )
}

pub struct OpenAiSummarizer {
    client: Arc<OpenAiClient>,
    model: String,
    request_timeout: Duration,
}

impl OpenAiSummarizer {
    pub fn new(
        client: Arc<OpenAiClient>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            request_timeout,
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(
        &self,
        context: &str,
        question: &str,
        max_tokens: u32,
    ) -> Result<String, SummarizeError> {
        // The budget is stated in the prompt; a hard max_tokens cap would cut answers mid-sentence.
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(build_prompt(context, question, max_tokens))],
            temperature: None,
            max_tokens: None,
        };

        let response = self
            .client
            .chat_completions(&request, Some(self.request_timeout))
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SummarizeError::Timeout(self.request_timeout)
                } else {
                    SummarizeError::Service(e.to_string())
                }
            })?;

        if let Some(usage) = &response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }

        response
            .first_content()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                SummarizeError::Service("missing choices[0].message.content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::post;
    use axum::{Json, Router};
    use report_common::openai::OpenAiClientConfig;

    async fn summarizer_for(router: Router) -> OpenAiSummarizer {
        summarizer_with_timeout(router, Duration::from_secs(5)).await
    }

    async fn summarizer_with_timeout(
        router: Router,
        request_timeout: Duration,
    ) -> OpenAiSummarizer {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let client = OpenAiClient::new(OpenAiClientConfig {
            base_url: format!("http://{addr}/v1"),
            api_key: "sk-test".to_string(),
            default_timeout: Duration::from_secs(5),
            max_error_body_bytes: 1024,
        })
        .unwrap();
        OpenAiSummarizer::new(Arc::new(client), "gpt-3.5-turbo", request_timeout)
    }

    #[test]
    fn prompt_carries_context_question_and_budget() {
        let prompt = build_prompt("段落A\n段落B", "業界の現状を説明してください。", 50);
        assert!(prompt.starts_with("段落A\n段落B\n\n"));
        assert!(prompt.contains("以下の質問に回答してください：業界の現状を説明してください。"));
        assert!(prompt.ends_with("トークン数は50以内でお願いします。"));
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["model"], "gpt-3.5-turbo");
                assert!(body.get("max_tokens").is_none());
                Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "  市場は堅調。 "}}]
                }))
            }),
        );
        let summarizer = summarizer_for(router).await;
        let answer = summarizer.summarize("ctx", "q", 50).await.unwrap();
        assert_eq!(answer, "  市場は堅調。 ");
    }

    #[tokio::test]
    async fn missing_content_is_a_service_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let summarizer = summarizer_for(router).await;
        let err = summarizer.summarize("ctx", "q", 50).await.unwrap_err();
        assert_eq!(
            err,
            SummarizeError::Service("missing choices[0].message.content".to_string())
        );
    }

    #[tokio::test]
    async fn upstream_error_message_is_passed_through() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": {"message": "Incorrect API key provided"}})),
                )
            }),
        );
        let summarizer = summarizer_for(router).await;
        match summarizer.summarize("ctx", "q", 50).await.unwrap_err() {
            SummarizeError::Service(msg) => assert!(msg.contains("Incorrect API key provided")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_upstream_reports_the_request_limit() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(serde_json::json!({"choices": []}))
            }),
        );
        let summarizer = summarizer_with_timeout(router, Duration::from_millis(100)).await;
        let err = summarizer.summarize("ctx", "q", 50).await.unwrap_err();
        assert_eq!(err, SummarizeError::Timeout(Duration::from_millis(100)));
    }
}
