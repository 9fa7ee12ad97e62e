use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use crate::error::AppError;
use crate::model::IndustryReport;
use crate::pipeline::ReportPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: ReportPipeline,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeParams {
    industry: Option<String>,
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/summarize", get(summarize))
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer; `None` allows any origin, method and header.
pub fn cors_layer(allow_origins: Option<&[String]>) -> Result<CorsLayer, AppError> {
    let origin = match allow_origins {
        None => AllowOrigin::any(),
        Some(origins) => {
            let values = origins
                .iter()
                .map(|o| {
                    HeaderValue::from_str(o)
                        .map_err(|_| AppError::Config(format!("invalid CORS origin: {o}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowOrigin::list(values)
        }
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn summarize(
    State(state): State<AppState>,
    Query(params): Query<SummarizeParams>,
) -> Result<Json<IndustryReport>, AppError> {
    let Some(industry) = params.industry else {
        return Err(AppError::MissingParameter(
            "industry is required; specify an industry name".to_string(),
        ));
    };
    info!(industry = %industry, "received industry parameter");

    let report = state.pipeline.run(&industry).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::loader::DocumentLoader;
    use crate::model::{Document, Table};
    use crate::summarizer::{SummarizeError, Summarizer};

    struct StaticLoader {
        documents: HashMap<PathBuf, Document>,
    }

    impl DocumentLoader for StaticLoader {
        fn load(&self, path: &Path) -> Result<Document, AppError> {
            self.documents
                .get(path)
                .cloned()
                .ok_or_else(|| AppError::DocumentNotFound(path.to_path_buf()))
        }
    }

    struct StaticSummarizer {
        result: Result<String, SummarizeError>,
    }

    #[async_trait]
    impl Summarizer for StaticSummarizer {
        async fn summarize(&self, _: &str, _: &str, _: u32) -> Result<String, SummarizeError> {
            self.result.clone()
        }
    }

    fn doc(median: Option<&str>) -> Document {
        let label = if median.is_some() { "中央値" } else { "平均値" };
        Document {
            paragraphs: vec!["市場は成熟している".to_string()],
            tables: vec![Table {
                rows: vec![vec![label.to_string(), median.unwrap_or("9.0倍").to_string()]],
            }],
        }
    }

    fn app(result: Result<String, SummarizeError>) -> Router {
        let documents = HashMap::from([
            (Path::new("app").join("retail.docx"), doc(Some("8.4倍"))),
            (Path::new("app").join("logistics.docx"), doc(None)),
        ]);
        let pipeline = ReportPipeline::new(
            Arc::new(StaticLoader { documents }),
            Arc::new(StaticSummarizer { result }),
            "app",
            50,
            Duration::from_secs(5),
        );
        router(AppState { pipeline }, cors_layer(None).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn success_returns_six_string_fields() {
        let (status, body) = get_json(app(Ok("要約".to_string())), "/summarize?industry=retail").await;
        assert_eq!(status, StatusCode::OK);
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 6);
        assert!(object.values().all(|v| v.is_string()));
        assert_eq!(body["ev_ebitda_median"], "8.4倍");
        assert_eq!(body["current_situation"], "要約");
    }

    #[tokio::test]
    async fn missing_industry_is_bad_request() {
        let (status, body) = get_json(app(Ok("要約".to_string())), "/summarize").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("industry"));
    }

    #[tokio::test]
    async fn unknown_industry_is_not_found() {
        let (status, body) =
            get_json(app(Ok("要約".to_string())), "/summarize?industry=mining").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("mining.docx"));
    }

    #[tokio::test]
    async fn missing_metric_is_not_found() {
        let (status, body) =
            get_json(app(Ok("要約".to_string())), "/summarize?industry=logistics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap().contains("EV/EBITDA"));
    }

    #[tokio::test]
    async fn summarization_error_is_server_error() {
        let failing = Err(SummarizeError::Service("rate limited".to_string()));
        let (status, body) = get_json(app(failing), "/summarize?industry=retail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "OpenAI API error: rate limited");
    }

    #[tokio::test]
    async fn path_like_industry_is_rejected() {
        let (status, _) = get_json(
            app(Ok("要約".to_string())),
            "/summarize?industry=..%2Fsecrets",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cors_layer_rejects_invalid_origin() {
        assert!(cors_layer(Some(&["https://ok.example.com".to_string()][..])).is_ok());
        assert!(matches!(
            cors_layer(Some(&["bad\norigin".to_string()][..])),
            Err(AppError::Config(_))
        ));
    }
}
