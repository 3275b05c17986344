//! Remote evaluation over HTTP.
//!
//! Simulation hosts can offload indicator computation to a shared evaluation service: POST the
//! result rows, get the indicator values back. The wire format is JSON throughout.

use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::eval::{Evaluator, IndicatorValue, INDICATORS_ALL};
use crate::sim::ResultRow;

#[derive(Debug, Deserialize, Serialize)]
pub struct EvalRequest {
    /// Indicators to run; `None` means the default selection.
    pub indicator_names: Option<Vec<String>>,
    pub instruments: Vec<String>,
    pub data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EvalResponse {
    pub indicators: HashMap<String, IndicatorValue>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndicatorsResponse {
    pub indicators: Vec<String>,
}

#[derive(Debug)]
pub enum EvalServerError {
    IndicatorNotFound(String),
}

impl std::error::Error for EvalServerError {}

impl core::fmt::Display for EvalServerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EvalServerError::IndicatorNotFound(name) => write!(f, "IndicatorNotFound: {name}"),
        }
    }
}

impl actix_web::ResponseError for EvalServerError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            EvalServerError::IndicatorNotFound(_) => actix_web::http::StatusCode::BAD_REQUEST,
        }
    }
}

pub trait Client {
    fn evaluate(&self, request: EvalRequest) -> impl Future<Output = Result<EvalResponse>>;
    fn indicators(&self) -> impl Future<Output = Result<IndicatorsResponse>>;
}

pub mod server {
    use actix_web::{get, post, web};

    use super::{EvalRequest, EvalResponse, EvalServerError, IndicatorsResponse, INDICATORS_ALL};
    use crate::error::Error;
    use crate::eval::Evaluator;

    #[post("/evaluate")]
    pub async fn evaluate(
        request: web::Json<EvalRequest>,
    ) -> Result<web::Json<EvalResponse>, EvalServerError> {
        let request = request.into_inner();
        let evaluator = match &request.indicator_names {
            Some(names) => Evaluator::with_indicators(names).map_err(|e| match e {
                Error::IndicatorNotFound(name) => EvalServerError::IndicatorNotFound(name),
                other => EvalServerError::IndicatorNotFound(other.to_string()),
            })?,
            None => Evaluator::new_default(),
        };
        let values = evaluator.run(&request.instruments, &request.data).await;
        Ok(web::Json(EvalResponse { indicators: values }))
    }

    #[get("/indicators")]
    pub async fn indicators() -> web::Json<IndicatorsResponse> {
        web::Json(IndicatorsResponse {
            indicators: INDICATORS_ALL
                .iter()
                .map(|indicator| indicator.name.to_string())
                .collect(),
        })
    }
}

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_millis(500);

#[derive(Debug)]
pub struct HttpEvalClient {
    pub path: String,
    pub client: reqwest::Client,
}

impl HttpEvalClient {
    pub fn new(path: String) -> Self {
        Self {
            path,
            client: reqwest::Client::new(),
        }
    }
}

impl Client for HttpEvalClient {
    /// Retries transient failures a fixed number of times with a fixed backoff before giving
    /// up; a 4xx answer is the caller's fault and returns immediately.
    async fn evaluate(&self, request: EvalRequest) -> Result<EvalResponse> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let sent = self
                .client
                .post(self.path.clone() + "/evaluate")
                .json(&request)
                .send()
                .await;
            match sent {
                Ok(response) if response.status().is_client_error() => {
                    return Err(anyhow::anyhow!(
                        "evaluation rejected: {}",
                        response.status()
                    ));
                }
                Ok(response) => match response.error_for_status() {
                    Ok(response) => return Ok(response.json::<EvalResponse>().await?),
                    Err(e) if attempt >= MAX_ATTEMPTS => return Err(e.into()),
                    Err(e) => log::warn!("evaluation attempt {attempt} failed: {e}"),
                },
                Err(e) if attempt >= MAX_ATTEMPTS => return Err(e.into()),
                Err(e) => log::warn!("evaluation attempt {attempt} failed: {e}"),
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }

    async fn indicators(&self) -> Result<IndicatorsResponse> {
        Ok(self
            .client
            .get(self.path.clone() + "/indicators")
            .send()
            .await?
            .json::<IndicatorsResponse>()
            .await?)
    }
}

/// In-process client evaluating directly, for tests and for hosts that do not run a separate
/// service.
pub struct LocalEvalClient;

impl Client for LocalEvalClient {
    async fn evaluate(&self, request: EvalRequest) -> Result<EvalResponse> {
        let evaluator = match &request.indicator_names {
            Some(names) => Evaluator::with_indicators(names)?,
            None => Evaluator::new_default(),
        };
        let indicators = evaluator.run(&request.instruments, &request.data).await;
        Ok(EvalResponse { indicators })
    }

    async fn indicators(&self) -> Result<IndicatorsResponse> {
        Ok(IndicatorsResponse {
            indicators: INDICATORS_ALL
                .iter()
                .map(|indicator| indicator.name.to_string())
                .collect(),
        })
    }
}
