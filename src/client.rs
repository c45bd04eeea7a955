//! Client for a remote face analysis endpoint.
//!
//! Uploads a frame as multipart `image` and turns the reply into an
//! [`AnalysisResult`]. Network and server failures fall back to a local mock
//! analysis so the dashboard always has something to show.

use crate::capture::{CaptureError, Frame, DEFAULT_JPEG_QUALITY};
use crate::config::EngineConfig;
use crate::core::{
    AnalysisError, AnalysisResult, FaceAnalysis, Gender, MockEngine, RecommendationTable,
};
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct AnalysisClientConfig {
    /// Full URL of the analysis endpoint
    pub endpoint: String,
    /// Optional bearer key
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub jpeg_quality: u8,
    pub recommendations: RecommendationTable,
}

impl Default for AnalysisClientConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:8080/api/analyze-face")
    }
}

impl AnalysisClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            recommendations: RecommendationTable::default(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = if key.is_empty() { None } else { Some(key) };
        self
    }
}

/// Client error types.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// JSON deserialization error
    Serialization(String),
    /// The frame could not be encoded
    Capture(CaptureError),
    /// The endpoint saw no face
    Analysis(AnalysisError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "Client config error: {msg}"),
            ClientError::Network(msg) => write!(f, "Analysis network error: {msg}"),
            ClientError::Server { status, message } => {
                write!(f, "Analysis server error ({status}): {message}")
            }
            ClientError::Serialization(msg) => write!(f, "Analysis response error: {msg}"),
            ClientError::Capture(e) => write!(f, "{e}"),
            ClientError::Analysis(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Remote,
    Fallback,
}

/// Analysis plus the demographic guesses the endpoint returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAnalysis {
    pub result: AnalysisResult,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub source: AnalysisSource,
}

/// Async analysis client.
pub struct AnalysisClient {
    config: AnalysisClientConfig,
    client: reqwest::Client,
    /// Derives stress for remote replies
    scorer: Mutex<MockEngine>,
    /// Stands in when the endpoint is unreachable
    fallback: Mutex<MockEngine>,
}

impl AnalysisClient {
    pub fn new(config: AnalysisClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {e}")))?;

        let scorer = MockEngine::new(EngineConfig::default(), config.recommendations.clone());
        let fallback = MockEngine::new(EngineConfig::fallback(), config.recommendations.clone());

        Ok(Self {
            config,
            client,
            scorer: Mutex::new(scorer),
            fallback: Mutex::new(fallback),
        })
    }

    pub fn config(&self) -> &AnalysisClientConfig {
        &self.config
    }

    /// Upload encoded image bytes and return the raw endpoint reply.
    pub async fn request(&self, image: Vec<u8>) -> Result<FaceAnalysis, ClientError> {
        let part = reqwest::multipart::Part::bytes(image)
            .file_name("face.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let mut request = self.client.post(&self.config.endpoint).multipart(form);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<FaceAnalysis>()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Analyze encoded image bytes, falling back to a local mock on failure.
    ///
    /// Only a reply that reports no face is returned as an error.
    pub async fn analyze_image(&self, image: Vec<u8>) -> Result<ClientAnalysis, ClientError> {
        match self.request(image).await {
            Ok(reply) => self.analysis_from_reply(reply),
            Err(e) => {
                tracing::warn!("Face analysis API error, using local mock: {}", e);
                Ok(self.fallback_analysis())
            }
        }
    }

    /// Encode a frame and analyze it.
    pub async fn analyze_frame(&self, frame: &Frame) -> Result<ClientAnalysis, ClientError> {
        let jpeg = frame
            .to_jpeg(self.config.jpeg_quality)
            .map_err(ClientError::Capture)?;
        self.analyze_image(jpeg).await
    }

    /// Turn an endpoint reply into a result, scoring stress locally.
    pub fn analysis_from_reply(&self, reply: FaceAnalysis) -> Result<ClientAnalysis, ClientError> {
        if !reply.face_detected {
            return Err(ClientError::Analysis(AnalysisError::NoSubjectDetected));
        }

        // A missing confidence reads as the 0.85 default
        let confidence = if reply.confidence > 0.0 {
            reply.confidence
        } else {
            0.85
        };
        let result = self
            .scorer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .result_from_emotions(reply.emotions, confidence);

        Ok(ClientAnalysis {
            result,
            age: Some(reply.age),
            gender: Some(reply.gender),
            source: AnalysisSource::Remote,
        })
    }

    /// Local mock used when the endpoint cannot be reached.
    pub fn fallback_analysis(&self) -> ClientAnalysis {
        let mut engine = self.fallback.lock().unwrap_or_else(|e| e.into_inner());
        let face = engine.face_analysis(true);
        let result = engine.result_from_emotions(face.emotions, face.confidence);

        ClientAnalysis {
            result,
            age: Some(face.age),
            gender: Some(face.gender),
            source: AnalysisSource::Fallback,
        }
    }
}

/// Blocking analysis client for use in synchronous contexts.
pub struct BlockingAnalysisClient {
    inner: AnalysisClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingAnalysisClient {
    pub fn new(config: AnalysisClientConfig) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: AnalysisClient::new(config)?,
            runtime,
        })
    }

    pub fn analyze_frame(&self, frame: &Frame) -> Result<ClientAnalysis, ClientError> {
        self.runtime.block_on(self.inner.analyze_frame(frame))
    }

    pub fn analyze_image(&self, image: Vec<u8>) -> Result<ClientAnalysis, ClientError> {
        self.runtime.block_on(self.inner.analyze_image(image))
    }
}
