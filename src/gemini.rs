//! Gemini `generateContent` client.
//!
//! Encodes one user message plus a persona system instruction, sends it through
//! the [`ResilientClient`], and decodes the first candidate into a [`Reply`].

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::assistant::{Assistant, Reply, Source};
use crate::client::ResilientClient;
use crate::error::ClientError;
use crate::persona::SessionKind;
use crate::retry::RetryPolicy;
use crate::transport::{HttpRequest, Transport};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ============================================================================
// API Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

// ============================================================================
// Encoding / Decoding
// ============================================================================

/// `generateContent` body: one user turn, the persona as system
/// instruction, and the search tool when grounding is wanted.
fn build_request_body(system_instruction: &str, message: &str, with_search: bool) -> String {
    let mut request = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": message }],
        }],
        "systemInstruction": {
            "parts": [{ "text": system_instruction }],
        },
    });
    if with_search {
        request["tools"] = json!([{ "googleSearch": {} }]);
    }
    request.to_string()
}

/// Decode a success body into the first candidate's answer and its sources.
fn decode_reply(body: &str) -> Result<Reply, ClientError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::MalformedResponse("Response has no candidates".to_string()))?;

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ClientError::MalformedResponse(
            "First candidate has no text".to_string(),
        ));
    }

    let sources = candidate
        .grounding_metadata
        .map(extract_sources)
        .unwrap_or_default();

    Ok(Reply { text, sources })
}

/// Web chunks with a uri, first occurrence wins. Untitled sources use the uri.
fn extract_sources(metadata: GroundingMetadata) -> Vec<Source> {
    let mut seen = HashSet::new();
    metadata
        .grounding_chunks
        .into_iter()
        .filter_map(|chunk| chunk.web)
        .filter_map(|web| {
            let uri = web.uri.filter(|u| !u.trim().is_empty())?;
            let title = web
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| uri.clone());
            Some(Source { uri, title })
        })
        .filter(|source| seen.insert(source.uri.clone()))
        .collect()
}

// ============================================================================
// Client
// ============================================================================

pub struct GeminiClient<T: Transport + ?Sized = dyn Transport> {
    api_key: Option<String>,
    endpoint: String,
    model: String,
    search_grounding: bool,
    http: ResilientClient<T>,
}

impl<T: Transport + ?Sized> GeminiClient<T> {
    /// A missing key is allowed; every call then fails with `NotConfigured`.
    pub fn new(api_key: Option<String>, transport: Arc<T>, policy: RetryPolicy) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            search_grounding: true,
            http: ResilientClient::new(transport, policy),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Allow explore sessions to request search grounding.
    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    /// Send one message and decode the answer.
    pub async fn generate(&self, kind: SessionKind, message: &str) -> Result<Reply, ClientError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Gemini API key not configured, skipping request");
            return Err(ClientError::NotConfigured);
        };

        let with_search = self.search_grounding && kind.wants_grounding();
        let body = build_request_body(&kind.system_instruction(), message, with_search);
        let request =
            HttpRequest::post_json(self.url(), body).with_header("x-goog-api-key", api_key);

        info!(
            model = %self.model,
            kind = kind.as_str(),
            search = with_search,
            "Sending Gemini request"
        );

        let response = self.http.execute(&request).await?;
        let reply = decode_reply(&response.body)?;

        debug!(
            chars = reply.text.len(),
            sources = reply.sources.len(),
            "Decoded Gemini reply"
        );
        Ok(reply)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Assistant for GeminiClient<T> {
    async fn reply(&self, kind: SessionKind, message: &str) -> Result<Reply, ClientError> {
        self.generate(kind, message).await
    }
}
