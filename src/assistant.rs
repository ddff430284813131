//! The seam between a conversation session and whatever answers it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::persona::SessionKind;

/// A cited web source attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// A resolved answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    pub sources: Vec<Source>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Assistant: Send + Sync {
    /// Answer one user message. Retries, if any, happen in here.
    async fn reply(&self, kind: SessionKind, message: &str) -> Result<Reply, ClientError>;
}
