//! Scripted language model.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use syncara_agent::{AgentError, GenerationRequest, LanguageModel};
use tokio::sync::Mutex;

/// A language model that replays queued replies.
///
/// When the queue is empty, `"mock reply"` is returned.
pub struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<Result<String, AgentError>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A model pre-loaded with successful replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = replies.into_iter().map(|r| Ok(r.into())).collect();
        Self {
            replies: Arc::new(Mutex::new(queue)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    pub async fn push_error(&self, error: AgentError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: GenerationRequest) -> syncara_agent::Result<String> {
        self.requests.lock().await.push(request);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok("mock reply".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_default() {
        let model = ScriptedModel::with_replies(["satu", "dua"]);
        let req = || GenerationRequest::new("sys", "hai");
        assert_eq!(model.generate(req()).await.unwrap(), "satu");
        assert_eq!(model.generate(req()).await.unwrap(), "dua");
        assert_eq!(model.generate(req()).await.unwrap(), "mock reply");
        assert_eq!(model.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let model = ScriptedModel::new();
        model.push_error(AgentError::ModelInvocation("boom".into())).await;
        assert!(model.generate(GenerationRequest::new("s", "p")).await.is_err());
    }
}
