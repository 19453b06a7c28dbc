//! Scripted providers and fixtures shared by orchestrator tests.

use std::sync::Mutex;
use workroom_core::error::ProviderError;
use workroom_core::message::{Message, MessageToolCall};
use workroom_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage,
};

/// A mock provider that returns a sequence of scripted responses and
/// records every request it receives.
///
/// Panics if more completions are requested than responses provided.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// First returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, ""),
            make_text_response(answer),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);
        match self.responses.get(index) {
            Some(response) => Ok(response.clone()),
            None => panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                self.responses.len()
            ),
        }
    }

    /// Every text embeds to the same unit vector.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        Ok(EmbeddingResponse {
            embeddings: request.inputs.iter().map(|_| vec![1.0, 0.0, 0.0]).collect(),
            model: request.model,
            usage: None,
        })
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A plain text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A response requesting tool calls.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut message = Message::assistant(thought);
    message.tool_calls = tool_calls;
    ProviderResponse {
        message,
        usage: usage(),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{}", name),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
