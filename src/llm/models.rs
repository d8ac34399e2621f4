use serde::{Deserialize, Serialize};

/// A single completion call: one system instruction plus one user turn,
/// with bounded generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}
