pub mod models;
pub mod providers;

use chrono::{DateTime, Utc};

use crate::config::LlmConfig;
use crate::db::normalize::Record;
use crate::llm::models::CompletionRequest;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// Transport to a text-completion backend. Prompt content is owned by the
/// callers in this module; implementations only move bytes.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

const SQL_TEMPERATURE: f32 = 0.1;
const SQL_MAX_TOKENS: usize = 1000;
const EXPLANATION_TEMPERATURE: f32 = 0.3;
const EXPLANATION_MAX_TOKENS: usize = 500;
const EXPLANATION_SAMPLE_ROWS: usize = 20;

pub struct LlmManager {
    provider: Box<dyn CompletionProvider + Send + Sync>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider: Box<dyn CompletionProvider + Send + Sync> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self { provider })
    }

    /// Builds a manager around an arbitrary provider, letting tests
    /// substitute a scripted backend.
    pub fn with_provider(provider: Box<dyn CompletionProvider + Send + Sync>) -> Self {
        Self { provider }
    }

    /// Asks the model for one bare SQL statement answering `question`.
    ///
    /// The returned string is cleaned of enclosing whitespace and code
    /// fences but is otherwise the model's unparsed output; the safety
    /// gate downstream is the only semantic check.
    pub async fn generate_sql(
        &self,
        question: &str,
        schema_text: &str,
        now: DateTime<Utc>,
    ) -> Result<String, LlmError> {
        let request = CompletionRequest {
            system: sql_system_prompt(schema_text, now),
            prompt: question.to_string(),
            temperature: SQL_TEMPERATURE,
            max_tokens: SQL_MAX_TOKENS,
        };

        let raw = self.provider.complete(&request).await?;
        let sql = strip_code_fences(&raw);
        if sql.is_empty() {
            return Err(LlmError::ResponseError(
                "Model returned an empty completion".to_string(),
            ));
        }
        Ok(sql)
    }

    /// Summarizes an executed result set in plain language. Rows beyond a
    /// fixed sample are elided from the prompt.
    pub async fn explain_results(
        &self,
        question: &str,
        sql: &str,
        records: &[Record],
        row_count: usize,
    ) -> Result<String, LlmError> {
        let sample = &records[..records.len().min(EXPLANATION_SAMPLE_ROWS)];
        let sample_json =
            serde_json::to_string_pretty(sample).unwrap_or_else(|_| "[]".to_string());

        let request = CompletionRequest {
            system: EXPLANATION_SYSTEM_PROMPT.to_string(),
            prompt: format!(
                "Question: {}\nSQL query: {}\nTotal rows: {}\nResult sample:\n{}",
                question, sql, row_count, sample_json
            ),
            temperature: EXPLANATION_TEMPERATURE,
            max_tokens: EXPLANATION_MAX_TOKENS,
        };

        let raw = self.provider.complete(&request).await?;
        let explanation = raw.trim().to_string();
        if explanation.is_empty() {
            return Err(LlmError::ResponseError(
                "Model returned an empty explanation".to_string(),
            ));
        }
        Ok(explanation)
    }
}

const EXPLANATION_SYSTEM_PROMPT: &str = "You are a data analyst. Explain the results of a SQL \
query to a non-technical user in two to four plain sentences. Describe what the data shows, not \
how the query works. Do not use markdown formatting.";

fn sql_system_prompt(schema_text: &str, now: DateTime<Utc>) -> String {
    format!(
        r#"You are an expert SQL assistant that helps users query a relational database.
Your task is to generate a SQL query based on the user's natural language request.

Current date and time: {}

Here is the database schema information:
{}

IMPORTANT RULES:
1. ONLY generate SELECT queries. DO NOT generate any INSERT, UPDATE, DELETE, or other data modification queries.
2. Make your queries as efficient as possible.
3. Use proper table and column names from the schema provided.
4. DO NOT include any explanations or markdown formatting in your response.
5. Return ONLY the SQL query as plain text - nothing else.
6. If the user request involves dates or time periods like "today", "this month", etc., use the current date provided above.

Generate a SQL query for the following request:"#,
        now.format("%Y-%m-%d %H:%M:%S"),
        schema_text
    )
}

/// Removes an enclosing markdown code fence from a completion, if present.
fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```sql") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CapturingProvider {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CapturingProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for CapturingProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn manager_with(reply: &str) -> (LlmManager, std::sync::Arc<CapturingProvider>) {
        let provider = std::sync::Arc::new(CapturingProvider::new(reply));
        struct Shared(std::sync::Arc<CapturingProvider>);
        #[async_trait]
        impl CompletionProvider for Shared {
            async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
                self.0.complete(request).await
            }
        }
        (
            LlmManager::with_provider(Box::new(Shared(provider.clone()))),
            provider,
        )
    }

    #[test]
    fn strips_sql_fences() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("  SELECT 1  "), "SELECT 1");
        assert_eq!(strip_code_fences("SELECT 1"), "SELECT 1");
        assert_eq!(strip_code_fences(""), "");
    }

    #[test]
    fn system_prompt_carries_timestamp_schema_and_rules() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-08-07T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let prompt = sql_system_prompt("Table: orders\nColumns: id (INTEGER)", now);

        assert!(prompt.contains("2026-08-07 09:30:00"));
        assert!(prompt.contains("Table: orders"));
        assert!(prompt.contains("ONLY generate SELECT queries"));
        assert!(prompt.contains("Return ONLY the SQL query as plain text"));
    }

    #[tokio::test]
    async fn generate_sql_sends_low_temperature_and_strips_fences() {
        let (manager, provider) = manager_with("```sql\nSELECT * FROM orders\n```");
        let sql = manager
            .generate_sql("show me all orders", "Table: orders", Utc::now())
            .await
            .unwrap();

        assert_eq!(sql, "SELECT * FROM orders");
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prompt, "show me all orders");
        assert!(seen[0].system.contains("Table: orders"));
        assert!((seen[0].temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(seen[0].max_tokens, 1000);
    }

    #[tokio::test]
    async fn empty_completion_is_a_response_error() {
        let (manager, _) = manager_with("```sql\n```");
        let err = manager
            .generate_sql("anything at all", "Table: t", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ResponseError(_)));
    }

    #[tokio::test]
    async fn explanation_prompt_includes_question_sql_and_rows() {
        let (manager, provider) = manager_with("Two orders were placed today.");
        let mut record = Record::new();
        record.insert("id".to_string(), serde_json::json!(1));

        let explanation = manager
            .explain_results("orders today?", "SELECT * FROM orders", &[record], 1)
            .await
            .unwrap();

        assert_eq!(explanation, "Two orders were placed today.");
        let seen = provider.seen.lock().unwrap();
        assert!(seen[0].system.contains("data analyst"));
        assert!(seen[0].prompt.contains("orders today?"));
        assert!(seen[0].prompt.contains("SELECT * FROM orders"));
        assert!(seen[0].prompt.contains("\"id\": 1"));
    }
}
