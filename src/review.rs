//! Assignment generation and grading through an OpenAI-compatible
//! chat-completions endpoint

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClientError, Result};
use crate::models::Difficulty;

/// Reviewer endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewerConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            model: "google/gemini-flash-1.5".to_string(),
            max_tokens: 2048,
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicCheck {
    #[serde(default)]
    is_technical: bool,
    #[serde(default)]
    is_appropriate: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Assignment drafted from a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedAssignment {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub estimated_time: String,
}

/// Grade and feedback for a submitted solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionEvaluation {
    /// 0 to 10
    pub score: f64,
    pub analysis: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub strength_points: Vec<String>,
    #[serde(default)]
    pub weakness_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownStep {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A project requirement split into steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemBreakdown {
    pub steps: Vec<BreakdownStep>,
}

const NON_TECHNICAL_TOPIC: &str = "Please provide a valid technical programming topic";

/// Chat-completions client for assignment authoring and grading
pub struct AssignmentReviewer {
    client: Client,
    config: ReviewerConfig,
}

impl AssignmentReviewer {
    pub fn new(config: ReviewerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Configuration(format!("HTTP client: {e}")))?;
        info!("Assignment reviewer: model={}", config.model);
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ReviewerConfig {
        &self.config
    }

    /// Draft an assignment for `topic`, refusing topics that are not about
    /// programming.
    pub async fn generate_assignment(
        &self,
        topic: &str,
        difficulty: Difficulty,
    ) -> Result<GeneratedAssignment> {
        let check: TopicCheck = self
            .complete_json(&format!(
                "Determine if the following topic is related to technical programming or development.\n\
                 Topic: \"{topic}\"\n\
                 Respond with a JSON object containing:\n\
                 - \"isTechnical\": boolean\n\
                 - \"isAppropriate\": boolean\n\
                 - \"reason\": string explaining why if either check fails"
            ))
            .await?;

        if !check.is_appropriate || !check.is_technical {
            let reason = check
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| NON_TECHNICAL_TOPIC.to_string());
            return Err(ClientError::Validation(reason));
        }

        self.complete_json(&format!(
            "Create a blockchain/web3 programming assignment with the following criteria:\n\
             Topic: {topic}\n\
             Difficulty: {difficulty}\n\n\
             Please provide the response in the following JSON format:\n\
             {{\n\
               \"title\": \"Assignment title\",\n\
               \"description\": \"Detailed description of the task\",\n\
               \"requirements\": [\"requirement1\", \"requirement2\", ...],\n\
               \"hints\": [\"hint1\", \"hint2\", ...],\n\
               \"estimatedTime\": \"estimated completion time\"\n\
             }}"
        ))
        .await
    }

    /// Grade a solution against a generated assignment
    pub async fn check_assignment(
        &self,
        assignment: &GeneratedAssignment,
        solution: &str,
    ) -> Result<SolutionEvaluation> {
        let evaluation: SolutionEvaluation = self
            .complete_json(&format!(
                "You are a blockchain education expert. Please evaluate this solution for the following assignment:\n\n\
                 Assignment:\n{}\n{}\n\n\
                 Requirements:\n{}\n\n\
                 Student's Solution:\n{solution}\n\n\
                 Please provide your evaluation in the following JSON format:\n\
                 {{\n\
                   \"score\": <number between 0-10>,\n\
                   \"analysis\": \"detailed analysis of the solution\",\n\
                   \"suggestions\": [\"improvement1\", \"improvement2\", ...],\n\
                   \"strengthPoints\": [\"strength1\", \"strength2\", ...],\n\
                   \"weaknessPoints\": [\"weakness1\", \"weakness2\", ...]\n\
                 }}",
                assignment.title,
                assignment.description,
                assignment.requirements.join("\n"),
            ))
            .await?;

        if !(0.0..=10.0).contains(&evaluation.score) {
            return Err(ClientError::Decode(format!(
                "score {} outside 0-10",
                evaluation.score
            )));
        }
        Ok(evaluation)
    }

    /// Split a project description into steps
    pub async fn break_down_problem(&self, project: &str) -> Result<ProblemBreakdown> {
        let check: TopicCheck = self
            .complete_json(&format!(
                "Determine if the following query is related to technical programming, development, or learning.\n\
                 Respond with a JSON object containing:\n\
                 - \"isTechnical\": boolean (true if related to programming/development)\n\
                 - \"isAppropriate\": boolean (false if contains inappropriate/NSFW content)\n\
                 - \"reason\": string explaining why if either check fails\n\n\
                 Query: \"{project}\""
            ))
            .await?;

        if !check.is_appropriate {
            return Err(ClientError::Validation(
                "Inappropriate content detected. Please keep queries professional and work-appropriate."
                    .into(),
            ));
        }
        if !check.is_technical {
            return Err(ClientError::Validation(
                "Please provide a technical programming or development related query".into(),
            ));
        }

        let text = self
            .complete(&format!(
                "Break down this technical project requirement into clear, manageable steps.\n\
                 Only provide response if it's related to programming, development, or technical learning.\n\
                 Format the response as JSON with the following structure:\n\
                 {{\n\
                   \"steps\": [\n\
                     {{\n\
                       \"title\": \"Step title\",\n\
                       \"description\": \"Detailed description of what needs to be done\",\n\
                       \"estimatedTime\": \"Estimated time to complete this step\",\n\
                       \"requirements\": [\"requirement1\", \"requirement2\"],\n\
                       \"resources\": [\"helpful resource1\", \"helpful resource2\"]\n\
                     }}\n\
                   ]\n\
                 }}\n\n\
                 Project: {project}"
            ))
            .await?;

        let lowered = text.to_lowercase();
        if ["nsfw", "inappropriate", "adult content"]
            .iter()
            .any(|w| lowered.contains(w))
        {
            return Err(ClientError::Validation(
                "Invalid or inappropriate request. Please keep queries technical and professional."
                    .into(),
            ));
        }
        parse_json_reply(&text)
    }

    async fn complete_json<T: DeserializeOwned>(&self, prompt: &str) -> Result<T> {
        let text = self.complete(prompt).await?;
        parse_json_reply(&text)
    }

    /// Single-turn completion, returns the first choice's text
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        debug!(model = %self.config.model, "Calling chat completions");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages: vec![ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                }],
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("LLM request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ClientError::Transport(format!("LLM error ({status}): {err}")));
        }

        let chat: ChatResponse = resp.json().await?;
        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ClientError::Decode("LLM response has no choices".into()))
    }
}

/// Strip markdown code fences and parse the remaining JSON
fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = text.replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim())
        .map_err(|e| ClientError::Decode(format!("LLM reply is not the expected JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn reviewer(server: &MockServer) -> AssignmentReviewer {
        AssignmentReviewer::new(ReviewerConfig {
            api_base: server.url("/v1"),
            api_key: "test-key".into(),
            timeout_secs: 5,
            ..Default::default()
        })
        .unwrap()
    }

    fn reply(content: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn strips_code_fences() {
        let parsed: serde_json::Value =
            parse_json_reply("```json\n{\"score\": 7}\n```").unwrap();
        assert_eq!(parsed["score"], 7);
        assert!(parse_json_reply::<serde_json::Value>("not json").is_err());
    }

    #[tokio::test]
    async fn generate_assignment_validates_then_generates() {
        let server = MockServer::start();
        let check = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .body_contains("isTechnical");
            then.status(200).json_body(reply(
                r#"{"isTechnical": true, "isAppropriate": true, "reason": ""}"#,
            ));
        });
        let generate = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("Difficulty: advanced");
            then.status(200).json_body(reply(
                "```json\n{\"title\":\"Flash loans\",\"description\":\"Build one\",\"requirements\":[\"Aave\"],\"hints\":[],\"estimatedTime\":\"3h\"}\n```",
            ));
        });

        let assignment = reviewer(&server)
            .generate_assignment("Flash loans", Difficulty::Advanced)
            .await
            .unwrap();

        assert_eq!(assignment.title, "Flash loans");
        assert_eq!(assignment.requirements, vec!["Aave".to_string()]);
        assert_eq!(assignment.estimated_time, "3h");
        check.assert();
        generate.assert();
    }

    #[tokio::test]
    async fn non_technical_topic_is_rejected() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(reply(
                r#"{"isTechnical": false, "isAppropriate": true, "reason": "Cooking is not programming"}"#,
            ));
        });

        let err = reviewer(&server)
            .generate_assignment("Pasta", Difficulty::Beginner)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Validation(ref m) if m == "Cooking is not programming"));
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn check_assignment_parses_evaluation() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("Student's Solution");
            then.status(200).json_body(reply(
                r#"{"score": 8, "analysis": "Solid", "suggestions": ["Add tests"], "strengthPoints": ["Clear"], "weaknessPoints": []}"#,
            ));
        });

        let assignment = GeneratedAssignment {
            title: "ERC-20".into(),
            description: "Token".into(),
            requirements: vec!["transfer".into()],
            hints: vec![],
            estimated_time: "1h".into(),
        };
        let eval = reviewer(&server)
            .check_assignment(&assignment, "contract Token {}")
            .await
            .unwrap();

        assert_eq!(eval.score, 8.0);
        assert_eq!(eval.strength_points, vec!["Clear".to_string()]);
    }

    #[tokio::test]
    async fn out_of_range_score_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .json_body(reply(r#"{"score": 42, "analysis": "?"}"#));
        });
        let assignment = GeneratedAssignment {
            title: "t".into(),
            description: "d".into(),
            requirements: vec![],
            hints: vec![],
            estimated_time: String::new(),
        };
        assert!(matches!(
            reviewer(&server).check_assignment(&assignment, "x").await,
            Err(ClientError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn break_down_problem_rejects_inappropriate_query() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(reply(
                r#"{"isTechnical": true, "isAppropriate": false, "reason": "nsfw"}"#,
            ));
        });
        let err = reviewer(&server)
            .break_down_problem("something")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref m) if m.starts_with("Inappropriate")));
    }

    #[tokio::test]
    async fn break_down_problem_returns_steps() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("isTechnical");
            then.status(200)
                .json_body(reply(r#"{"isTechnical": true, "isAppropriate": true}"#));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("Break down");
            then.status(200).json_body(reply(
                r#"{"steps":[{"title":"Scaffold","description":"cargo new","estimatedTime":"5m","requirements":[],"resources":[]}]}"#,
            ));
        });

        let breakdown = reviewer(&server)
            .break_down_problem("Build a Rust CLI")
            .await
            .unwrap();
        assert_eq!(breakdown.steps.len(), 1);
        assert_eq!(breakdown.steps[0].title, "Scaffold");
    }

    #[tokio::test]
    async fn http_error_is_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("invalid api key");
        });
        let err = reviewer(&server)
            .generate_assignment("Solidity", Difficulty::Beginner)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(ref m) if m.contains("invalid api key")));
    }
}
