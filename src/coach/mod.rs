//! Goal-coaching helpers built on the gateway.
//!
//! Each helper renders a deterministic prompt, sends it through
//! [`AiGateway::complete`] (so repeated questions about the same goal are
//! served from cache) and parses the JSON reply into a typed result.
//! Replies that are empty or don't fit the expected shape degrade to the
//! helper's fallback; user-facing gateway errors are passed through.

mod images;
mod parse;
mod prompts;

pub use images::{DEFAULT_ACCESS_KEY_ENV, GoalImage, ImageSearchClient, UNSPLASH_BASE_URL};
pub use parse::{ReplyError, parse_json_reply};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;
use crate::gateway::AiGateway;
use crate::types::{CompletionOptions, Message, Role};

/// Questions used when the model can't provide any.
pub const DEFAULT_CHECKIN_QUESTIONS: [&str; 3] = [
    "What progress did you make toward this goal today?",
    "What got in your way, and how could you work around it?",
    "What is one small step you can take tomorrow?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    #[default]
    Personal,
    Business,
    Wellness,
}

impl GoalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalCategory::Personal => "personal",
            GoalCategory::Business => "business",
            GoalCategory::Wellness => "wellness",
        }
    }
}

/// What the coach knows about a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalContext {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub category: GoalCategory,
    /// Free-form date, shown to the model as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    /// Self-reported progress on a 0-10 scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl GoalContext {
    pub fn new(title: impl Into<String>, category: GoalCategory) -> Self {
        Self {
            title: title.into(),
            description: None,
            category,
            target_date: None,
            progress: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn target_date(mut self, date: impl Into<String>) -> Self {
        self.target_date = Some(date.into());
        self
    }

    /// Set progress, clamped to 10.
    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(10));
        self
    }
}

/// One check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub date: String,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ProgressEntry {
    pub fn new(date: impl Into<String>, score: u8) -> Self {
        Self {
            date: date.into(),
            score: score.min(10),
            note: None,
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAnalysis {
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub obstacles: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Steady,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressAnalysis {
    pub trend: Trend,
    pub insight: String,
    #[serde(default)]
    pub encouragement: String,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoSuggestion {
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
}

#[derive(Deserialize)]
struct QuestionsReply {
    questions: Vec<String>,
}

#[derive(Deserialize)]
struct TodosReply {
    todos: Vec<TodoSuggestion>,
}

#[derive(Deserialize)]
struct QueryReply {
    query: String,
}

/// AI goal coach.
#[derive(Clone)]
pub struct Coach {
    gateway: AiGateway,
    images: Option<ImageSearchClient>,
    options: CompletionOptions,
}

impl Coach {
    pub fn new(gateway: AiGateway) -> Self {
        Self {
            gateway,
            images: None,
            options: CompletionOptions::default(),
        }
    }

    /// Enable [`goal_image`](Self::goal_image).
    pub fn with_images(mut self, images: ImageSearchClient) -> Self {
        self.images = Some(images);
        self
    }

    /// Generation parameters for every helper (default: 500 tokens, 0.7).
    pub fn options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn gateway(&self) -> &AiGateway {
        &self.gateway
    }

    /// Summary, strengths, obstacles and suggestions for a goal.
    pub async fn analyze_goal(&self, goal: &GoalContext) -> Result<Option<GoalAnalysis>> {
        self.structured("analyze_goal", &prompts::goal_analysis(goal)).await
    }

    /// Trend and advice from a goal's check-in history.
    pub async fn analyze_progress(
        &self,
        goal: &GoalContext,
        history: &[ProgressEntry],
    ) -> Result<Option<ProgressAnalysis>> {
        self.structured("analyze_progress", &prompts::progress_analysis(goal, history))
            .await
    }

    /// Reflective questions for today's check-in.
    ///
    /// Falls back to [`DEFAULT_CHECKIN_QUESTIONS`] when the model gives
    /// nothing usable.
    pub async fn checkin_questions(&self, goal: &GoalContext) -> Result<Vec<String>> {
        let questions: Vec<String> = self
            .structured::<QuestionsReply>("checkin_questions", &prompts::checkin_questions(goal))
            .await?
            .map(|reply| non_blank(reply.questions))
            .unwrap_or_default();

        if questions.is_empty() {
            return Ok(DEFAULT_CHECKIN_QUESTIONS.iter().map(|q| q.to_string()).collect());
        }
        Ok(questions)
    }

    /// Concrete to-dos for a goal; empty when the model gives nothing usable.
    pub async fn generate_todos(&self, goal: &GoalContext) -> Result<Vec<TodoSuggestion>> {
        let todos = self
            .structured::<TodosReply>("generate_todos", &prompts::todos(goal))
            .await?
            .map(|reply| reply.todos)
            .unwrap_or_default();

        Ok(todos
            .into_iter()
            .filter(|todo| !todo.title.trim().is_empty())
            .collect())
    }

    /// Free-form coaching conversation.
    ///
    /// The coach's system prompt is prepended unless the conversation
    /// already opens with one. Never cached.
    pub async fn coach_reply(&self, conversation: &[Message]) -> Result<Option<String>> {
        let starts_with_system = conversation
            .first()
            .is_some_and(|m| m.role == Role::System);

        if starts_with_system {
            return self.gateway.chat(conversation, &self.options).await;
        }

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(prompts::COACH_SYSTEM_PROMPT));
        messages.extend_from_slice(conversation);
        self.gateway.chat(&messages, &self.options).await
    }

    /// A photo that represents the goal.
    ///
    /// The model suggests the search query; if it can't (for any reason,
    /// including rate limits) the goal title is searched instead. Returns
    /// `None` without an image client or when the search finds nothing.
    pub async fn goal_image(&self, goal: &GoalContext) -> Result<Option<GoalImage>> {
        let Some(images) = &self.images else {
            return Ok(None);
        };

        let suggested = match self
            .structured::<QueryReply>("goal_image", &prompts::image_query(goal))
            .await
        {
            Ok(reply) => reply.map(|r| r.query.trim().to_string()),
            Err(e) => {
                debug!(error = %e, "image query unavailable, using goal title");
                None
            }
        };
        let query = suggested
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| goal.title.clone());

        Ok(images.search(&query).await)
    }

    async fn structured<T: DeserializeOwned>(
        &self,
        task: &'static str,
        prompt: &str,
    ) -> Result<Option<T>> {
        let Some(reply) = self.gateway.complete(prompt, &self.options).await? else {
            return Ok(None);
        };

        match parse_json_reply(&reply) {
            Ok(value) => Ok(Some(value)),
            Err(ReplyError::Empty) => {
                debug!(task, "empty reply from model");
                Ok(None)
            }
            Err(ReplyError::Schema(error)) => {
                warn!(task, error = %error, "model reply did not match expected shape");
                Ok(None)
            }
        }
    }
}

fn non_blank(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
