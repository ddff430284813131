//! Assistant personas for the chat and explore screens.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Which screen a conversation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Free-form health questions.
    Chat,
    /// Topic lookups backed by web search, answered with cited sources.
    Explore,
}

/// Must appear at the end of every answer.
pub const DISCLAIMER: &str = "**Disclaimer: This information is for educational purposes only and is not a substitute for professional medical advice. Always consult a qualified healthcare provider about your health.**";

/// Text of the pending turn while a request is in flight.
pub const PENDING_PLACEHOLDER: &str = "Thinking...";

const CHAT_GREETING: &str = "Hi, I can help answer health questions.";
const EXPLORE_GREETING: &str =
    "Search a health topic or pick one of the trending topics to learn more.";

impl SessionKind {
    /// The assistant turn every new session starts with.
    pub fn greeting(&self) -> &'static str {
        match self {
            SessionKind::Chat => CHAT_GREETING,
            SessionKind::Explore => EXPLORE_GREETING,
        }
    }

    /// Whether requests should ask the API for search grounding.
    pub fn wants_grounding(&self) -> bool {
        matches!(self, SessionKind::Explore)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Chat => "chat",
            SessionKind::Explore => "explore",
        }
    }

    /// Build the system instruction, including today's date.
    pub fn system_instruction(&self) -> String {
        let current_date = Local::now().format("%B %d, %Y").to_string();

        let role = match self {
            SessionKind::Chat => {
                "You are HealAI, a friendly and careful health assistant. Answer the user's health questions clearly and concisely in plain language. Suggest practical self-care steps where appropriate, and say when symptoms warrant seeing a doctor or seeking emergency care. Never diagnose conditions or prescribe medication doses."
            }
            SessionKind::Explore => {
                "You are HealAI, a health educator. The user gives you a health topic. Write a short, well-organized overview of the topic using current, reputable sources: what it is, why it matters, and practical tips. Prefer sources from public health agencies and medical institutions."
            }
        };

        format!(
            "{role}\n\nToday's date is {date}.\n\nEnd every answer with this exact disclaimer on its own line:\n{disclaimer}",
            role = role,
            date = current_date,
            disclaimer = DISCLAIMER
        )
    }
}
