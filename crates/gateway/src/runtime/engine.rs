//! The turn engine: a per-category transition table over the user-turn count.
//!
//! State is exactly `(category, user_turn_count)` — there is no hidden
//! state. [`plan`] maps that pair to a [`TurnPlan`], and
//! [`TurnEngine::respond`] executes the plan against the completion client.
//! An unmatched pair yields an empty text reply on purpose (the step counter
//! and completion flag still advance in the orchestrator).

use std::sync::Arc;

use qm_domain::chat::{Category, MessageType};
use qm_domain::error::{Error, Result};
use qm_providers::CompletionClient;

use super::prompts;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transition table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What to do for one user turn. `user_turn_count` counts user messages
/// including the one just submitted, so the first reply to a user runs
/// with count 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPlan {
    /// Reflect one gratitude item back and ask a short follow-up.
    GratitudeReflect,
    /// 2-3 sentence encouraging wrap-up over both user turns. Final.
    GratitudeWrapUp,
    /// Produce negative-thought candidates and turn them into a choice list.
    AnxietyIdentify,
    /// One challenging question about the selected thought.
    AnxietyChallenge,
    /// Balanced replacement statement plus three action steps. Final.
    AnxietyReframe,
    /// Out-of-script turn: reply with empty text, still advance the step.
    NoOp,
}

/// The per-category transition table: `(category, count) -> plan`.
pub fn plan(category: Category, user_turn_count: u32) -> TurnPlan {
    match (category, user_turn_count) {
        (Category::Gratitude, 1) => TurnPlan::GratitudeReflect,
        (Category::Gratitude, 2) => TurnPlan::GratitudeWrapUp,
        (Category::Anxiety, 1) => TurnPlan::AnxietyIdentify,
        (Category::Anxiety, 2) => TurnPlan::AnxietyChallenge,
        (Category::Anxiety, 3) => TurnPlan::AnxietyReframe,
        _ => TurnPlan::NoOp,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The assistant turn produced by the engine.
#[derive(Debug, Clone)]
pub struct EngineReply {
    pub content: String,
    pub message_type: MessageType,
    pub choices: Option<Vec<String>>,
}

impl EngineReply {
    fn text(content: String) -> Self {
        Self {
            content,
            message_type: MessageType::Text,
            choices: None,
        }
    }
}

/// Executes [`TurnPlan`]s against the completion client.
pub struct TurnEngine {
    llm: Arc<dyn CompletionClient>,
}

impl TurnEngine {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Produce the assistant reply for one user turn.
    ///
    /// `user_turns` holds the content of every user-authored message in
    /// order, the just-submitted one last. The turn count is its length.
    pub async fn respond(&self, category: Category, user_turns: &[String]) -> Result<EngineReply> {
        let count = user_turns.len() as u32;
        let current = user_turns
            .last()
            .map(String::as_str)
            .ok_or_else(|| Error::Other("engine invoked with no user turns".into()))?;

        match plan(category, count) {
            TurnPlan::GratitudeReflect => {
                let input = format!("Here's what I'm grateful for today: {current}");
                let content = self.llm.complete(&input, prompts::GRATITUDE_REFLECT).await?;
                Ok(EngineReply::text(content))
            }

            TurnPlan::GratitudeWrapUp => {
                let gratitude = first_or_empty(user_turns);
                let input = format!(
                    "My gratitude: {gratitude}\nMy reflection: {current}\n\n\
                     Give me an encouraging wrap-up message."
                );
                let content = self.llm.complete(&input, prompts::GRATITUDE_WRAP_UP).await?;
                Ok(EngineReply::text(content))
            }

            TurnPlan::AnxietyIdentify => {
                let input = format!(
                    "I'm feeling anxious about this: \"{current}\"\n\n\
                     Can you help me identify the specific negative thoughts \
                     that might be behind this concern?"
                );
                let raw = self.llm.complete(&input, prompts::ANXIETY_IDENTIFY).await?;
                let choices = parse_numbered_choices(&raw);
                // The raw list is replaced with a fixed prompt; the parsed
                // items become the selectable choices.
                Ok(EngineReply {
                    content: prompts::ANXIETY_CHOICES_PROMPT.to_string(),
                    message_type: MessageType::Choices,
                    choices: Some(choices),
                })
            }

            TurnPlan::AnxietyChallenge => {
                let input = format!(
                    "I want to challenge this negative thought: \"{current}\"\n\n\
                     Help me examine this thought with a good CBT-style question."
                );
                let content = self.llm.complete(&input, prompts::ANXIETY_CHALLENGE).await?;
                Ok(EngineReply::text(content))
            }

            TurnPlan::AnxietyReframe => {
                let concern = first_or_empty(user_turns);
                let thought = user_turns.get(1).map(String::as_str).unwrap_or_default();

                let balanced_input = format!(
                    "Negative thought: \"{thought}\"\nUser reflection: \"{current}\"\n\n\
                     Create a balanced, realistic replacement thought in first person."
                );
                let balanced = self
                    .llm
                    .complete(&balanced_input, prompts::ANXIETY_BALANCED_THOUGHT)
                    .await?;

                let actions_input = format!(
                    "Original concern: \"{concern}\"\nBalanced thought: \"{balanced}\"\n\n\
                     Suggest 3 small, specific actions to help with this concern."
                );
                let actions = self
                    .llm
                    .complete(&actions_input, prompts::ANXIETY_ACTIONS)
                    .await?;

                Ok(EngineReply::text(prompts::anxiety_wrap_up(&balanced, &actions)))
            }

            TurnPlan::NoOp => {
                tracing::warn!(
                    category = %category,
                    user_turn_count = count,
                    "turn count outside exercise script, replying with empty text"
                );
                Ok(EngineReply::text(String::new()))
            }
        }
    }
}

fn first_or_empty(turns: &[String]) -> &str {
    turns.first().map(String::as_str).unwrap_or_default()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Choice parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extract the choice list from a numbered-list completion.
///
/// A line counts as a choice when, after trimming, it starts with one or
/// more digits followed by a `.`. The marker is stripped and the remainder
/// trimmed. Lines that don't match (preamble, notes) are excluded.
pub fn parse_numbered_choices(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return None;
            }
            let rest = line[digits..].strip_prefix('.')?;
            Some(rest.trim().to_string())
        })
        .collect()
}
