//! Closed enums shared by the store, the turn engine, and the API surface.

use serde::{Deserialize, Serialize};

/// Guided exercise category. A closed enum: any other value fails request
/// deserialization before reaching the turn engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gratitude,
    Anxiety,
}

impl Category {
    /// Fixed exercise length, derived from the category at conversation
    /// creation time and never recomputed.
    pub fn total_steps(self) -> u32 {
        match self {
            Category::Gratitude => 3,
            Category::Anxiety => 4,
        }
    }

    /// The number of user turns after which the exercise is complete
    /// (`total_steps - 1`).
    pub fn max_user_turns(self) -> u32 {
        self.total_steps() - 1
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Gratitude => write!(f, "gratitude"),
            Category::Anxiety => write!(f, "anxiety"),
        }
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// How a message should be rendered and interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Free text.
    Text,
    /// Assistant message carrying a choice list for the user to pick from.
    Choices,
    /// User message recording a pick from the previous choice list.
    ChoiceSelection,
}
