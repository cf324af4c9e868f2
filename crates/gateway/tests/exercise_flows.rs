//! End-to-end exercise flows through the orchestrator — no HTTP, no real
//! provider. A scripted completion client makes every run deterministic.

use std::sync::Arc;

use parking_lot::Mutex;

use qm_domain::chat::{Category, MessageType, Role};
use qm_domain::error::{Error, Result};
use qm_gateway::runtime::{run_turn, ConversationLockMap, TurnRequest};
use qm_gateway::state::AppState;
use qm_providers::CompletionClient;
use qm_store::{JournalStore, User};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ScriptedClient {
    replies: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(replies: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(String::from).rev().collect()),
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _input: &str, _instructions: &str) -> Result<String> {
        self.replies.lock().pop().ok_or_else(|| Error::Provider {
            provider: "scripted".into(),
            message: "script exhausted".into(),
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

struct FailingClient;

#[async_trait::async_trait]
impl CompletionClient for FailingClient {
    async fn complete(&self, _input: &str, _instructions: &str) -> Result<String> {
        Err(Error::Provider {
            provider: "failing".into(),
            message: "upstream unavailable".into(),
        })
    }

    fn provider_id(&self) -> &str {
        "failing"
    }
}

fn harness(llm: Arc<dyn CompletionClient>) -> (tempfile::TempDir, AppState, User) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JournalStore::new(dir.path()).unwrap());
    let (user, _) = store.get_or_create_user("test-subject").unwrap();
    let state = AppState {
        config: Arc::new(qm_domain::config::Config::default()),
        store,
        llm: Some(llm),
        conversation_locks: Arc::new(ConversationLockMap::new()),
        api_token_hash: None,
    };
    (dir, state, user)
}

fn start(category: Category) -> TurnRequest {
    TurnRequest {
        category,
        message: None,
        conversation_id: None,
        selected_choice: None,
    }
}

fn say(category: Category, conversation_id: uuid::Uuid, text: &str) -> TurnRequest {
    TurnRequest {
        category,
        message: Some(text.into()),
        conversation_id: Some(conversation_id),
        selected_choice: None,
    }
}

fn pick(category: Category, conversation_id: uuid::Uuid, index: usize) -> TurnRequest {
    TurnRequest {
        category,
        message: None,
        conversation_id: Some(conversation_id),
        selected_choice: Some(index),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gratitude happy path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn gratitude_happy_path() {
    let client = ScriptedClient::new(vec![
        "I love that you mentioned your dog! What makes those moments special?",
        "Your gratitude practice is paying off. Keep noticing the small joys. See you tomorrow!",
    ]);
    let (_dir, state, user) = harness(client);

    // Create: fixed opening, no provider call, incomplete at step 1.
    let out = run_turn(&state, &user, start(Category::Gratitude))
        .await
        .unwrap();
    let conv_id = out.conversation.id;
    assert_eq!(out.conversation.total_steps, 3);
    assert_eq!(out.conversation.current_step, 1);
    assert!(!out.is_complete());
    assert_eq!(out.messages.len(), 1);
    assert_eq!(out.messages[0].content, "What are you grateful for today?");
    assert_eq!(out.messages[0].role, Role::Assistant);

    // First user turn: reflective follow-up, step 2, still incomplete.
    let out = run_turn(&state, &user, say(Category::Gratitude, conv_id, "my dog"))
        .await
        .unwrap();
    assert_eq!(out.conversation.current_step, 2);
    assert!(!out.is_complete());
    assert_eq!(out.messages.len(), 3);
    assert!(out.messages[2].content.contains("your dog"));

    // Second user turn: wrap-up, step 3, complete.
    let out = run_turn(
        &state,
        &user,
        say(Category::Gratitude, conv_id, "she's always happy to see me"),
    )
    .await
    .unwrap();
    assert_eq!(out.conversation.current_step, 3);
    assert!(out.is_complete());
    assert_eq!(out.messages.len(), 5);
    assert!(out.messages[4].content.contains("gratitude practice"));

    // Order values are contiguous 1..N.
    let orders: Vec<u32> = out.messages.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5]);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Anxiety happy path
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn anxiety_happy_path() {
    let client = ScriptedClient::new(vec![
        "1. I will fail\n2. They will laugh\nNote: be kind to yourself",
        "What evidence do you actually have that this will happen?",
        "I can prepare well and handle whatever happens",
        "1. Rehearse once\n2. Sleep early\n3. Breathe before you start",
    ]);
    let (_dir, state, user) = harness(client);

    let out = run_turn(&state, &user, start(Category::Anxiety)).await.unwrap();
    let conv_id = out.conversation.id;
    assert_eq!(out.conversation.total_steps, 4);
    assert_eq!(
        out.messages[0].content,
        "What are you feeling anxious about?"
    );

    // Concern → fixed "which feels strongest" with a populated choice list.
    let out = run_turn(
        &state,
        &user,
        say(Category::Anxiety, conv_id, "my presentation tomorrow"),
    )
    .await
    .unwrap();
    let assistant = out.messages.last().unwrap();
    assert_eq!(assistant.message_type, MessageType::Choices);
    assert_eq!(
        assistant.choices.as_deref().unwrap(),
        ["I will fail".to_string(), "They will laugh".to_string()]
    );
    assert!(assistant.content.contains("Which one feels strongest"));
    assert!(!out.is_complete());

    // Selection → recorded as the chosen thought, answered with a question.
    let out = run_turn(&state, &user, pick(Category::Anxiety, conv_id, 0))
        .await
        .unwrap();
    let user_msg = &out.messages[out.messages.len() - 2];
    assert_eq!(user_msg.content, "I will fail");
    assert_eq!(user_msg.message_type, MessageType::ChoiceSelection);
    assert_eq!(user_msg.selected_choice, Some(0));
    assert!(out
        .messages
        .last()
        .unwrap()
        .content
        .contains("What evidence"));
    assert!(!out.is_complete());

    // Reflection → combined balanced thought + action steps, complete.
    let out = run_turn(
        &state,
        &user,
        say(Category::Anxiety, conv_id, "I've given good talks before"),
    )
    .await
    .unwrap();
    assert!(out.is_complete());
    assert_eq!(out.conversation.current_step, 4);
    let final_msg = out.messages.last().unwrap();
    assert!(final_msg.content.contains("Balanced thought"));
    assert!(final_msg.content.contains("I can prepare well"));
    assert!(final_msg.content.contains("Rehearse once"));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Edge cases
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn rereading_without_input_is_idempotent() {
    let client = ScriptedClient::new(vec![]);
    let (_dir, state, user) = harness(client);

    let out = run_turn(&state, &user, start(Category::Gratitude))
        .await
        .unwrap();
    let conv_id = out.conversation.id;

    let first = run_turn(
        &state,
        &user,
        TurnRequest {
            category: Category::Gratitude,
            message: None,
            conversation_id: Some(conv_id),
            selected_choice: None,
        },
    )
    .await
    .unwrap();
    let second = run_turn(
        &state,
        &user,
        TurnRequest {
            category: Category::Gratitude,
            message: None,
            conversation_id: Some(conv_id),
            selected_choice: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(first.messages.len(), second.messages.len());
    assert_eq!(first.conversation.current_step, second.conversation.current_step);
    assert_eq!(first.is_complete(), second.is_complete());
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let client = ScriptedClient::new(vec![]);
    let (_dir, state, user) = harness(client);

    let err = run_turn(
        &state,
        &user,
        say(Category::Gratitude, uuid::Uuid::new_v4(), "hi"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn foreign_conversation_reads_as_not_found() {
    let client = ScriptedClient::new(vec![]);
    let (_dir, state, owner) = harness(client);

    let out = run_turn(&state, &owner, start(Category::Gratitude))
        .await
        .unwrap();
    let conv_id = out.conversation.id;

    let (intruder, _) = state.store.get_or_create_user("someone-else").unwrap();
    let err = run_turn(&state, &intruder, say(Category::Gratitude, conv_id, "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn provider_failure_leaves_no_orphaned_user_turn() {
    let (_dir, state, user) = harness(Arc::new(FailingClient));

    let out = run_turn(&state, &user, start(Category::Gratitude))
        .await
        .unwrap();
    let conv_id = out.conversation.id;

    let err = run_turn(&state, &user, say(Category::Gratitude, conv_id, "my dog"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));

    // The turn never committed: only the opening message exists and the
    // step counter is untouched.
    let messages = state.store.messages(conv_id);
    assert_eq!(messages.len(), 1);
    let conv = state.store.get_conversation(conv_id).unwrap();
    assert_eq!(conv.current_step, 1);
    assert!(!conv.is_complete);
}

#[tokio::test]
async fn off_script_turn_still_advances_step() {
    // Script covers the two gratitude turns; the third submission is
    // outside the exercise script.
    let client = ScriptedClient::new(vec!["reflect", "wrap up"]);
    let (_dir, state, user) = harness(client);

    let out = run_turn(&state, &user, start(Category::Gratitude))
        .await
        .unwrap();
    let conv_id = out.conversation.id;
    run_turn(&state, &user, say(Category::Gratitude, conv_id, "one"))
        .await
        .unwrap();
    run_turn(&state, &user, say(Category::Gratitude, conv_id, "two"))
        .await
        .unwrap();

    let out = run_turn(&state, &user, say(Category::Gratitude, conv_id, "three"))
        .await
        .unwrap();
    let assistant = out.messages.last().unwrap();
    assert_eq!(assistant.content, "");
    assert_eq!(assistant.message_type, MessageType::Text);
    assert_eq!(out.conversation.current_step, 4);
    // Completion never reverts.
    assert!(out.is_complete());
}
