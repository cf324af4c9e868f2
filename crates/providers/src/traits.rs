use qm_domain::error::Result;

/// Trait every completion adapter must implement.
///
/// `input` is the user-role content for this turn; `instructions` is the
/// system-role prompt that scripts the exercise step. The call either
/// returns the generated text or fails — there is no partial success and
/// callers do not retry.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, input: &str, instructions: &str) -> Result<String>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}
