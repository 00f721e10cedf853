use crate::error::LlmError;
use crate::local::LocalBackend;
#[cfg(feature = "mock")]
use crate::mock::MockBackend;
use crate::openai::OpenAiBackend;
use crate::provider::{Completion, Message, ModelBackend};

/// Generates a match over all `AnyBackend` variants, binding the inner backend
/// and evaluating the given expression for each arm.
macro_rules! delegate_backend {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyBackend::Hosted($p) => $expr,
            AnyBackend::Local($p) => $expr,
            #[cfg(feature = "mock")]
            AnyBackend::Mock($p) => $expr,
        }
    };
}

/// The backend chosen by configuration. Adding a backend means adding a
/// variant here; callers only see [`ModelBackend`].
#[derive(Debug, Clone)]
pub enum AnyBackend {
    Hosted(OpenAiBackend),
    Local(LocalBackend),
    #[cfg(feature = "mock")]
    Mock(MockBackend),
}

impl ModelBackend for AnyBackend {
    async fn complete(&self, messages: &[Message]) -> Result<Completion, LlmError> {
        delegate_backend!(self, |p| p.complete(messages).await)
    }

    fn name(&self) -> &str {
        delegate_backend!(self, |p| p.name())
    }

    fn model(&self) -> &str {
        delegate_backend!(self, |p| p.model())
    }
}
