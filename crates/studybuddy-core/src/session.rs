//! Interactive chat state: the selected pipeline and a display-only transcript.
//!
//! Past turns are never sent to the model; every question is answered on its own.

use studybuddy_llm::{Embedder, Message, ModelBackend, Role};

use crate::config::{BackendKind, Secret};
use crate::error::RagError;
use crate::rag::Rag;

/// Reply shown while no model backend has been chosen.
pub const NOT_CONFIGURED_REPLY: &str = "Please set your LLM model first!";

/// A slash command typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/model <hosted|local> [api-key]`
    Model {
        kind: BackendKind,
        api_key: Option<Secret>,
    },
    History,
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
/model <hosted|local> [api-key]  choose the chat model backend
/history                         show this session's transcript
/clear                           clear the transcript
/help                            show this help
/quit                            leave the chat";

/// Parse a chat line. `None` means it is a question, not a command; `Some(Err)`
/// carries a user-facing message for a malformed or unknown command.
pub fn parse_command(line: &str) -> Option<Result<Command, String>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let parsed = match name {
        "model" => match parts.next() {
            Some(kind) => kind.parse::<BackendKind>().map(|kind| Command::Model {
                kind,
                api_key: parts.next().map(Secret::new),
            }),
            None => Err("usage: /model <hosted|local> [api-key]".to_owned()),
        },
        "history" => Ok(Command::History),
        "clear" => Ok(Command::Clear),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '/{other}', try /help")),
    };
    Some(parsed)
}

/// Caller-side session state. The [`Rag`] it holds is stateless.
pub struct ChatSession<E, B> {
    rag: Option<Rag<E, B>>,
    history: Vec<Message>,
}

impl<E, B> Default for ChatSession<E, B> {
    fn default() -> Self {
        Self {
            rag: None,
            history: Vec::new(),
        }
    }
}

impl<E, B> std::fmt::Debug for ChatSession<E, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("configured", &self.rag.is_some())
            .field("turns", &self.history.len())
            .finish()
    }
}

impl<E: Embedder, B: ModelBackend> ChatSession<E, B> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rag(rag: Rag<E, B>) -> Self {
        Self {
            rag: Some(rag),
            history: Vec::new(),
        }
    }

    /// Replace the active pipeline. The transcript is kept.
    pub fn set_rag(&mut self, rag: Rag<E, B>) {
        self.rag = Some(rag);
    }

    #[must_use]
    pub fn rag(&self) -> Option<&Rag<E, B>> {
        self.rag.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Answer one question and record both turns for display.
    ///
    /// Without a configured backend the placeholder reply is returned instead
    /// of an error. A failed answer records only the question.
    ///
    /// # Errors
    ///
    /// Returns the pipeline error for the failed stage.
    pub async fn ask(&mut self, question: &str) -> Result<String, RagError> {
        self.history.push(Message::user(question));
        let reply = match &self.rag {
            Some(rag) => rag.answer(question).await?.answer,
            None => NOT_CONFIGURED_REPLY.to_owned(),
        };
        self.history.push(Message {
            role: Role::Assistant,
            content: reply.clone(),
        });
        Ok(reply)
    }
}
