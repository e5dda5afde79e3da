//! Note continuations from a text-completion provider.
//!
//! Requests run on a background thread and come back to the event loop as a
//! single [`SuggestionEvent`] tagged with the token the caller supplied.

mod gemini;

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use thiserror::Error;

pub use gemini::GeminiProvider;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const TEMPERATURE: f32 = 0.9;

const PROMPT_TEMPLATE: &str = "You are a note assistant that helps the user continue their notes.
Continue the note naturally and concisely, keeping the same tone.
Do not repeat the existing text. Do not add labels such as \"Completion:\" and do not wrap the answer in quotes.
Finish the sentence you start and never begin or end with \"...\".
Reply with the continuation only, it is inserted into the note as-is.
Note:
{note}
Continuation:";

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("provider unavailable")]
    Unavailable,
    #[error("empty result")]
    Empty,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub trait SuggestionProvider: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, SuggestError>;
}

pub fn build_prompt(note: &str) -> String {
    PROMPT_TEMPLATE.replacen("{note}", note, 1)
}

/// Asks `provider` to continue `note`. The returned text is used verbatim.
pub fn request_suggestion(
    provider: Option<&dyn SuggestionProvider>,
    note: &str,
) -> Result<String, SuggestError> {
    let provider = provider.ok_or(SuggestError::Unavailable)?;
    let text = provider.complete(&build_prompt(note))?;
    if text.is_empty() {
        return Err(SuggestError::Empty);
    }
    Ok(text)
}

#[derive(Debug)]
pub struct SuggestionEvent {
    pub token: u64,
    pub result: Result<String, SuggestError>,
}

pub struct Suggester {
    provider: Option<Arc<dyn SuggestionProvider>>,
    tx: Sender<SuggestionEvent>,
}

impl Suggester {
    pub fn new(
        provider: Option<Arc<dyn SuggestionProvider>>,
        tx: Sender<SuggestionEvent>,
    ) -> Self {
        Self { provider, tx }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Fire-and-forget: exactly one event is sent back for each call.
    pub fn dispatch(&self, token: u64, note: String) {
        let provider = self.provider.clone();
        let tx = self.tx.clone();
        tracing::debug!(token, chars = note.len(), "dispatching suggestion request");
        thread::spawn(move || {
            let result = request_suggestion(provider.as_deref(), &note);
            if let Err(e) = &result {
                tracing::warn!(token, "suggestion request failed: {e}");
            }
            if tx.send(SuggestionEvent { token, result }).is_err() {
                tracing::debug!(token, "suggestion receiver gone, dropping result");
            }
        });
    }
}
