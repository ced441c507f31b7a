//! The chat view state machine.
//!
//! [`ChatView`] owns everything the page renders: the message thread, the
//! text in the prompt box, the selected model, whether a request is in
//! flight ("thinking"), whether the settings modal is open, and the last
//! error alert.
//!
//! A send is split in two so no lock is held across the network call:
//! [`ChatView::begin_send`] validates and records the user message, and
//! [`ChatView::finish_send`] records the outcome.

use serde::Serialize;
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::{ProviderError, SendError};
use crate::filter::ProfanityFilter;
use crate::message::Message;
use crate::model::AiModel;
use crate::provider::Turn;
use crate::settings::ApiKey;
use crate::thread::MessageThread;

/// Maximum allowed prompt length in bytes.
pub const MAX_PROMPT_BYTES: usize = 128 * 1024; // 128 KiB

/// Context window sent with completions unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Everything needed to perform one upstream call, captured at submit time.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub model: AiModel,
    /// Filtered prompt text.
    pub prompt: String,
    /// Earlier turns with the same model, oldest first.
    pub history: Vec<Turn>,
    pub api_key: ApiKey,
    pub user_message: Message,
}

/// Serializable copy of the view, used for rendering and the JSON API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ViewSnapshot {
    pub form_value: String,
    pub thinking: bool,
    pub selected: AiModel,
    pub options: Vec<AiModel>,
    pub modal_open: bool,
    pub alert: Option<String>,
    pub can_submit: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug)]
pub struct ChatView {
    thread: MessageThread,
    form_value: String,
    thinking: bool,
    selected: AiModel,
    modal_open: bool,
    alert: Option<String>,
    filter: ProfanityFilter,
    history_limit: usize,
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new(ProfanityFilter::default(), DEFAULT_HISTORY_LIMIT)
    }
}

impl ChatView {
    pub fn new(filter: ProfanityFilter, history_limit: usize) -> Self {
        Self {
            thread: MessageThread::new(),
            form_value: String::new(),
            thinking: false,
            selected: AiModel::default(),
            modal_open: false,
            alert: None,
            filter,
            history_limit,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn messages(&self) -> &[Message] {
        self.thread.messages()
    }

    pub fn form_value(&self) -> &str {
        &self.form_value
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn selected(&self) -> AiModel {
        self.selected
    }

    pub fn modal_open(&self) -> bool {
        self.modal_open
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Whether the send button is enabled.
    pub fn can_submit(&self) -> bool {
        !self.thinking && !self.form_value.trim().is_empty()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            form_value: self.form_value.clone(),
            thinking: self.thinking,
            selected: self.selected,
            options: AiModel::ALL.to_vec(),
            modal_open: self.modal_open,
            alert: self.alert.clone(),
            can_submit: self.can_submit(),
            messages: self.thread.messages().to_vec(),
        }
    }

    // ── Input ────────────────────────────────────────────────────────────────

    pub fn set_form_value(&mut self, value: impl Into<String>) {
        self.form_value = value.into();
    }

    pub fn select_model(&mut self, model: AiModel) {
        self.selected = model;
    }

    pub fn open_settings(&mut self) {
        self.modal_open = true;
    }

    pub fn close_settings(&mut self) {
        self.modal_open = false;
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Show a user-facing alert outside the send flow (e.g. a rejected key).
    pub fn raise_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    /// Start a new chat. Refused while a request is in flight so its reply
    /// cannot land in the fresh thread.
    pub fn clear_thread(&mut self) -> Result<(), SendError> {
        if self.thinking {
            return Err(SendError::Busy);
        }
        self.thread.clear();
        self.alert = None;
        Ok(())
    }

    // ── Send ─────────────────────────────────────────────────────────────────

    /// Validate the form and record the user's message.
    ///
    /// Without an API key the settings modal is opened and the typed prompt
    /// is kept so the user can send it once a key is saved.
    pub fn begin_send(&mut self, api_key: Option<ApiKey>) -> Result<PendingSend, SendError> {
        if self.thinking {
            return Err(SendError::Busy);
        }
        if self.form_value.trim().is_empty() {
            return Err(SendError::EmptyPrompt);
        }
        if self.form_value.len() > MAX_PROMPT_BYTES {
            return Err(SendError::PromptTooLarge {
                size: self.form_value.len(),
                max: MAX_PROMPT_BYTES,
            });
        }
        let Some(api_key) = api_key else {
            self.modal_open = true;
            return Err(SendError::MissingApiKey);
        };

        let prompt = if self.filter.is_clean(&self.form_value) {
            self.form_value.clone()
        } else {
            debug!("prompt contained blocked words; masking");
            self.filter.clean(&self.form_value)
        };
        let model = self.selected;
        // Captured before the new message is pushed so the prompt is not
        // repeated in its own context.
        let history = if model.produces_image() {
            Vec::new()
        } else {
            self.thread.recent_turns(model, self.history_limit)
        };

        self.thinking = true;
        self.form_value.clear();
        let user_message = Message::user(prompt.clone(), model);
        self.thread.push(user_message.clone());

        debug!(%model, prompt_len = prompt.len(), history = history.len(), "send started");

        Ok(PendingSend {
            model,
            prompt,
            history,
            api_key,
            user_message,
        })
    }

    /// Record the provider outcome and clear the thinking flag.
    ///
    /// Returns the AI message when one was appended.  A blank reply appends
    /// nothing; a failure sets the alert.
    pub fn finish_send(
        &mut self,
        pending: &PendingSend,
        result: Result<String, ProviderError>,
    ) -> Option<Message> {
        self.thinking = false;
        match result {
            Ok(text) if text.trim().is_empty() => {
                debug!(model = %pending.model, "provider returned a blank reply");
                None
            }
            Ok(text) => {
                let reply = Message::ai(text, pending.model);
                self.thread.push(reply.clone());
                Some(reply)
            }
            Err(e) => {
                warn!(model = %pending.model, error = %e, "send failed");
                self.alert = Some(format!("Error: {e} please try again later"));
                None
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::MessageKind;
    use tracing_test::traced_test;

    fn key() -> Option<ApiKey> {
        Some(ApiKey::parse("sk-test-0000000000").unwrap())
    }

    fn view_with(prompt: &str) -> ChatView {
        let mut v = ChatView::default();
        v.set_form_value(prompt);
        v
    }

    #[test]
    fn initial_state() {
        let v = ChatView::default();
        assert!(v.messages().is_empty());
        assert!(!v.is_thinking());
        assert!(!v.modal_open());
        assert_eq!(v.selected(), AiModel::ChatGpt);
        assert!(!v.can_submit());
    }

    #[test]
    fn begin_send_records_user_message_and_sets_thinking() {
        let mut v = view_with("hello there");
        let pending = v.begin_send(key()).unwrap();

        assert!(v.is_thinking());
        assert_eq!(v.form_value(), "");
        assert_eq!(v.messages().len(), 1);
        assert_eq!(v.messages()[0].text, "hello there");
        assert!(!v.messages()[0].ai);
        assert_eq!(pending.prompt, "hello there");
        assert_eq!(pending.user_message.id, v.messages()[0].id);
        assert!(!v.can_submit());
    }

    #[test]
    fn missing_key_opens_modal_and_keeps_prompt() {
        let mut v = view_with("hello");
        assert_eq!(v.begin_send(None).unwrap_err(), SendError::MissingApiKey);
        assert!(v.modal_open());
        assert_eq!(v.form_value(), "hello");
        assert!(v.messages().is_empty());
        assert!(!v.is_thinking());
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut v = view_with("   \n ");
        assert_eq!(v.begin_send(key()).unwrap_err(), SendError::EmptyPrompt);
        assert!(v.messages().is_empty());
    }

    #[test]
    fn oversized_prompt_is_rejected() {
        let mut v = view_with(&"x".repeat(MAX_PROMPT_BYTES + 1));
        assert!(matches!(
            v.begin_send(key()),
            Err(SendError::PromptTooLarge { .. })
        ));
        assert!(!v.is_thinking());
    }

    #[test]
    fn second_send_while_thinking_is_busy() {
        let mut v = view_with("first");
        let _pending = v.begin_send(key()).unwrap();
        v.set_form_value("second");
        assert_eq!(v.begin_send(key()).unwrap_err(), SendError::Busy);
        assert_eq!(v.messages().len(), 1);
    }

    #[test]
    fn prompt_is_filtered_before_recording() {
        let mut v = view_with("damn this bug");
        let pending = v.begin_send(key()).unwrap();
        assert_eq!(pending.prompt, "**** this bug");
        assert_eq!(v.messages()[0].text, "**** this bug");
    }

    #[test]
    #[traced_test]
    fn masking_is_logged_only_for_dirty_prompts() {
        let mut v = view_with("fix this bug");
        let pending = v.begin_send(key()).unwrap();
        assert_eq!(pending.prompt, "fix this bug");
        assert!(!logs_contain("blocked words"));

        v.finish_send(&pending, Ok("done".into()));
        v.set_form_value("damn this bug");
        v.begin_send(key()).unwrap();
        assert!(logs_contain("blocked words"));
    }

    #[test]
    fn finish_send_appends_reply_with_submit_time_model() {
        let mut v = view_with("a red fox");
        v.select_model(AiModel::Dalle);
        let pending = v.begin_send(key()).unwrap();
        // Switching models mid-flight must not relabel the reply.
        v.select_model(AiModel::ChatGpt);

        let reply = v
            .finish_send(&pending, Ok("https://img.test/fox.png".into()))
            .unwrap();
        assert!(!v.is_thinking());
        assert_eq!(reply.selected, AiModel::Dalle);
        assert_eq!(reply.kind, MessageKind::Image);
        assert_eq!(v.messages().len(), 2);
    }

    #[test]
    fn blank_reply_appends_nothing() {
        let mut v = view_with("hi");
        let pending = v.begin_send(key()).unwrap();
        assert!(v.finish_send(&pending, Ok("  ".into())).is_none());
        assert_eq!(v.messages().len(), 1);
        assert!(v.alert().is_none());
        assert!(!v.is_thinking());
    }

    #[test]
    fn failure_sets_alert_and_clears_thinking() {
        let mut v = view_with("hi");
        let pending = v.begin_send(key()).unwrap();
        let err = ProviderError::Api {
            status: 429,
            message: "Rate limit reached".into(),
        };
        assert!(v.finish_send(&pending, Err(err)).is_none());
        assert!(!v.is_thinking());
        assert_eq!(
            v.alert(),
            Some("Error: API returned 429: Rate limit reached please try again later")
        );
        v.dismiss_alert();
        assert!(v.alert().is_none());
    }

    #[test]
    fn history_excludes_the_new_prompt() {
        let mut v = view_with("q1");
        let p1 = v.begin_send(key()).unwrap();
        assert!(p1.history.is_empty());
        v.finish_send(&p1, Ok("a1".into()));

        v.set_form_value("q2");
        let p2 = v.begin_send(key()).unwrap();
        let texts: Vec<_> = p2.history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["q1", "a1"]);
    }

    #[test]
    fn image_sends_carry_no_history() {
        let mut v = view_with("q1");
        let p1 = v.begin_send(key()).unwrap();
        v.finish_send(&p1, Ok("a1".into()));

        v.select_model(AiModel::Dalle);
        v.set_form_value("a cat");
        let p2 = v.begin_send(key()).unwrap();
        assert!(p2.history.is_empty());
    }

    #[test]
    fn clear_thread_refused_while_thinking() {
        let mut v = view_with("hi");
        let pending = v.begin_send(key()).unwrap();
        assert_eq!(v.clear_thread().unwrap_err(), SendError::Busy);
        v.finish_send(&pending, Ok("yo".into()));
        v.clear_thread().unwrap();
        assert!(v.messages().is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut v = view_with("draft");
        v.open_settings();
        let snap = v.snapshot();
        assert_eq!(snap.form_value, "draft");
        assert!(snap.modal_open);
        assert!(snap.can_submit);
        assert_eq!(snap.options, vec![AiModel::ChatGpt, AiModel::Dalle]);
    }
}
