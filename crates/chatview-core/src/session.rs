//! Drives a [`ChatView`] against an [`AiProvider`].
//!
//! The view sits behind an async mutex.  [`ChatSession::submit`] and the
//! bookkeeping half of [`ChatSession::dispatch`] take the lock briefly; the
//! provider call itself runs unlocked so the page can keep rendering the
//! thinking indicator while it waits.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{ProviderError, SendError};
use crate::message::Message;
use crate::model::AiModel;
use crate::provider::{AiProvider, CompletionRequest};
use crate::settings::ApiKey;
use crate::view::{ChatView, PendingSend, ViewSnapshot};

/// Result of a completed send.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendOutcome {
    pub user_message: Message,
    /// `None` when the provider failed or returned a blank reply.
    pub reply: Option<Message>,
    /// The alert text when the provider failed.
    pub error: Option<String>,
}

pub struct ChatSession {
    view: Mutex<ChatView>,
    provider: Arc<dyn AiProvider>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession").finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(view: ChatView, provider: Arc<dyn AiProvider>) -> Self {
        Self {
            view: Mutex::new(view),
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn AiProvider> {
        &self.provider
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        self.view.lock().await.snapshot()
    }

    /// Run `f` with exclusive access to the view.
    pub async fn with_view<R>(&self, f: impl FnOnce(&mut ChatView) -> R) -> R {
        let mut view = self.view.lock().await;
        f(&mut view)
    }

    /// Put `prompt` in the form under `model` and start a send.
    pub async fn submit(
        &self,
        prompt: impl Into<String>,
        model: AiModel,
        api_key: Option<ApiKey>,
    ) -> Result<PendingSend, SendError> {
        let mut view = self.view.lock().await;
        if view.is_thinking() {
            // Leave the in-flight request's form state untouched.
            return Err(SendError::Busy);
        }
        view.set_form_value(prompt);
        view.select_model(model);
        view.begin_send(api_key)
    }

    /// Call the provider for `pending` and record the outcome.
    pub async fn dispatch(&self, pending: PendingSend) -> SendOutcome {
        let result = self.call_provider(&pending).await;
        let error = result
            .as_ref()
            .err()
            .map(|e| format!("Error: {e} please try again later"));

        let reply = self.view.lock().await.finish_send(&pending, result);
        info!(model = %pending.model, replied = reply.is_some(), failed = error.is_some(), "send finished");

        SendOutcome {
            user_message: pending.user_message,
            reply,
            error,
        }
    }

    /// [`dispatch`](Self::dispatch) on its own task.
    ///
    /// The send runs to completion, and the thinking flag is cleared, even if
    /// the returned handle is dropped.  Callers whose future can be cancelled
    /// mid-request (HTTP handlers) go through here.
    pub fn spawn_dispatch(self: &Arc<Self>, pending: PendingSend) -> JoinHandle<SendOutcome> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.dispatch(pending).await })
    }

    /// [`submit`](Self::submit) then [`dispatch`](Self::dispatch).
    pub async fn send(
        &self,
        prompt: impl Into<String>,
        model: AiModel,
        api_key: Option<ApiKey>,
    ) -> Result<SendOutcome, SendError> {
        let pending = self.submit(prompt, model, api_key).await?;
        Ok(self.dispatch(pending).await)
    }

    async fn call_provider(&self, pending: &PendingSend) -> Result<String, ProviderError> {
        match pending.model {
            AiModel::ChatGpt => {
                let request = CompletionRequest::new(pending.prompt.as_str())
                    .with_history(pending.history.clone());
                self.provider.complete(&request, &pending.api_key).await
            }
            AiModel::Dalle => {
                self.provider
                    .generate_image(&pending.prompt, &pending.api_key)
                    .await
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::message::MessageKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    /// Echoes prompts back; optionally parks until released.
    #[derive(Default)]
    struct EchoProvider {
        gate: Option<Arc<Notify>>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AiProvider for EchoProvider {
        async fn complete(
            &self,
            request: &CompletionRequest,
            _api_key: &ApiKey,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(ProviderError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(format!("echo({}): {}", request.history.len(), request.prompt))
        }

        async fn generate_image(
            &self,
            prompt: &str,
            _api_key: &ApiKey,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://img.test/{}.png", prompt.replace(' ', "-")))
        }

        async fn verify_key(&self, _api_key: &ApiKey) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn key() -> Option<ApiKey> {
        Some(ApiKey::parse("sk-session-test-0001").unwrap())
    }

    #[tokio::test]
    async fn send_text_round_trip() {
        let session = ChatSession::new(ChatView::default(), Arc::new(EchoProvider::default()));
        let out = session.send("hello", AiModel::ChatGpt, key()).await.unwrap();

        assert_eq!(out.user_message.text, "hello");
        let reply = out.reply.unwrap();
        assert_eq!(reply.text, "echo(0): hello");
        assert!(reply.ai);
        assert!(out.error.is_none());

        let snap = session.snapshot().await;
        assert_eq!(snap.messages.len(), 2);
        assert!(!snap.thinking);
    }

    #[tokio::test]
    async fn send_image_routes_to_image_generation() {
        let session = ChatSession::new(ChatView::default(), Arc::new(EchoProvider::default()));
        let out = session.send("a red fox", AiModel::Dalle, key()).await.unwrap();
        let reply = out.reply.unwrap();
        assert_eq!(reply.kind, MessageKind::Image);
        assert_eq!(reply.text, "https://img.test/a-red-fox.png");
    }

    #[tokio::test]
    async fn follow_up_carries_history() {
        let session = ChatSession::new(ChatView::default(), Arc::new(EchoProvider::default()));
        session.send("one", AiModel::ChatGpt, key()).await.unwrap();
        let out = session.send("two", AiModel::ChatGpt, key()).await.unwrap();
        assert_eq!(out.reply.unwrap().text, "echo(2): two");
    }

    #[tokio::test]
    #[traced_test]
    async fn provider_failure_becomes_alert() {
        let provider = EchoProvider {
            fail: true,
            ..EchoProvider::default()
        };
        let session = ChatSession::new(ChatView::default(), Arc::new(provider));
        let out = session.send("hi", AiModel::ChatGpt, key()).await.unwrap();

        assert!(out.reply.is_none());
        let expected = "Error: API returned 500: boom please try again later";
        assert_eq!(out.error.as_deref(), Some(expected));
        assert_eq!(session.snapshot().await.alert.as_deref(), Some(expected));
        assert!(logs_contain("send failed"));
    }

    #[tokio::test]
    async fn missing_key_never_reaches_provider() {
        let provider = Arc::new(EchoProvider::default());
        let session = ChatSession::new(ChatView::default(), provider.clone());
        let err = session.send("hi", AiModel::ChatGpt, None).await.unwrap_err();

        assert_eq!(err, SendError::MissingApiKey);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        let snap = session.snapshot().await;
        assert!(snap.modal_open);
        assert_eq!(snap.form_value, "hi");
    }

    #[tokio::test]
    async fn only_one_request_in_flight() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(EchoProvider {
            gate: Some(gate.clone()),
            ..EchoProvider::default()
        });
        let session = Arc::new(ChatSession::new(ChatView::default(), provider.clone()));

        let pending = session.submit("first", AiModel::ChatGpt, key()).await.unwrap();
        let worker = {
            let session = session.clone();
            tokio::spawn(async move { session.dispatch(pending).await })
        };

        // While the first call is parked, the view reports thinking and
        // refuses a second submission without touching the form.
        assert!(session.snapshot().await.thinking);
        let err = session.submit("second", AiModel::ChatGpt, key()).await.unwrap_err();
        assert_eq!(err, SendError::Busy);
        assert_eq!(session.snapshot().await.form_value, "");

        gate.notify_one();
        let out = worker.await.unwrap();
        assert_eq!(out.reply.unwrap().text, "echo(0): first");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(!session.snapshot().await.thinking);
    }

    #[tokio::test]
    async fn spawned_dispatch_finishes_after_caller_gives_up() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(EchoProvider {
            gate: Some(gate.clone()),
            ..EchoProvider::default()
        });
        let session = Arc::new(ChatSession::new(ChatView::default(), provider));

        let pending = session.submit("first", AiModel::ChatGpt, key()).await.unwrap();
        drop(session.spawn_dispatch(pending));
        assert!(session.snapshot().await.thinking);

        gate.notify_one();
        for _ in 0..100 {
            if !session.snapshot().await.thinking {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let snap = session.snapshot().await;
        assert!(!snap.thinking);
        assert_eq!(snap.messages.len(), 2);

        // The next send starts normally.
        let pending = session.submit("second", AiModel::ChatGpt, key()).await.unwrap();
        gate.notify_one();
        let out = session.spawn_dispatch(pending).await.unwrap();
        assert_eq!(out.reply.unwrap().text, "echo(2): second");
    }
}
