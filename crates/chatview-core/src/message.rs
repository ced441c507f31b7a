//! A single entry in the conversation thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::AiModel;

/// How a message body is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    /// `text` holds an image URL.
    Image,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text: String,
    /// `true` when the message came back from the provider.
    pub ai: bool,
    /// Model selected when the message was produced.
    pub selected: AiModel,
    pub kind: MessageKind,
}

impl Message {
    pub fn user(text: impl Into<String>, selected: AiModel) -> Self {
        Self::new(text.into(), false, selected, MessageKind::Text)
    }

    /// Provider reply. Replies from an image model are rendered as images.
    pub fn ai(text: impl Into<String>, selected: AiModel) -> Self {
        let kind = if selected.produces_image() {
            MessageKind::Image
        } else {
            MessageKind::Text
        };
        Self::new(text.into(), true, selected, kind)
    }

    fn new(text: String, ai: bool, selected: AiModel, kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            text,
            ai,
            selected,
            kind,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MessageKind::Image
    }
}
