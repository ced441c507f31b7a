//! Model options offered by the model picker.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Which upstream capability a prompt is sent to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum AiModel {
    /// Text completion.
    #[default]
    #[serde(rename = "ChatGPT")]
    #[strum(to_string = "ChatGPT", serialize = "chatgpt")]
    ChatGpt,

    /// Image generation; replies are image URLs.
    #[serde(rename = "DALL·E")]
    #[strum(to_string = "DALL·E", serialize = "DALL-E", serialize = "dalle")]
    Dalle,
}

impl AiModel {
    /// Options in the order the picker lists them.
    pub const ALL: [AiModel; 2] = [AiModel::ChatGpt, AiModel::Dalle];

    pub fn produces_image(self) -> bool {
        matches!(self, AiModel::Dalle)
    }
}
