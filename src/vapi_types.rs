use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ModelMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub messages: Vec<ModelMessage>,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssistantRequest {
    pub name: String,
    pub first_message: String,
    pub model: ModelConfig,
    pub voice: VoiceConfig,
    pub end_call_message: String,
    pub max_duration_seconds: u32,
}

/// Only the fields that are `Some` are sent to the provider.
#[derive(Serialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssistantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_call_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u32>,
}

#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneNumberRequest {
    pub provider: String,
    pub name: String,
    pub number_desired_area_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

/// `assistant_id: None` serializes as `null`, which unlinks the number.
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneNumberRequest {
    pub assistant_id: Option<String>,
}

/// The part of a created provider resource we keep locally.
#[derive(Deserialize, Clone, PartialEq, Debug)]
pub struct RemoteResource {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
}

/// Provider error payload, e.g. `{"message": ["name must be shorter..."], "statusCode": 400}`.
#[derive(Deserialize, Debug)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub message: Option<ProviderErrorMessage>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ProviderErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ProviderErrorMessage {
    pub fn into_text(self) -> String {
        match self {
            ProviderErrorMessage::One(message) => message,
            ProviderErrorMessage::Many(messages) => messages.join("; "),
        }
    }
}
