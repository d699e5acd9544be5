use crate::db_types::{Assistant, PhoneNumber};
use crate::store::Store;
use crate::utils::explicit_null;
use crate::vapi::VoiceGateway;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn VoiceGateway>,
}

/// Fields are all optional here so a missing one is reported by us, not by the extractor.
#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssistantBody {
    pub name: Option<String>,
    pub first_message: Option<String>,
    pub system_prompt: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssistantBody {
    pub id: Option<String>,
    pub name: Option<String>,
    pub first_message: Option<String>,
    pub system_prompt: Option<String>,
    pub voice_provider: Option<String>,
    pub voice_id: Option<String>,
    pub end_call_message: Option<String>,
    pub max_duration_seconds: Option<u32>,
    pub phone_number_id: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePhoneNumberBody {
    pub name: Option<String>,
    pub assistant_id: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePhoneNumberBody {
    pub id: Option<String>,
    /// Absent leaves the link alone; `null` unlinks.
    #[serde(default, deserialize_with = "explicit_null")]
    pub assistant_id: Option<Option<String>>,
}

#[derive(Deserialize, Default, Debug)]
pub struct DeleteBody {
    pub id: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct AssistantList {
    pub assistants: Vec<Assistant>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberList {
    pub phone_numbers: Vec<PhoneNumber>,
}

/// A local assistant merged with the provider's live document.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AssistantView {
    #[serde(flatten)]
    pub assistant: Assistant,
    pub vapi_assistant: Option<Value>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberView {
    #[serde(flatten)]
    pub phone_number: PhoneNumber,
    pub vapi_phone_number: Option<Value>,
}

#[derive(Serialize, Debug)]
pub struct Deleted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub message: &'static str,
}
