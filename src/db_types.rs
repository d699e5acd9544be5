use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The whole persisted document.  Older files may predate `phoneNumbers`, so both collections
/// default to empty.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub assistants: Vec<Assistant>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Assistant {
    pub id: String,
    pub name: String,
    pub first_message: String,
    pub system_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_call_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<u32>,
    /// Local id of the linked phone number, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vapi_assistant_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied when an assistant is first stored; id and timestamp are assigned by the store.
#[derive(Clone, Debug)]
pub struct NewAssistant {
    pub name: String,
    pub first_message: String,
    pub system_prompt: String,
    pub vapi_assistant_id: Option<String>,
}

/// Shallow patch: every `Some` overwrites, every `None` is left alone.
#[derive(Clone, Default, Debug)]
pub struct AssistantPatch {
    pub name: Option<String>,
    pub first_message: Option<String>,
    pub system_prompt: Option<String>,
    pub voice_provider: Option<String>,
    pub voice_id: Option<String>,
    pub end_call_message: Option<String>,
    pub max_duration_seconds: Option<u32>,
    pub phone_number_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub id: String,
    pub name: String,
    /// The number the provider actually provisioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_code: Option<String>,
    /// Local id of the linked assistant, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vapi_phone_number_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewPhoneNumber {
    pub name: String,
    pub number: Option<String>,
    pub area_code: Option<String>,
    pub assistant_id: Option<String>,
    pub vapi_phone_number_id: Option<String>,
}

/// `assistant_id` is tri-state: `None` leaves the link alone, `Some(None)` clears it.
#[derive(Clone, Default, Debug)]
pub struct PhoneNumberPatch {
    pub assistant_id: Option<Option<String>>,
}

/// A kind of record kept in one of the `Database` collections.
pub trait Record: Clone + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    fn id(&self) -> &str;
    fn from_draft(draft: Self::Draft, id: String, created_at: OffsetDateTime) -> Self;
    fn apply(&mut self, patch: Self::Patch);
    fn collection(db: &Database) -> &Vec<Self>;
    fn collection_mut(db: &mut Database) -> &mut Vec<Self>;
}

impl Record for Assistant {
    type Draft = NewAssistant;
    type Patch = AssistantPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(draft: NewAssistant, id: String, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            name: draft.name,
            first_message: draft.first_message,
            system_prompt: draft.system_prompt,
            voice_provider: None,
            voice_id: None,
            end_call_message: None,
            max_duration_seconds: None,
            phone_number_id: None,
            vapi_assistant_id: draft.vapi_assistant_id,
            created_at,
        }
    }

    fn apply(&mut self, patch: AssistantPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(first_message) = patch.first_message {
            self.first_message = first_message;
        }
        if let Some(system_prompt) = patch.system_prompt {
            self.system_prompt = system_prompt;
        }
        if patch.voice_provider.is_some() {
            self.voice_provider = patch.voice_provider;
        }
        if patch.voice_id.is_some() {
            self.voice_id = patch.voice_id;
        }
        if patch.end_call_message.is_some() {
            self.end_call_message = patch.end_call_message;
        }
        if patch.max_duration_seconds.is_some() {
            self.max_duration_seconds = patch.max_duration_seconds;
        }
        if patch.phone_number_id.is_some() {
            self.phone_number_id = patch.phone_number_id;
        }
    }

    fn collection(db: &Database) -> &Vec<Self> {
        &db.assistants
    }

    fn collection_mut(db: &mut Database) -> &mut Vec<Self> {
        &mut db.assistants
    }
}

impl Record for PhoneNumber {
    type Draft = NewPhoneNumber;
    type Patch = PhoneNumberPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_draft(draft: NewPhoneNumber, id: String, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            name: draft.name,
            number: draft.number,
            area_code: draft.area_code,
            assistant_id: draft.assistant_id,
            vapi_phone_number_id: draft.vapi_phone_number_id,
            created_at,
        }
    }

    fn apply(&mut self, patch: PhoneNumberPatch) {
        if let Some(assistant_id) = patch.assistant_id {
            self.assistant_id = assistant_id;
        }
    }

    fn collection(db: &Database) -> &Vec<Self> {
        &db.phone_numbers
    }

    fn collection_mut(db: &mut Database) -> &mut Vec<Self> {
        &mut db.phone_numbers
    }
}
