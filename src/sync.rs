//! Per-request sequences that keep the local records and the provider's resources in step.
//!
//! Creates go to the provider first and are only stored locally once the provider has answered,
//! so a provider failure never leaves a local-only record behind.  Updates and deletes read the
//! local record first to find the remote id.  Nothing is rolled back: when a later step fails,
//! the earlier steps stay applied.

use crate::consts::PHONE_NUMBER_AREA_CODE;
use crate::db_types::{
    Assistant, AssistantPatch, NewAssistant, NewPhoneNumber, PhoneNumber, PhoneNumberPatch,
};
use crate::error::AppError;
use crate::types::{
    AppState, AssistantView, CreateAssistantBody, CreatePhoneNumberBody, Deleted, PhoneNumberView,
    UpdateAssistantBody, UpdatePhoneNumberBody,
};
use crate::utils::{default_system_prompt, non_empty};
use crate::vapi::model_config;
use crate::vapi_types::{
    CreateAssistantRequest, CreatePhoneNumberRequest, UpdateAssistantRequest,
    UpdatePhoneNumberRequest, VoiceConfig,
};

use tracing::{debug, error, info, warn};

const ASSISTANT_NOT_FOUND: &str = "Assistant not found";
const PHONE_NUMBER_NOT_FOUND: &str = "Phone number not found";
const ASSISTANT_NOT_SYNCED: &str = "Assistant not found or not synced with Vapi";

fn require_id(id: Option<String>) -> Result<String, AppError> {
    non_empty(id).ok_or_else(|| AppError::validation("id is required"))
}

/// Look up the provider id of a local assistant that a phone number should be linked to.
async fn linkable_assistant(state: &AppState, assistant_id: &str) -> Result<String, AppError> {
    state
        .store
        .assistants()
        .get_by_id(assistant_id)
        .await?
        .and_then(|a| a.vapi_assistant_id)
        .ok_or_else(|| {
            warn!(assistant_id, "assistant missing or not synced; refusing to link");
            AppError::validation(ASSISTANT_NOT_SYNCED)
        })
}

pub async fn list_assistants(state: &AppState) -> Result<Vec<Assistant>, AppError> {
    Ok(state.store.assistants().get_all().await?)
}

pub async fn get_assistant(state: &AppState, id: &str) -> Result<AssistantView, AppError> {
    let assistant = state
        .store
        .assistants()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(ASSISTANT_NOT_FOUND))?;
    let vapi_assistant = match &assistant.vapi_assistant_id {
        Some(remote_id) => Some(state.gateway.get_assistant(remote_id).await?),
        None => None,
    };
    Ok(AssistantView {
        assistant,
        vapi_assistant,
    })
}

pub async fn create_assistant(
    state: &AppState,
    body: CreateAssistantBody,
) -> Result<Assistant, AppError> {
    let (name, first_message) = match (non_empty(body.name), non_empty(body.first_message)) {
        (Some(name), Some(first_message)) => (name, first_message),
        _ => return Err(AppError::validation("name and firstMessage are required")),
    };
    let system_prompt =
        non_empty(body.system_prompt).unwrap_or_else(|| default_system_prompt(&name));

    let request = CreateAssistantRequest::new(&name, &first_message, &system_prompt);
    let remote = state.gateway.create_assistant(&request).await?;
    debug!(remote_id=%remote.id, "created Vapi assistant");

    let assistant = state
        .store
        .assistants()
        .create(NewAssistant {
            name,
            first_message,
            system_prompt,
            vapi_assistant_id: Some(remote.id.clone()),
        })
        .await
        .map_err(|e| {
            error!(error=%e, remote_id=%remote.id, "Vapi assistant created but not stored locally");
            e
        })?;
    info!(id=%assistant.id, remote_id=%remote.id, "assistant created");
    Ok(assistant)
}

pub async fn update_assistant(
    state: &AppState,
    body: UpdateAssistantBody,
) -> Result<Assistant, AppError> {
    let id = require_id(body.id)?;
    let assistant = state.store.assistants().get_by_id(&id).await?;
    let remote_id = assistant
        .and_then(|a| a.vapi_assistant_id)
        .ok_or_else(|| AppError::not_found(ASSISTANT_NOT_FOUND))?;

    let patch = AssistantPatch {
        name: non_empty(body.name),
        first_message: non_empty(body.first_message),
        system_prompt: non_empty(body.system_prompt),
        voice_provider: non_empty(body.voice_provider),
        voice_id: non_empty(body.voice_id),
        end_call_message: non_empty(body.end_call_message),
        max_duration_seconds: body.max_duration_seconds.filter(|&s| s != 0),
        phone_number_id: non_empty(body.phone_number_id),
    };

    // A voice is only sent as a complete pair.
    let voice = match (&patch.voice_provider, &patch.voice_id) {
        (Some(provider), Some(voice_id)) => Some(VoiceConfig {
            provider: provider.clone(),
            voice_id: voice_id.clone(),
        }),
        _ => None,
    };
    let request = UpdateAssistantRequest {
        name: patch.name.clone(),
        first_message: patch.first_message.clone(),
        model: patch.system_prompt.as_deref().map(model_config),
        voice,
        end_call_message: patch.end_call_message.clone(),
        max_duration_seconds: patch.max_duration_seconds,
    };
    state.gateway.update_assistant(&remote_id, &request).await?;

    if let Some(phone_number_id) = &patch.phone_number_id {
        link_phone_number(state, phone_number_id, &id, &remote_id).await?;
    }

    let updated = state
        .store
        .assistants()
        .update(&id, patch)
        .await?
        .ok_or_else(|| AppError::not_found(ASSISTANT_NOT_FOUND))?;
    info!(id=%updated.id, "assistant updated");
    Ok(updated)
}

/// Point a phone number at an assistant, remotely and then locally.  Unknown or unsynced phone
/// numbers are skipped.
async fn link_phone_number(
    state: &AppState,
    phone_number_id: &str,
    assistant_id: &str,
    remote_assistant_id: &str,
) -> Result<(), AppError> {
    let phone_number = state.store.phone_numbers().get_by_id(phone_number_id).await?;
    let remote_phone_id = match phone_number.and_then(|p| p.vapi_phone_number_id) {
        Some(remote_phone_id) => remote_phone_id,
        None => {
            warn!(phone_number_id, "phone number missing or not synced; link skipped");
            return Ok(());
        }
    };
    let request = UpdatePhoneNumberRequest {
        assistant_id: Some(remote_assistant_id.to_string()),
    };
    state
        .gateway
        .update_phone_number(&remote_phone_id, &request)
        .await?;
    state
        .store
        .phone_numbers()
        .update(
            phone_number_id,
            PhoneNumberPatch {
                assistant_id: Some(Some(assistant_id.to_string())),
            },
        )
        .await?;
    debug!(phone_number_id, assistant_id, "phone number linked");
    Ok(())
}

pub async fn delete_assistant(state: &AppState, id: Option<String>) -> Result<Deleted, AppError> {
    let id = require_id(id)?;
    let assistant = state
        .store
        .assistants()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(ASSISTANT_NOT_FOUND))?;
    if let Some(remote_id) = &assistant.vapi_assistant_id {
        state.gateway.delete_assistant(remote_id).await?;
    }
    state.store.assistants().delete(&id).await?;
    info!(id=%id, "assistant deleted");
    Ok(Deleted {
        success: None,
        message: "Assistant deleted successfully",
    })
}

pub async fn list_phone_numbers(state: &AppState) -> Result<Vec<PhoneNumber>, AppError> {
    Ok(state.store.phone_numbers().get_all().await?)
}

pub async fn get_phone_number(state: &AppState, id: &str) -> Result<PhoneNumberView, AppError> {
    let phone_number = state
        .store
        .phone_numbers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(PHONE_NUMBER_NOT_FOUND))?;
    let vapi_phone_number = match &phone_number.vapi_phone_number_id {
        Some(remote_id) => Some(state.gateway.get_phone_number(remote_id).await?),
        None => None,
    };
    Ok(PhoneNumberView {
        phone_number,
        vapi_phone_number,
    })
}

pub async fn create_phone_number(
    state: &AppState,
    body: CreatePhoneNumberBody,
) -> Result<PhoneNumber, AppError> {
    let name = non_empty(body.name).ok_or_else(|| AppError::validation("name is required"))?;
    let assistant_id = non_empty(body.assistant_id);
    let remote_assistant_id = match &assistant_id {
        Some(assistant_id) => Some(linkable_assistant(state, assistant_id).await?),
        None => None,
    };

    let request = CreatePhoneNumberRequest::new(&name, remote_assistant_id);
    let remote = state.gateway.create_phone_number(&request).await?;
    debug!(remote_id=%remote.id, number=?remote.number, "created Vapi phone number");

    let phone_number = state
        .store
        .phone_numbers()
        .create(NewPhoneNumber {
            name,
            number: remote.number,
            area_code: Some(PHONE_NUMBER_AREA_CODE.to_string()),
            assistant_id,
            vapi_phone_number_id: Some(remote.id.clone()),
        })
        .await
        .map_err(|e| {
            error!(error=%e, remote_id=%remote.id, "Vapi phone number created but not stored locally");
            e
        })?;
    info!(id=%phone_number.id, remote_id=%remote.id, "phone number created");
    Ok(phone_number)
}

pub async fn update_phone_number(
    state: &AppState,
    body: UpdatePhoneNumberBody,
) -> Result<PhoneNumber, AppError> {
    let id = require_id(body.id)?;
    let phone_number = state
        .store
        .phone_numbers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(PHONE_NUMBER_NOT_FOUND))?;

    // An empty string is treated like an explicit unlink.
    let Some(assistant_id) = body.assistant_id.map(non_empty) else {
        return Ok(phone_number);
    };
    let remote_assistant_id = match &assistant_id {
        Some(assistant_id) => Some(linkable_assistant(state, assistant_id).await?),
        None => None,
    };

    if let Some(remote_id) = &phone_number.vapi_phone_number_id {
        let request = UpdatePhoneNumberRequest {
            assistant_id: remote_assistant_id,
        };
        state.gateway.update_phone_number(remote_id, &request).await?;
    }

    let updated = state
        .store
        .phone_numbers()
        .update(
            &id,
            PhoneNumberPatch {
                assistant_id: Some(assistant_id),
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found(PHONE_NUMBER_NOT_FOUND))?;
    info!(id=%updated.id, assistant_id=?updated.assistant_id, "phone number updated");
    Ok(updated)
}

pub async fn delete_phone_number(
    state: &AppState,
    id: Option<String>,
) -> Result<Deleted, AppError> {
    let id = require_id(id)?;
    let phone_number = state
        .store
        .phone_numbers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(PHONE_NUMBER_NOT_FOUND))?;
    if let Some(remote_id) = &phone_number.vapi_phone_number_id {
        state.gateway.delete_phone_number(remote_id).await?;
    }
    state.store.phone_numbers().delete(&id).await?;
    info!(id=%id, "phone number deleted");
    Ok(Deleted {
        success: Some(true),
        message: "Phone number deleted",
    })
}
