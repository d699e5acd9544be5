use crate::error::AppError;
use crate::sync;
use crate::types::{
    AppState, AssistantList, AssistantView, CreateAssistantBody, CreatePhoneNumberBody,
    DeleteBody, Deleted, PhoneNumberList, PhoneNumberView, UpdateAssistantBody,
    UpdatePhoneNumberBody,
};
use crate::db_types::{Assistant, PhoneNumber};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// Unwrap a JSON body, turning extractor rejections into our own 400 shape.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(body)| body).map_err(|e| {
        warn!(error=%e, "rejected request body");
        AppError::validation(e.body_text())
    })
}

pub async fn list_assistants(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<AssistantList>, AppError> {
    let assistants = sync::list_assistants(&app_state)
        .await
        .map_err(|e| e.during("Failed to get assistants"))?;
    Ok(Json(AssistantList { assistants }))
}

pub async fn create_assistant(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CreateAssistantBody>, JsonRejection>,
) -> Result<Json<Assistant>, AppError> {
    let body = json_body(body)?;
    trace!(body=?body, "create assistant request");
    sync::create_assistant(&app_state, body)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to create assistant"))
}

pub async fn update_assistant(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<UpdateAssistantBody>, JsonRejection>,
) -> Result<Json<Assistant>, AppError> {
    let body = json_body(body)?;
    trace!(body=?body, "update assistant request");
    sync::update_assistant(&app_state, body)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to update assistant"))
}

pub async fn delete_assistant(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<Json<Deleted>, AppError> {
    let body = json_body(body)?;
    sync::delete_assistant(&app_state, body.id)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to delete assistant"))
}

pub async fn get_assistant(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AssistantView>, AppError> {
    sync::get_assistant(&app_state, &id)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to get assistant"))
}

pub async fn list_phone_numbers(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<PhoneNumberList>, AppError> {
    let phone_numbers = sync::list_phone_numbers(&app_state)
        .await
        .map_err(|e| e.during("Failed to list phone numbers"))?;
    Ok(Json(PhoneNumberList { phone_numbers }))
}

pub async fn create_phone_number(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CreatePhoneNumberBody>, JsonRejection>,
) -> Result<Json<PhoneNumber>, AppError> {
    let body = json_body(body)?;
    trace!(body=?body, "create phone number request");
    sync::create_phone_number(&app_state, body)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to create phone number"))
}

pub async fn update_phone_number(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<UpdatePhoneNumberBody>, JsonRejection>,
) -> Result<Json<PhoneNumber>, AppError> {
    let body = json_body(body)?;
    trace!(body=?body, "update phone number request");
    sync::update_phone_number(&app_state, body)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to update phone number"))
}

pub async fn delete_phone_number(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<Json<Deleted>, AppError> {
    let body = json_body(body)?;
    sync::delete_phone_number(&app_state, body.id)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to delete phone number"))
}

pub async fn get_phone_number(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PhoneNumberView>, AppError> {
    sync::get_phone_number(&app_state, &id)
        .await
        .map(Json)
        .map_err(|e| e.during("Failed to get phone number"))
}
