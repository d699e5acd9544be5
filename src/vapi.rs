use crate::consts::{
    END_CALL_MESSAGE, MAX_DURATION_SECONDS, MODEL, MODEL_PROVIDER, PHONE_NUMBER_AREA_CODE,
    PHONE_NUMBER_PROVIDER, VOICE_ID, VOICE_PROVIDER,
};
use crate::vapi_types::{
    CreateAssistantRequest, CreatePhoneNumberRequest, ModelConfig, ModelMessage,
    ProviderErrorBody, RemoteResource, UpdateAssistantRequest, UpdatePhoneNumberRequest,
    VoiceConfig,
};

use async_trait::async_trait;
use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The provider answered with a non-success status.
    #[error("{message}")]
    Provider { status: StatusCode, message: String },

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("VAPI_API_KEY is not configured")]
    MissingCredential,

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

/// The remote voice platform's assistant and phone-number resources.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<RemoteResource, GatewayError>;
    async fn update_assistant(
        &self,
        remote_id: &str,
        request: &UpdateAssistantRequest,
    ) -> Result<Value, GatewayError>;
    async fn get_assistant(&self, remote_id: &str) -> Result<Value, GatewayError>;
    async fn delete_assistant(&self, remote_id: &str) -> Result<(), GatewayError>;

    async fn create_phone_number(
        &self,
        request: &CreatePhoneNumberRequest,
    ) -> Result<RemoteResource, GatewayError>;
    async fn update_phone_number(
        &self,
        remote_id: &str,
        request: &UpdatePhoneNumberRequest,
    ) -> Result<Value, GatewayError>;
    async fn get_phone_number(&self, remote_id: &str) -> Result<Value, GatewayError>;
    async fn delete_phone_number(&self, remote_id: &str) -> Result<(), GatewayError>;
}

/// Model block with the fixed provider/model and a single system message.
pub fn model_config(system_prompt: &str) -> ModelConfig {
    ModelConfig {
        provider: MODEL_PROVIDER.to_string(),
        model: MODEL.to_string(),
        messages: vec![ModelMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        }],
    }
}

impl CreateAssistantRequest {
    /// Everything except the name, greeting and prompt is fixed.
    pub fn new(name: &str, first_message: &str, system_prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            first_message: first_message.to_string(),
            model: model_config(system_prompt),
            voice: VoiceConfig {
                provider: VOICE_PROVIDER.to_string(),
                voice_id: VOICE_ID.to_string(),
            },
            end_call_message: END_CALL_MESSAGE.to_string(),
            max_duration_seconds: MAX_DURATION_SECONDS,
        }
    }
}

impl CreatePhoneNumberRequest {
    pub fn new(name: &str, remote_assistant_id: Option<String>) -> Self {
        Self {
            provider: PHONE_NUMBER_PROVIDER.to_string(),
            name: name.to_string(),
            number_desired_area_code: PHONE_NUMBER_AREA_CODE.to_string(),
            assistant_id: remote_assistant_id,
        }
    }
}

/// `VoiceGateway` backed by the Vapi REST API.
pub struct VapiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl VapiClient {
    pub fn new(http_client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn call<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, GatewayError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            error!("refusing to call Vapi without an API key");
            GatewayError::MissingCredential
        })?;
        let url = format!("{}/{path}", self.base_url);
        let mut rq = self
            .http_client
            .request(method.clone(), &url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"));
        if let Some(body) = body {
            rq = rq.json(body);
        }
        let resp = rq.send().await.map_err(|e| {
            error!(error=%e, %method, url=%url, "failed to send request to Vapi");
            GatewayError::Transport(e)
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            error!(error=%e, %method, url=%url, "failed to read Vapi response body");
            GatewayError::Transport(e)
        })?;
        if !status.is_success() {
            let err = provider_error(status, &text);
            error!(error=%err, %status, %method, url=%url, "Vapi rejected request");
            return Err(err);
        }
        debug!(%status, %method, url=%url, "Vapi response");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            error!(error=%e, %method, url=%url, "failed to parse Vapi response");
            GatewayError::Decode(e.to_string())
        })
    }

    async fn create<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<RemoteResource, GatewayError> {
        let created = self.call(Method::POST, path, Some(body)).await?;
        serde_json::from_value(created).map_err(|e| {
            error!(error=%e, path, "Vapi create response has no id");
            GatewayError::Decode(e.to_string())
        })
    }
}

/// Narrow a provider error body into a message: the `message` field if present, else the raw
/// body, else the status reason.
fn provider_error(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .map(|m| m.into_text())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("provider request failed")
                .to_string()
        });
    GatewayError::Provider { status, message }
}

#[async_trait]
impl VoiceGateway for VapiClient {
    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<RemoteResource, GatewayError> {
        self.create("assistant", request).await
    }

    async fn update_assistant(
        &self,
        remote_id: &str,
        request: &UpdateAssistantRequest,
    ) -> Result<Value, GatewayError> {
        self.call(Method::PATCH, &format!("assistant/{remote_id}"), Some(request))
            .await
    }

    async fn get_assistant(&self, remote_id: &str) -> Result<Value, GatewayError> {
        self.call::<()>(Method::GET, &format!("assistant/{remote_id}"), None)
            .await
    }

    async fn delete_assistant(&self, remote_id: &str) -> Result<(), GatewayError> {
        self.call::<()>(Method::DELETE, &format!("assistant/{remote_id}"), None)
            .await
            .map(|_| ())
    }

    async fn create_phone_number(
        &self,
        request: &CreatePhoneNumberRequest,
    ) -> Result<RemoteResource, GatewayError> {
        self.create("phone-number", request).await
    }

    async fn update_phone_number(
        &self,
        remote_id: &str,
        request: &UpdatePhoneNumberRequest,
    ) -> Result<Value, GatewayError> {
        self.call(Method::PATCH, &format!("phone-number/{remote_id}"), Some(request))
            .await
    }

    async fn get_phone_number(&self, remote_id: &str) -> Result<Value, GatewayError> {
        self.call::<()>(Method::GET, &format!("phone-number/{remote_id}"), None)
            .await
    }

    async fn delete_phone_number(&self, remote_id: &str) -> Result<(), GatewayError> {
        self.call::<()>(Method::DELETE, &format!("phone-number/{remote_id}"), None)
            .await
            .map(|_| ())
    }
}

/// In-process stand-in for the provider.  Records every call and can be told to reject a given
/// operation with a provider error.
#[cfg(test)]
#[derive(Default)]
pub struct FakeGateway {
    pub calls: std::sync::Mutex<Vec<(&'static str, Value)>>,
    pub failures: std::sync::Mutex<std::collections::HashMap<&'static str, (StatusCode, String)>>,
    next_id: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl FakeGateway {
    pub fn fail(&self, op: &'static str, status: StatusCode, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(op, (status, message.to_string()));
    }

    pub fn calls_to(&self, op: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == op)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, op: &'static str, payload: Value) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push((op, payload));
        match self.failures.lock().unwrap().get(op) {
            Some((status, message)) => Err(GatewayError::Provider {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn new_id(&self, prefix: &str) -> String {
        let n = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        format!("{prefix}-{n}")
    }
}

#[cfg(test)]
#[async_trait]
impl VoiceGateway for FakeGateway {
    async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<RemoteResource, GatewayError> {
        self.record("create_assistant", serde_json::to_value(request).unwrap())?;
        Ok(RemoteResource {
            id: self.new_id("asst"),
            number: None,
        })
    }

    async fn update_assistant(
        &self,
        remote_id: &str,
        request: &UpdateAssistantRequest,
    ) -> Result<Value, GatewayError> {
        let body = serde_json::to_value(request).unwrap();
        self.record(
            "update_assistant",
            serde_json::json!({ "id": remote_id, "body": body }),
        )?;
        Ok(serde_json::json!({ "id": remote_id }))
    }

    async fn get_assistant(&self, remote_id: &str) -> Result<Value, GatewayError> {
        self.record("get_assistant", Value::String(remote_id.to_string()))?;
        Ok(serde_json::json!({ "id": remote_id, "name": "remote view" }))
    }

    async fn delete_assistant(&self, remote_id: &str) -> Result<(), GatewayError> {
        self.record("delete_assistant", Value::String(remote_id.to_string()))
    }

    async fn create_phone_number(
        &self,
        request: &CreatePhoneNumberRequest,
    ) -> Result<RemoteResource, GatewayError> {
        self.record(
            "create_phone_number",
            serde_json::to_value(request).unwrap(),
        )?;
        Ok(RemoteResource {
            id: self.new_id("pn"),
            number: Some("+12075550100".to_string()),
        })
    }

    async fn update_phone_number(
        &self,
        remote_id: &str,
        request: &UpdatePhoneNumberRequest,
    ) -> Result<Value, GatewayError> {
        let body = serde_json::to_value(request).unwrap();
        self.record(
            "update_phone_number",
            serde_json::json!({ "id": remote_id, "body": body }),
        )?;
        Ok(serde_json::json!({ "id": remote_id }))
    }

    async fn get_phone_number(&self, remote_id: &str) -> Result<Value, GatewayError> {
        self.record("get_phone_number", Value::String(remote_id.to_string()))?;
        Ok(serde_json::json!({ "id": remote_id, "number": "+12075550100" }))
    }

    async fn delete_phone_number(&self, remote_id: &str) -> Result<(), GatewayError> {
        self.record("delete_phone_number", Value::String(remote_id.to_string()))
    }
}
