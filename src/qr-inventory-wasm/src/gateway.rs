use crate::error::{js_error_to_string, GatewayError};
use crate::types::{
    ApiId, GenerateRequest, GenerateResponse, InventoryConfig, MoveRequest, RawBatch, RawNode,
    RawQrCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::cell::RefCell;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, AbortSignal, Headers, Request, RequestInit, Response};

/// Logical operations of the QR admin API
#[allow(async_fn_in_trait)]
pub trait QrGateway {
    /// `GET /admin/qr/file-system`
    async fn file_system(&self) -> Result<Vec<RawNode>, GatewayError>;

    /// `GET /admin/qr/batches`
    async fn batches(&self) -> Result<Vec<RawBatch>, GatewayError>;

    /// `GET /admin/qr/batches/{id}`
    async fn batch_codes(&self, batch_id: &ApiId) -> Result<Vec<RawQrCode>, GatewayError>;

    /// `POST /admin/qr/generate`
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError>;

    /// `POST /admin/qr/move`
    async fn move_codes(&self, request: &MoveRequest) -> Result<(), GatewayError>;

    /// `DELETE /admin/qr/{id}`
    async fn delete_code(&self, id: &ApiId) -> Result<(), GatewayError>;

    /// `DELETE /admin/qr/batches/{id}/unmapped` or `DELETE /admin/qr/unmapped`
    async fn delete_unmapped(&self, batch_id: Option<&ApiId>) -> Result<(), GatewayError>;
}

/// Responses come either bare or wrapped in `{"data": ...}`
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(data) => data,
        }
    }
}

pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, GatewayError> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    Ok(envelope.into_inner())
}

/// Gateway backed by the browser `fetch` API.
///
/// Every request carries the signal of one shared `AbortController`;
/// `abort_all` cancels whatever is in flight and arms a fresh controller.
pub struct FetchGateway {
    base_url: String,
    auth_token: Option<String>,
    controller: RefCell<AbortController>,
}

impl FetchGateway {
    pub fn new(config: &InventoryConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone().filter(|token| !token.is_empty()),
            controller: RefCell::new(new_controller()?),
        })
    }

    /// Abort every in-flight request
    pub fn abort_all(&self) {
        let fresh = match new_controller() {
            Ok(controller) => controller,
            Err(err) => {
                tracing::warn!(%err, "could not arm a new abort controller");
                return;
            }
        };
        let previous = self.controller.replace(fresh);
        previous.abort();
        tracing::debug!("aborted in-flight requests");
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn signal(&self) -> AbortSignal {
        self.controller.borrow().signal()
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
    ) -> Result<String, GatewayError> {
        let window = web_sys::window().ok_or(GatewayError::NoWindow)?;
        let signal = self.signal();

        let headers = Headers::new().map_err(network)?;
        headers.set("Accept", "application/json").map_err(network)?;
        if let Some(token) = &self.auth_token {
            headers
                .set("Authorization", &format!("Bearer {}", token))
                .map_err(network)?;
        }

        let init = RequestInit::new();
        init.set_method(method);
        if let Some(body) = &body {
            headers.set("Content-Type", "application/json").map_err(network)?;
            init.set_body(&JsValue::from_str(body));
        }
        init.set_headers(&headers);
        init.set_signal(Some(&signal));

        let url = self.url(path);
        tracing::debug!(method, %url, "request");
        let request = Request::new_with_str_and_init(&url, &init).map_err(network)?;

        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|err| interrupted(signal.aborted(), || js_error_to_string(err)))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| GatewayError::Network("fetch did not resolve to a Response".to_string()))?;

        let text = JsFuture::from(response.text().map_err(network)?)
            .await
            .map_err(|err| interrupted(signal.aborted(), || js_error_to_string(err)))?
            .as_string()
            .unwrap_or_default();

        if !response.ok() {
            tracing::warn!(method, %url, status = response.status(), "request failed");
            return Err(GatewayError::Http {
                status: response.status(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let body = self.send("GET", path, None).await?;
        decode_body(&body)
    }
}

impl QrGateway for FetchGateway {
    async fn file_system(&self) -> Result<Vec<RawNode>, GatewayError> {
        self.get_json("/admin/qr/file-system").await
    }

    async fn batches(&self) -> Result<Vec<RawBatch>, GatewayError> {
        self.get_json("/admin/qr/batches").await
    }

    async fn batch_codes(&self, batch_id: &ApiId) -> Result<Vec<RawQrCode>, GatewayError> {
        self.get_json(&format!("/admin/qr/batches/{}", batch_id)).await
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GatewayError> {
        let body = serde_json::to_string(request)?;
        let response = self.send("POST", "/admin/qr/generate", Some(body)).await?;
        decode_body(&response)
    }

    async fn move_codes(&self, request: &MoveRequest) -> Result<(), GatewayError> {
        let body = serde_json::to_string(request)?;
        self.send("POST", "/admin/qr/move", Some(body)).await?;
        Ok(())
    }

    async fn delete_code(&self, id: &ApiId) -> Result<(), GatewayError> {
        self.send("DELETE", &format!("/admin/qr/{}", id), None).await?;
        Ok(())
    }

    async fn delete_unmapped(&self, batch_id: Option<&ApiId>) -> Result<(), GatewayError> {
        let path = match batch_id {
            Some(id) => format!("/admin/qr/batches/{}/unmapped", id),
            None => "/admin/qr/unmapped".to_string(),
        };
        self.send("DELETE", &path, None).await?;
        Ok(())
    }
}

fn new_controller() -> Result<AbortController, GatewayError> {
    AbortController::new().map_err(network)
}

fn network(err: JsValue) -> GatewayError {
    GatewayError::Network(js_error_to_string(err))
}

/// A rejected fetch or body read counts as aborted once the signal fired
fn interrupted(aborted: bool, detail: impl FnOnce() -> String) -> GatewayError {
    if aborted {
        GatewayError::Aborted
    } else {
        GatewayError::Network(detail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bare_and_wrapped_bodies() {
        let bare: Vec<RawBatch> = decode_body(r#"[{"id": 1, "name": "A", "count": 3}]"#).unwrap();
        let wrapped: Vec<RawBatch> =
            decode_body(r#"{"success": true, "data": [{"id": 1, "name": "A"}]}"#).unwrap();

        assert_eq!(bare.len(), 1);
        assert_eq!(wrapped[0].id, bare[0].id);
    }

    #[test]
    fn test_decode_generate_response() {
        let response: GenerateResponse = decode_body(r#"{"batch_id": 17}"#).unwrap();
        assert_eq!(response.batch_id, ApiId::Number(17));
    }

    #[test]
    fn test_rejection_after_abort_is_not_a_network_error() {
        assert_eq!(interrupted(true, || "body stream aborted".to_string()), GatewayError::Aborted);
        assert_eq!(
            interrupted(false, || "offline".to_string()),
            GatewayError::Network("offline".to_string())
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<Vec<RawNode>, _> = decode_body("<html>");
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }
}
