// Request authentication: Ed25519 verification of Discord interaction webhooks.

use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::{HeaderMap, StatusCode},
    Json,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

use crate::metrics;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("signature is not valid hex")]
    MalformedSignature,
    #[error("signature does not match")]
    Mismatch,
}

/// Check that `signature_hex` signs `timestamp || body` under `key`.
pub fn verify_signature(
    key: &VerifyingKey,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<(), SignatureError> {
    let raw = hex::decode(signature_hex).map_err(|_| SignatureError::MalformedSignature)?;
    let signature =
        Signature::from_slice(&raw).map_err(|_| SignatureError::MalformedSignature)?;

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify(&message, &signature)
        .map_err(|_| SignatureError::Mismatch)
}

/// Verify the signature headers of an inbound request against its raw body.
pub fn verify_request(
    key: &VerifyingKey,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), SignatureError> {
    let signature = header_str(headers, SIGNATURE_HEADER)?;
    let timestamp = header_str(headers, TIMESTAMP_HEADER)?;
    verify_signature(key, signature, timestamp, body)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

// ── Axum extractor: VerifiedBody ─────────────────────────────────────

/// Raw request body whose Discord signature has been checked.
/// Usage: `VerifiedBody(bytes)` in handler parameters; the handler's state
/// must expose the application's `VerifyingKey` through `FromRef`.
#[derive(Debug, Clone)]
pub struct VerifiedBody(pub Bytes);

impl<S> FromRequest<S> for VerifiedBody
where
    S: Send + Sync,
    VerifyingKey: FromRef<S>,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let key = VerifyingKey::from_ref(state);
        let headers = req.headers().clone();

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("Failed to read body: {e}")})),
            )
        })?;

        if let Err(e) = verify_request(&key, &headers, &body) {
            metrics::SIGNATURE_REJECTIONS_TOTAL.inc();
            tracing::warn!("Rejected interaction: {e}");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "invalid request signature"})),
            ));
        }

        Ok(VerifiedBody(body))
    }
}
