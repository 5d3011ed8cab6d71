use crate::domain::models::UserRole;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub user_id: String,
    pub role: UserRole,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
    #[error("bad role")]
    Role,
}

/// Token layout: `base64(user_id|ROLE|exp).base64(hmac_sha256)`. Tokens are
/// issued by the auth provider; this signer mirrors its format for tests.
#[cfg(test)]
pub fn sign_session(
    user_id: &str,
    role: &UserRole,
    ttl: chrono::Duration,
    key: &[u8],
) -> Result<String, SessionError> {
    let exp = Utc::now() + ttl;
    let payload = format!("{}|{}|{}", user_id, role.as_str(), exp.timestamp());
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload_bytes = general_purpose::STANDARD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    // user ids are opaque, so split from the right
    let mut pieces = payload.rsplitn(3, '|');
    let exp: i64 = pieces
        .next()
        .and_then(|raw| raw.parse().ok())
        .ok_or(SessionError::Invalid)?;
    let role = pieces
        .next()
        .ok_or(SessionError::Invalid)
        .and_then(|raw| UserRole::parse(raw).ok_or(SessionError::Role))?;
    let user_id = pieces
        .next()
        .filter(|id| !id.is_empty())
        .ok_or(SessionError::Invalid)?
        .to_string();

    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(SessionClaims { user_id, role, exp })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(val) = auth.to_str() {
            if let Some(bearer) = val.strip_prefix("Bearer ") {
                return Some(bearer.trim().to_string());
            }
        }
    }
    if let Some(cookie) = headers.get(axum::http::header::COOKIE) {
        if let Ok(val) = cookie.to_str() {
            for pair in val.split(';') {
                if let Some(rest) = pair.trim().strip_prefix("session=") {
                    return Some(rest.to_string());
                }
            }
        }
    }
    None
}

/// Extractor that admits only sessions carrying the admin role.
pub struct AdminSession(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    crate::state::SharedState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = crate::state::SharedState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let claims = verify_session(&token, &shared_state.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

        if claims.role != UserRole::Admin {
            tracing::warn!(user_id = %claims.user_id, "Non-admin session rejected");
            return Err(StatusCode::FORBIDDEN);
        }

        Ok(AdminSession(claims.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const KEY: &[u8] = b"test-session-key";

    #[test]
    fn test_sign_and_verify() {
        let token = sign_session("a1|legacy", &UserRole::Admin, Duration::hours(1), KEY).unwrap();
        let claims = verify_session(&token, KEY).unwrap();
        assert_eq!(claims.user_id, "a1|legacy");
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_rejects_wrong_key_and_expired() {
        let token = sign_session("a1", &UserRole::Admin, Duration::hours(1), KEY).unwrap();
        assert!(matches!(
            verify_session(&token, b"other-key"),
            Err(SessionError::Signature)
        ));

        let expired = sign_session("a1", &UserRole::Admin, Duration::hours(-1), KEY).unwrap();
        assert!(matches!(
            verify_session(&expired, KEY),
            Err(SessionError::Expired)
        ));

        assert!(matches!(
            verify_session("garbage", KEY),
            Err(SessionError::Invalid)
        ));
    }

    #[test]
    fn test_extract_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer xyz "),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }
}
