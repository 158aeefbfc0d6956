//! Password hashing, session cookies and the authenticated-user extractor

use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use scan_common::{Error, SessionToken};
use tracing::{debug, warn};

use crate::handlers::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "scan_session";

/// Where requests without a session are sent
pub const LOGIN_PATH: &str = "/login";

const HASH_SCHEME: &str = "pbkdf2_sha256";
const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 150;

/// Hash a password as `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| anyhow!("Failed to generate password salt"))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        &salt,
        password.as_bytes(),
        &mut hash,
    );

    Ok(format!(
        "{}${}${}${}",
        HASH_SCHEME,
        PBKDF2_ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Constant-time check of a password against a stored hash.
/// Malformed hashes never verify.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(HASH_SCHEME), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (hex::decode(salt), hex::decode(hash)) else {
        return false;
    };

    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        &salt,
        password.as_bytes(),
        &hash,
    )
    .is_ok()
}

/// Fresh random session token
pub fn new_session_token() -> anyhow::Result<SessionToken> {
    let mut bytes = [0u8; 32];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow!("Failed to generate session token"))?;
    Ok(SessionToken::new(bytes))
}

/// Usernames are 1-150 characters of letters, digits and `@.+-_`.
pub fn validate_username(username: &str) -> Result<(), Error> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::InvalidUsername(format!(
            "must be between 1 and {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
    {
        return Err(Error::InvalidUsername(
            "may contain only letters, numbers, and @/./+/-/_ characters".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_new_password(password1: &str, password2: &str) -> Result<(), Error> {
    if password1 != password2 {
        return Err(Error::InvalidPassword(
            "the two password fields didn't match".to_string(),
        ));
    }
    if password1.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidPassword(format!(
            "must contain at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(token: &SessionToken, ttl_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token.to_hex(),
        ttl_secs
    )
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// Session token from the request's `Cookie` headers, if well-formed
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionToken::from_hex(value).ok())
}

/// A request made with a live session.
///
/// Extracting this from a request without one redirects to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let login = || Redirect::to(LOGIN_PATH).into_response();

        let Some(token) = session_token(&parts.headers) else {
            debug!("No session cookie for {}", parts.uri.path());
            return Err(login());
        };

        match state.store.session_user(&token).await {
            Ok(Some(username)) => Ok(CurrentUser { username }),
            Ok(None) => Err(login()),
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                Err(login())
            }
        }
    }
}
