use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::{debug, trace, warn};
use pmg_common::Secret;
use regex::Regex;
use sha2::Sha256;

use crate::errors::ServerError;

/// Header carrying the HMAC-SHA256 signature of platform callback bodies.
pub const SIGNATURE_HEADER: &str = "x-pi-signature";
/// Header carrying the authenticated user, installed by the session layer in front of this service.
pub const USER_HEADER: &str = "x-forwarded-user";

pub fn calculate_hmac(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(body);
    base64::encode(mac.finalize().into_bytes())
}

/// Verifies the HMAC signature on platform callbacks.
#[derive(Clone)]
pub struct WebhookValidator {
    secret: Secret<String>,
    enabled: bool,
}

impl WebhookValidator {
    pub fn new(secret: Secret<String>, enabled: bool) -> Self {
        Self { secret, enabled }
    }

    pub fn check(&self, req: &HttpRequest, body: &[u8]) -> Result<(), ServerError> {
        if !self.enabled {
            trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
            return Ok(());
        }
        let provided = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ServerError::InvalidSignature)?;
        let expected = calculate_hmac(self.secret.reveal(), body);
        if provided == expected {
            trace!("🔐️ Webhook signature check ✅️");
            Ok(())
        } else {
            warn!("🔐️ Invalid webhook signature. Denying access.");
            Err(ServerError::InvalidSignature)
        }
    }
}

/// The user on whose behalf the request is made. User-initiated endpoints refuse requests that arrive without the
/// session layer having identified a user.
pub fn authenticated_user(req: &HttpRequest) -> Result<String, ServerError> {
    req.headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ServerError::Unauthenticated)
}

/// Get the remote IP address from the request. It uses 3 sources to determine the IP address, in decreasing order
/// of preference:
/// 1. The `X-Forwarded-For` header, iif `use_x_forwarded_for` is set to true in the configuration.
/// 2. The `Forwarded` header, iif `use_forwarded` is set to true in the configuration.
/// 3. The peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool, use_forwarded: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        result =
            req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()).and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    if use_forwarded && result.is_none() {
        let re = Regex::new(r#"for=(?P<ip>[^;]+)"#).expect("hardcoded regex is valid");
        result = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| re.captures(v))
            .and_then(|caps| caps.name("ip"))
            .map(|m| m.as_str())
            .and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            debug!("Using Forwarded header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using peer address for remote address: {peer_addr:?}");
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_is_deterministic_and_key_sensitive() {
        let sig = calculate_hmac("secret", b"payload");
        assert_eq!(sig, calculate_hmac("secret", b"payload"));
        assert_ne!(sig, calculate_hmac("other", b"payload"));
        assert_ne!(sig, calculate_hmac("secret", b"payload2"));
    }
}
