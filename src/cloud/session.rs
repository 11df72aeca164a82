// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Cloud session: OAuth tokens and the data extracted from the access token.

use crate::cloud::model::{TokenClaims, TokenResponse};
use crate::errors::ServiceError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::{debug, warn};
use std::collections::HashMap;

#[derive(Clone, Default)]
pub(crate) struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// User uuid from the `usr` token claim.
    pub user_uuid: Option<String>,
    /// Controller uuid to full controller string from the `ctrv2` token claim.
    pub controllers: HashMap<String, String>,
}

impl Session {
    /// Create a new session from a token endpoint response.
    ///
    /// Both tokens and the user uuid claim are required, otherwise an [`ServiceError::AuthError`]
    /// is returned.
    pub fn from_token_response(response: TokenResponse) -> Result<Self, ServiceError> {
        let (Some(access_token), Some(refresh_token)) =
            (response.access_token, response.refresh_token)
        else {
            return Err(ServiceError::AuthError(
                "Login response missing tokens".into(),
            ));
        };

        let claims = decode_claims(&access_token)?;
        let user_uuid = claims
            .usr
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ServiceError::AuthError("Token is missing the user id".into()))?;

        let controllers = controller_map(&claims.ctrv2);
        if controllers.is_empty() {
            warn!("Could not parse controller strings (ctrv2) from access token");
        } else {
            debug!("Built controller map with {} controller(s)", controllers.len());
        }

        Ok(Self {
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            user_uuid: Some(user_uuid),
            controllers,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Decode the payload of a JWT without verifying the signature.
pub(crate) fn decode_claims(token: &str) -> Result<TokenClaims, ServiceError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ServiceError::AuthError("Invalid access token format".into()))?;
    let json = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ServiceError::AuthError(format!("Failed to decode token: {e}")))?;
    serde_json::from_slice(&json)
        .map_err(|e| ServiceError::AuthError(format!("Failed to parse token payload: {e}")))
}

fn controller_map(controller_strings: &[String]) -> HashMap<String, String> {
    controller_strings
        .iter()
        .filter_map(|full| {
            let uuid = full.split(',').next().unwrap_or_default();
            if uuid.is_empty() {
                None
            } else {
                Some((uuid.to_string(), full.clone()))
            }
        })
        .collect()
}
