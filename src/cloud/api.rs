// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Neo cloud REST API requests.
//!
//! All requests are authorized with the access token of the shared [`Session`]. An expired token
//! is refreshed once, and the request repeated.

use crate::cloud::command::{BlindCommand, generate_hash, sanitize_payload};
use crate::cloud::model::{LocationData, ScheduleUpdate, TokenResponse, TransmitCommand};
use crate::cloud::session::Session;
use crate::configuration::{CloudSettings, PayloadLogging};
use crate::errors::ServiceError;
use crate::util::new_http_client;
use actix_web::web::Bytes;
use awc::http::{Method, StatusCode};
use derive_more::Constructor;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

const CLIENT_ID: &str = "mobile";
const APP_ORIGIN: &str = "https://app.neosmartblinds.com";
const APP_REFERER: &str = "https://app.neosmartblinds.com/";
/// Motor type field of a transmit command. The cloud always expects `no`.
const TRANSMIT_MOTOR: &str = "no";
const MAX_RESPONSE_SIZE: usize = 4 * 1024 * 1024;

/// A motor command for a single blind.
#[derive(Clone, Debug, PartialEq, Eq, Constructor)]
pub struct CommandTarget {
    /// Blind code: `<room token>-<channel>`
    pub blind_code: String,
    pub command: BlindCommand,
}

#[derive(Clone)]
pub(crate) struct CloudApi {
    id: String,
    http: awc::Client,
    base_url: String,
    username: String,
    password: String,
    payload_logging: PayloadLogging,
    session: Rc<RefCell<Session>>,
}

impl CloudApi {
    pub fn new(settings: &CloudSettings) -> Self {
        Self {
            id: format!("cloud:{}", settings.username),
            http: new_http_client(settings.request_timeout),
            base_url: settings.url.as_str().trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            payload_logging: settings.payload_logging,
            session: Default::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_uuid(&self) -> Option<String> {
        self.session.borrow().user_uuid.clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Log in with username and password and store the new session.
    ///
    /// Returns the user uuid of the account.
    pub async fn login(&self) -> Result<String, ServiceError> {
        debug!("[{}] Attempting to log in to Neo Smart Blinds cloud", self.id);
        let session = self
            .token_request(&[
                ("grant_type", "password"),
                ("username", &self.username),
                ("password", &self.password),
                ("client_id", CLIENT_ID),
            ])
            .await?;
        let user_uuid = session.user_uuid.clone().unwrap_or_default();
        *self.session.borrow_mut() = session;
        info!("[{}] Successfully logged in to Neo cloud", self.id);
        Ok(user_uuid)
    }

    async fn refresh_token(&self) -> Result<(), ServiceError> {
        debug!("[{}] Refreshing Neo cloud access token", self.id);
        let Some(refresh_token) = self.session.borrow().refresh_token.clone() else {
            return Err(ServiceError::AuthError("No refresh token available".into()));
        };
        let session = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
                ("client_id", CLIENT_ID),
            ])
            .await?;
        *self.session.borrow_mut() = session;
        debug!("[{}] Successfully refreshed Neo cloud token", self.id);
        Ok(())
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<Session, ServiceError> {
        let mut response = self
            .http
            .post(self.url("oauth/token"))
            .insert_header(("Origin", APP_ORIGIN))
            .insert_header(("Referer", APP_REFERER))
            .send_form(&form)
            .await?;

        let status = response.status();
        if status.is_server_error() {
            error!("[{}] Token request failed: HTTP {status}", self.id);
            return Err(ServiceError::ApiError(format!(
                "Token request failed: HTTP {status}"
            )));
        }
        if !status.is_success() {
            error!("[{}] Login failed: HTTP {status}", self.id);
            return Err(ServiceError::AuthError(format!(
                "Login failed, check credentials (HTTP {status})"
            )));
        }

        let body = response.body().limit(MAX_RESPONSE_SIZE).await?;
        let tokens: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| ServiceError::ApiError(format!("Invalid token response: {e}")))?;
        Session::from_token_response(tokens)
    }

    async fn ensure_session(&self) -> Result<String, ServiceError> {
        if !self.session.borrow().is_authenticated() {
            self.login().await?;
        }
        self.user_uuid()
            .ok_or_else(|| ServiceError::AuthError("User id not available".into()))
    }

    /// Make an authenticated API request, handling token refresh.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Bytes, ServiceError> {
        self.ensure_session().await?;
        let url = self.url(path);

        let (mut status, mut bytes) = self.send(&method, &url, body).await?;
        if status == StatusCode::UNAUTHORIZED {
            debug!("[{}] Token expired, attempting refresh", self.id);
            if let Err(e) = self.refresh_token().await {
                warn!("[{}] Token refresh failed, logging in again: {e}", self.id);
                *self.session.borrow_mut() = Session::default();
                self.login().await?;
            }
            (status, bytes) = self.send(&method, &url, body).await?;
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ServiceError::AuthError(format!(
                "{method} {path} rejected after token refresh"
            )));
        }
        if !status.is_success() {
            error!("[{}] API request {method} {path} failed: HTTP {status}", self.id);
            return Err(ServiceError::ApiError(format!(
                "{method} {path} failed: HTTP {status}"
            )));
        }

        Ok(bytes)
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Bytes), ServiceError> {
        let token = self.session.borrow().access_token.clone().unwrap_or_default();
        let request = self
            .http
            .request(method.clone(), url)
            .insert_header(("Authorization", format!("Bearer {token}")))
            .insert_header(("Origin", APP_ORIGIN))
            .insert_header(("Referer", APP_REFERER));

        let mut response = match body {
            Some(body) => request.send_json(body).await?,
            None => request.send().await?,
        };
        let status = response.status();
        let bytes = response.body().limit(MAX_RESPONSE_SIZE).await?;
        Ok((status, bytes))
    }

    /// Get all user data (rooms with blinds, schedules) from the cloud.
    pub async fn get_location(&self) -> Result<LocationData, ServiceError> {
        let user_uuid = self.ensure_session().await?;
        let body = self
            .request(Method::GET, &format!("location/{user_uuid}"), None)
            .await?;

        if self.payload_logging == PayloadLogging::Full {
            debug!(
                "[{}] Full API data payload received (UNREDACTED): {}",
                self.id,
                String::from_utf8_lossy(&body)
            );
        } else {
            debug!("[{}] API data payload received: {} bytes", self.id, body.len());
        }

        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::ApiError(format!("Invalid location data: {e}")))
    }

    /// Send one or more blind commands of the same controller in a single request.
    pub async fn transmit(
        &self,
        controller_id: &str,
        targets: &[CommandTarget],
    ) -> Result<(), ServiceError> {
        self.ensure_session().await?;

        let controller = self
            .session
            .borrow()
            .controllers
            .get(controller_id)
            .cloned();
        let Some(controller) = controller else {
            error!("[{}] No controller string found for {controller_id}", self.id);
            return Err(ServiceError::BadRequest(format!(
                "Unknown controller: {controller_id}"
            )));
        };

        let hash = generate_hash();
        let mut commands = Vec::with_capacity(targets.len());
        for target in targets {
            let Some((token, channel)) = target.blind_code.split_once('-') else {
                error!("[{}] Invalid blind code format: {}", self.id, target.blind_code);
                return Err(ServiceError::BadRequest(format!(
                    "Invalid blind code: {}",
                    target.blind_code
                )));
            };
            commands.push(TransmitCommand {
                token: token.to_string(),
                command: target.command.code(),
                channel: channel.to_string(),
                motor: TRANSMIT_MOTOR,
                hash: hash.clone(),
            });
        }

        let mut payload = Map::with_capacity(1);
        payload.insert(controller, serde_json::to_value(commands)?);
        let payload = Value::Object(payload);

        let path = "esp32/multi-transmit";
        match self.payload_logging {
            PayloadLogging::Full => debug!(
                "[{}] Sending command to {path} with FULL (UNREDACTED) payload: {payload}",
                self.id
            ),
            PayloadLogging::Redacted => debug!(
                "[{}] Sending command to {path} with SANITIZED payload: {}",
                self.id,
                sanitize_payload(&payload)
            ),
            PayloadLogging::None => debug!("[{}] Sending command to {path}", self.id),
        }

        match self.request(Method::POST, path, Some(&payload)).await {
            Ok(_) => {
                info!("[{}] Command sent successfully", self.id);
                Ok(())
            }
            Err(e) => {
                // error logging is always sanitized
                error!(
                    "[{}] Failed to send command: {e}. Sanitized payload was: {}",
                    self.id,
                    sanitize_payload(&payload)
                );
                Err(e)
            }
        }
    }

    /// Enable or disable a cloud schedule.
    pub async fn set_schedule_state(
        &self,
        schedule_id: &str,
        enabled: bool,
    ) -> Result<(), ServiceError> {
        let user_uuid = self.ensure_session().await?;
        debug!("[{}] Setting schedule {schedule_id} to {enabled}", self.id);

        let payload = serde_json::to_value(ScheduleUpdate { enabled })?;
        self.request(
            Method::POST,
            &format!("location/{user_uuid}/schedules/{schedule_id}"),
            Some(&payload),
        )
        .await?;

        info!("[{}] Schedule {schedule_id} state set to {enabled}", self.id);
        Ok(())
    }
}
