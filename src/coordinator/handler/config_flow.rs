// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Config flow: account credentials entry and validation.

use crate::cloud::CloudClient;
use crate::cloud::messages::Login;
use crate::configuration::{remove_user_settings, save_user_settings};
use crate::coordinator::handler::SetupEntry;
use crate::coordinator::{
    ConfigFlowResult, Coordinator, OperationModeInput, OperationModeState, RemoveConfigEntry,
    StartConfigFlow, SubmitConfigFlow,
};
use crate::errors::ServiceError;
use actix::{Actor, ActorFutureExt, AsyncContext, Handler, ResponseActFuture, WrapFuture, fut};
use log::{error, info, warn};
use uuid::Uuid;

impl Handler<StartConfigFlow> for Coordinator {
    type Result = Result<ConfigFlowResult, ServiceError>;

    fn handle(&mut self, _: StartConfigFlow, _ctx: &mut Self::Context) -> Self::Result {
        let flow_id = Uuid::new_v4().to_string();
        info!("Starting config flow {flow_id}");
        self.flows.insert(flow_id.clone());
        Ok(ConfigFlowResult::user_form(flow_id, None))
    }
}

/// Validate the entered credentials by logging in to the Neo cloud.
///
/// Without a configured account, valid credentials create the config entry and start the initial
/// cloud discovery with [SetupEntry]. An already configured account aborts the flow.
impl Handler<SubmitConfigFlow> for Coordinator {
    type Result = ResponseActFuture<Self, Result<ConfigFlowResult, ServiceError>>;

    fn handle(&mut self, msg: SubmitConfigFlow, _ctx: &mut Self::Context) -> Self::Result {
        let flow_id = msg.flow_id;
        if !self.flows.contains(&flow_id) {
            return Box::pin(fut::result(Err(ServiceError::NotFound(format!(
                "Unknown config flow: {flow_id}"
            )))));
        }

        let username = msg.input.username.trim().to_string();
        if username.is_empty() || msg.input.password.is_empty() {
            return Box::pin(fut::result(Err(ServiceError::BadRequest(
                "Missing username or password".into(),
            ))));
        }

        if matches!(
            self.machine.state(),
            &OperationModeState::ValidatingCredentials
        ) {
            return Box::pin(fut::result(Err(ServiceError::ServiceUnavailable(
                "Credential validation in progress".into(),
            ))));
        }
        let configured = self.is_running();
        if !configured {
            let _ = self.sm_consume(&OperationModeInput::UserInput);
        }

        let mut cfg = self.settings.cloud.clone();
        cfg.set_credentials(&username, msg.input.password);
        let client = CloudClient::new(&cfg).start();
        let login = client.send(Login);

        Box::pin(
            async move { login.await? }
                .into_actor(self)
                .map(move |result, act, ctx| {
                    let user_uuid = match result {
                        Ok(user_uuid) => user_uuid,
                        Err(e) => {
                            warn!("[{flow_id}] Credential validation failed: {e}");
                            if !configured {
                                let _ = act.sm_consume(&OperationModeInput::CredentialsInvalid);
                            }
                            let error = match e {
                                ServiceError::AuthError(_) => "invalid_auth",
                                _ => "cannot_connect",
                            };
                            return Ok(ConfigFlowResult::user_form(flow_id, Some(error)));
                        }
                    };

                    act.flows.remove(&flow_id);
                    if configured {
                        // accounts from the configuration file have no entry id until set up
                        let configured_uuid = act
                            .settings
                            .cloud
                            .entry_id
                            .as_deref()
                            .or(act.account.as_ref().map(|a| a.user_uuid.as_str()));
                        let same_account = match configured_uuid {
                            Some(uuid) => uuid == user_uuid,
                            None => act.settings.cloud.username.eq_ignore_ascii_case(&username),
                        };
                        let reason = if same_account {
                            "already_configured"
                        } else {
                            "single_instance_allowed"
                        };
                        info!("[{flow_id}] Aborting config flow: {reason}");
                        return Ok(ConfigFlowResult::Abort {
                            flow_id,
                            reason: reason.into(),
                        });
                    }

                    cfg.entry_id = Some(user_uuid.clone());
                    if let Err(e) = save_user_settings(&act.user_settings, &cfg) {
                        error!("[{flow_id}] Credentials are only kept until restart: {e}");
                    }
                    act.settings.cloud = cfg;
                    act.cloud = Some(client);
                    let _ = act.sm_consume(&OperationModeInput::CredentialsValid);
                    ctx.notify(SetupEntry);

                    let title = format!("Neo Blinds ({username})");
                    info!("[{flow_id}] Created config entry: {title}");
                    Ok(ConfigFlowResult::CreateEntry {
                        flow_id,
                        title,
                        unique_id: user_uuid,
                    })
                }),
        )
    }
}

impl Handler<RemoveConfigEntry> for Coordinator {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, _: RemoveConfigEntry, ctx: &mut Self::Context) -> Self::Result {
        info!("Removing Neo cloud account {}", self.settings.cloud.username);
        self.unload(ctx);
        self.settings.cloud.set_credentials("", "");
        self.settings.cloud.entry_id = None;
        remove_user_settings(&self.user_settings)
    }
}
