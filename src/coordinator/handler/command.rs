// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Entity commands and custom service calls.

use crate::cloud::messages::{SetScheduleState, TransmitCommands};
use crate::coordinator::{CallServiceMsg, Coordinator, EntityCommandMsg};
use crate::entity::Entity;
use crate::errors::ServiceError;
use crate::hierarchy::Account;
use crate::service::{CloudAction, DOMAIN, handle_entity_command, handle_favorite_service};
use actix::{ActorFutureExt, Handler, ResponseActFuture, WrapFuture, fut};
use log::{debug, info};

impl Handler<EntityCommandMsg> for Coordinator {
    type Result = ResponseActFuture<Self, Result<(), ServiceError>>;

    fn handle(&mut self, msg: EntityCommandMsg, _ctx: &mut Self::Context) -> Self::Result {
        let cmd = msg.0;
        debug!("Entity command {} for {}", cmd.cmd_id, cmd.entity_id);
        let favorites = self.settings.cloud.favorites;
        let action = self
            .command_target(&cmd.entity_id)
            .and_then(|(entity, account)| handle_entity_command(entity, account, favorites, &cmd));
        self.execute(cmd.entity_id, action)
    }
}

impl Handler<CallServiceMsg> for Coordinator {
    type Result = ResponseActFuture<Self, Result<(), ServiceError>>;

    fn handle(&mut self, msg: CallServiceMsg, _ctx: &mut Self::Context) -> Self::Result {
        info!("Calling service {DOMAIN}.{} for {}", msg.service, msg.entity_id);
        let action = self
            .command_target(&msg.entity_id)
            .and_then(|(entity, account)| handle_favorite_service(entity, account, msg.service));
        self.execute(msg.entity_id, action)
    }
}

impl Coordinator {
    fn command_target(&self, entity_id: &str) -> Result<(&Entity, &Account), ServiceError> {
        let account = match (&self.account, self.is_running()) {
            (Some(account), true) => account,
            _ => {
                return Err(ServiceError::ServiceUnavailable(
                    "Neo cloud account not set up".into(),
                ));
            }
        };
        let entity = self
            .entity(entity_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown entity: {entity_id}")))?;
        if !entity.available {
            return Err(ServiceError::ServiceUnavailable(format!(
                "{entity_id} is currently not available"
            )));
        }
        Ok((entity, account))
    }

    /// Send the cloud request and update the entity state on success.
    fn execute(
        &mut self,
        entity_id: String,
        action: Result<CloudAction, ServiceError>,
    ) -> ResponseActFuture<Self, Result<(), ServiceError>> {
        let action = match action {
            Ok(action) => action,
            Err(e) => return Box::pin(fut::result(Err(e))),
        };
        let cloud = self.cloud_client();
        let request = action.clone();

        Box::pin(
            async move {
                match request {
                    CloudAction::Transmit {
                        controller_id,
                        targets,
                        ..
                    } => {
                        cloud
                            .send(TransmitCommands::new(controller_id, targets))
                            .await?
                    }
                    CloudAction::SetSchedule {
                        schedule_id,
                        enabled,
                    } => {
                        cloud
                            .send(SetScheduleState::new(schedule_id, enabled))
                            .await?
                    }
                }
            }
            .into_actor(self)
            .map(move |result, act, ctx| {
                match &result {
                    Ok(()) => act.apply_action(&entity_id, &action),
                    Err(ServiceError::AuthError(_)) => act.reauth_required(ctx),
                    Err(_) => {}
                }
                result
            }),
        )
    }
}
