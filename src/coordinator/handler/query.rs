// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Device, entity and state queries and entity event subscriptions.

use crate::coordinator::{
    Coordinator, CoordinatorState, GetDevices, GetEntities, GetEntity, GetState,
    SubscribeEntityEvents, UnsubscribeEntityEvents,
};
use crate::entity::{Entity, EntityChanges};
use crate::errors::ServiceError;
use actix::{Handler, MessageResult};
use log::{error, info};

impl Handler<GetDevices> for Coordinator {
    type Result = MessageResult<GetDevices>;

    fn handle(&mut self, _: GetDevices, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.devices.devices().to_vec())
    }
}

impl Handler<GetEntities> for Coordinator {
    type Result = MessageResult<GetEntities>;

    fn handle(&mut self, _: GetEntities, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.entities.clone())
    }
}

impl Handler<GetEntity> for Coordinator {
    type Result = Result<Entity, ServiceError>;

    fn handle(&mut self, msg: GetEntity, _ctx: &mut Self::Context) -> Self::Result {
        self.entity(&msg.entity_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown entity: {}", msg.entity_id)))
    }
}

impl Handler<GetState> for Coordinator {
    type Result = MessageResult<GetState>;

    fn handle(&mut self, _: GetState, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(CoordinatorState {
            operation_mode: format!("{:?}", self.machine.state()),
            polling: format!("{:?}", self.polling.state()),
            last_update_success: self.last_update_success,
            entry_id: self.settings.cloud.entry_id.clone(),
            title: self.entry_title(),
            entities: self.entities.len(),
        })
    }
}

impl Handler<SubscribeEntityEvents> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: SubscribeEntityEvents, _ctx: &mut Self::Context) -> Self::Result {
        info!("[{}] Subscribed to entity events", msg.session_id);
        // send current states to the new subscriber
        if !self.entities.is_empty() {
            let changes = self.entities.iter().map(|e| e.to_change()).collect();
            if let Err(e) = msg.recipient.try_send(EntityChanges(changes)) {
                error!("[{}] Could not send entity states: {e}", msg.session_id);
            }
        }
        self.subscribers.insert(msg.session_id, msg.recipient);
    }
}

impl Handler<UnsubscribeEntityEvents> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: UnsubscribeEntityEvents, _ctx: &mut Self::Context) -> Self::Result {
        if self.subscribers.remove(&msg.session_id).is_some() {
            info!("[{}] Unsubscribed from entity events", msg.session_id);
        }
    }
}
