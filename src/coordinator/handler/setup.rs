// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Initial cloud discovery of the configured account.

use crate::cloud::messages::{AccountData, FetchLocation};
use crate::coordinator::Coordinator;
use crate::coordinator::handler::SetupEntry;
use crate::entity::{self, device};
use crate::errors::ServiceError;
use crate::hierarchy::build_hierarchy;
use actix::{ActorFutureExt, AsyncContext, Context, Handler, WrapFuture};
use log::{debug, error, info, warn};

impl Handler<SetupEntry> for Coordinator {
    type Result = ();

    fn handle(&mut self, _: SetupEntry, ctx: &mut Self::Context) -> Self::Result {
        self.setup_retry = None;
        if !self.is_running() {
            debug!("Ignoring setup request: not running");
            return;
        }

        info!("Setting up Neo cloud account {}", self.settings.cloud.username);
        let cloud = self.cloud_client();

        ctx.spawn(
            async move { cloud.send(FetchLocation).await? }
                .into_actor(self)
                .map(|result, act, ctx| {
                    if !act.is_running() {
                        return;
                    }
                    match result {
                        Ok(data) => {
                            if let Err(e) = act.finish_setup(data, ctx) {
                                error!("Setup failed: {e}");
                            }
                        }
                        Err(ServiceError::AuthError(e)) => {
                            error!("Setup failed: {e}");
                            act.reauth_required(ctx);
                        }
                        Err(e) => {
                            warn!("Setup failed, cloud not ready: {e}");
                            act.last_update_success = Some(false);
                            act.schedule_setup_retry(ctx);
                        }
                    }
                }),
        );
    }
}

impl Coordinator {
    fn finish_setup(
        &mut self,
        data: AccountData,
        ctx: &mut Context<Self>,
    ) -> Result<(), ServiceError> {
        let favorites = self.settings.cloud.favorites;
        let account = build_hierarchy(&self.settings.cloud.username, &data.user_uuid, &data.location);

        let known_account = self
            .account
            .as_ref()
            .is_some_and(|a| a.user_uuid == account.user_uuid);
        let changes = if known_account && !self.entities.is_empty() {
            // re-authenticated: entities are only created once
            entity::refresh_entities(&mut self.entities, &account)
        } else {
            self.devices.clear();
            self.entity_registry.clear();
            device::register_devices(&account, favorites, &mut self.devices)?;
            self.entities = entity::create_entities(&account, favorites, &mut self.entity_registry);
            self.entities.iter().map(|e| e.to_change()).collect()
        };

        info!(
            "Neo cloud account ready: {} controller(s), {} entities",
            account.controllers.len(),
            self.entities.len()
        );
        if self.settings.cloud.entry_id.is_none() {
            self.settings.cloud.entry_id = Some(account.user_uuid.clone());
        }
        self.account = Some(account);
        self.last_update_success = Some(true);
        self.broadcast(&changes);
        self.start_polling(ctx);
        Ok(())
    }
}
