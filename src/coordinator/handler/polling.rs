// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Periodic cloud update of the entity states.

use crate::cloud::messages::{AccountData, FetchLocation};
use crate::coordinator::handler::Poll;
use crate::coordinator::{Coordinator, PollingInput, PollingOutput};
use crate::entity;
use crate::errors::ServiceError;
use crate::hierarchy::build_hierarchy;
use actix::{ActorFutureExt, AsyncContext, Context, Handler, WrapFuture};
use log::{debug, info, warn};

impl Handler<Poll> for Coordinator {
    type Result = ();

    fn handle(&mut self, _: Poll, ctx: &mut Self::Context) -> Self::Result {
        if !self.is_running() || self.account.is_none() {
            return;
        }
        if self.polling.consume(&PollingInput::Tick).is_err() {
            debug!("Cloud update still in progress, skipping poll");
            return;
        }

        let cloud = self.cloud_client();
        ctx.spawn(
            async move { cloud.send(FetchLocation).await? }
                .into_actor(self)
                .map(|result, act, ctx| act.on_poll_result(result, ctx)),
        );
    }
}

impl Coordinator {
    fn on_poll_result(&mut self, result: Result<AccountData, ServiceError>, ctx: &mut Context<Self>) {
        if !self.is_running() {
            return;
        }

        match result {
            Ok(data) => {
                let _ = self.polling.consume(&PollingInput::FetchSucceeded);
                let account =
                    build_hierarchy(&self.settings.cloud.username, &data.user_uuid, &data.location);
                let changes = entity::refresh_entities(&mut self.entities, &account);
                debug!("Cloud update: {} entity change(s)", changes.len());
                if self.last_update_success == Some(false) {
                    info!("Neo cloud available again");
                }
                self.account = Some(account);
                self.last_update_success = Some(true);
                self.broadcast(&changes);
            }
            Err(e) => {
                warn!("Cloud update failed: {e}");
                self.last_update_success = Some(false);
                if let Ok(Some(PollingOutput::MarkUnavailable)) =
                    self.polling.consume(&PollingInput::FetchFailed)
                {
                    let changes = entity::mark_unavailable(&mut self.entities);
                    self.broadcast(&changes);
                }
                if matches!(e, ServiceError::AuthError(_)) {
                    self.reauth_required(ctx);
                }
            }
        }
    }
}
