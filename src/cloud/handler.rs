// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handler implementations of the cloud client.

use crate::cloud::CloudClient;
use crate::cloud::messages::{
    AccountData, FetchLocation, Login, SetScheduleState, TransmitCommands,
};
use crate::errors::ServiceError;
use actix::{Handler, ResponseFuture};
use log::debug;

impl Handler<Login> for CloudClient {
    type Result = ResponseFuture<Result<String, ServiceError>>;

    fn handle(&mut self, _: Login, _ctx: &mut Self::Context) -> Self::Result {
        let api = self.api.clone();
        Box::pin(async move { api.login().await })
    }
}

impl Handler<FetchLocation> for CloudClient {
    type Result = ResponseFuture<Result<AccountData, ServiceError>>;

    fn handle(&mut self, _: FetchLocation, _ctx: &mut Self::Context) -> Self::Result {
        let api = self.api.clone();
        Box::pin(async move {
            let location = api.get_location().await?;
            Ok(AccountData {
                user_uuid: api.user_uuid().unwrap_or_default(),
                location,
            })
        })
    }
}

impl Handler<TransmitCommands> for CloudClient {
    type Result = ResponseFuture<Result<(), ServiceError>>;

    fn handle(&mut self, msg: TransmitCommands, _ctx: &mut Self::Context) -> Self::Result {
        debug!(
            "[{}] Transmit {} command(s) to controller {}",
            self.api.id(),
            msg.commands.len(),
            msg.controller_id
        );
        let api = self.api.clone();
        Box::pin(async move { api.transmit(&msg.controller_id, &msg.commands).await })
    }
}

impl Handler<SetScheduleState> for CloudClient {
    type Result = ResponseFuture<Result<(), ServiceError>>;

    fn handle(&mut self, msg: SetScheduleState, _ctx: &mut Self::Context) -> Self::Result {
        let api = self.api.clone();
        Box::pin(async move { api.set_schedule_state(&msg.schedule_id, msg.enabled).await })
    }
}
