// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix Actor message definitions for CloudClient

use crate::cloud::CommandTarget;
use crate::cloud::model::LocationData;
use crate::errors::ServiceError;
use actix::prelude::Message;
use derive_more::Constructor;

/// Log in with the configured credentials.
///
/// Returns the user uuid of the account.
#[derive(Message)]
#[rtype(result = "Result<String, ServiceError>")]
pub struct Login;

/// Fetch the rooms, blinds and schedules of the account.
#[derive(Message)]
#[rtype(result = "Result<AccountData, ServiceError>")]
pub struct FetchLocation;

/// Response of [`FetchLocation`].
#[derive(Debug)]
pub struct AccountData {
    pub user_uuid: String,
    pub location: LocationData,
}

/// Send blind commands of one controller in a single cloud request.
#[derive(Constructor, Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct TransmitCommands {
    pub controller_id: String,
    pub commands: Vec<CommandTarget>,
}

#[derive(Constructor, Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct SetScheduleState {
    pub schedule_id: String,
    pub enabled: bool,
}
