// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message handlers.

mod command;
mod config_flow;
mod polling;
mod query;
mod setup;

use actix::Message;

/// Internal message to set up the configured account: initial cloud discovery.
#[derive(Message)]
#[rtype(result = "()")]
pub(super) struct SetupEntry;

/// Internal message of the polling timer.
#[derive(Message)]
#[rtype(result = "()")]
pub(super) struct Poll;
