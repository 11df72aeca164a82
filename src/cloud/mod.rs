// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Neo Smart Blinds cloud client implemented as an Actix actor.
//!
//! The actor owns the authenticated [`session::Session`]. Requests are executed as concurrent
//! futures sharing the session: two requests rejected with HTTP 401 at the same time both refresh
//! the token, the last stored session wins.

use crate::cloud::api::CloudApi;
use crate::configuration::CloudSettings;
use actix::{Actor, Context};
use log::debug;

mod api;
pub mod command;
mod handler;
pub mod messages;
pub mod model;
mod session;

pub use api::CommandTarget;

#[cfg(test)]
pub(crate) use session::tests::test_jwt;

pub struct CloudClient {
    api: CloudApi,
}

impl CloudClient {
    pub fn new(settings: &CloudSettings) -> Self {
        Self {
            api: CloudApi::new(settings),
        }
    }
}

impl Actor for CloudClient {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        debug!("[{}] Cloud client started", self.api.id());
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        debug!("[{}] Cloud client stopped", self.api.id());
    }
}
