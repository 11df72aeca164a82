// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

use crate::errors::ServiceError;
use crate::service::{EntityCommand, cmd_from_str};
use strum::{EnumString, VariantNames};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum ButtonCommand {
    Press,
}

pub(crate) fn handle_button(msg: &EntityCommand) -> Result<ButtonCommand, ServiceError> {
    cmd_from_str(&msg.cmd_id)
}
