// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Switch entity specific command logic.

use crate::entity::Entity;
use crate::entity::switch::is_on;
use crate::errors::ServiceError;
use crate::service::{EntityCommand, cmd_from_str};
use strum::{Display, EnumString, VariantNames};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum SwitchCommand {
    On,
    Off,
    Toggle,
}

/// Returns the requested schedule state.
pub(crate) fn handle_switch(entity: &Entity, msg: &EntityCommand) -> Result<bool, ServiceError> {
    let cmd: SwitchCommand = cmd_from_str(&msg.cmd_id)?;

    let enabled = match cmd {
        SwitchCommand::On => true,
        SwitchCommand::Off => false,
        SwitchCommand::Toggle => !is_on(entity),
    };

    Ok(enabled)
}
