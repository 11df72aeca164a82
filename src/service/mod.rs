// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Entity command and custom service handling.
//! Translates host entity commands into Neo cloud requests.
//!
//! Unsupported commands are rejected here, before any cloud request is made.

use crate::cloud::CommandTarget;
use crate::cloud::command::BlindCommand;
use crate::configuration::FavoriteMode;
use crate::entity::{Entity, EntitySource};
use crate::errors::ServiceError;
use crate::hierarchy::{Account, Blind, Room};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString, VariantNames};

mod button;
mod cover;
mod switch;

pub use cover::CoverCommand;
pub use switch::SwitchCommand;

/// Custom service domain.
pub const DOMAIN: &str = "neosmartblinds";

/// Entity command request of the host.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EntityCommand {
    #[serde(default)]
    pub entity_id: String,
    pub cmd_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

/// Custom services of the integration, each targeting a blind cover entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum FavoriteService {
    #[strum(serialize = "favorite_1")]
    Favorite1,
    #[strum(serialize = "favorite_2")]
    Favorite2,
}

/// Cloud request resulting from an entity command or service call.
#[derive(Clone, Debug, PartialEq)]
pub enum CloudAction {
    Transmit {
        controller_id: String,
        targets: Vec<CommandTarget>,
        /// Sent command for the optimistic entity state.
        command: BlindCommand,
    },
    SetSchedule {
        schedule_id: String,
        enabled: bool,
    },
}

impl CloudAction {
    fn for_blind(blind: &Blind, command: BlindCommand) -> Self {
        CloudAction::Transmit {
            controller_id: blind.controller_id.clone(),
            targets: vec![CommandTarget::new(blind.blind_code.clone(), command)],
            command,
        }
    }

    fn for_room(room: &Room, command: BlindCommand) -> Self {
        CloudAction::Transmit {
            controller_id: room.controller_id.clone(),
            targets: room
                .blind_codes
                .iter()
                .map(|code| CommandTarget::new(code.clone(), command))
                .collect(),
            command,
        }
    }
}

/// Translate an entity command into a cloud request.
///
/// The entity's source must be present in the current account snapshot.
pub fn handle_entity_command(
    entity: &Entity,
    account: &Account,
    favorites: FavoriteMode,
    cmd: &EntityCommand,
) -> Result<CloudAction, ServiceError> {
    match &entity.source {
        EntitySource::Blind(uid) => {
            let blind = find_blind(account, uid)?;
            let command = cover::handle_cover(blind, favorites, cmd)?;
            Ok(CloudAction::for_blind(blind, command))
        }
        EntitySource::Favorite { blind, favorite } => {
            button::handle_button(cmd)?;
            let blind = find_blind(account, blind)?;
            let service = match favorite {
                1 => FavoriteService::Favorite1,
                _ => FavoriteService::Favorite2,
            };
            Ok(CloudAction::for_blind(blind, favorite_command(blind, service)?))
        }
        EntitySource::Schedule(id) => {
            let schedule = account
                .schedule(id)
                .ok_or_else(|| unavailable(&entity.entity_id))?;
            let enabled = switch::handle_switch(entity, cmd)?;
            Ok(CloudAction::SetSchedule {
                schedule_id: schedule.id.clone(),
                enabled,
            })
        }
        EntitySource::Room(uid) => {
            let room = account
                .room(uid)
                .ok_or_else(|| unavailable(&entity.entity_id))?;
            let command = cover::handle_room_cover(cmd)?;
            Ok(CloudAction::for_room(room, command))
        }
    }
}

/// Translate a `neosmartblinds.favorite_N` service call on a blind cover into a cloud request.
pub fn handle_favorite_service(
    entity: &Entity,
    account: &Account,
    service: FavoriteService,
) -> Result<CloudAction, ServiceError> {
    let EntitySource::Blind(uid) = &entity.source else {
        return Err(ServiceError::BadRequest(format!(
            "{DOMAIN}.{service} requires a blind cover entity, got {}",
            entity.entity_id
        )));
    };
    let blind = find_blind(account, uid)?;
    Ok(CloudAction::for_blind(blind, favorite_command(blind, service)?))
}

pub(crate) fn favorite_command(
    blind: &Blind,
    service: FavoriteService,
) -> Result<BlindCommand, ServiceError> {
    match service {
        FavoriteService::Favorite1 => Ok(blind.favorite_1_command()),
        FavoriteService::Favorite2 if blind.supports_favorite_2() => Ok(BlindCommand::Favorite2),
        FavoriteService::Favorite2 => Err(ServiceError::UnsupportedCommand(format!(
            "Favorite 2 is not supported by motor type {} of {}",
            blind.motor_code, blind.name
        ))),
    }
}

pub fn cmd_from_str<T: std::str::FromStr + VariantNames>(cmd: &str) -> Result<T, ServiceError> {
    T::from_str(cmd).map_err(|_| {
        ServiceError::BadRequest(format!(
            "Invalid cmd_id: {cmd}. Valid commands: {}",
            T::VARIANTS.to_vec().join(",")
        ))
    })
}

/// Get a serde_json::Map reference of the params attribute of the provided EntityCommand.
///
/// A BadRequest error is returned if `params` is not set.
fn get_required_params(cmd: &EntityCommand) -> Result<&Map<String, Value>, ServiceError> {
    if let Some(params) = cmd.params.as_ref() {
        Ok(params)
    } else {
        Err(ServiceError::BadRequest("Missing params object".into()))
    }
}

fn find_blind<'a>(account: &'a Account, unique_id: &str) -> Result<&'a Blind, ServiceError> {
    account.blind(unique_id).ok_or_else(|| unavailable(unique_id))
}

fn unavailable(id: &str) -> ServiceError {
    ServiceError::ServiceUnavailable(format!("{id} is currently not available"))
}
