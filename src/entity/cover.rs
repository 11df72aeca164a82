// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Cover entity specific logic for blinds and room groups.

use crate::cloud::command::BlindCommand;
use crate::configuration::FavoriteMode;
use crate::entity::device::blind_device_id;
use crate::entity::{Entity, EntitySource, EntityType};
use crate::hierarchy::{Blind, Room};
use crate::registry::EntityRegistry;
use crate::util::slugify;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CoverFeature {
    Open,
    Close,
    Stop,
    Position,
    /// Legacy favorite mode: recall favorite 1.
    OpenTilt,
    /// Legacy favorite mode: recall favorite 2.
    CloseTilt,
    /// Top-down / bottom-up rail commands.
    Tdbu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum CoverState {
    Open,
    Closed,
    Unknown,
}

pub(crate) fn cover_features(blind: &Blind, favorites: FavoriteMode) -> Vec<CoverFeature> {
    let mut features = vec![CoverFeature::Open, CoverFeature::Close, CoverFeature::Stop];
    if blind.supports_position() {
        features.push(CoverFeature::Position);
    }
    if favorites == FavoriteMode::Tilt {
        features.push(CoverFeature::OpenTilt);
        if blind.supports_favorite_2() {
            features.push(CoverFeature::CloseTilt);
        }
    }
    if blind.is_tdbu {
        features.push(CoverFeature::Tdbu);
    }
    features
}

pub(crate) fn convert_blind(
    blind: &Blind,
    favorites: FavoriteMode,
    registry: &mut EntityRegistry,
) -> Entity {
    let entity_id = registry.get_or_allocate(
        EntityType::Cover.as_ref(),
        &blind.unique_id,
        &slugify(&blind.name),
    );

    let mut entity = Entity {
        entity_id,
        unique_id: blind.unique_id.clone(),
        entity_type: EntityType::Cover,
        name: blind.name.clone(),
        device_id: Some(blind_device_id(blind, favorites)),
        icon: None,
        features: cover_features(blind, favorites)
            .into_iter()
            .map(|f| f.to_string())
            .collect(),
        attributes: Map::with_capacity(8),
        available: true,
        source: EntitySource::Blind(blind.unique_id.clone()),
    };
    set_position(&mut entity.attributes, None);
    update_from_blind(&mut entity, blind);
    entity
}

/// Update the cover attributes from the cloud data of the blind.
///
/// The optimistic state of the last command is kept if the cloud doesn't report a position.
pub(crate) fn update_from_blind(entity: &mut Entity, blind: &Blind) {
    let attributes = &mut entity.attributes;
    if blind.position.is_some() {
        set_position(attributes, blind.position);
    }
    attributes.insert("room_name".into(), blind.room_name.clone().into());
    attributes.insert("blind_code".into(), blind.blind_code.clone().into());
    attributes.insert("controller_id".into(), blind.controller_id.clone().into());
    attributes.insert("motor_code".into(), blind.motor_code.clone().into());
    attributes.insert("is_tdbu".into(), blind.is_tdbu.into());
}

pub(crate) fn convert_room(room: &Room, registry: &mut EntityRegistry) -> Entity {
    let entity_id = registry.get_or_allocate(
        EntityType::Cover.as_ref(),
        &room.unique_id,
        &format!("room_{}", slugify(&room.name)),
    );

    let mut attributes = Map::with_capacity(4);
    set_position(&mut attributes, None);
    attributes.insert("room_name".into(), room.name.clone().into());
    attributes.insert("controller_id".into(), room.controller_id.clone().into());
    attributes.insert("blind_codes".into(), room.blind_codes.clone().into());

    Entity {
        entity_id,
        unique_id: room.unique_id.clone(),
        entity_type: EntityType::Cover,
        name: format!("Room: {}", room.name),
        device_id: Some(room.controller_id.clone()),
        icon: Some("mdi:blinds"),
        features: [CoverFeature::Open, CoverFeature::Close, CoverFeature::Stop]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        attributes,
        available: true,
        source: EntitySource::Room(room.unique_id.clone()),
    }
}

/// Optimistic cover state after a successfully sent command.
pub(crate) fn apply_command(entity: &mut Entity, command: BlindCommand) {
    let position = match command {
        BlindCommand::Open => Some(100),
        BlindCommand::Close => Some(0),
        BlindCommand::Position(pos) => Some(pos),
        BlindCommand::Stop
        | BlindCommand::Favorite1
        | BlindCommand::Favorite2
        | BlindCommand::GenericFavorite
        | BlindCommand::MiddleUp
        | BlindCommand::MiddleDown
        | BlindCommand::LowerUp
        | BlindCommand::LowerDown => None,
    };
    set_position(&mut entity.attributes, position);
}

fn set_position(attributes: &mut Map<String, Value>, position: Option<u8>) {
    let state = match position {
        Some(0) => CoverState::Closed,
        Some(_) => CoverState::Open,
        None => CoverState::Unknown,
    };
    attributes.insert("state".into(), state.to_string().into());
    match position {
        Some(pos) => attributes.insert("position".into(), pos.into()),
        None => attributes.remove("position"),
    };
}
