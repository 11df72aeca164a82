// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Host entities of the account hierarchy.
//!
//! Entities are created once after the initial cloud discovery and updated in place with every
//! poll. Entities whose source disappears are marked unavailable, never removed.

use crate::configuration::FavoriteMode;
use crate::hierarchy::Account;
use crate::registry::EntityRegistry;
use actix::Message;
use log::{debug, info};
use serde::Serialize;
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString, VariantNames};

pub mod button;
pub mod cover;
pub mod device;
pub mod switch;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, VariantNames, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
    Button,
    Cover,
    Switch,
}

/// Hierarchy object an entity represents.
#[derive(Clone, Debug, PartialEq)]
pub enum EntitySource {
    Blind(String),
    Favorite { blind: String, favorite: u8 },
    Schedule(String),
    Room(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entity {
    pub entity_id: String,
    pub unique_id: String,
    pub entity_type: EntityType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    pub features: Vec<String>,
    /// Entity state and extra state attributes.
    pub attributes: Map<String, Value>,
    pub available: bool,
    #[serde(skip)]
    pub source: EntitySource,
}

impl Entity {
    pub fn state(&self) -> Option<&str> {
        self.attributes.get("state").and_then(|v| v.as_str())
    }

    pub fn has_feature(&self, feature: impl AsRef<str>) -> bool {
        let feature = feature.as_ref();
        self.features.iter().any(|f| f == feature)
    }

    pub fn to_change(&self) -> EntityChange {
        EntityChange {
            entity_type: self.entity_type,
            entity_id: self.entity_id.clone(),
            attributes: self.attributes.clone(),
            available: self.available,
        }
    }
}

/// Entity state change event pushed to subscribed host sessions.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityChange {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub attributes: Map<String, Value>,
    pub available: bool,
}

/// Entity state changes of one update, delivered as a single message.
///
/// The recipient mailbox is bounded: one message per entity would drop states of larger accounts.
#[derive(Clone, Debug, PartialEq, Message)]
#[rtype(result = "()")]
pub struct EntityChanges(pub Vec<EntityChange>);

/// Create all entities of an account.
///
/// Entity ids are allocated in hierarchy order: covers, favorite buttons, room covers, switches.
pub fn create_entities(
    account: &Account,
    favorites: FavoriteMode,
    registry: &mut EntityRegistry,
) -> Vec<Entity> {
    let mut entities = Vec::new();

    for blind in account.blinds() {
        entities.push(cover::convert_blind(blind, favorites, registry));
        if favorites == FavoriteMode::Buttons {
            entities.extend(button::convert_favorites(blind, registry));
        }
    }
    for room in account.rooms() {
        entities.push(cover::convert_room(room, registry));
    }
    for schedule in account.schedules() {
        entities.push(switch::convert_schedule(schedule, registry));
    }

    info!(
        "Created {} entities for {} controller(s)",
        entities.len(),
        account.controllers.len()
    );
    entities
}

/// Update entity states from a new account snapshot.
///
/// Returns the changes of all modified entities. Sources missing in the snapshot mark their
/// entities unavailable. New hierarchy objects are ignored until the next setup.
pub fn refresh_entities(entities: &mut [Entity], account: &Account) -> Vec<EntityChange> {
    let mut changes = Vec::new();

    for entity in entities.iter_mut() {
        let (was_available, attributes) = (entity.available, entity.attributes.clone());
        let source = entity.source.clone();
        let found = match &source {
            EntitySource::Blind(uid) => account
                .blind(uid)
                .map(|blind| cover::update_from_blind(entity, blind))
                .is_some(),
            EntitySource::Favorite { blind, .. } => account.blind(blind).is_some(),
            EntitySource::Schedule(id) => account
                .schedule(id)
                .map(|schedule| switch::update_from_schedule(entity, schedule))
                .is_some(),
            EntitySource::Room(uid) => account.room(uid).is_some(),
        };

        if !found && entity.available {
            debug!("Source of {} disappeared, marking unavailable", entity.entity_id);
        }
        entity.available = found;

        if entity.available != was_available || entity.attributes != attributes {
            changes.push(entity.to_change());
        }
    }

    log_new_sources(entities, account);
    changes
}

/// Mark all entities unavailable, e.g. after a failed cloud fetch.
pub fn mark_unavailable(entities: &mut [Entity]) -> Vec<EntityChange> {
    entities
        .iter_mut()
        .filter(|e| e.available)
        .map(|e| {
            e.available = false;
            e.to_change()
        })
        .collect()
}

fn log_new_sources(entities: &[Entity], account: &Account) {
    let known = |source: EntitySource| entities.iter().any(|e| e.source == source);
    for blind in account.blinds() {
        if !known(EntitySource::Blind(blind.unique_id.clone())) {
            info!(
                "New blind {} ({}) found, reload the integration to add it",
                blind.name, blind.unique_id
            );
        }
    }
    for schedule in account.schedules() {
        if !known(EntitySource::Schedule(schedule.id.clone())) {
            info!(
                "New schedule {} found, reload the integration to add it",
                schedule.name
            );
        }
    }
}
