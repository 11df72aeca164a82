// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Schedule switch entity.

use crate::entity::{Entity, EntitySource, EntityType};
use crate::hierarchy::Schedule;
use crate::registry::EntityRegistry;
use crate::util::slugify;
use serde_json::{Map, Value};

pub(crate) fn convert_schedule(schedule: &Schedule, registry: &mut EntityRegistry) -> Entity {
    let entity_id = registry.get_or_allocate(
        EntityType::Switch.as_ref(),
        &schedule.id,
        &slugify(&schedule.id),
    );

    let mut entity = Entity {
        entity_id,
        unique_id: schedule.id.clone(),
        entity_type: EntityType::Switch,
        name: schedule.name.clone(),
        device_id: Some(schedule.controller_id.clone()),
        icon: Some("mdi:calendar-clock"),
        features: vec!["on_off".into(), "toggle".into()],
        attributes: Map::with_capacity(3),
        available: true,
        source: EntitySource::Schedule(schedule.id.clone()),
    };
    update_from_schedule(&mut entity, schedule);
    entity
}

pub(crate) fn update_from_schedule(entity: &mut Entity, schedule: &Schedule) {
    set_enabled(&mut entity.attributes, schedule.enabled);
    entity
        .attributes
        .insert("schedule_id".into(), schedule.id.clone().into());
    entity
        .attributes
        .insert("room_name".into(), schedule.room_name.clone().into());
}

pub(crate) fn is_on(entity: &Entity) -> bool {
    entity.state() == Some("ON")
}

/// State after a successful schedule update.
pub(crate) fn set_enabled(attributes: &mut Map<String, Value>, enabled: bool) {
    attributes.insert("state".into(), if enabled { "ON" } else { "OFF" }.into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_hierarchy;
    use crate::hierarchy::tests::sample_location;

    #[test]
    fn schedule_switch_entity() {
        let account = build_hierarchy("A1", "u", &sample_location());
        let schedule = &account.controllers[0].schedules[0];
        let mut entity = convert_schedule(schedule, &mut Default::default());

        assert_eq!("switch.s1", entity.entity_id);
        assert_eq!("Master Favorite 1 at 7:00", entity.name);
        assert_eq!(Some("C1"), entity.device_id.as_deref());
        assert_eq!(Some(&Value::from("S1")), entity.attributes.get("schedule_id"));
        assert_eq!(Some(&Value::from("Master")), entity.attributes.get("room_name"));
        assert!(is_on(&entity));

        set_enabled(&mut entity.attributes, false);
        assert!(!is_on(&entity));
        assert_eq!(Some("OFF"), entity.state());
    }
}
