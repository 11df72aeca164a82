// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Favorite position buttons of a blind.

use crate::entity::{Entity, EntitySource, EntityType};
use crate::hierarchy::Blind;
use crate::registry::EntityRegistry;
use crate::util::slugify;
use serde_json::Map;

pub(crate) fn convert_favorites(blind: &Blind, registry: &mut EntityRegistry) -> Vec<Entity> {
    let mut buttons = vec![favorite_button(blind, 1, "mdi:star-outline", registry)];
    if blind.supports_favorite_2() {
        buttons.push(favorite_button(blind, 2, "mdi:star", registry));
    }
    buttons
}

fn favorite_button(
    blind: &Blind,
    favorite: u8,
    icon: &'static str,
    registry: &mut EntityRegistry,
) -> Entity {
    let unique_id = format!("{}_favorite_{favorite}", blind.unique_id);
    let entity_id = registry.get_or_allocate(
        EntityType::Button.as_ref(),
        &unique_id,
        &format!("{}_favorite_{favorite}", slugify(&blind.name)),
    );

    let mut attributes = Map::with_capacity(2);
    attributes.insert("state".into(), "AVAILABLE".into());
    attributes.insert("blind_code".into(), blind.blind_code.clone().into());

    Entity {
        entity_id,
        unique_id,
        entity_type: EntityType::Button,
        name: format!("{} Favorite {favorite}", blind.name),
        device_id: Some(blind.unique_id.clone()),
        icon: Some(icon),
        features: vec!["press".into()],
        attributes,
        available: true,
        source: EntitySource::Favorite {
            blind: blind.unique_id.clone(),
            favorite,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_hierarchy;
    use crate::hierarchy::tests::sample_location;

    #[test]
    fn favorite_buttons_of_rx_motor() {
        let blind = build_hierarchy("A1", "u", &sample_location()).controllers[0].blinds[0].clone();
        let buttons = convert_favorites(&blind, &mut Default::default());

        assert_eq!(2, buttons.len());
        assert_eq!("button.b1_favorite_1", buttons[0].entity_id);
        assert_eq!("C1_109.055-01_favorite_1", buttons[0].unique_id);
        assert_eq!("B1 Favorite 1", buttons[0].name);
        assert_eq!("button.b1_favorite_2", buttons[1].entity_id);
        assert_eq!(Some("mdi:star"), buttons[1].icon);
        assert_eq!(
            EntitySource::Favorite { blind: blind.unique_id.clone(), favorite: 2 },
            buttons[1].source
        );
    }
}
