// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Device entries: account → controller → blind.

use crate::configuration::FavoriteMode;
use crate::errors::ServiceError;
use crate::hierarchy::{Account, Blind, Controller};
use crate::registry::{DeviceEntry, DeviceEntryBuilder, DeviceEntryType, DeviceRegistry};

pub fn account_device(account: &Account) -> Result<DeviceEntry, ServiceError> {
    DeviceEntryBuilder::default()
        .identifier(account.username.as_str())
        .name(format!("Neo Blinds ({})", account.username))
        .model("Cloud Account")
        .entry_type(DeviceEntryType::Service)
        .try_build()
}

pub fn controller_device(account: &Account, controller: &Controller) -> Result<DeviceEntry, ServiceError> {
    DeviceEntryBuilder::default()
        .identifier(controller.id.as_str())
        .name(controller.name.as_str())
        .model("Cloud Controller")
        .via_device(account.username.clone())
        .try_build()
}

pub fn blind_device(blind: &Blind) -> Result<DeviceEntry, ServiceError> {
    DeviceEntryBuilder::default()
        .identifier(blind.unique_id.as_str())
        .name(blind.name.as_str())
        .model(format!("Blind (Motor: {})", blind.motor_code.to_uppercase()))
        .via_device(blind.controller_id.clone())
        .try_build()
}

/// Register all devices of the account. Blinds are only separate devices with favorite buttons.
pub fn register_devices(
    account: &Account,
    favorites: FavoriteMode,
    registry: &mut DeviceRegistry,
) -> Result<(), ServiceError> {
    registry.get_or_create(account_device(account)?);
    for controller in &account.controllers {
        registry.get_or_create(controller_device(account, controller)?);
        if favorites == FavoriteMode::Buttons {
            for blind in &controller.blinds {
                registry.get_or_create(blind_device(blind)?);
            }
        }
    }
    Ok(())
}

/// Device of a blind's cover entity.
pub(crate) fn blind_device_id(blind: &Blind, favorites: FavoriteMode) -> String {
    match favorites {
        FavoriteMode::Buttons => blind.unique_id.clone(),
        FavoriteMode::Tilt => blind.controller_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_hierarchy;
    use crate::hierarchy::tests::sample_location;

    #[test]
    fn device_tree_with_buttons() {
        let account = build_hierarchy("user@example.com", "user-1", &sample_location());
        let mut registry = DeviceRegistry::default();

        register_devices(&account, FavoriteMode::Buttons, &mut registry).unwrap();

        let devices = registry.devices();
        assert_eq!(3, devices.len());
        assert_eq!("Neo Blinds (user@example.com)", devices[0].name);
        assert_eq!(Some(DeviceEntryType::Service), devices[0].entry_type);
        assert_eq!("Neo Controller (Master)", devices[1].name);
        assert_eq!(Some("user@example.com"), devices[1].via_device.as_deref());
        assert_eq!("C1_109.055-01", devices[2].identifier);
        assert_eq!("Blind (Motor: RX)", devices[2].model);
        assert_eq!(Some("C1"), devices[2].via_device.as_deref());
    }

    #[test]
    fn tilt_mode_has_no_blind_devices() {
        let account = build_hierarchy("user@example.com", "user-1", &sample_location());
        let mut registry = DeviceRegistry::default();

        register_devices(&account, FavoriteMode::Tilt, &mut registry).unwrap();

        assert_eq!(2, registry.devices().len());
        let blind = &account.controllers[0].blinds[0];
        assert_eq!("C1", blind_device_id(blind, FavoriteMode::Tilt));
        assert_eq!("C1_109.055-01", blind_device_id(blind, FavoriteMode::Buttons));
    }
}
