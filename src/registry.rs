// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Device and entity registries of the integration.
//!
//! Devices are identified by the account username, the controller id or the blind unique id.
//! Entity ids are allocated once per unique id and never change while the integration is loaded.

use crate::errors::ServiceError;
use derive_builder::Builder;
use log::debug;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use strum::{Display, EnumString};

pub const MANUFACTURER: &str = "Neo Smart Blinds";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceEntryType {
    /// Cloud service without physical device.
    Service,
}

#[derive(Builder, Clone, Debug, PartialEq, Serialize)]
#[builder(setter(into))]
pub struct DeviceEntry {
    pub identifier: String,
    pub name: String,
    #[builder(default = MANUFACTURER.to_string())]
    pub manufacturer: String,
    pub model: String,
    /// Identifier of the parent device.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<DeviceEntryType>,
}

impl DeviceEntryBuilder {
    pub fn try_build(&self) -> Result<DeviceEntry, ServiceError> {
        self.build().map_err(|e| {
            ServiceError::InternalServerError(format!("Error building device entry: {e}"))
        })
    }
}

/// Registered devices in registration order.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceEntry>,
}

impl DeviceRegistry {
    /// Register a device if its identifier is not yet known.
    ///
    /// Returns the registered entry, which is the existing one for a known identifier.
    pub fn get_or_create(&mut self, device: DeviceEntry) -> &DeviceEntry {
        let index = match self
            .devices
            .iter()
            .position(|d| d.identifier == device.identifier)
        {
            Some(index) => index,
            None => {
                debug!("Registering device {}: {}", device.identifier, device.name);
                self.devices.push(device);
                self.devices.len() - 1
            }
        };
        &self.devices[index]
    }

    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

/// Entity id allocation by unique id.
#[derive(Default)]
pub struct EntityRegistry {
    by_unique_id: HashMap<String, String>,
    entity_ids: HashSet<String>,
}

impl EntityRegistry {
    /// Get the entity id of a unique id, allocating `<domain>.<object_id>` for a new unique id.
    ///
    /// An already used entity id gets a numeric suffix starting with `_2`.
    pub fn get_or_allocate(&mut self, domain: &str, unique_id: &str, object_id: &str) -> String {
        if let Some(entity_id) = self.by_unique_id.get(unique_id) {
            return entity_id.clone();
        }

        let base = format!("{domain}.{object_id}");
        let mut entity_id = base.clone();
        let mut suffix = 2;
        while self.entity_ids.contains(&entity_id) {
            entity_id = format!("{base}_{suffix}");
            suffix += 1;
        }

        self.entity_ids.insert(entity_id.clone());
        self.by_unique_id
            .insert(unique_id.to_string(), entity_id.clone());
        entity_id
    }

    pub fn clear(&mut self) {
        self.by_unique_id.clear();
        self.entity_ids.clear();
    }
}
