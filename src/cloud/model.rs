// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Neo cloud API data structure definitions for JSON serialization & deserialization.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, DefaultOnNull, serde_as};
use std::collections::BTreeMap;

/// OAuth token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Claims of the access token used by the integration.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenClaims {
    /// User uuid
    pub usr: Option<String>,
    /// Controller strings: `<controller uuid>,<...>`
    #[serde(default)]
    pub ctrv2: Vec<String>,
}

/// Location payload of an account: all rooms with their blinds and the cloud schedules.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct LocationData {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub rooms: BTreeMap<String, RoomData>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub schedules: BTreeMap<String, ScheduleData>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RoomData {
    pub name: Option<String>,
    /// Controller uuid
    pub controller: Option<String>,
    /// Room token, first part of the blind code.
    pub token: Option<String>,
    /// Blinds by channel number. Unused channels are `null` or an empty object.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub blinds: BTreeMap<String, Option<BlindData>>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BlindData {
    pub name: Option<String>,
    #[serde(rename = "hasPercent", default)]
    pub has_percent: bool,
    #[serde(rename = "motorCode")]
    pub motor_code: Option<String>,
    #[serde(default)]
    pub tdbu: bool,
    /// Last reported position, only available for some motors.
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub position: Option<u8>,
}

impl BlindData {
    /// An empty blind object marks an unused channel.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.motor_code.is_none()
            && !self.has_percent
            && !self.tdbu
            && self.position.is_none()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ScheduleData {
    pub time: Option<String>,
    pub command: Option<String>,
    /// Room id
    pub room: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

/// Single blind command of a `multi-transmit` request.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct TransmitCommand {
    pub token: String,
    pub command: String,
    pub channel: String,
    pub motor: &'static str,
    pub hash: String,
}

/// Schedule update request.
#[derive(Debug, Serialize)]
pub(crate) struct ScheduleUpdate {
    pub enabled: bool,
}
