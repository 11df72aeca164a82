// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Account hierarchy built from the cloud location payload.
//!
//! The tree is owned from parent to children: Account → Controller → Blind / Schedule / Room.
//! Back references are plain identifier strings.

use crate::cloud::command::{
    BlindCommand, MOTORS_WITH_FAVORITE_2, MOTORS_WITH_POSITION, friendly_command_name,
};
use crate::cloud::model::LocationData;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

const UNKNOWN_ROOM: &str = "Unknown Room";
const UNKNOWN_MOTOR: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Account {
    pub username: String,
    /// User uuid from the access token.
    pub user_uuid: String,
    pub controllers: Vec<Controller>,
}

impl Account {
    pub fn blinds(&self) -> impl Iterator<Item = &Blind> {
        self.controllers.iter().flat_map(|c| c.blinds.iter())
    }

    pub fn schedules(&self) -> impl Iterator<Item = &Schedule> {
        self.controllers.iter().flat_map(|c| c.schedules.iter())
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.controllers.iter().flat_map(|c| c.rooms.iter())
    }

    pub fn blind(&self, unique_id: &str) -> Option<&Blind> {
        self.blinds().find(|b| b.unique_id == unique_id)
    }

    pub fn schedule(&self, id: &str) -> Option<&Schedule> {
        self.schedules().find(|s| s.id == id)
    }

    pub fn room(&self, unique_id: &str) -> Option<&Room> {
        self.rooms().find(|r| r.unique_id == unique_id)
    }
}

/// Neo hub. Identified by the controller uuid of its rooms.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Controller {
    pub id: String,
    pub name: String,
    pub blinds: Vec<Blind>,
    pub schedules: Vec<Schedule>,
    pub rooms: Vec<Room>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Blind {
    /// `<controller id>_<blind code>`
    pub unique_id: String,
    pub name: String,
    pub room_id: String,
    pub room_name: String,
    /// `<room token>-<channel>`, channel zero padded to two digits.
    pub blind_code: String,
    pub controller_id: String,
    pub motor_code: String,
    pub has_percent: bool,
    pub is_tdbu: bool,
    /// Last position reported by the cloud: 0 = closed, 100 = open.
    pub position: Option<u8>,
}

impl Blind {
    pub fn supports_favorite_2(&self) -> bool {
        MOTORS_WITH_FAVORITE_2.contains(&self.motor_code.as_str())
    }

    /// Position feature as reported by the cloud.
    pub fn supports_position(&self) -> bool {
        self.has_percent
    }

    /// Position commands are only sent to motor types of the Neo command reference.
    pub fn accepts_position(&self) -> bool {
        self.has_percent && MOTORS_WITH_POSITION.contains(&self.motor_code.as_str())
    }

    /// Motor specific command to recall the (first) favorite position.
    pub fn favorite_1_command(&self) -> BlindCommand {
        if self.supports_favorite_2() {
            BlindCommand::Favorite1
        } else {
            BlindCommand::GenericFavorite
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Schedule {
    pub id: String,
    pub room_id: String,
    pub room_name: String,
    /// Command code, e.g. `up` or `i1`.
    pub command: String,
    pub time: String,
    pub enabled: bool,
    pub name: String,
    pub controller_id: String,
}

/// All blinds of a room, controlled as a group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Room {
    /// `room_<room id>_<controller id>`
    pub unique_id: String,
    pub id: String,
    pub name: String,
    pub controller_id: String,
    pub blind_unique_ids: Vec<String>,
    pub blind_codes: Vec<String>,
}

/// Build the account tree from a cloud location payload.
///
/// Rooms without controller or token are skipped, duplicate blinds are collapsed. Schedules whose
/// room cannot be resolved to a controller are dropped.
pub fn build_hierarchy(username: &str, user_uuid: &str, data: &LocationData) -> Account {
    let mut controllers: BTreeMap<String, Controller> = BTreeMap::new();
    let mut seen_blinds = HashSet::new();

    if data.rooms.is_empty() {
        warn!("No rooms found in cloud data");
    }

    for (room_id, room) in &data.rooms {
        let Some(controller_id) = room.controller.as_deref().filter(|c| !c.is_empty()) else {
            debug!("Skipping room {room_id} without controller");
            continue;
        };
        let room_name = room.name.as_deref().unwrap_or(UNKNOWN_ROOM);

        let controller = controllers
            .entry(controller_id.to_string())
            .or_insert_with(|| Controller {
                id: controller_id.to_string(),
                name: format!("Neo Controller ({room_name})"),
                blinds: Vec::new(),
                schedules: Vec::new(),
                rooms: Vec::new(),
            });

        let Some(room_token) = room.token.as_deref().filter(|t| !t.is_empty()) else {
            debug!("Skipping blinds of room {room_id} without token");
            continue;
        };

        let mut group = Room {
            unique_id: format!("room_{room_id}_{controller_id}"),
            id: room_id.clone(),
            name: room_name.to_string(),
            controller_id: controller_id.to_string(),
            blind_unique_ids: Vec::new(),
            blind_codes: Vec::new(),
        };

        for (channel, blind) in &room.blinds {
            let Some(blind) = blind.as_ref().filter(|b| !b.is_empty()) else {
                continue;
            };
            let blind_code = format!("{room_token}-{}", zero_pad_channel(channel));
            let unique_id = format!("{controller_id}_{blind_code}");
            group.blind_unique_ids.push(unique_id.clone());
            group.blind_codes.push(blind_code.clone());

            if !seen_blinds.insert(unique_id.clone()) {
                debug!("Ignoring duplicate blind {unique_id}");
                continue;
            }

            let motor_code = blind
                .motor_code
                .clone()
                .unwrap_or_else(|| UNKNOWN_MOTOR.to_string());
            if blind.has_percent && !MOTORS_WITH_POSITION.contains(&motor_code.as_str()) {
                debug!("Blind {unique_id} reports percent support for motor type {motor_code}");
            }

            controller.blinds.push(Blind {
                name: blind
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{room_name} {channel}")),
                room_id: room_id.clone(),
                room_name: room_name.to_string(),
                blind_code,
                controller_id: controller_id.to_string(),
                motor_code,
                has_percent: blind.has_percent,
                is_tdbu: blind.tdbu,
                position: blind.position.map(|p| p.min(100)),
                unique_id,
            });
        }

        if !group.blind_unique_ids.is_empty() {
            controller.rooms.push(group);
        }
    }

    for (schedule_id, schedule) in &data.schedules {
        let room = schedule
            .room
            .as_deref()
            .and_then(|id| data.rooms.get(id).map(|r| (id, r)));
        let controller = room
            .and_then(|(_, r)| r.controller.as_deref())
            .and_then(|id| controllers.get_mut(id));
        let (Some((room_id, room)), Some(controller)) = (room, controller) else {
            warn!("Dropping schedule {schedule_id}: room not found or without controller");
            continue;
        };

        let room_name = room.name.as_deref().unwrap_or(UNKNOWN_ROOM);
        let command = schedule.command.clone().unwrap_or_default();
        let time = schedule.time.clone().unwrap_or_default();
        controller.schedules.push(Schedule {
            id: schedule_id.clone(),
            room_id: room_id.to_string(),
            room_name: room_name.to_string(),
            name: schedule_display_name(Some(room_name), &command, &time),
            command,
            time,
            enabled: schedule.enabled,
            controller_id: controller.id.clone(),
        });
    }

    let mut controllers: Vec<Controller> = controllers.into_values().collect();
    for controller in &mut controllers {
        controller.blinds.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
    }

    Account {
        username: username.to_string(),
        user_uuid: user_uuid.to_string(),
        controllers,
    }
}

/// Display name of a schedule: `<room name> <command name> at <time>`.
pub fn schedule_display_name(room_name: Option<&str>, command: &str, time: &str) -> String {
    let time = if time.is_empty() {
        "Unknown Time".to_string()
    } else {
        display_time(time)
    };
    format!(
        "{} {} at {time}",
        room_name.unwrap_or(UNKNOWN_ROOM),
        friendly_command_name(command)
    )
}

/// Remove the leading zero of the hour in `HH:MM` times.
fn display_time(time: &str) -> String {
    let bytes = time.as_bytes();
    let is_hh_mm = bytes.len() == 5
        && bytes[2] == b':'
        && time
            .chars()
            .enumerate()
            .all(|(i, c)| i == 2 || c.is_ascii_digit());
    if is_hh_mm && bytes[0] == b'0' {
        time[1..].to_string()
    } else {
        time.to_string()
    }
}

fn zero_pad_channel(channel: &str) -> String {
    if channel.len() < 2 {
        format!("{channel:0>2}")
    } else {
        channel.to_string()
    }
}
