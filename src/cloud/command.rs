// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Blind motor commands of the Neo cloud `multi-transmit` API.

use derive_more::Display;
use log::error;
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Motor codes with a native favorite 1 (`i1`) and a second favorite (`i2`) position.
pub const MOTORS_WITH_FAVORITE_2: [&str; 2] = ["no", "rx"];

/// Motor codes accepting a percentage position command.
pub const MOTORS_WITH_POSITION: [&str; 8] = ["no", "db", "ra", "rb", "ap", "bl", "mb", "jo"];

/// A single blind motor command.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum BlindCommand {
    #[display("open")]
    Open,
    #[display("close")]
    Close,
    #[display("stop")]
    Stop,
    /// Move to a position in percent: 0 = closed, 100 = open.
    #[display("position {_0}")]
    Position(u8),
    #[display("favorite 1")]
    Favorite1,
    #[display("favorite 2")]
    Favorite2,
    /// Single favorite position of motors without `i1` / `i2` support.
    #[display("favorite")]
    GenericFavorite,
    #[display("middle up")]
    MiddleUp,
    #[display("middle down")]
    MiddleDown,
    #[display("lower up")]
    LowerUp,
    #[display("lower down")]
    LowerDown,
}

impl BlindCommand {
    /// Command code sent in the `command` field.
    pub fn code(&self) -> String {
        match self {
            BlindCommand::Open => "up".into(),
            BlindCommand::Close => "dn".into(),
            BlindCommand::Stop => "sp".into(),
            BlindCommand::Position(pos) => format!("{pos:02}"),
            BlindCommand::Favorite1 => "i1".into(),
            BlindCommand::Favorite2 => "i2".into(),
            BlindCommand::GenericFavorite => "gp".into(),
            BlindCommand::MiddleUp => "u4".into(),
            BlindCommand::MiddleDown => "d4".into(),
            BlindCommand::LowerUp => "u2".into(),
            BlindCommand::LowerDown => "d2".into(),
        }
    }

    /// TDBU (top-down / bottom-up) specific command.
    pub fn is_tdbu(&self) -> bool {
        matches!(
            self,
            BlindCommand::MiddleUp
                | BlindCommand::MiddleDown
                | BlindCommand::LowerUp
                | BlindCommand::LowerDown
        )
    }
}

/// Translate a command code, e.g. from a cloud schedule, into a display name.
pub fn friendly_command_name(code: &str) -> String {
    let name = match code {
        "up" => "Open",
        "dn" | "cl" => "Close",
        "sp" => "Stop",
        "i1" => "Favorite 1",
        "i2" => "Favorite 2",
        "gp" => "Favorite (GP)",
        "u4" => "Middle Up",
        "d4" => "Middle Down",
        "u2" => "Lower Up",
        "d2" => "Lower Down",
        _ if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) => {
            return format!("Position {code}%");
        }
        _ => return code.to_uppercase(),
    };
    name.into()
}

/// Generate the 7-digit request hash required by the API: the last 7 digits of the current time
/// in milliseconds.
pub(crate) fn generate_hash() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{:07}", millis % 10_000_000)
}

/// Return a copy of a `multi-transmit` payload with the controller strings, blind tokens and
/// hashes redacted.
pub(crate) fn sanitize_payload(payload: &Value) -> Value {
    let Some(payload) = payload.as_object() else {
        error!("Failed to sanitize payload: not a json object");
        return serde_json::json!({ "error": "Payload sanitization failed" });
    };

    let mut safe_payload = Map::with_capacity(payload.len());
    for (controller, commands) in payload {
        let prefix: String = controller.chars().take(4).collect();
        let mut commands = commands.clone();
        if let Some(commands) = commands.as_array_mut() {
            for command in commands.iter_mut().filter_map(|c| c.as_object_mut()) {
                if command.contains_key("token") {
                    command.insert("token".into(), "[REDACTED_TOKEN]".into());
                }
                if command.contains_key("hash") {
                    command.insert("hash".into(), "[REDACTED_HASH]".into());
                }
            }
        }
        safe_payload.insert(format!("[REDACTED_CONTROLLER_ID:{prefix}...]"), commands);
    }

    Value::Object(safe_payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(BlindCommand::Open, "up")]
    #[case(BlindCommand::Close, "dn")]
    #[case(BlindCommand::Stop, "sp")]
    #[case(BlindCommand::Favorite1, "i1")]
    #[case(BlindCommand::Favorite2, "i2")]
    #[case(BlindCommand::GenericFavorite, "gp")]
    #[case(BlindCommand::Position(5), "05")]
    #[case(BlindCommand::Position(80), "80")]
    #[case(BlindCommand::Position(100), "100")]
    #[case(BlindCommand::MiddleUp, "u4")]
    #[case(BlindCommand::LowerDown, "d2")]
    fn command_codes(#[case] cmd: BlindCommand, #[case] expected: &str) {
        assert_eq!(expected, cmd.code());
    }

    #[rstest]
    #[case("i1", "Favorite 1")]
    #[case("cl", "Close")]
    #[case("gp", "Favorite (GP)")]
    #[case("u2", "Lower Up")]
    #[case("50", "Position 50%")]
    #[case("xy", "XY")]
    fn friendly_names(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(expected, friendly_command_name(code));
    }

    #[test]
    fn hash_has_seven_digits() {
        let hash = generate_hash();
        assert_eq!(7, hash.len());
        assert!(hash.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn sanitize_payload_redacts_secrets() {
        let payload = json!({
            "vkoYKvLYU7qx,secret-part": [
                { "token": "109.055", "command": "up", "channel": "03", "motor": "no", "hash": "1234567" }
            ]
        });

        let safe = sanitize_payload(&payload);
        let text = safe.to_string();
        assert!(!text.contains("secret-part"));
        assert!(!text.contains("109.055"));
        assert!(!text.contains("1234567"));

        let commands = &safe["[REDACTED_CONTROLLER_ID:vkoY...]"];
        assert_eq!(json!("up"), commands[0]["command"]);
        assert_eq!(json!("03"), commands[0]["channel"]);
        // input payload is untouched
        assert_eq!(json!("109.055"), payload["vkoYKvLYU7qx,secret-part"][0]["token"]);
    }
}
