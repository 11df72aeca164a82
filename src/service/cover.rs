// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Cover entity specific command logic.

use crate::cloud::command::BlindCommand;
use crate::configuration::FavoriteMode;
use crate::errors::ServiceError;
use crate::hierarchy::Blind;
use crate::service::{
    EntityCommand, FavoriteService, cmd_from_str, favorite_command, get_required_params,
};
use strum::{Display, EnumString, VariantNames};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum CoverCommand {
    Open,
    Close,
    Stop,
    Position,
    OpenTilt,
    CloseTilt,
    MiddleUp,
    MiddleDown,
    LowerUp,
    LowerDown,
}

pub(crate) fn handle_cover(
    blind: &Blind,
    favorites: FavoriteMode,
    msg: &EntityCommand,
) -> Result<BlindCommand, ServiceError> {
    let cmd: CoverCommand = cmd_from_str(&msg.cmd_id)?;

    let command = match cmd {
        CoverCommand::Open => BlindCommand::Open,
        CoverCommand::Close => BlindCommand::Close,
        CoverCommand::Stop => BlindCommand::Stop,
        CoverCommand::Position => {
            if !blind.accepts_position() {
                return Err(ServiceError::UnsupportedCommand(format!(
                    "Percentage positioning is not supported by motor type {} of {}",
                    blind.motor_code, blind.name
                )));
            }
            let params = get_required_params(msg)?;
            match params.get("position").and_then(|v| v.as_u64()) {
                Some(pos @ 0..=100) => BlindCommand::Position(pos as u8),
                _ => {
                    return Err(ServiceError::BadRequest(
                        "Invalid or missing params.position attribute".into(),
                    ));
                }
            }
        }
        CoverCommand::OpenTilt | CoverCommand::CloseTilt if favorites != FavoriteMode::Tilt => {
            return Err(ServiceError::UnsupportedCommand(format!(
                "{cmd} is only available in tilt favorite mode"
            )));
        }
        CoverCommand::OpenTilt => favorite_command(blind, FavoriteService::Favorite1)?,
        CoverCommand::CloseTilt => favorite_command(blind, FavoriteService::Favorite2)?,
        CoverCommand::MiddleUp
        | CoverCommand::MiddleDown
        | CoverCommand::LowerUp
        | CoverCommand::LowerDown
            if !blind.is_tdbu =>
        {
            return Err(ServiceError::UnsupportedCommand(format!(
                "{cmd} requires a top-down / bottom-up blind"
            )));
        }
        CoverCommand::MiddleUp => BlindCommand::MiddleUp,
        CoverCommand::MiddleDown => BlindCommand::MiddleDown,
        CoverCommand::LowerUp => BlindCommand::LowerUp,
        CoverCommand::LowerDown => BlindCommand::LowerDown,
    };

    Ok(command)
}

/// Room group covers only support open, close and stop.
pub(crate) fn handle_room_cover(msg: &EntityCommand) -> Result<BlindCommand, ServiceError> {
    let cmd: CoverCommand = cmd_from_str(&msg.cmd_id)?;
    match cmd {
        CoverCommand::Open => Ok(BlindCommand::Open),
        CoverCommand::Close => Ok(BlindCommand::Close),
        CoverCommand::Stop => Ok(BlindCommand::Stop),
        cmd => Err(ServiceError::UnsupportedCommand(format!(
            "{cmd} is not supported by room covers"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_hierarchy;
    use crate::hierarchy::tests::sample_location;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn blind(motor: &str, has_percent: bool, tdbu: bool) -> Blind {
        let mut blind = build_hierarchy("A1", "u", &sample_location()).controllers[0].blinds[0].clone();
        blind.motor_code = motor.into();
        blind.has_percent = has_percent;
        blind.is_tdbu = tdbu;
        blind
    }

    fn cmd(cmd_id: &str, params: Option<Value>) -> EntityCommand {
        EntityCommand {
            entity_id: "cover.b1".into(),
            cmd_id: cmd_id.into(),
            params: params.and_then(|p| p.as_object().cloned()),
        }
    }

    #[rstest]
    #[case("open", BlindCommand::Open)]
    #[case("close", BlindCommand::Close)]
    #[case("stop", BlindCommand::Stop)]
    fn basic_commands(#[case] cmd_id: &str, #[case] expected: BlindCommand) {
        let result = handle_cover(&blind("rx", false, false), FavoriteMode::Buttons, &cmd(cmd_id, None));
        assert_eq!(Ok(expected), result);
    }

    #[test]
    fn position_command() {
        let result = handle_cover(
            &blind("no", true, false),
            FavoriteMode::Buttons,
            &cmd("position", Some(json!({ "position": 5 }))),
        );
        assert_eq!(Ok(BlindCommand::Position(5)), result);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(json!({ "position": 101 })))]
    #[case(Some(json!({ "position": "50" })))]
    fn invalid_position_params(#[case] params: Option<Value>) {
        let result = handle_cover(&blind("no", true, false), FavoriteMode::Buttons, &cmd("position", params));
        assert!(matches!(result, Err(ServiceError::BadRequest(_))), "{result:?}");
    }

    #[rstest]
    #[case("rx", true)]
    #[case("no", false)]
    fn position_on_unsupported_motor(#[case] motor: &str, #[case] has_percent: bool) {
        let result = handle_cover(
            &blind(motor, has_percent, false),
            FavoriteMode::Buttons,
            &cmd("position", Some(json!({ "position": 50 }))),
        );
        assert!(matches!(result, Err(ServiceError::UnsupportedCommand(_))));
    }

    #[rstest]
    #[case("rx", "open_tilt", Ok(BlindCommand::Favorite1))]
    #[case("rx", "close_tilt", Ok(BlindCommand::Favorite2))]
    #[case("bf", "open_tilt", Ok(BlindCommand::GenericFavorite))]
    fn tilt_favorites(
        #[case] motor: &str,
        #[case] cmd_id: &str,
        #[case] expected: Result<BlindCommand, ServiceError>,
    ) {
        let result = handle_cover(&blind(motor, false, false), FavoriteMode::Tilt, &cmd(cmd_id, None));
        assert_eq!(expected, result);
    }

    #[test]
    fn tilt_close_on_unsupported_motor() {
        let result = handle_cover(&blind("bf", false, false), FavoriteMode::Tilt, &cmd("close_tilt", None));
        assert!(matches!(result, Err(ServiceError::UnsupportedCommand(_))));
    }

    #[test]
    fn tilt_commands_require_tilt_mode() {
        let result = handle_cover(&blind("rx", false, false), FavoriteMode::Buttons, &cmd("open_tilt", None));
        assert!(matches!(result, Err(ServiceError::UnsupportedCommand(_))));
    }

    #[test]
    fn tdbu_commands() {
        let result = handle_cover(&blind("no", false, true), FavoriteMode::Buttons, &cmd("middle_up", None));
        assert_eq!(Ok(BlindCommand::MiddleUp), result);
        let result = handle_cover(&blind("no", false, false), FavoriteMode::Buttons, &cmd("lower_down", None));
        assert!(matches!(result, Err(ServiceError::UnsupportedCommand(_))));
    }

    #[test]
    fn unknown_command_is_bad_request() {
        let result = handle_cover(&blind("no", false, false), FavoriteMode::Buttons, &cmd("jump", None));
        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[test]
    fn room_cover_commands() {
        assert_eq!(Ok(BlindCommand::Stop), handle_room_cover(&cmd("stop", None)));
        let result = handle_room_cover(&cmd("position", Some(json!({ "position": 10 }))));
        assert!(matches!(result, Err(ServiceError::UnsupportedCommand(_))));
    }
}
