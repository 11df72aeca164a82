// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Actix message definitions of the coordinator.

use crate::entity::{Entity, EntityChanges};
use crate::errors::ServiceError;
use crate::registry::DeviceEntry;
use crate::service::{EntityCommand, FavoriteService};
use actix::prelude::{Message, Recipient};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Start a new config flow.
#[derive(Message)]
#[rtype(result = "Result<ConfigFlowResult, ServiceError>")]
pub struct StartConfigFlow;

/// User input of the `user` config flow step.
#[derive(Clone, Debug, Deserialize)]
pub struct ConfigFlowInput {
    pub username: String,
    pub password: String,
}

#[derive(Constructor, Message)]
#[rtype(result = "Result<ConfigFlowResult, ServiceError>")]
pub struct SubmitConfigFlow {
    pub flow_id: String,
    pub input: ConfigFlowInput,
}

/// Remove the configured account with all its entities and devices.
#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct RemoveConfigEntry;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: &'static str,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigFlowResult {
    Form {
        flow_id: String,
        step_id: &'static str,
        data_schema: Vec<FlowField>,
        /// Field name (or `base`) to error key.
        errors: HashMap<String, String>,
    },
    CreateEntry {
        flow_id: String,
        title: String,
        unique_id: String,
    },
    Abort {
        flow_id: String,
        reason: String,
    },
}

impl ConfigFlowResult {
    pub fn user_form(flow_id: impl Into<String>, error: Option<&str>) -> Self {
        let mut errors = HashMap::new();
        if let Some(error) = error {
            errors.insert("base".to_string(), error.to_string());
        }
        ConfigFlowResult::Form {
            flow_id: flow_id.into(),
            step_id: "user",
            data_schema: vec![
                FlowField {
                    name: "username",
                    field_type: "string",
                    required: true,
                },
                FlowField {
                    name: "password",
                    field_type: "password",
                    required: true,
                },
            ],
            errors,
        }
    }
}

#[derive(Message)]
#[rtype(result = "Vec<DeviceEntry>")]
pub struct GetDevices;

#[derive(Message)]
#[rtype(result = "Vec<Entity>")]
pub struct GetEntities;

#[derive(Constructor, Message)]
#[rtype(result = "Result<Entity, ServiceError>")]
pub struct GetEntity {
    pub entity_id: String,
}

#[derive(Message)]
#[rtype(result = "CoordinatorState")]
pub struct GetState;

#[derive(Clone, Debug, Serialize)]
pub struct CoordinatorState {
    pub operation_mode: String,
    pub polling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub entities: usize,
}

/// Execute an entity command.
#[derive(Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct EntityCommandMsg(pub EntityCommand);

/// Call a custom `neosmartblinds` service.
#[derive(Constructor, Message)]
#[rtype(result = "Result<(), ServiceError>")]
pub struct CallServiceMsg {
    pub service: FavoriteService,
    pub entity_id: String,
}

/// Subscribe a host session to entity change events.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SubscribeEntityEvents {
    pub session_id: String,
    pub recipient: Recipient<EntityChanges>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UnsubscribeEntityEvents {
    pub session_id: String,
}
