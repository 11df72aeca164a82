// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Host API: JSON REST endpoints and the entity event WebSocket.

use crate::coordinator::{
    CallServiceMsg, ConfigFlowInput, Coordinator, EntityCommandMsg, GetDevices, GetEntities,
    GetEntity, GetState, RemoveConfigEntry, StartConfigFlow, SubmitConfigFlow,
};
use crate::errors::ServiceError;
use crate::service::{DOMAIN, EntityCommand, FavoriteService};
use actix::Addr;
use actix_web::{HttpResponse, delete, get, post, web};
use log::debug;
use std::str::FromStr;
use web_model::{ApiResponse, ServiceCall};

mod events;
pub mod web_model;

pub use events::ws_events;
pub use web_model::json_error_handler;

/// Register all host API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(start_config_flow)
        .service(submit_config_flow)
        .service(remove_config_entry)
        .service(get_devices)
        .service(get_entities)
        .service(get_entity)
        .service(entity_command)
        .service(call_service)
        .service(get_state)
        .service(ws_events);
}

#[get("/api/config_flow")]
async fn start_config_flow(
    coordinator: web::Data<Addr<Coordinator>>,
) -> Result<HttpResponse, ServiceError> {
    let result = coordinator.send(StartConfigFlow).await??;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/api/config_flow/{flow_id}")]
async fn submit_config_flow(
    coordinator: web::Data<Addr<Coordinator>>,
    flow_id: web::Path<String>,
    input: web::Json<ConfigFlowInput>,
) -> Result<HttpResponse, ServiceError> {
    let result = coordinator
        .send(SubmitConfigFlow::new(flow_id.into_inner(), input.into_inner()))
        .await??;
    Ok(HttpResponse::Ok().json(result))
}

#[delete("/api/config_entry")]
async fn remove_config_entry(
    coordinator: web::Data<Addr<Coordinator>>,
) -> Result<HttpResponse, ServiceError> {
    coordinator.send(RemoveConfigEntry).await??;
    Ok(HttpResponse::Ok().json(ApiResponse::new("OK", "Integration removed")))
}

#[get("/api/devices")]
async fn get_devices(
    coordinator: web::Data<Addr<Coordinator>>,
) -> Result<HttpResponse, ServiceError> {
    let devices = coordinator.send(GetDevices).await?;
    Ok(HttpResponse::Ok().json(devices))
}

#[get("/api/entities")]
async fn get_entities(
    coordinator: web::Data<Addr<Coordinator>>,
) -> Result<HttpResponse, ServiceError> {
    let entities = coordinator.send(GetEntities).await?;
    Ok(HttpResponse::Ok().json(entities))
}

#[get("/api/entities/{entity_id}")]
async fn get_entity(
    coordinator: web::Data<Addr<Coordinator>>,
    entity_id: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let entity = coordinator
        .send(GetEntity::new(entity_id.into_inner()))
        .await??;
    Ok(HttpResponse::Ok().json(entity))
}

#[post("/api/entities/{entity_id}/command")]
async fn entity_command(
    coordinator: web::Data<Addr<Coordinator>>,
    entity_id: web::Path<String>,
    cmd: web::Json<EntityCommand>,
) -> Result<HttpResponse, ServiceError> {
    let mut cmd = cmd.into_inner();
    cmd.entity_id = entity_id.into_inner();
    debug!("Entity command: {cmd:?}");
    coordinator.send(EntityCommandMsg(cmd)).await??;
    Ok(HttpResponse::Ok().json(ApiResponse::new("OK", "Command executed")))
}

#[post("/api/services/{domain}/{service}")]
async fn call_service(
    coordinator: web::Data<Addr<Coordinator>>,
    path: web::Path<(String, String)>,
    call: web::Json<ServiceCall>,
) -> Result<HttpResponse, ServiceError> {
    let (domain, service) = path.into_inner();
    if domain != DOMAIN {
        return Err(ServiceError::NotFound(format!("Unknown service domain: {domain}")));
    }
    let service = FavoriteService::from_str(&service)
        .map_err(|_| ServiceError::NotFound(format!("Unknown service: {domain}.{service}")))?;
    coordinator
        .send(CallServiceMsg::new(service, call.into_inner().entity_id))
        .await??;
    Ok(HttpResponse::Ok().json(ApiResponse::new("OK", "Service called")))
}

#[get("/api/state")]
async fn get_state(
    coordinator: web::Data<Addr<Coordinator>>,
) -> Result<HttpResponse, ServiceError> {
    let state = coordinator.send(GetState).await?;
    Ok(HttpResponse::Ok().json(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Settings;
    use actix::Actor;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};

    fn coordinator() -> web::Data<Addr<Coordinator>> {
        web::Data::new(Coordinator::new(Settings::default()).start())
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                    .app_data(coordinator())
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn state_of_unconfigured_integration() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/state").to_request();
        let state: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!("RequireSetup", state["operation_mode"]);
        assert_eq!("Idle", state["polling"]);
        assert_eq!(0, state["entities"]);
    }

    #[actix_web::test]
    async fn config_flow_starts_with_user_form() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/config_flow").to_request();
        let form: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!("form", form["type"]);
        assert_eq!("user", form["step_id"]);
        assert_eq!("username", form["data_schema"][0]["name"]);
        assert!(form["flow_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[actix_web::test]
    async fn config_flow_with_unknown_flow_id_is_not_found() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/config_flow/unknown")
            .set_json(json!({"username": "user", "password": "secret"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::NOT_FOUND, resp.status());
    }

    #[actix_web::test]
    async fn unknown_entity_is_not_found() {
        let app = app!();
        let req = test::TestRequest::get()
            .uri("/api/entities/cover.b1")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::NOT_FOUND, resp.status());
    }

    #[actix_web::test]
    async fn command_without_setup_is_unavailable() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/entities/cover.b1/command")
            .set_json(json!({"cmd_id": "open"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::SERVICE_UNAVAILABLE, resp.status());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!("SERVICE_UNAVAILABLE", body["code"]);
    }

    #[actix_web::test]
    async fn command_without_cmd_id_is_rejected() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/entities/cover.b1/command")
            .set_json(json!({"params": {"position": 10}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::BAD_REQUEST, resp.status());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!("INVALID_JSON", body["code"]);
    }

    #[actix_web::test]
    async fn unknown_service_is_not_found() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/api/services/neosmartblinds/favorite_3")
            .set_json(json!({"entity_id": "cover.b1"}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(StatusCode::NOT_FOUND, resp.status());
    }

    #[actix_web::test]
    async fn devices_and_entities_are_empty_without_account() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/devices").to_request();
        let devices: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json!([]), devices);

        let req = test::TestRequest::get().uri("/api/entities").to_request();
        let entities: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json!([]), entities);
    }
}
