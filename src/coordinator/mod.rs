// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Central coordinator owning the account hierarchy, the registries and the cloud client.
//!
//! The cloud state is fetched in a fixed interval and reconciled with the host entities.

mod handler;
mod messages;

pub use messages::*;

use crate::cloud::CloudClient;
use crate::configuration::{Settings, user_settings_path};
use crate::entity::{self, Entity, EntityChange, EntityChanges, EntitySource, cover, switch};
use crate::hierarchy::Account;
use crate::registry::{DeviceRegistry, EntityRegistry};
use crate::service::CloudAction;
use actix::prelude::{Actor, Context, Recipient};
use actix::{Addr, AsyncContext, SpawnHandle};
use handler::{Poll, SetupEntry};
use log::{debug, error, info, warn};
use rust_fsm::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

state_machine! {
    derive(Debug)
    OperationMode(RequireSetup)

    RequireSetup => {
        ConfigurationAvailable => Running,
        UserInput => ValidatingCredentials,
    },
    ValidatingCredentials => {
        CredentialsValid => Running,
        CredentialsInvalid => RequireSetup,
    },
    Running => {
        ReauthRequired => RequireSetup,
        Unload => RequireSetup,
    },
}

state_machine! {
    derive(Debug)
    Polling(Idle)

    Idle(Tick) => Fetching,
    Fetching => {
        FetchSucceeded => Idle,
        FetchFailed => Idle [MarkUnavailable],
    },
}

pub struct Coordinator {
    settings: Settings,
    /// User settings file written by the config flow.
    user_settings: PathBuf,
    /// Cloud client of the configured account.
    cloud: Option<Addr<CloudClient>>,
    /// Last successfully fetched account hierarchy.
    account: Option<Account>,
    entities: Vec<Entity>,
    devices: DeviceRegistry,
    entity_registry: EntityRegistry,
    machine: StateMachine<OperationMode>,
    polling: StateMachine<Polling>,
    poll_timer: Option<SpawnHandle>,
    setup_retry: Option<SpawnHandle>,
    last_update_success: Option<bool>,
    /// Active config flow ids.
    flows: HashSet<String>,
    /// Entity change event subscribers by host session id.
    subscribers: HashMap<String, Recipient<EntityChanges>>,
}

impl Coordinator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            user_settings: user_settings_path(),
            cloud: None,
            account: None,
            entities: Vec::new(),
            devices: Default::default(),
            entity_registry: Default::default(),
            machine: StateMachine::new(),
            polling: StateMachine::new(),
            poll_timer: None,
            setup_retry: None,
            last_update_success: None,
            flows: Default::default(),
            subscribers: Default::default(),
        }
    }

    /// Use another user settings file for the config flow credentials.
    pub fn with_user_settings(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_settings = path.into();
        self
    }

    fn sm_consume(&mut self, input: &OperationModeInput) -> Result<(), ()> {
        let from = format!("{:?}", self.machine.state());
        match self.machine.consume(input) {
            Ok(_) => {
                debug!("State machine: {from} -({input:?})-> {:?}", self.machine.state());
                Ok(())
            }
            Err(_) => {
                warn!("State machine input {input:?} not allowed in state {from}");
                Err(())
            }
        }
    }

    fn is_running(&self) -> bool {
        matches!(self.machine.state(), &OperationModeState::Running)
    }

    fn cloud_client(&mut self) -> Addr<CloudClient> {
        self.cloud
            .get_or_insert_with(|| CloudClient::new(&self.settings.cloud).start())
            .clone()
    }

    fn entry_title(&self) -> Option<String> {
        self.settings
            .cloud
            .entry_id
            .as_ref()
            .map(|_| format!("Neo Blinds ({})", self.settings.cloud.username))
    }

    fn broadcast(&self, changes: &[EntityChange]) {
        if changes.is_empty() {
            return;
        }
        for (session_id, recipient) in &self.subscribers {
            if let Err(e) = recipient.try_send(EntityChanges(changes.to_vec())) {
                error!("[{session_id}] Internal message send error: {e}");
            }
        }
    }

    fn start_polling(&mut self, ctx: &mut Context<Self>) {
        self.stop_polling(ctx);
        let interval = self.settings.cloud.poll_interval;
        info!("Polling Neo cloud every {}s", interval.as_secs());
        self.poll_timer = Some(ctx.run_interval(interval, |_, ctx| ctx.notify(Poll)));
    }

    fn stop_polling(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.poll_timer.take() {
            ctx.cancel_future(handle);
        }
        if let Some(handle) = self.setup_retry.take() {
            ctx.cancel_future(handle);
        }
        self.polling = StateMachine::new();
    }

    /// Retry the initial setup after the poll interval.
    fn schedule_setup_retry(&mut self, ctx: &mut Context<Self>) {
        let interval = self.settings.cloud.poll_interval;
        info!("Retrying setup in {}s", interval.as_secs());
        self.setup_retry = Some(ctx.notify_later(SetupEntry, interval));
    }

    /// Credentials are no longer accepted: stop polling and require a new config flow.
    fn reauth_required(&mut self, ctx: &mut Context<Self>) {
        if !self.is_running() {
            return;
        }
        error!("Neo cloud rejected the credentials, new setup required");
        self.stop_polling(ctx);
        self.cloud = None;
        let _ = self.sm_consume(&OperationModeInput::ReauthRequired);
        let changes = entity::mark_unavailable(&mut self.entities);
        self.broadcast(&changes);
    }

    /// Remove all account data, entities and devices.
    fn unload(&mut self, ctx: &mut Context<Self>) {
        self.stop_polling(ctx);
        self.cloud = None;
        self.account = None;
        self.entities.clear();
        self.devices.clear();
        self.entity_registry.clear();
        self.last_update_success = None;
        if self.is_running() {
            let _ = self.sm_consume(&OperationModeInput::Unload);
        }
    }

    fn entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.entity_id == entity_id)
    }

    /// Update entity states after a successful cloud request.
    fn apply_action(&mut self, entity_id: &str, action: &CloudAction) {
        let Some(index) = self.entities.iter().position(|e| e.entity_id == entity_id) else {
            return;
        };
        let mut changed = vec![index];

        match action {
            CloudAction::Transmit { command, .. } => {
                let source = self.entities[index].source.clone();
                match source {
                    EntitySource::Blind(_) => cover::apply_command(&mut self.entities[index], *command),
                    EntitySource::Room(uid) => {
                        cover::apply_command(&mut self.entities[index], *command);
                        let blinds = self
                            .account
                            .as_ref()
                            .and_then(|a| a.room(&uid))
                            .map(|r| r.blind_unique_ids.clone())
                            .unwrap_or_default();
                        for (i, entity) in self.entities.iter_mut().enumerate() {
                            if matches!(&entity.source, EntitySource::Blind(b) if blinds.contains(b)) {
                                cover::apply_command(entity, *command);
                                changed.push(i);
                            }
                        }
                    }
                    EntitySource::Favorite { .. } | EntitySource::Schedule(_) => {
                        changed.clear();
                    }
                }
            }
            CloudAction::SetSchedule { schedule_id, enabled } => {
                switch::set_enabled(&mut self.entities[index].attributes, *enabled);
                if let Some(schedule) = self.account.as_mut().and_then(|a| {
                    a.controllers
                        .iter_mut()
                        .flat_map(|c| c.schedules.iter_mut())
                        .find(|s| &s.id == schedule_id)
                }) {
                    schedule.enabled = *enabled;
                }
            }
        }

        let changes: Vec<EntityChange> = changed
            .into_iter()
            .map(|i| self.entities[i].to_change())
            .collect();
        self.broadcast(&changes);
    }
}

impl Actor for Coordinator {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Context<Self>) {
        debug!("Coordinator started");
        if self.settings.cloud.has_credentials() {
            if self
                .sm_consume(&OperationModeInput::ConfigurationAvailable)
                .is_ok()
            {
                ctx.notify(SetupEntry);
            }
        } else {
            info!("No Neo cloud account configured, waiting for config flow");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::test_jwt;
    use crate::errors::ServiceError;
    use crate::service::EntityCommand;
    use actix_web::rt::time::sleep;
    use mockito::{Matcher, Mock, Server};
    use serde_json::{Map, Value, json};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use url::Url;

    const FAST_POLL: Duration = Duration::from_millis(200);
    const SLOW_POLL: Duration = Duration::from_secs(60);

    fn settings(url: &str, username: &str, password: &str, poll_interval: Duration) -> Settings {
        let mut settings = Settings::default();
        settings.cloud.url = Url::parse(url).unwrap();
        settings.cloud.set_credentials(username, password);
        settings.cloud.poll_interval = poll_interval;
        settings
    }

    fn temp_user_settings() -> PathBuf {
        std::env::temp_dir().join(format!("neo-user-{}.json", uuid::Uuid::new_v4()))
    }

    async fn mock_login(server: &mut Server, username: &str, user_uuid: &str) -> Mock {
        let token = test_jwt(json!({ "usr": user_uuid, "ctrv2": ["C1,secret"] }));
        server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
                Matcher::UrlEncoded("username".into(), username.into()),
            ]))
            .with_status(200)
            .with_body(json!({ "access_token": token, "refresh_token": "refresh-1" }).to_string())
            .create_async()
            .await
    }

    /// Location of room `Master` with `blinds` rx motors and schedule `S1`.
    fn location(blinds: usize) -> Value {
        let mut room_blinds = Map::new();
        for channel in 1..=blinds {
            room_blinds.insert(
                channel.to_string(),
                json!({ "name": format!("B{channel}"), "hasPercent": false, "motorCode": "rx", "tdbu": false }),
            );
        }
        json!({
            "rooms": {
                "R1": { "name": "Master", "controller": "C1", "token": "109.055", "blinds": room_blinds }
            },
            "schedules": {
                "S1": { "time": "07:00", "command": "i1", "room": "R1", "enabled": true }
            }
        })
    }

    async fn mock_location(server: &mut Server, location: Value) -> Mock {
        server
            .mock("GET", "/location/user-1")
            .with_status(200)
            .with_body(location.to_string())
            .create_async()
            .await
    }

    async fn wait_for_entities(
        addr: &Addr<Coordinator>,
        condition: impl Fn(&[Entity]) -> bool,
    ) -> bool {
        for _ in 0..50 {
            let entities = addr.send(GetEntities).await.unwrap();
            if condition(&entities) {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        false
    }

    async fn wait_for_state(
        addr: &Addr<Coordinator>,
        condition: impl Fn(&CoordinatorState) -> bool,
    ) -> bool {
        for _ in 0..50 {
            let state = addr.send(GetState).await.unwrap();
            if condition(&state) {
                return true;
            }
            sleep(Duration::from_millis(50)).await;
        }
        false
    }

    /// Start a coordinator configured for `user@example.com` and wait for the initial setup.
    async fn running_coordinator(
        server: &mut Server,
        poll_interval: Duration,
    ) -> (Addr<Coordinator>, Mock) {
        let login = mock_login(server, "user@example.com", "user-1").await;
        let addr = Coordinator::new(settings(
            &server.url(),
            "user@example.com",
            "secret",
            poll_interval,
        ))
        .with_user_settings(temp_user_settings())
        .start();
        assert!(
            wait_for_entities(&addr, |entities| !entities.is_empty()).await,
            "setup did not create entities"
        );
        (addr, login)
    }

    fn command(entity_id: &str, cmd_id: &str) -> EntityCommandMsg {
        EntityCommandMsg(EntityCommand {
            entity_id: entity_id.into(),
            cmd_id: cmd_id.into(),
            params: None,
        })
    }

    async fn entity_state(addr: &Addr<Coordinator>, entity_id: &str) -> Option<String> {
        let entity = addr.send(GetEntity::new(entity_id.into())).await.unwrap().unwrap();
        entity.state().map(str::to_string)
    }

    /// Collects all entity change events of a subscription.
    struct Collector(Rc<RefCell<Vec<EntityChange>>>);

    impl Actor for Collector {
        type Context = Context<Self>;
    }

    impl actix::Handler<EntityChanges> for Collector {
        type Result = ();

        fn handle(&mut self, msg: EntityChanges, _: &mut Context<Self>) {
            self.0.borrow_mut().extend(msg.0);
        }
    }

    async fn subscribe(addr: &Addr<Coordinator>) -> Rc<RefCell<Vec<EntityChange>>> {
        let received = Rc::new(RefCell::new(Vec::new()));
        let collector = Collector(received.clone()).start();
        addr.send(SubscribeEntityEvents {
            session_id: "test".into(),
            recipient: collector.recipient(),
        })
        .await
        .unwrap();
        received
    }

    #[actix_web::test]
    async fn setup_creates_entities_of_account() {
        let mut server = Server::new_async().await;
        mock_location(&mut server, location(1)).await;
        let (addr, _login) = running_coordinator(&mut server, SLOW_POLL).await;

        let entities = addr.send(GetEntities).await.unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.entity_id.as_str()).collect();
        assert!(ids.contains(&"cover.b1"), "{ids:?}");
        assert!(ids.contains(&"button.b1_favorite_1"), "{ids:?}");
        assert!(ids.contains(&"button.b1_favorite_2"), "{ids:?}");
        assert!(ids.contains(&"cover.room_master"), "{ids:?}");
        assert!(ids.contains(&"switch.s1"), "{ids:?}");

        let state = addr.send(GetState).await.unwrap();
        assert_eq!("Running", state.operation_mode);
        assert_eq!(Some("user-1".to_string()), state.entry_id);
        assert_eq!(Some(true), state.last_update_success);

        let devices = addr.send(GetDevices).await.unwrap();
        assert!(devices.iter().any(|d| d.identifier == "C1"), "{devices:?}");
    }

    #[actix_web::test]
    async fn failed_poll_marks_entities_unavailable() {
        let mut server = Server::new_async().await;
        let location = mock_location(&mut server, location(1)).await;
        let (addr, _login) = running_coordinator(&mut server, FAST_POLL).await;

        location.remove_async().await;
        server
            .mock("GET", "/location/user-1")
            .with_status(500)
            .create_async()
            .await;

        assert!(
            wait_for_entities(&addr, |entities| entities.iter().all(|e| !e.available)).await,
            "entities must become unavailable"
        );
        let entities = addr.send(GetEntities).await.unwrap();
        assert!(!entities.is_empty(), "entities must not be removed");
        let state = addr.send(GetState).await.unwrap();
        assert_eq!(Some(false), state.last_update_success);
        assert_eq!("Running", state.operation_mode);
    }

    #[actix_web::test]
    async fn rejected_credentials_during_poll_require_new_setup() {
        let mut server = Server::new_async().await;
        let location = mock_location(&mut server, location(1)).await;
        let (addr, login) = running_coordinator(&mut server, FAST_POLL).await;

        location.remove_async().await;
        login.remove_async().await;
        server
            .mock("GET", "/location/user-1")
            .with_status(401)
            .create_async()
            .await;
        // refresh and password login are rejected
        server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .create_async()
            .await;

        assert!(
            wait_for_state(&addr, |state| state.operation_mode == "RequireSetup").await,
            "operation mode must change to RequireSetup"
        );
        let state = addr.send(GetState).await.unwrap();
        assert_eq!("Idle", state.polling);
        let entities = addr.send(GetEntities).await.unwrap();
        assert!(!entities.is_empty());
        assert!(entities.iter().all(|e| !e.available));

        let result = addr.send(command("cover.b1", "open")).await.unwrap();
        assert!(matches!(result, Err(ServiceError::ServiceUnavailable(_))), "{result:?}");
    }

    #[actix_web::test]
    async fn cover_command_updates_state_optimistically() {
        let mut server = Server::new_async().await;
        mock_location(&mut server, location(1)).await;
        let transmit = server
            .mock("POST", "/esp32/multi-transmit")
            .match_body(Matcher::Regex(r#""command":"up""#.into()))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let (addr, _login) = running_coordinator(&mut server, SLOW_POLL).await;

        let result = addr.send(command("cover.b1", "open")).await.unwrap();

        assert_eq!(Ok(()), result);
        transmit.assert_async().await;
        assert_eq!(Some("OPEN".to_string()), entity_state(&addr, "cover.b1").await);
    }

    #[actix_web::test]
    async fn room_cover_command_updates_all_room_blinds() {
        let mut server = Server::new_async().await;
        mock_location(&mut server, location(2)).await;
        let transmit = server
            .mock("POST", "/esp32/multi-transmit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""command":"dn","channel":"01""#.into()),
                Matcher::Regex(r#""command":"dn","channel":"02""#.into()),
            ]))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let (addr, _login) = running_coordinator(&mut server, SLOW_POLL).await;
        let received = subscribe(&addr).await;
        sleep(Duration::from_millis(50)).await;
        received.borrow_mut().clear();

        let result = addr.send(command("cover.room_master", "close")).await.unwrap();

        assert_eq!(Ok(()), result);
        transmit.assert_async().await;
        for entity_id in ["cover.room_master", "cover.b1", "cover.b2"] {
            assert_eq!(
                Some("CLOSED".to_string()),
                entity_state(&addr, entity_id).await,
                "{entity_id}"
            );
        }
        sleep(Duration::from_millis(50)).await;
        let received = received.borrow();
        assert_eq!(3, received.len(), "{received:?}");
    }

    #[actix_web::test]
    async fn schedule_switch_off_and_on_again() {
        let mut server = Server::new_async().await;
        mock_location(&mut server, location(1)).await;
        let disable = server
            .mock("POST", "/location/user-1/schedules/S1")
            .match_body(Matcher::Json(json!({ "enabled": false })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let enable = server
            .mock("POST", "/location/user-1/schedules/S1")
            .match_body(Matcher::Json(json!({ "enabled": true })))
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let (addr, _login) = running_coordinator(&mut server, SLOW_POLL).await;

        assert_eq!(Ok(()), addr.send(command("switch.s1", "off")).await.unwrap());
        assert_eq!(Some("OFF".to_string()), entity_state(&addr, "switch.s1").await);

        assert_eq!(Ok(()), addr.send(command("switch.s1", "on")).await.unwrap());
        assert_eq!(Some("ON".to_string()), entity_state(&addr, "switch.s1").await);

        disable.assert_async().await;
        enable.assert_async().await;
    }

    #[actix_web::test]
    async fn config_flow_creates_and_removes_entry() {
        let mut server = Server::new_async().await;
        mock_login(&mut server, "user@example.com", "user-1").await;
        mock_location(&mut server, location(1)).await;
        let user_settings = temp_user_settings();
        let addr = Coordinator::new(settings(&server.url(), "", "", SLOW_POLL))
            .with_user_settings(user_settings.clone())
            .start();

        let ConfigFlowResult::Form { flow_id, .. } = addr.send(StartConfigFlow).await.unwrap().unwrap()
        else {
            panic!("expected form");
        };
        let input = ConfigFlowInput {
            username: "user@example.com".into(),
            password: "secret".into(),
        };
        let result = addr
            .send(SubmitConfigFlow::new(flow_id.clone(), input.clone()))
            .await
            .unwrap();

        assert_eq!(
            Ok(ConfigFlowResult::CreateEntry {
                flow_id,
                title: "Neo Blinds (user@example.com)".into(),
                unique_id: "user-1".into(),
            }),
            result
        );
        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(&user_settings).unwrap()).unwrap();
        assert_eq!("user-1", saved["cloud"]["entry_id"]);
        assert_eq!("user@example.com", saved["cloud"]["username"]);
        assert!(
            wait_for_entities(&addr, |entities| !entities.is_empty()).await,
            "setup did not create entities"
        );

        // a second flow for the same account is aborted
        let ConfigFlowResult::Form { flow_id, .. } = addr.send(StartConfigFlow).await.unwrap().unwrap()
        else {
            panic!("expected form");
        };
        let result = addr
            .send(SubmitConfigFlow::new(flow_id.clone(), input))
            .await
            .unwrap();
        assert_eq!(
            Ok(ConfigFlowResult::Abort {
                flow_id,
                reason: "already_configured".into()
            }),
            result
        );

        assert_eq!(Ok(()), addr.send(RemoveConfigEntry).await.unwrap());
        assert!(!user_settings.exists());
        assert!(addr.send(GetEntities).await.unwrap().is_empty());
        assert!(addr.send(GetDevices).await.unwrap().is_empty());
        let state = addr.send(GetState).await.unwrap();
        assert_eq!("RequireSetup", state.operation_mode);
        assert_eq!(None, state.entry_id);
    }

    #[actix_web::test]
    async fn config_flow_for_configured_account() {
        let mut server = Server::new_async().await;
        mock_location(&mut server, location(1)).await;
        mock_login(&mut server, "other@example.com", "user-2").await;
        // account from the configuration file, without an entry id
        let (addr, _login) = running_coordinator(&mut server, SLOW_POLL).await;

        for (username, expected) in [
            ("user@example.com", "already_configured"),
            ("other@example.com", "single_instance_allowed"),
        ] {
            let ConfigFlowResult::Form { flow_id, .. } =
                addr.send(StartConfigFlow).await.unwrap().unwrap()
            else {
                panic!("expected form");
            };
            let input = ConfigFlowInput {
                username: username.into(),
                password: "secret".into(),
            };
            let result = addr
                .send(SubmitConfigFlow::new(flow_id.clone(), input))
                .await
                .unwrap();
            assert_eq!(
                Ok(ConfigFlowResult::Abort {
                    flow_id,
                    reason: expected.into()
                }),
                result,
                "{username}"
            );
        }
        assert_eq!("Running", addr.send(GetState).await.unwrap().operation_mode);
    }

    #[actix_web::test]
    async fn config_flow_with_invalid_credentials_shows_error() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;
        let addr = Coordinator::new(settings(&server.url(), "", "", SLOW_POLL))
            .with_user_settings(temp_user_settings())
            .start();

        let form = addr.send(StartConfigFlow).await.unwrap().unwrap();
        let ConfigFlowResult::Form { flow_id, .. } = form else {
            panic!("expected form, got {form:?}");
        };

        let result = addr
            .send(SubmitConfigFlow::new(
                flow_id.clone(),
                ConfigFlowInput {
                    username: "user@example.com".into(),
                    password: "wrong".into(),
                },
            ))
            .await
            .unwrap();

        login.assert_async().await;
        assert_eq!(ConfigFlowResult::user_form(flow_id, Some("invalid_auth")), result.unwrap());
        let state = addr.send(GetState).await.unwrap();
        assert_eq!("RequireSetup", state.operation_mode);
    }

    #[actix_web::test]
    async fn all_entity_states_reach_subscribers() {
        let mut server = Server::new_async().await;
        // 8 covers, 16 favorite buttons, room cover and switch
        let location = mock_location(&mut server, location(8)).await;
        let (addr, _login) = running_coordinator(&mut server, FAST_POLL).await;
        let entities = addr.send(GetEntities).await.unwrap();
        assert_eq!(26, entities.len());

        let received = subscribe(&addr).await;
        sleep(Duration::from_millis(100)).await;
        for entity in &entities {
            assert!(
                received.borrow().iter().any(|c| c.entity_id == entity.entity_id),
                "missing initial state of {}",
                entity.entity_id
            );
        }

        location.remove_async().await;
        server
            .mock("GET", "/location/user-1")
            .with_status(500)
            .create_async()
            .await;
        assert!(
            wait_for_entities(&addr, |entities| entities.iter().all(|e| !e.available)).await,
            "entities must become unavailable"
        );
        sleep(Duration::from_millis(50)).await;
        let unavailable = received.borrow().iter().filter(|c| !c.available).count();
        assert_eq!(entities.len(), unavailable);
    }
}
