// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Entity change events pushed to the host over a WebSocket connection.

use crate::coordinator::{Coordinator, SubscribeEntityEvents, UnsubscribeEntityEvents};
use crate::entity::EntityChanges;
use actix::{
    Actor, ActorContext, ActorFutureExt, Addr, AsyncContext, Context, ContextFutureSpawner,
    Handler, Message, Running, WrapFuture,
};
use actix_web::{Error, HttpRequest, HttpResponse, get, rt, web};
use actix_ws::{CloseCode, CloseReason, Message as WsMessage, MessageStream, Session};
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[get("/ws/events")]
pub async fn ws_events(
    request: HttpRequest,
    stream: web::Payload,
    coordinator: web::Data<Addr<Coordinator>>,
) -> Result<HttpResponse, Error> {
    debug!("New WebSocket connection: {:?}", request);

    // use peer IP:port as unique client identifier
    let session_id = request
        .peer_addr()
        .map(|addr| format!("{}:{}", addr.ip(), addr.port()))
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let (response, session, msg_stream) = actix_ws::handle(&request, stream)?;

    let addr = EventSession::new(session_id, session.clone(), coordinator.get_ref().clone()).start();
    rt::spawn(read_messages(addr, session, msg_stream));

    Ok(response)
}

/// Handle incoming client frames until the connection is closed.
async fn read_messages(addr: Addr<EventSession>, mut session: Session, mut stream: MessageStream) {
    let reason = loop {
        let Some(msg) = stream.recv().await else {
            break None;
        };
        match msg {
            Ok(WsMessage::Ping(bytes)) => {
                addr.do_send(Heartbeat);
                if session.pong(&bytes).await.is_err() {
                    break None;
                }
            }
            Ok(WsMessage::Pong(_)) => addr.do_send(Heartbeat),
            Ok(WsMessage::Close(reason)) => break reason,
            // the event channel is push only
            Ok(WsMessage::Text(_)) | Ok(WsMessage::Binary(_)) => {
                warn!("Ignoring client message on event channel");
            }
            Ok(_) => {}
            Err(e) => {
                info!("Closing WebSocket: {e:?}");
                break Some(CloseReason {
                    code: CloseCode::Protocol,
                    description: Some(e.to_string()),
                });
            }
        }
    };

    addr.do_send(CloseSession);
    let _ = session.close(reason).await;
}

/// WebSocket session actor forwarding entity changes of the coordinator.
struct EventSession {
    id: String,
    /// Heartbeat timestamp of last activity
    hb: Instant,
    session: Session,
    coordinator: Addr<Coordinator>,
}

#[derive(Message)]
#[rtype(result = "()")]
struct Heartbeat;

#[derive(Message)]
#[rtype(result = "()")]
struct CloseSession;

impl EventSession {
    fn new(id: String, session: Session, coordinator: Addr<Coordinator>) -> Self {
        Self {
            id,
            hb: Instant::now(),
            session,
            coordinator,
        }
    }

    fn start_heartbeat(&self, ctx: &mut Context<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                info!("[{}] Closing connection due to failed heartbeat", act.id);
                ctx.stop();
                return;
            }

            let mut session = act.session.clone();
            async move { session.ping(b"").await }
                .into_actor(act)
                .map(|res, act, ctx| {
                    if res.is_err() {
                        debug!("[{}] Connection closed", act.id);
                        ctx.stop();
                    }
                })
                .spawn(ctx);
        });
    }
}

impl Actor for EventSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.start_heartbeat(ctx);
        self.coordinator.do_send(SubscribeEntityEvents {
            session_id: self.id.clone(),
            recipient: ctx.address().recipient(),
        });
        debug!("[{}] started", self.id);
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.coordinator.do_send(UnsubscribeEntityEvents {
            session_id: self.id.clone(),
        });
        let session = self.session.clone();
        rt::spawn(async move {
            let _ = session.close(None).await;
        });
        info!("[{}] stopped", self.id);
        Running::Stop
    }
}

impl Handler<EntityChanges> for EventSession {
    type Result = ();

    fn handle(&mut self, msg: EntityChanges, ctx: &mut Self::Context) {
        let mut frames = Vec::with_capacity(msg.0.len());
        for change in msg.0 {
            match serde_json::to_string(&change) {
                Ok(text) => frames.push(text),
                Err(e) => error!("[{}] Error serializing {change:?}: {e}", self.id),
            }
        }
        let mut session = self.session.clone();
        async move {
            for text in frames {
                session.text(text).await?;
            }
            Ok::<_, actix_ws::Closed>(())
        }
            .into_actor(self)
            .map(|res, act, ctx| {
                if res.is_err() {
                    debug!("[{}] Connection closed, dropping event", act.id);
                    ctx.stop();
                }
            })
            .spawn(ctx);
    }
}

impl Handler<Heartbeat> for EventSession {
    type Result = ();

    fn handle(&mut self, _: Heartbeat, _ctx: &mut Self::Context) {
        self.hb = Instant::now();
    }
}

impl Handler<CloseSession> for EventSession {
    type Result = ();

    fn handle(&mut self, _: CloseSession, ctx: &mut Self::Context) {
        ctx.stop();
    }
}
