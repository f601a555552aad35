//! The session transport: one websocket per client, one spawned task per
//! connection. The task exclusively owns its `SessionState`, so requests
//! within a session are processed strictly in arrival order while sessions
//! run independently of each other.

use actix_web::{HttpRequest, HttpResponse, get, web};
use actix_ws::{Message, Session};
use futures::StreamExt;
use log::{info, warn};

use crate::session::{
    coordinator::{SessionCoordinator, SessionState, encode},
    messages::ServerMessage,
};

#[get("/ws")]
pub async fn service(
    req: HttpRequest,
    stream: web::Payload,
    coordinator: web::Data<SessionCoordinator>,
) -> actix_web::Result<HttpResponse> {
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;
    let coordinator = coordinator.into_inner();

    actix_web::rt::spawn(async move {
        let mut session = session;
        let mut msg_stream = msg_stream;
        let mut state = coordinator.open_session();
        info!("session {} connected", state.session_id);

        let welcome = coordinator.welcome(&state);
        if send(&mut session, &welcome).await.is_err() {
            finish(&coordinator, &mut state);
            return;
        }

        while let Some(message) = msg_stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let reply = coordinator.handle_text(&mut state, &text);
                    if send(&mut session, &reply).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Ping(bytes)) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(protocol_error) => {
                    warn!(
                        "session {}: websocket protocol error: {protocol_error}",
                        state.session_id
                    );
                    break;
                }
            }
        }

        finish(&coordinator, &mut state);
        let _ = session.close(None).await;
    });

    Ok(response)
}

async fn send(session: &mut Session, message: &ServerMessage) -> Result<(), actix_ws::Closed> {
    session.text(encode(message)).await
}

fn finish(coordinator: &SessionCoordinator, state: &mut SessionState) {
    coordinator.close_session(state);
    info!("session {} disconnected", state.session_id);
}
