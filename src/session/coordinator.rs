//! Per-session request dispatch and state.
//!
//! The coordinator is shared by every connection; each connection task owns
//! its `SessionState` exclusively, so one session's requests are strictly
//! serialized while sessions stay independent. The coordinator itself only
//! holds the immutable pipeline handles, the process-wide default mode and
//! the registry of open sessions.

use std::{
    str::FromStr,
    sync::Arc,
    sync::atomic::{AtomicU8, Ordering},
};

use chrono::Utc;
use dashmap::DashMap;
use log::{debug, error, warn};
use uuid::Uuid;

use crate::{
    constants::{Mode, PIXELS_PER_METER},
    error::PipelineError,
    geometry::Point,
    map::MapRegistry,
    positioning::{
        RssiReading,
        orchestrator::{Orchestrator, PositionFilter},
    },
    routing::{RouteGraph, shortest_path},
    session::messages::{
        ClientMessage, LocationRequest, LocationResponse, ServerMessage, SetModeRequest,
    },
    tasks::history::{HistoryLogger, HistoryRecord},
};

/// State owned by exactly one session task.
#[derive(Debug)]
pub struct SessionState {
    pub session_id: Uuid,
    pub filter: PositionFilter,
    pub active_route: Option<Vec<Point>>,
    pub route_target: Option<String>,
    pub route_set_at: i64,
}

#[derive(Debug)]
struct SessionInfo {
    opened_at_ms: i64,
}

pub struct SessionCoordinator {
    registry: Arc<MapRegistry>,
    graph: Arc<RouteGraph>,
    orchestrator: Orchestrator,
    default_mode: AtomicU8,
    sessions: DashMap<Uuid, SessionInfo>,
    history: Option<HistoryLogger>,
}

impl SessionCoordinator {
    pub fn new(
        registry: Arc<MapRegistry>,
        graph: Arc<RouteGraph>,
        default_mode: Mode,
        history: Option<HistoryLogger>,
    ) -> Self {
        let orchestrator = Orchestrator::new(registry.clone());
        SessionCoordinator {
            registry,
            graph,
            orchestrator,
            default_mode: AtomicU8::new(default_mode.as_u8()),
            sessions: DashMap::new(),
            history,
        }
    }

    pub fn open_session(&self) -> SessionState {
        let session_id = Uuid::new_v4();
        self.sessions.insert(
            session_id,
            SessionInfo {
                opened_at_ms: Utc::now().timestamp_millis(),
            },
        );
        SessionState {
            session_id,
            filter: PositionFilter::new(),
            active_route: None,
            route_target: None,
            route_set_at: 0,
        }
    }

    pub fn close_session(&self, state: &mut SessionState) {
        state.active_route = None;
        state.route_target = None;
        if let Some((_, info)) = self.sessions.remove(&state.session_id) {
            debug!(
                "session {} closed after {} ms, last position {:?}",
                state.session_id,
                Utc::now().timestamp_millis() - info.opened_at_ms,
                state.filter.last_location()
            );
        }
    }

    pub fn connected_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn default_mode(&self) -> Mode {
        Mode::from_u8(self.default_mode.load(Ordering::Relaxed))
    }

    pub fn welcome(&self, state: &SessionState) -> ServerMessage {
        ServerMessage::Welcome {
            session_id: state.session_id.to_string(),
            message: "connected to indoor navigation".to_string(),
            default_mode: self.default_mode().to_string(),
        }
    }

    /// Handle one raw inbound message. Never panics the session: every
    /// failure becomes an `error` reply and state stays untouched.
    pub fn handle_text(&self, state: &mut SessionState, text: &str) -> ServerMessage {
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(parse_error) => {
                warn!("session {}: malformed message: {parse_error}", state.session_id);
                return error_reply(&PipelineError::MalformedRequest(parse_error.to_string()));
            }
        };

        match self.handle_message(state, message) {
            Ok(reply) => reply,
            Err(pipeline_error) => {
                debug!(
                    "session {}: {}: {pipeline_error}",
                    state.session_id,
                    pipeline_error.name()
                );
                error_reply(&pipeline_error)
            }
        }
    }

    fn handle_message(
        &self,
        state: &mut SessionState,
        message: ClientMessage,
    ) -> Result<ServerMessage, PipelineError> {
        match message {
            ClientMessage::Location(request) => self.handle_location(state, request),
            ClientMessage::SetMode(request) => self.handle_set_mode(request),
            ClientMessage::Ping => Ok(ServerMessage::Pong {
                timestamp: Utc::now().timestamp_millis(),
                connected_users: self.connected_sessions(),
            }),
        }
    }

    fn handle_location(
        &self,
        state: &mut SessionState,
        request: LocationRequest,
    ) -> Result<ServerMessage, PipelineError> {
        let mode = match &request.mode {
            Some(raw) => {
                Mode::from_str(raw).map_err(|_| PipelineError::InvalidMode(raw.clone()))?
            }
            None => self.default_mode(),
        };

        let readings: Vec<RssiReading> =
            request.beacons.into_iter().map(RssiReading::from).collect();

        let target = request
            .target
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty());
        let navigation = target.is_some() || state.active_route.is_some();

        let now_ms = Utc::now().timestamp_millis();
        let output = self.orchestrator.calculate(
            &readings,
            mode,
            &mut state.filter,
            navigation,
            state.active_route.as_deref(),
            now_ms,
        )?;
        if output.snapped {
            debug!("session {}: snapped onto active route", state.session_id);
        }

        // Route bookkeeping: a request without a target drops any active
        // route; a request with one replans from the fresh (pre-snap)
        // position.
        let (has_route, path, route_error) = match target {
            None => {
                if state.active_route.take().is_some() {
                    debug!("session {}: route cleared", state.session_id);
                    state.route_target = None;
                }
                (None, None, None)
            }
            Some(target) => {
                let planned = shortest_path(&self.graph, output.fresh, target);
                if planned.len() >= 2 {
                    if state.active_route.is_some() {
                        debug!(
                            "session {}: replacing route set {} ms ago",
                            state.session_id,
                            now_ms - state.route_set_at
                        );
                    }
                    state.active_route = Some(planned.clone());
                    state.route_target = Some(target.to_string());
                    state.route_set_at = now_ms;
                    (Some(true), Some(planned), None)
                } else {
                    let no_route = PipelineError::NoRoute(target.to_string());
                    (Some(false), None, Some(no_route.to_string()))
                }
            }
        };

        if let Some(history) = &self.history {
            history.append(HistoryRecord {
                session_id: state.session_id.to_string(),
                x: output.result.location.x,
                y: output.result.location.y,
                zone_name: output
                    .result
                    .nearest_room
                    .clone()
                    .unwrap_or_else(|| crate::map::UNKNOWN_ROOM.to_string()),
                target_destination: state.route_target.clone(),
                timestamp: now_ms,
            });
        }

        Ok(ServerMessage::Location(LocationResponse {
            status: "ok",
            x: output.result.location.x,
            y: output.result.location.y,
            x_meter: output.result.location.x / PIXELS_PER_METER,
            y_meter: output.result.location.y / PIXELS_PER_METER,
            mode: output.result.mode.to_string(),
            confidence: output.result.confidence,
            nearest_beacon: output.result.nearest_beacon,
            nearest_room: output.result.nearest_room,
            estimated_distance: output.result.estimated_distance_m,
            has_route,
            path,
            route_error,
        }))
    }

    fn handle_set_mode(&self, request: SetModeRequest) -> Result<ServerMessage, PipelineError> {
        let mode = Mode::from_str(&request.mode)
            .map_err(|_| PipelineError::InvalidMode(request.mode.clone()))?;
        self.default_mode.store(mode.as_u8(), Ordering::Relaxed);

        Ok(ServerMessage::ModeChanged {
            status: "ok",
            mode: mode.to_string(),
            message: format!("default positioning mode set to {mode}"),
        })
    }

    /// Beacon table size, for the health endpoint.
    pub fn known_beacons(&self) -> usize {
        self.registry.len()
    }
}

fn error_reply(error: &PipelineError) -> ServerMessage {
    ServerMessage::Error {
        status: "error",
        message: error.to_string(),
    }
}

// The error reply must never itself fail to build; log and fall back to a
// static string if serialization of a reply ever fails at the transport.
pub fn encode(message: &ServerMessage) -> String {
    serde_json::to_string(message).unwrap_or_else(|serialize_error| {
        error!("failed to encode server message: {serialize_error}");
        r#"{"type":"error","status":"error","message":"internal error"}"#.to_string()
    })
}
