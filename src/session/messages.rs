//! JSON messages exchanged over the session channel.
//!
//! Every message is a self-contained object with a `type` tag. Clients in
//! the field have shipped three different key names for the beacon address,
//! so the reading accepts all of them.

use serde::{Deserialize, Serialize};

use crate::{geometry::Point, positioning::RssiReading};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Location(LocationRequest),
    SetMode(SetModeRequest),
    Ping,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    #[serde(default)]
    pub beacons: Vec<BeaconObservation>,
    pub mode: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconObservation {
    #[serde(alias = "id", alias = "macAddress")]
    pub beacon_id: String,
    pub rssi: i32,
}

impl From<BeaconObservation> for RssiReading {
    fn from(observation: BeaconObservation) -> Self {
        RssiReading {
            beacon_id: observation.beacon_id,
            rssi: observation.rssi,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Welcome {
        session_id: String,
        message: String,
        default_mode: String,
    },
    Location(LocationResponse),
    ModeChanged {
        status: &'static str,
        mode: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Pong {
        timestamp: i64,
        connected_users: usize,
    },
    Error {
        status: &'static str,
        message: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub status: &'static str,
    pub x: f64,
    pub y: f64,
    pub x_meter: f64,
    pub y_meter: f64,
    pub mode: String,
    pub confidence: f64,
    pub nearest_beacon: Option<String>,
    pub nearest_room: Option<String>,
    pub estimated_distance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_route: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_location_requests_with_any_beacon_key() {
        let message: ClientMessage = serde_json::from_str(
            r#"{"type":"location","beacons":[
                {"beaconId":"08:92:72:87:9C:72","rssi":-55},
                {"id":"08:92:72:87:8D:D6","rssi":-60},
                {"macAddress":"08:92:72:87:8E:A1","rssi":-70}
            ],"mode":"hybrid","target":"147"}"#,
        )
        .unwrap();

        let ClientMessage::Location(request) = message else {
            panic!("expected location");
        };
        assert_eq!(request.beacons.len(), 3);
        assert_eq!(request.beacons[1].beacon_id, "08:92:72:87:8D:D6");
        assert_eq!(request.mode.as_deref(), Some("hybrid"));
        assert_eq!(request.target.as_deref(), Some("147"));
    }

    #[test]
    fn parses_bare_ping_and_set_mode() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).unwrap(),
            ClientMessage::Ping
        ));
        let message: ClientMessage =
            serde_json::from_str(r#"{"type":"setMode","mode":"weighted"}"#).unwrap();
        let ClientMessage::SetMode(request) = message else {
            panic!("expected setMode");
        };
        assert_eq!(request.mode, "weighted");
    }

    #[test]
    fn unknown_types_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"selfDestruct"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"beacons":[]}"#).is_err());
    }

    #[test]
    fn location_response_serializes_camel_case() {
        let response = ServerMessage::Location(LocationResponse {
            status: "ok",
            x: 789.0,
            y: 184.0,
            x_meter: 789.0 / 18.0,
            y_meter: 184.0 / 18.0,
            mode: "proximity".to_string(),
            confidence: 0.9,
            nearest_beacon: Some("08:92:72:87:9C:72".to_string()),
            nearest_room: Some("157".to_string()),
            estimated_distance: 0.76,
            has_route: None,
            path: None,
            route_error: None,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "location");
        assert_eq!(json["xMeter"], 789.0 / 18.0);
        assert_eq!(json["nearestRoom"], "157");
        assert!(json.get("hasRoute").is_none());
    }

    #[test]
    fn route_fields_appear_only_when_a_route_was_requested() {
        let response = ServerMessage::Location(LocationResponse {
            status: "ok",
            x: 500.0,
            y: 225.0,
            x_meter: 500.0 / 18.0,
            y_meter: 225.0 / 18.0,
            mode: "hybrid".to_string(),
            confidence: 0.7,
            nearest_beacon: None,
            nearest_room: None,
            estimated_distance: 2.0,
            has_route: Some(true),
            path: Some(vec![Point::new(245.0, 225.0), Point::new(790.0, 185.0)]),
            route_error: None,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["hasRoute"], true);
        assert_eq!(json["path"][0]["x"], 245.0);
        assert_eq!(json["path"][1]["y"], 185.0);
        assert!(json.get("routeError").is_none());
    }

    #[test]
    fn welcome_and_pong_carry_their_fields() {
        let welcome = ServerMessage::Welcome {
            session_id: "abc".to_string(),
            message: "connected".to_string(),
            default_mode: "hybrid".to_string(),
        };
        let json = serde_json::to_value(&welcome).unwrap();
        assert_eq!(json["type"], "welcome");
        assert_eq!(json["defaultMode"], "hybrid");

        let pong = ServerMessage::Pong {
            timestamp: 1_700_000_000_000,
            connected_users: 3,
        };
        let json = serde_json::to_value(&pong).unwrap();
        assert_eq!(json["type"], "pong");
        assert_eq!(json["connectedUsers"], 3);
    }
}
