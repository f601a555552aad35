use actix_web::{HttpResponse, get, web};
use serde_json::json;

use crate::session::SessionCoordinator;

#[get("/health")]
pub async fn service(
    coordinator: web::Data<SessionCoordinator>,
) -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!(
        {
            "message": "OK",
            "connectedSessions": coordinator.connected_sessions(),
            "knownBeacons": coordinator.known_beacons(),
        }
    )))
}
