//! Small request bodies that have no service-level input type

use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StartImpersonationRequest {
    pub user_id: Uuid,
}

/// Names a session explicitly instead of using the token of the current request.
#[derive(Debug, Default, Deserialize)]
pub struct ImpersonationTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImpersonableUsersQuery {
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailItineraryRequest {
    pub custom_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub staff_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ResolveTicketRequest {
    #[serde(default)]
    pub resolution: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}
