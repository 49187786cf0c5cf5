//! Thin HTTP gateways to the external collaborator services
//!
//! Each gateway is a trait seam with a reqwest-backed implementation. Every
//! outbound call carries a bounded timeout; exceeding it is that dependency's
//! failure, never a hang. Non-2xx statuses become status-passthrough errors.

pub mod identity;
pub mod question;
pub mod room;

pub use identity::{HttpIdentityClient, IdentityClient};
pub use question::{HttpQuestionClient, QuestionClient};
pub use room::{HttpRoomClient, RoomClient};

use crate::error::MatchingError;

/// Map a reqwest transport failure to a downstream-unavailable error
pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> anyhow::Error {
    MatchingError::DownstreamUnavailable {
        service: service.to_string(),
        message: err.to_string(),
    }
    .into()
}

/// Map a non-2xx response to a status-passthrough error
pub(crate) async fn status_error(service: &str, response: reqwest::Response) -> anyhow::Error {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    MatchingError::Downstream {
        service: service.to_string(),
        status,
        message,
    }
    .into()
}
