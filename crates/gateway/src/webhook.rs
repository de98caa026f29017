//! Inbound messaging webhook.

use {
    axum::{
        Form,
        extract::{State, rejection::FormRejection},
        http::StatusCode,
        response::{IntoResponse, Json, Response},
    },
    parley_common::types::InboundMessage,
    serde::{Deserialize, Serialize},
    tracing::{debug, error},
};

use crate::state::AppState;

/// Message shown when the request failed for reasons the sender cannot fix.
pub const INTERNAL_ERROR_MSG: &str = "Something went wrong, please try again later";

/// Form fields posted by the provider. Other fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "ProfileName")]
    pub profile_name: Option<String>,
}

impl WebhookForm {
    /// Typed extraction; the reply pipeline never sees the raw form.
    #[must_use]
    pub fn into_inbound(self, channel_prefix: &str) -> InboundMessage {
        InboundMessage::from_fields(
            self.from.as_deref(),
            self.body.as_deref(),
            self.profile_name.as_deref(),
            channel_prefix,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Success,
    Failure,
}

/// JSON acknowledgment returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub msg: String,
    pub response: ResponseKind,
}

pub async fn whatsapp_webhook_handler(
    State(state): State<AppState>,
    form: Result<Form<WebhookForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(error = %rejection, "unreadable webhook form, treating fields as absent");
            WebhookForm::default()
        },
    };
    let inbound = form.into_inbound(&state.channel_prefix);

    match state.orchestrator.handle(&inbound).await {
        Ok(outcome) => {
            let response = if outcome.is_success() {
                ResponseKind::Success
            } else {
                ResponseKind::Failure
            };
            Json(WebhookResponse {
                msg: outcome.acknowledgment().to_string(),
                response,
            })
            .into_response()
        },
        Err(e) => {
            error!(
                phone = inbound.phone.as_deref().unwrap_or(""),
                error = %e,
                "failed to handle inbound message"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse {
                    msg: INTERNAL_ERROR_MSG.to_string(),
                    response: ResponseKind::Failure,
                }),
            )
                .into_response()
        },
    }
}
