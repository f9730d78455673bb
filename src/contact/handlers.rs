//! Contact form handler.
//!
//! A submission is stored first. The operator notification and the
//! auto-reply are then sent independently; a failed send is logged and
//! counted but never fails the request.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Value};

use crate::contact::types::{ContactForm, NewContactSubmission};
use crate::http::sanitize::{sanitize_optional, sanitize_string};
use crate::http::{ApiError, AppState};
use crate::mail::{templates, Email, Mailer};
use crate::observability::metrics;

const MAX_NAME: usize = 100;
const MAX_EMAIL: usize = 254;
const MAX_PHONE: usize = 40;
const MAX_SUBJECT: usize = 200;
const MAX_MESSAGE: usize = 5000;

pub const DEFAULT_INQUIRY_TYPE: &str = "general";

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

/// Check and clean a raw form.
pub fn validate_form(form: ContactForm) -> Result<NewContactSubmission, ApiError> {
    let name = sanitize_string(form.name.as_deref().unwrap_or_default());
    let email = sanitize_string(form.email.as_deref().unwrap_or_default());
    let message = sanitize_string(form.message.as_deref().unwrap_or_default());

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(ApiError::bad_request("Name, email, and message are required."));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Please provide a valid email address."));
    }

    let phone = sanitize_optional(form.phone.as_deref());
    let subject = sanitize_optional(form.subject.as_deref());

    let over_limit = too_long(&name, MAX_NAME)
        || too_long(&email, MAX_EMAIL)
        || too_long(&message, MAX_MESSAGE)
        || phone.as_deref().is_some_and(|p| too_long(p, MAX_PHONE))
        || subject.as_deref().is_some_and(|s| too_long(s, MAX_SUBJECT));
    if over_limit {
        return Err(ApiError::bad_request("One or more fields exceed the maximum length."));
    }

    let inquiry_type = sanitize_optional(form.inquiry_type.as_deref())
        .filter(|t| !too_long(t, 50))
        .unwrap_or_else(|| DEFAULT_INQUIRY_TYPE.to_string());

    Ok(NewContactSubmission {
        name,
        email,
        phone,
        subject,
        message,
        inquiry_type,
    })
}

async fn deliver(mailer: &dyn Mailer, email: Email, kind: &'static str) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        tracing::warn!(error = %e, to = %to, kind, "Failed to send contact email");
        metrics::record_mail_failure();
    }
}

pub async fn submit_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(form) = payload?;
    let submission = validate_form(form)?;

    let saved = state.store.create_contact(submission).await?;
    metrics::record_contact_submission();
    tracing::info!(id = saved.id, inquiry_type = %saved.inquiry_type, "Contact submission stored");

    let contact = &state.config.contact;
    if contact.notify_email.trim().is_empty() {
        tracing::debug!("No notification address configured, skipping operator email");
    } else {
        deliver(
            state.mailer.as_ref(),
            templates::operator_notification(contact, &saved),
            "notification",
        )
        .await;
    }
    deliver(
        state.mailer.as_ref(),
        templates::auto_reply(contact, &saved),
        "auto_reply",
    )
    .await;

    Ok(Json(json!({ "ok": true, "id": saved.id })))
}
