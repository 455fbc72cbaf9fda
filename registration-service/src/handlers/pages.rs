//! Human-readable pages for the approve/deny links.

use crate::token::RegistrationPayload;

const PAGE_STYLE: &str = "body{font-family:Arial,sans-serif;max-width:600px;margin:50px auto;\
                          padding:20px;text-align:center}\
                          .info{background:#f8f9fa;padding:15px;border-radius:5px;margin:20px 0}";

fn page(title: &str, title_color: &str, body: &str) -> String {
    format!(
        "<html><head><title>{title}</title><style>{PAGE_STYLE}\
         h1{{color:{title_color}}}</style></head>\
         <body><h1>{title}</h1>{body}</body></html>"
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn approved(payload: &RegistrationPayload) -> String {
    page(
        "Registration Approved",
        "#28a745",
        &format!(
            "<div class=\"info\">\
             <p><strong>Username:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Name:</strong> {}</p>\
             </div>\
             <p>User has been created successfully.</p>\
             <p>They will receive an email to set their password.</p>",
            escape(&payload.username),
            escape(&payload.email),
            escape(&payload.display_name()),
        ),
    )
}

pub fn already_exists(payload: &RegistrationPayload) -> String {
    page(
        "User Already Exists",
        "#28a745",
        &format!(
            "<p>User {} was already created.</p>",
            escape(&payload.username)
        ),
    )
}

pub fn denied(payload: &RegistrationPayload) -> String {
    page(
        "Registration Denied",
        "#dc3545",
        &format!(
            "<div class=\"info\">\
             <p><strong>Username:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             </div>\
             <p>Registration request has been denied.</p>",
            escape(&payload.username),
            escape(&payload.email),
        ),
    )
}

/// One page for every token failure. Which check failed is logged, never
/// shown.
pub fn invalid_link() -> String {
    page(
        "Invalid or Expired Link",
        "#dc3545",
        "<p>This link is invalid or has expired. Ask the user to submit a new \
         registration request.</p>",
    )
}

pub fn missing_token() -> String {
    page("Error", "#dc3545", "<p>Missing token.</p>")
}

pub fn directory_failure(detail: &str) -> String {
    page(
        "Error Creating User",
        "#dc3545",
        &format!("<p>{}</p>", escape(detail)),
    )
}
