//! Contact form messages.

use crate::config::schema::ContactConfig;
use crate::contact::types::ContactSubmission;
use crate::mail::Email;

/// Escape text for inclusion in HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Notification to the café about a new submission.
pub fn operator_notification(config: &ContactConfig, submission: &ContactSubmission) -> Email {
    let topic = submission
        .subject
        .as_deref()
        .unwrap_or(&submission.inquiry_type);
    let or_missing = |v: &Option<String>| escape_html(v.as_deref().unwrap_or("Not provided"));

    let html = format!(
        "<h2>New Contact Form Submission</h2>\
         <p><strong>Name:</strong> {}</p>\
         <p><strong>Email:</strong> {}</p>\
         <p><strong>Phone:</strong> {}</p>\
         <p><strong>Inquiry Type:</strong> {}</p>\
         <p><strong>Subject:</strong> {}</p>\
         <hr/><p style=\"white-space: pre-line;\">{}</p>",
        escape_html(&submission.name),
        escape_html(&submission.email),
        or_missing(&submission.phone),
        escape_html(&submission.inquiry_type),
        or_missing(&submission.subject),
        escape_html(&submission.message),
    );

    Email {
        from: config.from_email.clone(),
        to: config.notify_email.clone(),
        reply_to: Some(submission.email.clone()),
        subject: format!("New Contact Form: {topic}"),
        html,
    }
}

/// Acknowledgement sent back to the person who wrote in.
pub fn auto_reply(config: &ContactConfig, submission: &ContactSubmission) -> Email {
    let business = escape_html(&config.business_name);
    let html = format!(
        "<h1>{business}</h1>\
         <p>Hi <strong>{}</strong>,</p>\
         <p>Thanks for reaching out to <strong>{business}</strong>! \
         We've received your message and one of our team members will get back to you within \
         <strong>24 hours</strong>.</p>\
         <p>Warm regards,<br/>The {business} Team</p>",
        escape_html(&submission.name),
    );

    Email {
        from: config.notify_email.clone(),
        to: submission.email.clone(),
        reply_to: Some(config.notify_email.clone()),
        subject: format!("Thank you for contacting {}", config.business_name),
        html,
    }
}
