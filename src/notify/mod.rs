//! Avisos por email y SMS de recordatorios próximos a vencer.

pub mod email;
pub mod jobs;
pub mod sms;

use async_trait::async_trait;
use thiserror::Error;

use crate::reminders::{ReminderStatus, ReminderView};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Twilio returned {status}: {body}")]
    Twilio { status: u16, body: String },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html_body: &str) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

pub fn email_subject(count: usize) -> String {
    format!("CarMonitor: {} upcoming reminder(s)", count)
}

pub fn status_color(status: ReminderStatus) -> &'static str {
    match status {
        ReminderStatus::Overdue => "#dc2626",
        ReminderStatus::Urgent => "#ea580c",
        ReminderStatus::Warning => "#ca8a04",
        _ => "#16a34a",
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn build_reminder_email_html(reminders: &[ReminderView]) -> String {
    let rows: String = reminders
        .iter()
        .map(|r| {
            format!(
                "<tr style='border-bottom: 1px solid #eee;'>\
                 <td style='padding: 10px;'>{}</td>\
                 <td style='padding: 10px;'>{}</td>\
                 <td style='padding: 10px;'>{}</td>\
                 <td style='padding: 10px; color: {};'>{}</td>\
                 </tr>",
                escape_html(&r.vehicle_name),
                escape_html(&r.reminder_type),
                r.due_date.format("%b %d, %Y"),
                status_color(r.status),
                r.status.as_str().to_uppercase(),
            )
        })
        .collect();

    format!(
        "<html>\
         <body style='font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;'>\
         <h2 style='color: #333;'>Vehicle Reminders</h2>\
         <p>The following reminders are due within the next 7 days:</p>\
         <table style='width: 100%; border-collapse: collapse;'>\
         <thead><tr style='background: #f5f5f5;'>\
         <th style='padding: 10px; text-align: left;'>Vehicle</th>\
         <th style='padding: 10px; text-align: left;'>Type</th>\
         <th style='padding: 10px; text-align: left;'>Due Date</th>\
         <th style='padding: 10px; text-align: left;'>Status</th>\
         </tr></thead>\
         <tbody>{}</tbody>\
         </table>\
         <p style='margin-top: 20px; color: #666;'>Log in to CarMonitor to manage your reminders.</p>\
         </body>\
         </html>",
        rows
    )
}

pub fn build_sms_body(reminders: &[ReminderView]) -> String {
    let mut body = String::from("CarMonitor: due tomorrow");
    for r in reminders {
        body.push_str(&format!("\n- {} for {}", r.reminder_type, r.vehicle_name));
    }
    body
}
