use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;

use super::{
    build_reminder_email_html, build_sms_body, email::SmtpMailer, email_subject, sms::TwilioSms,
    EmailSender, SmsSender,
};
use crate::{
    db,
    reminders::{build_reminder_views, ReminderView, URGENT_WITHIN_DAYS},
    state::AppState,
};

async fn views_for_user(
    pool: &SqlitePool,
    user_id: i64,
    today: NaiveDate,
) -> Result<Vec<ReminderView>, sqlx::Error> {
    let snapshot = db::snapshot_for_user(pool, user_id).await?;
    Ok(build_reminder_views(&snapshot.reminders, &snapshot.vehicles, today))
}

/// Pendientes que vencen en los próximos 7 días, incluidos los vencidos.
pub fn due_within_week(views: Vec<ReminderView>) -> Vec<ReminderView> {
    let mut due: Vec<ReminderView> = views
        .into_iter()
        .filter(|r| !r.is_completed && r.days_until_due <= URGENT_WITHIN_DAYS)
        .collect();
    due.sort_by_key(|r| r.due_date);
    due
}

pub fn due_tomorrow(views: Vec<ReminderView>) -> Vec<ReminderView> {
    views
        .into_iter()
        .filter(|r| !r.is_completed && r.days_until_due == 1)
        .collect()
}

/// Envía a cada usuario con email sus recordatorios de la semana.
/// Devuelve cuántos emails se enviaron; un fallo de envío no corta el resto.
pub async fn send_daily_reminder_emails(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    today: NaiveDate,
) -> Result<usize, sqlx::Error> {
    tracing::info!("Running daily reminder email job");

    let users = db::users_with_email(pool).await?;
    if users.is_empty() {
        tracing::info!("No users with email configured");
        return Ok(0);
    }

    let mut sent = 0;
    for user in users {
        let Some(email) = user.email.as_deref() else {
            continue;
        };

        let reminders = due_within_week(views_for_user(pool, user.id, today).await?);
        if reminders.is_empty() {
            tracing::debug!(user_id = user.id, "No upcoming reminders within 7 days");
            continue;
        }

        let html = build_reminder_email_html(&reminders);
        match sender
            .send_email(email, &email_subject(reminders.len()), &html)
            .await
        {
            Ok(()) => {
                tracing::info!(to = email, count = reminders.len(), "Email sent");
                sent += 1;
            }
            Err(e) => tracing::error!(to = email, "Failed to send email: {}", e),
        }
    }

    Ok(sent)
}

/// SMS a los usuarios que lo activaron, un día antes del vencimiento.
pub async fn send_sms_notifications(
    pool: &SqlitePool,
    sender: &dyn SmsSender,
    today: NaiveDate,
) -> Result<usize, sqlx::Error> {
    tracing::info!("Running daily SMS notification job");

    let users = db::users_with_sms_enabled(pool).await?;
    let mut sent = 0;
    for user in users {
        let Some(phone) = user.phone_number.as_deref() else {
            continue;
        };

        let reminders = due_tomorrow(views_for_user(pool, user.id, today).await?);
        if reminders.is_empty() {
            continue;
        }

        match sender.send_sms(phone, &build_sms_body(&reminders)).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::error!(user_id = user.id, "Failed to send SMS: {}", e),
        }
    }

    Ok(sent)
}

/// Tiempo hasta la próxima vez que el reloj UTC marque `hour`:00.
pub fn duration_until_next(now: DateTime<Utc>, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date_naive().and_time(at).and_utc();
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

async fn run_daily<F, Fut>(name: &'static str, hour: u32, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let wait = duration_until_next(Utc::now(), hour);
        tracing::info!(job = name, "next run in {}s", wait.as_secs());
        tokio::time::sleep(wait).await;
        job().await;
    }
}

/// Lanza los trabajos diarios de email y SMS que estén configurados.
pub fn spawn_scheduled_jobs(state: AppState) {
    let mailer = SmtpMailer::from_config(&state.config.smtp);
    let sms = TwilioSms::from_config(state.http.clone(), &state.config.twilio);

    match mailer {
        Ok(Some(mailer)) => {
            let mailer = Arc::new(mailer);
            let hour = state.config.email_job_hour;
            let state = state.clone();
            tokio::spawn(run_daily("daily-reminder-emails", hour, move || {
                let state = state.clone();
                let mailer = mailer.clone();
                async move {
                    let today = state.clock.today();
                    if let Err(e) = send_daily_reminder_emails(&state.pool, &*mailer, today).await {
                        tracing::error!("Daily reminder email job failed: {}", e);
                    }
                }
            }));
        }
        Ok(None) => tracing::warn!("Email not configured, daily reminder emails disabled"),
        Err(e) => tracing::error!("Invalid email configuration: {}", e),
    }

    match sms {
        Some(sms) => {
            tracing::info!("Twilio SMS service initialized");
            let sms = Arc::new(sms);
            let hour = state.config.sms_job_hour;
            tokio::spawn(run_daily("daily-sms-notifications", hour, move || {
                let state = state.clone();
                let sms = sms.clone();
                async move {
                    let today = state.clock.today();
                    if let Err(e) = send_sms_notifications(&state.pool, &*sms, today).await {
                        tracing::error!("Daily SMS job failed: {}", e);
                    }
                }
            }));
        }
        None => tracing::warn!("Twilio SMS service not configured, SMS notifications disabled"),
    }
}
