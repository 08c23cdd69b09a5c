//! One-second live status line in the log.

use chrono::{DateTime, Local, TimeZone};
use lumos_core::{ConnectionStatus, ScheduleTable, ShowViewModel, StatusHub};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

const LOG_TARGET: &str = "lumos::display";

const TICK: Duration = Duration::from_secs(1);

/// Render everything but the clock. Two ticks with the same status render equal.
#[must_use]
pub fn render_status(view: &ShowViewModel, connection: &ConnectionStatus) -> String {
    let badge = if view.is_live { "LIVE" } else { "OFFLINE" };
    let mut line = format!(
        "[{}] {} {} | {} | {}",
        view.theme, view.display_name, badge, view.current_sequence, view.next_show
    );

    if let (Some(percent), Some(remaining)) = (view.progress_percent, view.seconds_remaining) {
        use std::fmt::Write;
        let _ = write!(line, " | {percent:.0}% ({remaining}s left)");
    }
    if !connection.connected {
        line.push_str(" | controller offline");
    }
    line
}

/// Full display line including the wall clock
#[must_use]
pub fn render_line<Tz: TimeZone>(
    view: &ShowViewModel,
    connection: &ConnectionStatus,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{} | {}",
        render_status(view, connection),
        now.format("%H:%M:%S")
    )
}

/// Remembers the last rendered status so only changes are logged
#[derive(Debug, Default)]
struct LastStatus(Option<String>);

impl LastStatus {
    fn update(&mut self, status: String) -> bool {
        if self.0.as_deref() == Some(status.as_str()) {
            return false;
        }
        self.0 = Some(status);
        true
    }
}

/// Resolve and render the status every second until cancelled
pub async fn run_display(
    hub: Arc<StatusHub>,
    schedule: ScheduleTable,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = LastStatus::default();

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!(target: LOG_TARGET, "Display stopped");
                break;
            }
            _ = ticker.tick() => {
                let now = Local::now();
                let (view, connection) = hub.resolve_now(&now, &schedule).await;
                let line = render_line(&view, &connection, &now);

                if last.update(render_status(&view, &connection)) {
                    info!(target: LOG_TARGET, "{}", line);
                } else {
                    trace!(target: LOG_TARGET, "{}", line);
                }
            }
        }
    }
}
