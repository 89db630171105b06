//! Plain-text renderings of the board and the console.

use chrono::{DateTime, TimeZone};
use queueboard_types::{CounterType, CurrentTicket, TicketId, Waiting};

use crate::console::{ConsoleView, NoticeKind, Phase};
use crate::display::DisplayView;

const RULE_WIDTH: usize = 44;

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn join_ids(ids: &[TicketId]) -> String {
    ids.iter()
        .map(TicketId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// The public "now serving" board at time `now`.
pub fn render_board<Tz>(view: &DisplayView, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut lines = vec![
        format!(
            "{:<width$}{}",
            "NOW SERVING",
            now.format("%H:%M:%S"),
            width = RULE_WIDTH.saturating_sub(8)
        ),
        rule(),
    ];

    match &view.state {
        None => lines.push("Loading queue...".to_owned()),
        Some(state) => {
            for counter in CounterType::ALL {
                let serving = state
                    .counter(counter)
                    .map(|status| status.serving.as_slice())
                    .unwrap_or_default();
                lines.push(if serving.is_empty() {
                    format!("{:<10}IDLE", counter.label())
                } else {
                    format!("{:<10}SERVING  {}", counter.label(), join_ids(serving))
                });
            }
            lines.push(rule());
            lines.push(match state.waiting() {
                Waiting::Tickets(ids) if !ids.is_empty() => {
                    format!("Waiting: {} ({})", ids.len(), join_ids(ids))
                }
                Waiting::Tickets(_) => "Waiting: 0".to_owned(),
                Waiting::Count(count) => format!("Waiting: {count}"),
                Waiting::Unreported => "Waiting: -".to_owned(),
            });
            if let Some(updated_at) = state.updated_at {
                lines.push(format!(
                    "Updated {}",
                    updated_at.with_timezone(&now.timezone()).format("%H:%M:%S")
                ));
            }
        }
    }

    lines.push(if view.connected {
        "Connected".to_owned()
    } else {
        "Disconnected".to_owned()
    });
    lines.join("\n")
}

/// The staff console.
pub fn render_console(view: &ConsoleView) -> String {
    let phase = match view.phase {
        Phase::Idle => "ready",
        Phase::Loading => "loading",
    };
    let mut lines = vec![
        format!("COUNTER {}  [{phase}]", view.selected.label()),
        rule(),
    ];

    for counter in CounterType::ALL {
        let marker = if counter == view.selected { '>' } else { ' ' };
        let ticket = match view.current.get(&counter) {
            None => "-".to_owned(),
            Some(CurrentTicket::Confirmed(ticket)) => format!("{} ({})", ticket.id, ticket.status),
            Some(CurrentTicket::Projected(projection)) => format!("{} (from board)", projection.id),
        };
        let own = if view.can_select(counter) { "  (you)" } else { "" };
        lines.push(format!("{marker} {:<10}{ticket}{own}", counter.label()));
    }
    lines.push(rule());

    if let Some(notice) = &view.notice {
        let tag = match notice.kind {
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
        };
        lines.push(format!("[{tag}] {}", notice.text));
    }

    let finish = if view.can_finish() { "finish" } else { "(finish)" };
    lines.push(format!(
        "commands: next | {finish} | select <counter> | dismiss | quit"
    ));
    lines.join("\n")
}
