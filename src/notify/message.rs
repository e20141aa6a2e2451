//! Reminder text and inline keyboard.

use crate::model::{Language, Task};
use crate::scheduler::NotificationKind;
use serde_json::{Value, json};

/// Callback data prefix for the "ready" button.
pub const READY_CALLBACK_PREFIX: &str = "ready_";

/// Callback data prefix for the "not going" button.
pub const NOT_GOING_CALLBACK_PREFIX: &str = "notgoing_";

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML message body for one reminder in `language`.
pub fn render(task: &Task, kind: NotificationKind, language: Language) -> String {
    let emoji = match kind {
        NotificationKind::WeekBefore => "📅",
        NotificationKind::DayBefore => "⏰",
    };
    let (headline, created_by) = match (language, kind) {
        (Language::Uk, NotificationKind::WeekBefore) => {
            ("Нагадування: через тиждень подія!", "Створив")
        }
        (Language::Uk, NotificationKind::DayBefore) => ("Нагадування: завтра подія!", "Створив"),
        (Language::En, NotificationKind::WeekBefore) => ("Reminder: event in a week!", "Created by"),
        (Language::En, NotificationKind::DayBefore) => ("Reminder: event tomorrow!", "Created by"),
    };

    format!(
        "{emoji} <b>{headline}</b>\n\n📝 <b>{}</b>\n👤 {created_by}: @{}",
        escape_html(&task.title),
        escape_html(&task.created_by_username)
    )
}

/// Deep link that opens the task in the companion app.
pub fn open_link(app_link: &str, task: &Task) -> String {
    format!("{}?startapp=task_{}", app_link.trim_end_matches('?'), task.id)
}

/// `reply_markup` with ready / not going / open buttons.
pub fn keyboard(task: &Task, language: Language, app_link: &str) -> Value {
    let (ready, not_going, open) = match language {
        Language::Uk => ("✅ Готовий", "❌ Не йду", "🔗 Відкрити"),
        Language::En => ("✅ Ready", "❌ Not going", "🔗 Open"),
    };

    let mut row = vec![
        json!({"text": ready, "callback_data": format!("{READY_CALLBACK_PREFIX}{}", task.id)}),
        json!({"text": not_going, "callback_data": format!("{NOT_GOING_CALLBACK_PREFIX}{}", task.id)}),
    ];
    if !app_link.trim().is_empty() {
        row.push(json!({"text": open, "url": open_link(app_link, task)}));
    }

    json!({ "inline_keyboard": [row] })
}
