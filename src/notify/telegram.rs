use crate::config::TelegramConfig;
use crate::error::{PrepError, Result};
use crate::model::{Task, User};
use crate::notify::message;
use crate::notify::traits::Dispatcher;
use crate::scheduler::NotificationKind;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Telegram Bot API dispatcher.
///
/// Sends one `sendMessage` per recipient, in the recipient's language, with
/// an inline keyboard for answering straight from the chat.
#[derive(Clone)]
pub struct TelegramDispatcher {
    bot_token: String,
    api_base_url: String,
    app_link: String,
    client: reqwest::Client,
}

impl TelegramDispatcher {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            app_link: config.app_link.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, self.bot_token)
    }

    async fn send_to(&self, user: &User, task: &Task, kind: NotificationKind) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": user.id,
            "text": message::render(task, kind, user.language),
            "parse_mode": "HTML",
            "reply_markup": message::keyboard(task, user.language, &self.app_link),
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| PrepError::Dispatch(format!("telegram request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PrepError::Dispatch(format!(
                "telegram send failed ({status}): {body}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for TelegramDispatcher {
    fn id(&self) -> &'static str {
        "telegram"
    }

    async fn dispatch(
        &self,
        recipients: &[User],
        task: &Task,
        kind: NotificationKind,
    ) -> Result<()> {
        if self.bot_token.trim().is_empty() {
            return Err(PrepError::Dispatch("telegram bot token is empty".to_owned()));
        }

        let mut failures = Vec::new();
        for user in recipients {
            match self.send_to(user, task, kind).await {
                Ok(()) => debug!(user_id = user.id, task_id = %task.id, %kind, "reminder sent"),
                Err(e) => {
                    warn!(user_id = user.id, task_id = %task.id, "reminder not delivered: {e}");
                    failures.push(format!("{}: {e}", user.id));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PrepError::Dispatch(format!(
                "{} of {} recipients failed: {}",
                failures.len(),
                recipients.len(),
                failures.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::model::{Language, NewTask, NewUser};
    use crate::time::Stamp;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher(server: &MockServer) -> TelegramDispatcher {
        TelegramDispatcher::new(&TelegramConfig {
            bot_token: "TOKEN".to_owned(),
            api_base_url: server.uri(),
            app_link: "https://t.me/prep_bot/app".to_owned(),
        })
    }

    fn user(id: i64, language: Language) -> User {
        let mut user: NewUser = serde_json::from_value(serde_json::json!({
            "telegram_id": id,
            "username": format!("user{id}"),
        }))
        .unwrap();
        user.language = Some(language);
        user.into_user(Stamp::parse("2025-06-01T09:00").unwrap())
    }

    fn task() -> Task {
        NewTask {
            title: Some("Picnic".to_owned()),
            event_date: Some(Stamp::parse("2025-06-10T18:00").unwrap()),
            preparation_date: Some(Stamp::parse("2025-06-07T10:00").unwrap()),
            created_by: Some(1),
            created_by_username: Some("alice".to_owned()),
            ..NewTask::default()
        }
        .into_task(Stamp::parse("2025-06-01T09:00").unwrap())
        .unwrap()
    }

    #[tokio::test]
    async fn sends_one_message_per_recipient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(serde_json::json!({"parse_mode": "HTML"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(2)
            .mount(&server)
            .await;

        let task = task();
        dispatcher(&server)
            .dispatch(
                &[user(10, Language::Uk), user(11, Language::En)],
                &task,
                NotificationKind::WeekBefore,
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let bodies: Vec<serde_json::Value> = requests
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        assert_eq!(bodies[0]["chat_id"], 10);
        assert!(bodies[0]["text"].as_str().unwrap().contains("тиждень"));
        assert!(bodies[1]["text"].as_str().unwrap().contains("in a week"));
        assert_eq!(
            bodies[1]["reply_markup"]["inline_keyboard"][0][0]["callback_data"],
            format!("ready_{}", task.id)
        );
    }

    #[tokio::test]
    async fn failing_recipient_does_not_stop_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"chat_id": 20})))
            .respond_with(ResponseTemplate::new(403).set_body_string("bot was blocked"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"chat_id": 21})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let err = dispatcher(&server)
            .dispatch(
                &[user(20, Language::Uk), user(21, Language::Uk)],
                &task(),
                NotificationKind::DayBefore,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::Dispatch(_)));
        assert!(err.to_string().contains("1 of 2"));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let config = TelegramConfig::default();
        let err = TelegramDispatcher::new(&config)
            .dispatch(&[], &task(), NotificationKind::DayBefore)
            .await
            .unwrap_err();
        assert!(matches!(err, PrepError::Dispatch(_)));
    }
}
