use chrono_tz::Tz;
use thiserror::Error;

use taskminder_models::{
    settings::{DeliverySettings, default_body_template, default_subject_template},
    task::Task,
};

const REMINDER_AT_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown time zone {0}")]
    UnknownTimezone(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub subject: String,
    pub body: String,
}

/// Subject and body templates for reminder notifications.
///
/// Recognised placeholders are `{title}`, `{description}`, `{reminder_at}` and
/// `{id}`. Anything else in braces is copied verbatim.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    subject: String,
    body: String,
    timezone: Tz,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self {
            subject: default_subject_template(),
            body: default_body_template(),
            timezone: Tz::UTC,
        }
    }
}

impl MessageTemplate {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, timezone: Tz) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            timezone,
        }
    }

    pub fn from_settings(settings: &DeliverySettings) -> Result<Self, TemplateError> {
        let timezone = settings
            .timezone
            .parse::<Tz>()
            .map_err(|_| TemplateError::UnknownTimezone(settings.timezone.clone()))?;

        Ok(Self::new(
            settings.subject_template.clone(),
            settings.body_template.clone(),
            timezone,
        ))
    }

    pub fn render(&self, task: &Task) -> ReminderMessage {
        ReminderMessage {
            subject: self.render_template(&self.subject, task),
            body: self.render_template(&self.body, task),
        }
    }

    fn render_template(&self, template: &str, task: &Task) -> String {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(first_open) = rest.find('{') {
            let Some(close) = rest[first_open..].find('}').map(|at| first_open + at) else {
                break;
            };
            // The innermost `{` before the `}` starts the placeholder.
            let open = rest[..close].rfind('{').unwrap_or(first_open);

            rendered.push_str(&rest[..open]);
            match self.placeholder(&rest[open + 1..close], task) {
                Some(value) => rendered.push_str(&value),
                None => rendered.push_str(&rest[open..=close]),
            }
            rest = &rest[close + 1..];
        }

        rendered.push_str(rest);
        rendered
    }

    fn placeholder(&self, name: &str, task: &Task) -> Option<String> {
        match name {
            "title" => Some(task.title.clone()),
            "description" => Some(task.description.clone().unwrap_or_default()),
            "id" => Some(task.id.to_string()),
            "reminder_at" => Some(
                task.reminder_at
                    .map(|at| {
                        at.with_timezone(&self.timezone)
                            .format(REMINDER_AT_FORMAT)
                            .to_string()
                    })
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn task() -> Task {
        Task {
            id: 3,
            title: "Pay rent".to_owned(),
            description: Some("Transfer to landlord".to_owned()),
            reminder_at: Some(Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap()),
            notified: false,
            completed: false,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    pub fn default_template_matches_plain_reminder_format() {
        let message = MessageTemplate::default().render(&task());

        assert_eq!(message.subject, "Task Reminder: Pay rent");
        assert_eq!(message.body, "Reminder for task: Pay rent");
    }

    #[test]
    pub fn renders_all_placeholders_in_configured_timezone() {
        let template = MessageTemplate::new(
            "#{id} {title}",
            "{description} (due {reminder_at})",
            chrono_tz::Europe::Berlin,
        );

        let message = template.render(&task());

        assert_eq!(message.subject, "#3 Pay rent");
        assert_eq!(message.body, "Transfer to landlord (due 2025-05-31 14:00 CEST)");
    }

    #[test]
    pub fn title_is_inserted_verbatim() {
        let mut task = task();
        task.title = "Reply to {id} thread".to_owned();

        let message = MessageTemplate::default().render(&task);

        assert_eq!(message.subject, "Task Reminder: Reply to {id} thread");
    }

    #[test]
    pub fn unknown_and_unterminated_placeholders_are_kept() {
        let template = MessageTemplate::new("{unknown} {title", "{} {title}", Tz::UTC);

        let message = template.render(&task());

        assert_eq!(message.subject, "{unknown} {title");
        assert_eq!(message.body, "{} Pay rent");
    }

    #[test]
    pub fn stray_brace_before_placeholder_is_kept() {
        let template = MessageTemplate::new("{x{title}", "{{id}}", Tz::UTC);

        let message = template.render(&task());

        assert_eq!(message.subject, "{xPay rent");
        assert_eq!(message.body, "{3}");
    }

    #[test]
    pub fn missing_optional_fields_render_empty() {
        let mut task = task();
        task.description = None;
        task.reminder_at = None;
        let template = MessageTemplate::new("{title}", "[{description}][{reminder_at}]", Tz::UTC);

        let message = template.render(&task);

        assert_eq!(message.body, "[][]");
    }

    #[test]
    pub fn unknown_timezone_is_rejected() {
        let settings = DeliverySettings {
            kind: Default::default(),
            recipient: "someone@example.com".to_owned(),
            subject_template: default_subject_template(),
            body_template: default_body_template(),
            timezone: "Mars/Olympus_Mons".to_owned(),
            email: None,
            telegram: None,
        };

        let result = MessageTemplate::from_settings(&settings);

        assert!(matches!(result, Err(TemplateError::UnknownTimezone(_))));
    }
}
