use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct SchedulerSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_dispatch_concurrency")]
    pub dispatch_concurrency: usize,
    #[serde(default)]
    pub skip_completed: bool,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            dispatch_concurrency: default_dispatch_concurrency(),
            skip_completed: false,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    #[default]
    Console,
    Email,
    Telegram,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EmailSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TelegramSettings {
    pub token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeliverySettings {
    #[serde(default)]
    pub kind: DeliveryKind,
    pub recipient: String,
    #[serde(default = "default_subject_template")]
    pub subject_template: String,
    #[serde(default = "default_body_template")]
    pub body_template: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub email: Option<EmailSettings>,
    pub telegram: Option<TelegramSettings>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    pub delivery: DeliverySettings,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_dispatch_concurrency() -> usize {
    1
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_database_url() -> String {
    "sqlite://taskminder.db".to_owned()
}

fn default_max_connections() -> u32 {
    5
}

fn default_smtp_port() -> u16 {
    587
}

pub fn default_subject_template() -> String {
    "Task Reminder: {title}".to_owned()
}

pub fn default_body_template() -> String {
    "Reminder for task: {title}".to_owned()
}

fn default_timezone() -> String {
    "UTC".to_owned()
}
