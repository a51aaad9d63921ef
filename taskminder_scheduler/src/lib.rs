mod clock;
mod delivery;
mod dispatcher;
mod message;
mod scanner;
mod scheduler;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use delivery::{DeliveryError, NotificationTransport};
pub use dispatcher::{DispatchError, NotificationDispatcher, TaskOutcome};
pub use message::{MessageTemplate, ReminderMessage, TemplateError};
pub use scanner::{DueTaskScanner, ScanError};
pub use scheduler::{
    DueTaskScheduler, SchedulerConfig, SchedulerConfigError, SchedulerHandle, SchedulerState,
    StopError, TickReport, run_scheduler,
};

#[cfg(test)]
mod tests;
