// Medication reminder scheduling: schedule state, the polling loop,
// alert de-duplication and the intake log

pub mod engine;
pub mod notifier;
pub mod regimens;
pub mod snapshot;

pub use engine::{alert_callback, AlertCallback, ReminderConfig, ReminderEngine, SubscriptionId, DEFAULT_LOG_LIMIT};
pub use notifier::{notifier_callback, AlertNotifier, LogAlertNotifier};
