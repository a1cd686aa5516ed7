// Alert notification interface
//
// The kiosk UI, a buzzer or a caretaker webhook all plug in here. The
// daemon ships with the log-based notifier only.

use super::engine::{alert_callback, AlertCallback};
use crate::models::AlertPayload;
use anyhow::Result;
use std::sync::Arc;

/// Receives every fired medication reminder
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: &AlertPayload) -> Result<()>;
}

/// Log-based alert notifier (default implementation)
///
/// Writes each reminder at WARN level so it stands out in the kiosk log.
pub struct LogAlertNotifier;

impl AlertNotifier for LogAlertNotifier {
    fn notify(&self, alert: &AlertPayload) -> Result<()> {
        tracing::warn!(
            alert_id = %alert.id,
            medicine_id = %alert.medicine_id,
            medicine_name = %alert.medicine_name,
            dosage = %alert.dosage,
            scheduled_time = %alert.scheduled_time,
            alert_type = "medication_due",
            "REMINDER: {} ({}) is due at {}",
            alert.medicine_name,
            alert.dosage,
            alert.scheduled_time
        );
        Ok(())
    }
}

/// Adapt a notifier into an engine subscription callback
pub fn notifier_callback(notifier: Arc<dyn AlertNotifier>) -> AlertCallback {
    alert_callback(move |alert| notifier.notify(alert))
}
