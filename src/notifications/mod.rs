//! # Customer Notifications
//!
//! Customers are told when a sale is recorded for them and when their
//! motorcycle is repaired or delivered. Delivery is fire-and-forget: the
//! request that triggered it never waits on, or fails because of, the
//! messaging provider.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::work_order::WorkOrderStatus;

pub mod whatsapp;

pub use whatsapp::WhatsAppNotifier;

/// Event worth telling a customer about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    SaleRecorded {
        phone: String,
        customer_name: String,
        sale_id: Uuid,
        total: i64,
    },
    WorkOrderStatusChanged {
        phone: String,
        customer_name: String,
        work_order_id: Uuid,
        plate: String,
        status: WorkOrderStatus,
    },
}

impl Notification {
    pub fn phone(&self) -> &str {
        match self {
            Notification::SaleRecorded { phone, .. }
            | Notification::WorkOrderStatusChanged { phone, .. } => phone,
        }
    }

    /// Plain text body sent to the customer.
    pub fn message(&self) -> String {
        match self {
            Notification::SaleRecorded {
                customer_name,
                total,
                ..
            } => format!(
                "Hola {customer_name}, registramos tu compra por {}. Gracias por preferirnos.",
                format_amount(*total)
            ),
            Notification::WorkOrderStatusChanged {
                customer_name,
                plate,
                status,
                ..
            } => match status {
                WorkOrderStatus::Reparado => format!(
                    "Hola {customer_name}, tu moto {plate} ya está reparada y lista para recoger."
                ),
                WorkOrderStatus::Entregado => {
                    format!("Hola {customer_name}, tu moto {plate} fue entregada. ¡Buen viaje!")
                }
                WorkOrderStatus::Diagnosticando => {
                    format!("Hola {customer_name}, tu moto {plate} está en diagnóstico.")
                }
            },
        }
    }
}

/// Minor units rendered with two decimals
fn format_amount(minor_units: i64) -> String {
    let sign = if minor_units < 0 { "-" } else { "" };
    let abs = minor_units.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Whether a status change is one the customer hears about
pub fn notifies_customer(status: WorkOrderStatus) -> bool {
    matches!(status, WorkOrderStatus::Reparado | WorkOrderStatus::Entregado)
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid notifier configuration: {0}")]
    Config(String),

    #[error("recipient phone number is invalid: {0}")]
    InvalidRecipient(String),

    #[error("messaging request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("messaging provider rejected the message after {attempts} attempts (status {status})")]
    Rejected { attempts: u32, status: u16 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Used when no messaging provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::debug!(?notification, "Notifications disabled; dropping message");
        Ok(())
    }
}

/// Deliver in the background. Failures are logged and otherwise ignored.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        if let Err(err) = notifier.send(&notification).await {
            tracing::warn!(error = %err, "Customer notification failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    #[test]
    fn sale_message_formats_total() {
        let notification = Notification::SaleRecorded {
            phone: "3001234567".into(),
            customer_name: "Ana".into(),
            sale_id: Uuid::nil(),
            total: 4_550,
        };
        assert!(notification.message().contains("$45.50"));
        assert_eq!(notification.phone(), "3001234567");
    }

    #[test]
    fn only_repaired_and_delivered_notify() {
        assert!(notifies_customer(WorkOrderStatus::Reparado));
        assert!(notifies_customer(WorkOrderStatus::Entregado));
        assert!(!notifies_customer(WorkOrderStatus::Diagnosticando));
    }

    #[tokio::test]
    async fn dispatch_runs_in_background() {
        let recording = Arc::new(Recording::default());
        let notification = Notification::WorkOrderStatusChanged {
            phone: "3001234567".into(),
            customer_name: "Ana".into(),
            work_order_id: Uuid::nil(),
            plate: "ABC123".into(),
            status: WorkOrderStatus::Reparado,
        };

        dispatch(recording.clone(), notification.clone());

        for _ in 0..50 {
            if !recording.sent.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(recording.sent.lock().unwrap().as_slice(), &[notification]);
    }
}
