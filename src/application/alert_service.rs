// Alert service - fan-out of one message to many receivers
use crate::domain::alert::{AlertMessage, Receiver};
use crate::error::{AggregateError, DeliveryFailure, SendError};
use async_trait::async_trait;
use std::sync::Arc;

/// A single delivery channel
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait AlertSender: Send + Sync {
    fn is_enabled(&self) -> bool;

    async fn send(&self, message: &AlertMessage, receiver: &Receiver) -> Result<(), SendError>;
}

#[derive(Clone)]
pub struct AlertService {
    sender: Arc<dyn AlertSender>,
}

impl AlertService {
    pub fn new(sender: Arc<dyn AlertSender>) -> Self {
        Self { sender }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_enabled()
    }

    /// Attempt every receiver; failures are collected, not short-circuited
    pub async fn send_to_multiple(&self, message: &AlertMessage, receivers: &[Receiver]) -> Result<(), AggregateError> {
        let mut failures = Vec::new();

        for receiver in receivers {
            if let Err(error) = self.sender.send(message, receiver).await {
                tracing::warn!("Failed to send '{}' to {}: {}", message.subject, receiver.email, error);
                failures.push(DeliveryFailure {
                    receiver: receiver.email.clone(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError { failures })
        }
    }
}
