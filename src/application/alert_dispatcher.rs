// Alert dispatcher - turns evaluated alerts into messages for the default receivers
use crate::application::alert_service::AlertService;
use crate::domain::alert::{Alert, AlertMessage, Priority, Receiver};
use crate::error::{AggregateError, DispatchError};
use chrono::{DateTime, Utc};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

pub struct AlertDispatcher {
    service: AlertService,
    receivers: Vec<Receiver>,
}

impl AlertDispatcher {
    pub fn new(service: AlertService, receivers: Vec<Receiver>) -> Self {
        Self { service, receivers }
    }

    pub fn is_enabled(&self) -> bool {
        self.service.is_enabled()
    }

    /// Send every alert to every default receiver. Alerting being off or
    /// having nobody to notify is not an error here; the alert is skipped.
    pub async fn dispatch(&self, alerts: &[Alert], now: DateTime<Utc>) -> Result<(), AggregateError> {
        if alerts.is_empty() {
            return Ok(());
        }
        if !self.service.is_enabled() {
            tracing::info!("Alert service not enabled, skipping {} alert(s)", alerts.len());
            return Ok(());
        }
        if self.receivers.is_empty() {
            tracing::info!("No receivers configured, skipping {} alert(s)", alerts.len());
            return Ok(());
        }

        let mut failures = Vec::new();
        for alert in alerts {
            let message = compose(alert, now);
            tracing::info!("Sending {:?} alert with priority {}", alert.kind(), message.priority);
            match self.service.send_to_multiple(&message, &self.receivers).await {
                Ok(()) => tracing::debug!("{:?} alert sent", alert.kind()),
                Err(e) => failures.extend(e.failures),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError { failures })
        }
    }

    pub async fn send_test(&self, now: DateTime<Utc>) -> Result<(), DispatchError> {
        if !self.service.is_enabled() {
            return Err(DispatchError::Disabled);
        }
        if self.receivers.is_empty() {
            return Err(DispatchError::NoReceivers);
        }

        let message = AlertMessage {
            subject: "Pool Telemetry Test Alert".to_string(),
            body: "This is a test alert from the pool telemetry service. \
                   If you received it, alerting is configured correctly."
                .to_string(),
            priority: Priority::Normal,
            timestamp: now,
        };
        self.service.send_to_multiple(&message, &self.receivers).await?;
        Ok(())
    }
}

pub fn compose(alert: &Alert, now: DateTime<Utc>) -> AlertMessage {
    let time = now.format(TIME_FORMAT);
    let (subject, body) = match alert {
        Alert::TempLow {
            current,
            expected,
            delta,
        } => (
            "Pool Temperature Alert: Below Expected".to_string(),
            format!(
                "Pool temperature is below the expected level.\n\n\
                 Current temperature: {:.1}°C\n\
                 Expected temperature: {:.1}°C\n\
                 Difference: {:.1}°C\n\n\
                 Time: {}\n\n\
                 Please check the pool heating.",
                current, expected, delta, time
            ),
        ),
        Alert::TempHigh {
            current,
            expected,
            delta,
        } => (
            "Pool Temperature Alert: Above Expected".to_string(),
            format!(
                "Pool temperature is above the expected level.\n\n\
                 Current temperature: {:.1}°C\n\
                 Expected temperature: {:.1}°C\n\
                 Difference: +{:.1}°C\n\n\
                 Time: {}\n\n\
                 Please check the pool heating.",
                current, expected, delta, time
            ),
        ),
        Alert::FlowLoss => (
            "CRITICAL: Pool Water Flow Issue".to_string(),
            format!(
                "No water flow detected to the pool probes.\n\n\
                 Status: water flow is NO\n\
                 Time: {}\n\n\
                 Check pump operation, valve positions, pipe blockages and the filter.\n\
                 Without flow the probes report stale values and equipment may be damaged.",
                time
            ),
        ),
    };

    AlertMessage {
        subject,
        body,
        priority: alert.priority(),
        timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::alert_service::MockAlertSender;
    use crate::error::SendError;
    use std::sync::Arc;

    fn receivers(n: usize) -> Vec<Receiver> {
        (0..n)
            .map(|i| Receiver {
                email: format!("r{}@example.com", i),
                name: String::new(),
            })
            .collect()
    }

    fn dispatcher(sender: MockAlertSender, n: usize) -> AlertDispatcher {
        AlertDispatcher::new(AlertService::new(Arc::new(sender)), receivers(n))
    }

    #[test]
    fn test_compose_low_temperature() {
        let alert = Alert::TempLow {
            current: 25.5,
            expected: 28.0,
            delta: -2.5,
        };
        let message = compose(&alert, Utc::now());
        assert_eq!(message.subject, "Pool Temperature Alert: Below Expected");
        assert_eq!(message.priority, Priority::High);
        assert!(message.body.contains("Current temperature: 25.5°C"));
        assert!(message.body.contains("Difference: -2.5°C"));
    }

    #[test]
    fn test_compose_flow_loss_is_critical() {
        let message = compose(&Alert::FlowLoss, Utc::now());
        assert_eq!(message.priority, Priority::Critical);
        assert!(message.subject.starts_with("CRITICAL"));
    }

    #[tokio::test]
    async fn test_dispatch_sends_each_alert_to_each_receiver() {
        let mut sender = MockAlertSender::new();
        sender.expect_is_enabled().return_const(true);
        sender
            .expect_send()
            .times(4)
            .returning(|_, _| Box::pin(async { Ok(()) }));

        let alerts = vec![
            Alert::TempHigh {
                current: 31.0,
                expected: 28.0,
                delta: 3.0,
            },
            Alert::FlowLoss,
        ];
        dispatcher(sender, 2).dispatch(&alerts, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_aggregates_failures_across_alerts() {
        let mut sender = MockAlertSender::new();
        sender.expect_is_enabled().return_const(true);
        sender.expect_send().times(4).returning(|message, receiver| {
            let fail = message.priority == Priority::Critical && receiver.email == "r1@example.com";
            Box::pin(async move {
                if fail {
                    Err(SendError::Delivery("rejected".to_string()))
                } else {
                    Ok(())
                }
            })
        });

        let alerts = vec![
            Alert::TempLow {
                current: 20.0,
                expected: 28.0,
                delta: -8.0,
            },
            Alert::FlowLoss,
        ];
        let err = dispatcher(sender, 2).dispatch(&alerts, Utc::now()).await.unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].receiver, "r1@example.com");
    }

    #[tokio::test]
    async fn test_dispatch_skips_when_disabled_or_no_receivers() {
        let mut sender = MockAlertSender::new();
        sender.expect_is_enabled().return_const(false);
        sender.expect_send().never();
        dispatcher(sender, 2)
            .dispatch(&[Alert::FlowLoss], Utc::now())
            .await
            .unwrap();

        let mut sender = MockAlertSender::new();
        sender.expect_is_enabled().return_const(true);
        sender.expect_send().never();
        dispatcher(sender, 0)
            .dispatch(&[Alert::FlowLoss], Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_test_reports_configuration_problems() {
        let mut sender = MockAlertSender::new();
        sender.expect_is_enabled().return_const(false);
        let err = dispatcher(sender, 1).send_test(Utc::now()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Disabled));

        let mut sender = MockAlertSender::new();
        sender.expect_is_enabled().return_const(true);
        let err = dispatcher(sender, 0).send_test(Utc::now()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoReceivers));
    }
}
