//! Prometheus counters for the moderation workflow.
//!
//! Each [`Metrics`] owns its own registry, so tests and the running bot never
//! share global state. The intake server exposes [`Metrics::render`] at
//! `/metrics`.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    /// Labels: role (student/graduate), outcome (posted/malformed/delivery_failed)
    pub submissions: IntCounterVec,
    /// Labels: action (accept/reject), outcome (accepted/rejected/already_decided/in_flight/invite_failed)
    pub decisions: IntCounterVec,
    /// Labels: operation (send_message/edit_message/create_invite_link/get_chat_member)
    pub gateway_failures: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new("admission_submissions_total", "Form submissions received by the intake endpoint"),
            &["role", "outcome"],
        )?;
        let decisions = IntCounterVec::new(
            Opts::new("admission_decisions_total", "Admin button presses on review cards"),
            &["action", "outcome"],
        )?;
        let gateway_failures = IntCounterVec::new(
            Opts::new("admission_gateway_failures_total", "Failed outbound chat API calls"),
            &["operation"],
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(decisions.clone()))?;
        registry.register(Box::new(gateway_failures.clone()))?;

        Ok(Self {
            registry,
            submissions,
            decisions,
            gateway_failures,
        })
    }

    pub fn record_submission(&self, role: &str, outcome: &str) {
        self.submissions.with_label_values(&[role, outcome]).inc();
    }

    pub fn record_decision(&self, action: &str, outcome: &str) {
        self.decisions.with_label_values(&[action, outcome]).inc();
    }

    pub fn record_gateway_failure(&self, operation: &str) {
        self.gateway_failures.with_label_values(&[operation]).inc();
    }

    /// Text exposition format, ready to serve.
    pub fn render(&self) -> Result<(String, String), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        let body = String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))?;
        Ok((encoder.format_type().to_string(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_render() {
        let metrics = Metrics::new().unwrap();
        metrics.record_submission("graduate", "posted");
        metrics.record_submission("graduate", "posted");
        metrics.record_decision("accept", "accepted");
        metrics.record_gateway_failure("send_message");

        let (content_type, body) = metrics.render().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains(r#"admission_submissions_total{outcome="posted",role="graduate"} 2"#));
        assert!(body.contains(r#"admission_decisions_total{action="accept",outcome="accepted"} 1"#));
        assert!(body.contains(r#"admission_gateway_failures_total{operation="send_message"} 1"#));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();
        first.record_decision("reject", "rejected");

        let (_, body) = second.render().unwrap();
        assert!(!body.contains(r#"outcome="rejected""#));
    }
}
