//! Classification of metrics into nagios states.
//!
//! Rules, checked in this order:
//!
//! 1. a metric without value is UNKNOWN ("target not found"),
//! 2. a numeric metric carrying [`Thresholds`](crate::Thresholds) is judged by its ranges only,
//! 3. everything else is dispatched on the metric name:
//!    - `node_status` and `service_status` are OK when online, CRITICAL otherwise,
//!    - `subscription_status` is OK for `active` (any case), WARNING for `notfound`,
//!      UNKNOWN for any other token,
//!    - `vm_status` is OK for `running`, CRITICAL for `stopped`, UNKNOWN otherwise,
//!    - plain numeric metrics are OK.

use tracing::debug;

use crate::{CheckResult, Metric, MetricName, MetricValue, State};

pub const NOT_FOUND: &str = "target not found";
pub const UNRECOGNIZED: &str = "unrecognized metric";

/// Maps a metric to a state and a short summary.
pub fn evaluate(metric: &Metric) -> (State, String) {
    let name = metric.name();

    let value = match metric.value() {
        Some(value) => value,
        None => {
            debug!(%name, "metric has no value");
            return (State::Unknown, NOT_FOUND.to_owned());
        }
    };

    if let (Some(thresholds), Some(number)) = (metric.thresholds(), value.as_number()) {
        let state = thresholds.evaluate(number);
        debug!(%name, value = number, %state, "evaluated against thresholds");
        return (state, format!("{} is {}", name, metric.display_value()));
    }

    let state = match (name, value) {
        (MetricName::NodeStatus | MetricName::ServiceStatus, value) => {
            if is_online(value) {
                State::Ok
            } else {
                State::Critical
            }
        }
        (MetricName::SubscriptionStatus, MetricValue::Text(token)) => {
            subscription_state(token)
        }
        (MetricName::VmStatus, MetricValue::Text(status)) => match status.as_str() {
            "running" => State::Ok,
            "stopped" => State::Critical,
            _ => State::Unknown,
        },
        (
            MetricName::MemUsageTotal | MetricName::MemUsageRate | MetricName::CpuTemperature,
            MetricValue::Number(_),
        ) => State::Ok,
        _ => {
            debug!(%name, ?value, "no rule matches metric");
            return (State::Unknown, UNRECOGNIZED.to_owned());
        }
    };

    debug!(%name, ?value, %state, "evaluated");
    (state, message(metric, state))
}

/// Evaluates every metric into a [`CheckResult`].
pub fn evaluate_all(metrics: impl IntoIterator<Item = Metric>) -> Vec<CheckResult> {
    metrics
        .into_iter()
        .map(|metric| {
            let (state, message) = evaluate(&metric);
            CheckResult {
                state,
                message,
                metric,
            }
        })
        .collect()
}

fn is_online(value: &MetricValue) -> bool {
    match value {
        MetricValue::Flag(flag) => *flag,
        MetricValue::Number(n) => *n == 1.0,
        MetricValue::Text(s) => s == "1",
    }
}

fn subscription_state(token: &str) -> State {
    if token.eq_ignore_ascii_case("active") {
        State::Ok
    } else if token == "notfound" {
        State::Warning
    } else {
        State::Unknown
    }
}

fn message(metric: &Metric, state: State) -> String {
    match (metric.name(), state) {
        (MetricName::SubscriptionStatus, State::Ok) => "subscription is active".to_owned(),
        (MetricName::SubscriptionStatus, State::Warning) => "no subscription found".to_owned(),
        (MetricName::SubscriptionStatus, _) => {
            format!("unknown subscription status '{}'", metric.display_value())
        }
        (MetricName::VmStatus, State::Unknown) => {
            format!("unexpected VM status '{}'", metric.display_value())
        }
        (MetricName::NodeStatus | MetricName::ServiceStatus | MetricName::VmStatus, _) => {
            metric.display_value()
        }
        (name, _) => format!("{} is {}", name, metric.display_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Thresholds, Unit};

    fn state_of(metric: Metric) -> State {
        evaluate(&metric).0
    }

    #[test]
    fn test_absent_value_is_always_unknown() {
        for name in [
            MetricName::NodeStatus,
            MetricName::ServiceStatus,
            MetricName::VmStatus,
            MetricName::SubscriptionStatus,
            MetricName::MemUsageTotal,
            MetricName::MemUsageRate,
            MetricName::CpuTemperature,
        ] {
            let (state, message) = evaluate(&Metric::absent(name));
            assert_eq!(state, State::Unknown, "{name}");
            assert_eq!(message, NOT_FOUND);
        }

        let with_thresholds = Metric::absent(MetricName::MemUsageRate)
            .with_thresholds(Thresholds::new("80".parse().unwrap(), "90".parse().unwrap()));
        assert_eq!(state_of(with_thresholds), State::Unknown);
    }

    #[test]
    fn test_online_flags() {
        for name in [MetricName::NodeStatus, MetricName::ServiceStatus] {
            assert_eq!(state_of(Metric::new(name, true)), State::Ok);
            assert_eq!(state_of(Metric::new(name, false)), State::Critical);
            assert_eq!(state_of(Metric::new(name, 1.0)), State::Ok);
            assert_eq!(state_of(Metric::new(name, 0.0)), State::Critical);
        }

        assert_eq!(evaluate(&Metric::new(MetricName::NodeStatus, false)).1, "offline");
    }

    #[test]
    fn test_vm_status() {
        assert_eq!(state_of(Metric::new(MetricName::VmStatus, "running")), State::Ok);
        assert_eq!(state_of(Metric::new(MetricName::VmStatus, "stopped")), State::Critical);
        assert_eq!(state_of(Metric::new(MetricName::VmStatus, "paused")), State::Unknown);
        assert_eq!(state_of(Metric::absent(MetricName::VmStatus)), State::Unknown);
    }

    #[test]
    fn test_subscription_status() {
        let sub = |token: &str| state_of(Metric::new(MetricName::SubscriptionStatus, token));
        assert_eq!(sub("active"), State::Ok);
        assert_eq!(sub("Active"), State::Ok);
        assert_eq!(sub("ACTIVE"), State::Ok);
        assert_eq!(sub("notfound"), State::Warning);
        assert_eq!(sub("expired"), State::Unknown);
        assert_eq!(sub("invalid"), State::Unknown);
    }

    #[test]
    fn test_thresholds_take_precedence() {
        let thresholds = Thresholds::new("80".parse().unwrap(), "90".parse().unwrap());
        let rate = |value: f64| {
            Metric::new(MetricName::MemUsageRate, value)
                .with_unit(Unit::Percentage)
                .with_thresholds(thresholds.clone())
        };

        assert_eq!(state_of(rate(12.0)), State::Ok);
        assert_eq!(state_of(rate(85.0)), State::Warning);
        assert_eq!(state_of(rate(95.0)), State::Critical);
        assert_eq!(evaluate(&rate(85.0)).1, "mem_usage_rate is 85.00%");

        let unbounded = Metric::new(MetricName::MemUsageRate, 99.9)
            .with_thresholds(Thresholds::default());
        assert_eq!(state_of(unbounded), State::Ok);
    }

    #[test]
    fn test_unrecognized_metric() {
        let (state, message) = evaluate(&Metric::new(MetricName::VmStatus, 3.0));
        assert_eq!(state, State::Unknown);
        assert_eq!(message, UNRECOGNIZED);

        let (state, _) = evaluate(&Metric::new(MetricName::MemUsageRate, "full"));
        assert_eq!(state, State::Unknown);
    }

    #[test]
    fn test_evaluate_all() {
        let results = evaluate_all(vec![
            Metric::new(MetricName::MemUsageTotal, 512.0),
            Metric::absent(MetricName::MemUsageRate),
        ]);
        let states: Vec<State> = results.iter().map(|r| r.state).collect();
        assert_eq!(states, vec![State::Ok, State::Unknown]);
    }
}
