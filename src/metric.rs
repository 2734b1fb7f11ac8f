//! Measurements produced by probes and by the temperature reader.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::{Thresholds, ToPerfString};

/// The fixed set of things this crate knows how to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    NodeStatus,
    ServiceStatus,
    VmStatus,
    SubscriptionStatus,
    MemUsageTotal,
    MemUsageRate,
    CpuTemperature,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NodeStatus => "node_status",
            MetricName::ServiceStatus => "service_status",
            MetricName::VmStatus => "vm_status",
            MetricName::SubscriptionStatus => "subscription_status",
            MetricName::MemUsageTotal => "mem_usage_total",
            MetricName::MemUsageRate => "mem_usage_rate",
            MetricName::CpuTemperature => "cpu_temperature",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// An online/offline style flag.
    Flag(bool),
    /// A status token as reported by the cluster, e.g. `running` or `notfound`.
    Text(String),
    Number(f64),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        MetricValue::Flag(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_owned())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Unit {
    #[default]
    None,
    Percentage,
    Mebibytes,
    Celsius,
    Other(String),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::None => Ok(()),
            Unit::Percentage => f.write_str("%"),
            Unit::Mebibytes => f.write_str("MiB"),
            Unit::Celsius => f.write_str("C"),
            Unit::Other(s) => f.write_str(s),
        }
    }
}

/// A named measurement. A `None` value means the target was not found or could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: MetricName,
    value: Option<MetricValue>,
    unit: Unit,
    min: Option<f64>,
    thresholds: Option<Thresholds>,
}

impl Metric {
    pub fn new(name: MetricName, value: impl Into<MetricValue>) -> Self {
        Metric {
            name,
            value: Some(value.into()),
            unit: Unit::None,
            min: None,
            thresholds: None,
        }
    }

    /// A metric for a target which could not be found.
    pub fn absent(name: MetricName) -> Self {
        Metric {
            name,
            value: None,
            unit: Unit::None,
            min: None,
            thresholds: None,
        }
    }

    pub fn from_option(name: MetricName, value: Option<impl Into<MetricValue>>) -> Self {
        match value {
            Some(value) => Metric::new(name, value),
            None => Metric::absent(name),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    pub fn name(&self) -> MetricName {
        self.name
    }

    pub fn value(&self) -> Option<&MetricValue> {
        self.value.as_ref()
    }

    pub fn thresholds(&self) -> Option<&Thresholds> {
        self.thresholds.as_ref()
    }

    /// Human readable value, e.g. `85.00%` or `2048.5 MiB`.
    pub fn display_value(&self) -> String {
        match &self.value {
            None => "n/a".to_owned(),
            Some(MetricValue::Flag(true)) => "online".to_owned(),
            Some(MetricValue::Flag(false)) => "offline".to_owned(),
            Some(MetricValue::Text(s)) => s.clone(),
            Some(MetricValue::Number(n)) => match self.unit {
                Unit::Percentage => format!("{:.2}%", n),
                Unit::Mebibytes => format!("{:.1} MiB", n),
                Unit::Celsius => format!("{:.1}°C", n),
                ref unit => format!("{}{}", n, unit),
            },
        }
    }

    /// Performance data for numeric metrics, `None` for anything else.
    pub fn to_perf_string(&self) -> Option<String> {
        let value = self.value.as_ref()?.as_number()?;

        let name = self.name.as_str().replace('=', "_").replace('\'', "''");
        let name = if name.contains(' ') {
            format!("'{}'", name)
        } else {
            name
        };

        let warning = self.thresholds.as_ref().map(|t| t.warning.clone());
        let critical = self.thresholds.as_ref().map(|t| t.critical.clone());

        Some(metric_string!(
            name,
            format!("{}{}", value.to_perf_string(), self.unit),
            warning,
            critical,
            self.min
        ))
    }
}

impl ToPerfString for String {
    fn to_perf_string(&self) -> String {
        self.clone()
    }
}

/// One temperature reading and the time it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub celsius: Option<f64>,
    pub taken_at: DateTime<Utc>,
}

impl Sample {
    pub fn now(celsius: Option<f64>) -> Self {
        Sample {
            celsius,
            taken_at: Utc::now(),
        }
    }

    pub fn metric(&self) -> Metric {
        Metric::from_option(MetricName::CpuTemperature, self.celsius).with_unit(Unit::Celsius)
    }
}
