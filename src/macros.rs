macro_rules! impl_to_perf_string_on_to_string {
    ($($t:ty), *) => {
        $(
            impl ToPerfString for $t {
                fn to_perf_string(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

/// Lets you simply create a resource from a name and multiple results. It's a bit like the
/// vec! macro.
/// ```rust
/// # #[macro_use]
/// # extern crate pvemon;
/// #
/// # use pvemon::{CheckResult, Metric, MetricName, State};
/// #
/// # fn main() {
/// let r1 = CheckResult::new(State::Ok, "online", Metric::new(MetricName::NodeStatus, true));
/// let r2 = CheckResult::new(State::Critical, "stopped", Metric::new(MetricName::VmStatus, "stopped"));
/// let resource = resource!["PROXMOX"; r1, r2];
/// assert_eq!(resource.state(), State::Critical);
/// # }
/// ```
#[macro_export]
macro_rules! resource {
    ($name:expr; $( $r:expr ), *) => {
        {
            let mut r = $crate::Resource::new($name);
            $(
                r.push($r);
            )*
            r
        }
    };
}

/// Joins a perfdata label and its fields as `label=value;warn;crit;min;max`, dropping trailing
/// empty fields.
macro_rules! metric_string {
    ($name:expr, $( $tps:expr), *) => {
        {
            let mut s = String::new();
            s.push_str(&format!("{}=", $name));
            $(
                s.push_str(&$tps.to_perf_string());
                s.push(';');
            )*
            s.trim_end_matches(';').to_string()
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{CheckResult, Metric, MetricName, State, ToPerfString};

    #[test]
    fn test_resource_macro() {
        let r1 = CheckResult::new(State::Ok, "", Metric::new(MetricName::ServiceStatus, true));
        let r2 = r1.clone();

        let resource = resource!["test"; r1.clone()];
        assert_eq!(resource.results().len(), 1);
        let resource = resource!["test"; r1, r2];
        assert_eq!(resource.results().len(), 2);
    }

    #[test]
    fn test_metric_string_trims_empty_fields() {
        let none: Option<f64> = None;
        assert_eq!(metric_string!("load", 1.5, none, none), "load=1.5");
        assert_eq!(metric_string!("load", 1.5, none, Some(3.0)), "load=1.5;;3");
    }
}
