//! CPU temperature from the kernel thermal zone.
//!
//! `/sys/class/thermal/thermal_zone0/temp` holds a single integer in millidegrees Celsius
//! (e.g. `54321` is 54.321 °C).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{trace, warn};

/// Sysfs file of the CPU thermal zone.
pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads the CPU temperature in degrees Celsius, `None` if the zone can not be read.
pub fn read_temperature() -> Option<f64> {
    read_temperature_from(Path::new(THERMAL_ZONE_PATH))
}

/// Reads a millidegree value from the first line of `path`.
///
/// Lines shorter than four characters (newline included) are treated as a broken read.
pub fn read_temperature_from(path: &Path) -> Option<f64> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = %path.display(), "cannot open thermal zone: {}", err);
            return None;
        }
    };

    let mut line = String::new();
    if let Err(err) = BufReader::new(file).read_line(&mut line) {
        warn!(path = %path.display(), "cannot read thermal zone: {}", err);
        return None;
    }

    if line.len() < 4 {
        warn!(path = %path.display(), content = %line.trim(), "short read from thermal zone");
        return None;
    }

    match line.trim().parse::<i64>() {
        Ok(millidegrees) => {
            trace!(millidegrees, "read thermal zone");
            Some(millidegrees as f64 / 1000.0)
        }
        Err(_) => {
            warn!(path = %path.display(), content = %line.trim(), "expected integer millidegrees");
            None
        }
    }
}
