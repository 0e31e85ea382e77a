//! Version-string assembly, mirroring the upstream `Info` struct: an
//! application name, a semantic version, and an optional build timestamp
//! baked in at compile time.

use std::fmt;

/// An optional build timestamp, supplied by the build environment as
/// `SERIAL_DISCOVERY_BUILD_TIMESTAMP` (e.g. wired up in CI). Empty when the
/// crate was built without it.
const BUILD_TIMESTAMP: &str = match option_env!("SERIAL_DISCOVERY_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "",
};

#[derive(Debug, Clone, Copy)]
pub struct Info {
    pub application: &'static str,
    pub version: &'static str,
    pub timestamp: &'static str,
}

impl Info {
    pub const fn current() -> Self {
        Info {
            application: "serial-discovery",
            version: env!("CARGO_PKG_VERSION"),
            timestamp: BUILD_TIMESTAMP,
        }
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (build timestamp: {})",
            self.application, self.version, self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_expected_one_liner_shape() {
        let info = Info::current();
        let text = info.to_string();
        assert!(text.starts_with("serial-discovery "));
        assert!(text.contains("(build timestamp:"));
    }
}
