//! Process-wide debug toggle.
//!
//! Parsing is permissive: anything that is not clearly "on" turns debugging
//! off rather than failing.

use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Requested debug state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugMode {
    On,
    Off,
}

impl DebugMode {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl From<bool> for DebugMode {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

impl From<i64> for DebugMode {
    fn from(level: i64) -> Self {
        (level > 0).into()
    }
}

impl From<i32> for DebugMode {
    fn from(level: i32) -> Self {
        i64::from(level).into()
    }
}

impl From<u32> for DebugMode {
    fn from(level: u32) -> Self {
        (level > 0).into()
    }
}

impl From<&str> for DebugMode {
    fn from(mode: &str) -> Self {
        (!mode.eq_ignore_ascii_case("off")).into()
    }
}

impl From<String> for DebugMode {
    fn from(mode: String) -> Self {
        mode.as_str().into()
    }
}

impl<T: Into<DebugMode>> From<Option<T>> for DebugMode {
    fn from(mode: Option<T>) -> Self {
        mode.map_or(Self::Off, Into::into)
    }
}

/// Update the process-wide debug toggle.
pub fn set_debug(mode: impl Into<DebugMode>) {
    DEBUG.store(mode.into().is_on(), Ordering::Relaxed);
}

pub fn is_debug() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Emit a debug message, only while the toggle is on.
pub fn debug(message: impl AsRef<str>) {
    if is_debug() {
        tracing::info!(target: "hostfacts::debug", "{}", message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(DebugMode::from(true), DebugMode::On);
        assert_eq!(DebugMode::from(false), DebugMode::Off);
        assert_eq!(DebugMode::from(3_i64), DebugMode::On);
        assert_eq!(DebugMode::from(0_i64), DebugMode::Off);
        assert_eq!(DebugMode::from(-1_i32), DebugMode::Off);
        assert_eq!(DebugMode::from("OFF"), DebugMode::Off);
        assert_eq!(DebugMode::from("off"), DebugMode::Off);
        assert_eq!(DebugMode::from("verbose"), DebugMode::On);
        assert_eq!(DebugMode::from(None::<bool>), DebugMode::Off);
        assert_eq!(DebugMode::from(Some("yes")), DebugMode::On);
    }

    #[test]
    #[serial_test::serial(debug_toggle)]
    fn toggle_round_trip() {
        set_debug(1_i64);
        assert!(is_debug());
        set_debug("off");
        assert!(!is_debug());
    }
}
