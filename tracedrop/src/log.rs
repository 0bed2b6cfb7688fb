// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Self-contained leveled logging.
//!
//! The pipeline sits inside the tracing path, so it cannot report through
//! the tracing backend it feeds. Logs go straight to stdout/stderr through
//! the `td_*!` macros, filtered by a process-wide level.

use std::{
    fmt::{self, Display},
    str::FromStr,
    sync::atomic::{AtomicUsize, Ordering},
};

static MAX_LOG_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Error as usize);

pub fn set_max_level(lvl: LevelFilter) {
    MAX_LOG_LEVEL.store(lvl as usize, Ordering::Relaxed)
}

pub fn max_level() -> LevelFilter {
    match MAX_LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

#[repr(usize)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[non_exhaustive]
/// The level at which the library will log
pub enum LevelFilter {
    Off,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
}

impl FromStr for LevelFilter {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("debug") {
            Ok(LevelFilter::Debug)
        } else if s.eq_ignore_ascii_case("info") {
            Ok(LevelFilter::Info)
        } else if s.eq_ignore_ascii_case("warn") {
            Ok(LevelFilter::Warn)
        } else if s.eq_ignore_ascii_case("error") {
            Ok(LevelFilter::Error)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(LevelFilter::Off)
        } else {
            Err("log level filter should be one of DEBUG, INFO, WARN, ERROR, OFF")
        }
    }
}

impl Display for LevelFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filter = match self {
            LevelFilter::Debug => "DEBUG",
            LevelFilter::Info => "INFO",
            LevelFilter::Warn => "WARN",
            LevelFilter::Error => "ERROR",
            LevelFilter::Off => "OFF",
        };

        write!(f, "{filter}")
    }
}

#[repr(usize)]
#[derive(Clone, Copy, Debug, Hash, PartialEq)]
pub enum Level {
    Error = 1, // this value must match with LevelFilter::Error
    Warn,
    Info,
    Debug,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };

        write!(f, "{level}")
    }
}

impl PartialEq<LevelFilter> for Level {
    #[inline]
    fn eq(&self, other: &LevelFilter) -> bool {
        (*self as usize) == (*other as usize)
    }
}

impl PartialOrd<LevelFilter> for Level {
    #[inline]
    fn partial_cmp(&self, other: &LevelFilter) -> Option<std::cmp::Ordering> {
        Some((*self as usize).cmp(&(*other as usize)))
    }
}

pub fn print_log(lvl: Level, log: fmt::Arguments, file: &str, line: u32) {
    if lvl == LevelFilter::Error {
        eprintln!("\x1b[91m{lvl}\x1b[0m {file}:{line} - {log}");
    } else {
        println!("\x1b[93m{lvl}\x1b[0m {file}:{line} - {log}");
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_logger {
    //! Thread local, overridable logger so tests can assert on what the
    //! library logged.
    //!
    //! ```no_run
    //! let _log_guard = tracedrop::log::test_logger::activate_test_logger();
    //! tracedrop::td_debug!("my log");
    //! let logs = tracedrop::log::test_logger::take_test_logs().unwrap();
    //! // logs contains (Level::Debug, "my log")
    //! ```
    //!
    //! To capture logs emitted from threads spawned by the test, wrap the
    //! spawned function with [`with_local_logger`].
    use std::{cell::RefCell, sync::Arc};

    use super::Level;

    #[derive(Default)]
    struct TestLogger(std::sync::Mutex<Vec<(Level, String)>>);

    thread_local! {
        static LOCAL_LOGGER: RefCell<Option<Arc<TestLogger>>> = const { RefCell::new(None) };
    }

    pub fn print_log(lvl: Level, log: std::fmt::Arguments) {
        let _ = LOCAL_LOGGER.try_with(|l| {
            if let Some(l) = &*l.borrow() {
                l.0.lock().unwrap().push((lvl, log.to_string()))
            }
        });
    }

    pub fn with_local_logger<F: FnOnce() -> R, R>(f: F) -> impl FnOnce() -> R {
        let logger = LOCAL_LOGGER.try_with(|l| l.borrow().clone()).ok().flatten();
        move || {
            let _guard = LoggerGuard {
                prev: LOCAL_LOGGER.replace(logger),
            };
            f()
        }
    }

    pub struct LoggerGuard {
        prev: Option<Arc<TestLogger>>,
    }

    impl Drop for LoggerGuard {
        fn drop(&mut self) {
            LOCAL_LOGGER.set(self.prev.take());
        }
    }

    pub fn activate_test_logger() -> LoggerGuard {
        let prev = LOCAL_LOGGER.replace(Some(Arc::new(TestLogger::default())));
        LoggerGuard { prev }
    }

    pub fn take_test_logs() -> Option<Vec<(Level, String)>> {
        use std::ops::DerefMut;

        LOCAL_LOGGER
            .try_with(|l| {
                l.borrow()
                    .as_deref()
                    .map(|l| std::mem::take(l.0.lock().unwrap().deref_mut()))
            })
            .ok()
            .flatten()
    }
}

#[macro_export]
macro_rules! td_debug {
    // td_debug!("a {} event", "log")
    ($($arg:tt)+) => {
      $crate::td_log!($crate::log::Level::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! td_info {
  // td_info!("a {} event", "log")
  ($($arg:tt)+) => {
    $crate::td_log!($crate::log::Level::Info, $($arg)*)
  };
}

#[macro_export]
macro_rules! td_warn {
  // td_warn!("a {} event", "log")
  ($($arg:tt)+) => {
    $crate::td_log!($crate::log::Level::Warn, $($arg)*)
  };
}

#[macro_export]
macro_rules! td_error {
  // td_error!("a {} event", "log")
  ($($arg:tt)+) => {
    $crate::td_log!($crate::log::Level::Error, $($arg)*)
  };
}

#[macro_export]
macro_rules! td_log {
    ($lvl:expr, $($arg:tt)+) => {{
      let lvl = $lvl;
      if lvl <= $crate::log::max_level() {
        let loc = std::panic::Location::caller();
        $crate::log::print_log(lvl, format_args!($($arg)*), loc.file(), loc.line());
      }
      #[cfg(any(test, feature = "test-utils"))]
      {
        $crate::log::test_logger::print_log(lvl, format_args!($($arg)*))
      }
    }};
}

#[cfg(test)]
mod tests {
    use crate::log::{max_level, set_max_level, test_logger, Level, LevelFilter};

    #[test]
    fn test_default_max_level() {
        assert!(LevelFilter::Error == max_level());
    }

    #[test]
    fn test_level_and_filter_ordering() {
        const LEVELS: [Level; 4] = [Level::Error, Level::Warn, Level::Info, Level::Debug];
        const FILTERS: [LevelFilter; 4] = [
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ];

        for (lvl_index, lvl) in LEVELS.iter().enumerate() {
            assert!(*lvl > LevelFilter::Off);
            assert!(*lvl == FILTERS[lvl_index]);

            for filter_index in lvl_index..3 {
                assert!(*lvl < FILTERS[filter_index + 1]);
            }
        }
    }

    #[test]
    fn test_level_filter_parsing() {
        assert_eq!("debug".parse(), Ok(LevelFilter::Debug));
        assert_eq!("WARN".parse(), Ok(LevelFilter::Warn));
        assert_eq!("Off".parse(), Ok(LevelFilter::Off));
        assert!("verbose".parse::<LevelFilter>().is_err());
    }

    #[test]
    fn test_test_logger() {
        let _g = test_logger::activate_test_logger();
        td_debug!("debug log {}", "foo");
        std::thread::spawn(test_logger::with_local_logger(|| {
            td_warn!("debug log {}", "bar");
        }))
        .join()
        .unwrap();
        let test_logs = test_logger::take_test_logs().unwrap();
        assert_eq!(
            &test_logs,
            &[
                (Level::Debug, "debug log foo".into()),
                (Level::Warn, "debug log bar".into())
            ]
        );
    }
}
