//! debug: sink untuk klog!/kwarn!/kerror!
//!
//! Di bare metal log ditulis ke COM1. Di host (unit test) ke stderr,
//! selain itu dibuang.

use core::fmt;

#[cfg(target_os = "none")]
pub mod serial;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Fail,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Ok   => "[ OK ]",
            Level::Warn => "[WARN]",
            Level::Fail => "[FAIL]",
        }
    }
}

#[cfg(target_os = "none")]
pub fn log(level: Level, args: fmt::Arguments) {
    serial::print(format_args!("{} {}\n", level.tag(), args));
}

#[cfg(all(not(target_os = "none"), test))]
pub fn log(level: Level, args: fmt::Arguments) {
    std::eprintln!("{} {}", level.tag(), args);
}

#[cfg(all(not(target_os = "none"), not(test)))]
pub fn log(_level: Level, _args: fmt::Arguments) {}
