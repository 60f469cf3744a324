//! Leveled diagnostics, printed to stderr, used by the REPL and the VM's
//! native words to report lookup/runtime problems without aborting the
//! process.

use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Error,
    Warning,
    Info,
    Debug,
}

pub struct Msg {
    level: DebugLevel,
}

impl Msg {
    pub fn new() -> Self {
        Msg {
            level: DebugLevel::Error,
        }
    }

    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
    }

    pub fn get_level(&self) -> DebugLevel {
        self.level
    }

    fn emit<T: Debug>(&self, level: DebugLevel, tag: &str, caller: &str, desc: &str, extra: Option<T>) {
        if level > self.level {
            return;
        }
        match extra {
            Some(v) => eprintln!("{tag} {caller}: {desc} ({v:?})"),
            None => eprintln!("{tag} {caller}: {desc}"),
        }
    }

    pub fn error<T: Debug>(&self, caller: &str, desc: &str, extra: Option<T>) {
        self.emit(DebugLevel::Error, "error", caller, desc, extra);
    }

    pub fn warning<T: Debug>(&self, caller: &str, desc: &str, extra: Option<T>) {
        self.emit(DebugLevel::Warning, "warning", caller, desc, extra);
    }

    pub fn info<T: Debug>(&self, caller: &str, desc: &str, extra: Option<T>) {
        self.emit(DebugLevel::Info, "info", caller, desc, extra);
    }

    pub fn debug<T: Debug>(&self, caller: &str, desc: &str, extra: Option<T>) {
        self.emit(DebugLevel::Debug, "debug", caller, desc, extra);
    }
}

impl Default for Msg {
    fn default() -> Self {
        Self::new()
    }
}
