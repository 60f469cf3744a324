//! Raw-mode line editing for the interactive REPL, kept close to the
//! teacher's own split: a thin `terminal` wrapper around
//! `crossterm::terminal`'s enable/disable, and `tui`'s line editor built
//! on top of it.

pub mod terminal;
pub mod tui;
