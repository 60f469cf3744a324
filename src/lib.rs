//! nCVM: a small concatenative virtual machine in the Forth family.
//! The binary (`main.rs`) is a thin wrapper around [`repl::run`]; this
//! library crate is what `tests/` drives directly against a
//! memory-backed [`vm::stream::Stream`], the way the teacher's `f3`
//! splits its `kernel`/`runtime`/`internals` library from its `main.rs`.

pub mod config;
pub mod internals;
pub mod messages;
pub mod repl;
pub mod vm;
