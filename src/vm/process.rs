//! A single execution context: the three stacks, the string stack, the
//! running function/instruction/local pointers, and the exception flags,
//! matching `ncvm.h`'s `Process` struct.

use crate::vm::stacks::{LocalStack, ReturnStack, ValueStack};
use crate::vm::strings::StringStack;
use crate::vm::value::Value;

/// Stack/runtime exception bits, matching `ncvm.h`'s `ExceptFlags` union
/// plus a `yield` bit the reference only sets ad hoc
/// (`exceptFlags.indiv.yF`, never declared in the `ExceptFlags` struct
/// itself — a gap in the reference this crate closes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExceptFlags {
    pub vs_of: bool,
    pub vs_uf: bool,
    pub rs_of: bool,
    pub rs_uf: bool,
    pub ls_of: bool,
    pub fn_of: bool,
    pub ins_of: bool,
    pub ch_of: bool,
    pub div_by_zero: bool,
    pub yield_: bool,
}

impl ExceptFlags {
    pub fn any(&self) -> bool {
        self.vs_of
            || self.vs_uf
            || self.rs_of
            || self.rs_uf
            || self.ls_of
            || self.fn_of
            || self.ins_of
            || self.ch_of
            || self.div_by_zero
    }

    pub fn clear(&mut self) {
        *self = ExceptFlags::default();
    }
}

/// What `vmFetch` leaves behind for `vmExecute` to act on.
#[derive(Default)]
pub struct FetchState {
    pub is_tail: bool,
    pub opcode: u32,
    pub do_return: bool,
}

pub struct Process {
    pub vs: ValueStack,
    pub ls: LocalStack,
    pub rs: ReturnStack,
    pub ss: StringStack,

    pub fp: u32,
    pub ip: u32,
    pub lp: u32,

    pub except: ExceptFlags,
    pub fetch: FetchState,

    /// Set by the top-level driver when a word's body hits `yield`: the
    /// return-stack depth its sentinel frame sits at, so `resume` knows
    /// how far the word still has to unwind before it's actually done.
    /// `None` when nothing is suspended.
    pub suspended_base: Option<u32>,
}

impl Process {
    pub fn new(
        max_value_count: usize,
        max_local_count: usize,
        max_return_count: usize,
        max_char_count: usize,
        max_string_count: usize,
    ) -> Self {
        Process {
            vs: ValueStack::new(max_value_count),
            ls: LocalStack::new(max_local_count),
            rs: ReturnStack::new(max_return_count),
            ss: StringStack::new(max_char_count, max_string_count),
            fp: 0,
            ip: 0,
            lp: 0,
            except: ExceptFlags::default(),
            fetch: FetchState::default(),
            suspended_base: None,
        }
    }

    #[inline(always)]
    pub fn push_value(&mut self, v: Value) {
        if !self.vs.push(v) {
            self.except.vs_of = true;
        }
    }

    #[inline(always)]
    pub fn pop_value(&mut self) -> Value {
        match self.vs.pop() {
            Some(v) => v,
            None => {
                self.except.vs_uf = true;
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc() -> Process {
        Process::new(8, 8, 8, 64, 8)
    }

    #[test]
    fn pop_on_empty_stack_sets_underflow_flag() {
        let mut p = proc();
        let v = p.pop_value();
        assert_eq!(v, 0);
        assert!(p.except.vs_uf);
        assert!(p.except.any());
    }

    #[test]
    fn push_past_capacity_sets_overflow_flag() {
        let mut p = Process::new(1, 8, 8, 64, 8);
        p.push_value(1);
        p.push_value(2);
        assert!(p.except.vs_of);
    }

    #[test]
    fn clear_resets_all_flags() {
        let mut p = proc();
        p.pop_value();
        assert!(p.except.any());
        p.except.clear();
        assert!(!p.except.any());
    }
}
