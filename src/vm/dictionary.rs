//! The append-only function table. Reverse linear scan gives later
//! definitions shadowing priority over earlier ones with the same name,
//! the same way the teacher's `Kernel::add_builtin`/dictionary walk favors
//! the most recently defined word.

use crate::vm::process::Process;
use crate::vm::Vm;

pub type NativeFn = fn(&mut Vm, &mut Process);

#[derive(Clone, Copy)]
pub enum FunctionKind {
    Interpreted { ins_offset: u32, ins_count: u32 },
    Native(NativeFn),
}

pub struct Function {
    pub kind: FunctionKind,
    pub is_immediate: bool,
    pub name_offset: u32,
    pub in_vs: u32,
    pub out_vs: u32,
}

impl Function {
    pub fn is_native(&self) -> bool {
        matches!(self.kind, FunctionKind::Native(_))
    }
}

/// Sentinel arity used for REPL-driven/variadic native words (`:`, `repl`,
/// `see`, ...) whose effective stack effect depends on what they parse,
/// matching `std-words.c`'s `ALL = 0xFFFFFFFF`.
pub const ALL: u32 = 0xFFFF_FFFF;

pub struct Dictionary {
    funcs: Vec<Function>,
    chars: Vec<u8>,
    cap: usize,
    char_cap: usize,
}

impl Dictionary {
    pub fn new(max_function_count: usize, max_char_segment_size: usize) -> Self {
        Dictionary {
            funcs: Vec::with_capacity(max_function_count),
            chars: Vec::with_capacity(max_char_segment_size),
            cap: max_function_count,
            char_cap: max_char_segment_size,
        }
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Function {
        &self.funcs[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut Function {
        &mut self.funcs[idx]
    }

    pub fn name(&self, idx: usize) -> &str {
        self.name_at(self.funcs[idx].name_offset)
    }

    fn name_at(&self, offset: u32) -> &str {
        let start = offset as usize;
        let end = self.chars[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .unwrap_or(self.chars.len());
        std::str::from_utf8(&self.chars[start..end]).unwrap_or("")
    }

    fn add_const_string(&mut self, s: &str) -> Option<u32> {
        if self.chars.len() + s.len() + 1 > self.char_cap {
            return None;
        }
        let idx = self.chars.len() as u32;
        self.chars.extend_from_slice(s.as_bytes());
        self.chars.push(0);
        Some(idx)
    }

    /// Reverse scan from the most recent entry, matching `vmFindFunction`'s
    /// shadowing semantics. Returns `None` instead of the reference's
    /// `index + 1`/0 convention.
    pub fn find(&self, name: &str) -> Option<usize> {
        for idx in (0..self.funcs.len()).rev() {
            if self.name(idx) == name {
                return Some(idx);
            }
        }
        None
    }

    /// `None` on function-table or char-segment overflow; the caller (a
    /// guest-triggered `:`/`!`/`{`) is responsible for reporting the
    /// overflow and aborting rather than leaving a half-registered entry.
    pub fn allocate_interpreted(&mut self, name: &str) -> Option<usize> {
        if self.funcs.len() >= self.cap {
            return None;
        }
        let name_offset = self.add_const_string(name)?;
        let idx = self.funcs.len();
        self.funcs.push(Function {
            kind: FunctionKind::Interpreted {
                ins_offset: 0,
                ins_count: 0,
            },
            is_immediate: false,
            name_offset,
            in_vs: 0,
            out_vs: 0,
        });
        Some(idx)
    }

    /// Panics on overflow: only called at boot time to register the fixed
    /// hardware-opcode and standard-dictionary entries against capacities
    /// sized to hold them, never in response to guest input.
    pub fn add_native(
        &mut self,
        name: &str,
        is_immediate: bool,
        native: NativeFn,
        in_vs: u32,
        out_vs: u32,
    ) -> usize {
        assert!(self.funcs.len() < self.cap, "function table overflow");
        let name_offset = self
            .add_const_string(name)
            .expect("dictionary char segment overflow registering a built-in word");
        let idx = self.funcs.len();
        self.funcs.push(Function {
            kind: FunctionKind::Native(native),
            is_immediate,
            name_offset,
            in_vs,
            out_vs,
        });
        idx
    }

    pub fn set_immediate(&mut self, idx: usize, is_immediate: bool) {
        self.funcs[idx].is_immediate = is_immediate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_vm: &mut Vm, _p: &mut Process) {}

    #[test]
    fn find_favors_most_recent_definition() {
        let mut d = Dictionary::new(16, 256);
        d.allocate_interpreted("square").unwrap();
        let second = d.allocate_interpreted("square").unwrap();
        assert_eq!(d.find("square"), Some(second));
    }

    #[test]
    fn find_missing_is_none() {
        let d = Dictionary::new(16, 256);
        assert_eq!(d.find("nope"), None);
    }

    #[test]
    fn add_native_records_arity_and_immediacy() {
        let mut d = Dictionary::new(16, 256);
        let idx = d.add_native(":", true, noop, ALL, ALL);
        assert!(d.get(idx).is_immediate);
        assert!(d.get(idx).is_native());
        assert_eq!(d.get(idx).in_vs, ALL);
    }

    #[test]
    fn set_immediate_toggles_flag() {
        let mut d = Dictionary::new(16, 256);
        let idx = d.allocate_interpreted("w").unwrap();
        assert!(!d.get(idx).is_immediate);
        d.set_immediate(idx, true);
        assert!(d.get(idx).is_immediate);
    }

    #[test]
    fn allocate_past_capacity_returns_none() {
        let mut d = Dictionary::new(1, 64);
        assert!(d.allocate_interpreted("a").is_some());
        assert!(d.allocate_interpreted("b").is_none());
    }
}
