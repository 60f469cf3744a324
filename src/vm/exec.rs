//! Fetch/execute/next: the dense-match dispatch core, grounded on
//! `examples/original_source/ncvm.c`'s `vmFetch`/`vmExecute`/`vmNext`
//! (the definitive revision; `vm.c` is an earlier snapshot that lacks
//! `OP_CALL_IND`/`OP_YIELD` and is superseded). Restyled as a `match` the
//! way `internals/inner.rs`'s `i_definition` dispatch loop reads.

use crate::vm::dictionary::FunctionKind;
use crate::vm::process::Process;
use crate::vm::stacks::Return;
use crate::vm::value::{encode_call, operand, operation, HardOp, Value, OP_VALUE};
use crate::vm::Vm;

pub fn fetch(vm: &Vm, proc: &mut Process) {
    let func = vm.dictionary.get(proc.fp as usize);
    let (ins_offset, ins_count) = match func.kind {
        FunctionKind::Interpreted { ins_offset, ins_count } => (ins_offset, ins_count),
        FunctionKind::Native(_) => (0, 0),
    };

    proc.fetch.do_return = proc.ip >= ins_count;
    if !proc.fetch.do_return {
        let opcode = vm.heap.get(ins_offset + proc.ip);
        proc.fetch.opcode = opcode;
        proc.ip += 1;
        proc.fetch.is_tail = proc.ip >= ins_count;
    }
}

/// Seeds fetch state to invoke `word` as a normal (non-tail) call, the way
/// the REPL driver starts evaluating a top-level word.
pub fn set_call(proc: &mut Process, word: u32) {
    proc.fetch.opcode = encode_call(word);
    proc.fetch.do_return = false;
    proc.fetch.is_tail = false;
    proc.fp = word;
    proc.ip = 0;
}

/// Same, but in tail position: no return frame will be pushed for this
/// call. The REPL driver uses this under its own sentinel return frame so
/// top-level word execution never grows the return stack.
pub fn set_tail_call(proc: &mut Process, word: u32) {
    proc.fetch.opcode = encode_call(word);
    proc.fetch.do_return = false;
    proc.fetch.is_tail = true;
    proc.fp = word;
    proc.ip = 0;
}

/// Pops `n` values in the reference's eldest-first order: `s0` ends up
/// holding the value pushed earliest (deepest), `s[n-1]` the most recent.
fn pop_args(proc: &mut Process, n: u32) -> [Value; 4] {
    let mut s = [0u32; 4];
    for slot in (0..n.min(4) as usize).rev() {
        s[slot] = proc.pop_value();
    }
    s
}

fn execute_hard_op(vm: &Vm, proc: &mut Process, op: HardOp, is_tail: bool) {
    let (in_vs, _) = op.arity();
    let s = pop_args(proc, in_vs);

    match op {
        HardOp::Nop => {}
        HardOp::VsDrop => {}
        HardOp::VsDup => {
            proc.push_value(s[0]);
            proc.push_value(s[0]);
        }
        HardOp::VsRevRead => match proc.vs.peek_from_top(s[0] as usize) {
            Some(v) => proc.push_value(v),
            None => proc.except.vs_uf = true,
        },
        HardOp::U32Add => proc.push_value(s[0].wrapping_add(s[1])),
        HardOp::U32Sub => proc.push_value(s[0].wrapping_sub(s[1])),
        HardOp::U32Mul => proc.push_value(s[0].wrapping_mul(s[1])),
        HardOp::U32Div => {
            if s[1] == 0 {
                proc.except.div_by_zero = true;
            } else {
                proc.push_value(s[0] / s[1]);
            }
        }
        HardOp::U32Mod => {
            if s[1] == 0 {
                proc.except.div_by_zero = true;
            } else {
                proc.push_value(s[0] % s[1]);
            }
        }
        HardOp::U32And => proc.push_value(s[0] & s[1]),
        HardOp::U32Or => proc.push_value(s[0] | s[1]),
        HardOp::U32Xor => proc.push_value(s[0] ^ s[1]),
        HardOp::U32Not => proc.push_value(!s[0]),
        // Shift counts are masked to their low 5 bits: a u32 shift by >=32
        // is undefined in Rust (panics in debug) and unspecified in C.
        HardOp::U32Shl => proc.push_value(s[0].wrapping_shl(s[1] & 0x1F)),
        HardOp::U32Shr => proc.push_value(s[0].wrapping_shr(s[1] & 0x1F)),
        HardOp::U32Eq => proc.push_value((s[0] == s[1]) as u32),
        HardOp::U32Neq => proc.push_value((s[0] != s[1]) as u32),
        HardOp::U32Geq => proc.push_value((s[0] >= s[1]) as u32),
        HardOp::U32Leq => proc.push_value((s[0] <= s[1]) as u32),
        HardOp::U32Gt => proc.push_value((s[0] > s[1]) as u32),
        HardOp::U32Lt => proc.push_value((s[0] < s[1]) as u32),
        HardOp::Cond => {
            if !is_tail && !push_return(proc) {
                return;
            }
            proc.fp = if s[0] != 0 { s[1] } else { s[2] };
            proc.ip = 0;
        }
        // Indirect call never pushes a return frame, regardless of
        // tail position: it's meant to jump, not nest.
        HardOp::Call => {
            proc.fp = s[0];
            proc.ip = 0;
        }
        HardOp::LsPush => {
            if !proc.ls.push(s[0]) {
                proc.except.ls_of = true;
            }
        }
        HardOp::LsRead => match proc.ls.read(proc.lp, s[0]) {
            Some(v) => proc.push_value(v),
            None => proc.except.vs_uf = true,
        },
        HardOp::Yield => proc.except.yield_ = true,
    }
    let _ = vm; // kept for symmetry with the native/interpreted dispatch below
}

fn push_return(proc: &mut Process) -> bool {
    let ok = proc.rs.push(Return {
        fp: proc.fp,
        ip: proc.ip,
        lp: proc.lp,
    });
    if !ok {
        proc.except.rs_of = true;
    }
    ok
}

pub fn execute(vm: &mut Vm, proc: &mut Process) {
    if proc.fetch.do_return {
        match proc.rs.pop() {
            Some(r) => {
                proc.fp = r.fp;
                proc.ip = r.ip;
                proc.lp = r.lp;
            }
            None => proc.except.rs_uf = true,
        }
        return;
    }

    let opcode = proc.fetch.opcode;
    let is_tail = proc.fetch.is_tail;
    let op_bit = operation(opcode);
    let idx = operand(opcode);

    if op_bit == OP_VALUE {
        proc.push_value(idx);
        return;
    }

    if let Some(hard) = HardOp::from_index(idx) {
        execute_hard_op(vm, proc, hard, is_tail);
        return;
    }

    let func_idx = idx as usize;
    let is_native = vm.dictionary.get(func_idx).is_native();
    if is_native {
        let native = match vm.dictionary.get(func_idx).kind {
            FunctionKind::Native(f) => f,
            FunctionKind::Interpreted { .. } => unreachable!(),
        };
        native(vm, proc);
    } else {
        if !is_tail && !push_return(proc) {
            return;
        }
        proc.fp = idx;
        proc.ip = 0;
    }
}

pub fn next(vm: &mut Vm, proc: &mut Process) {
    fetch(vm, proc);
    execute(vm, proc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VmParameters;

    fn new_proc() -> Process {
        Process::new(64, 64, 64, 4096, 64)
    }

    #[test]
    fn literal_opcode_pushes_value() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.fetch.opcode = 42;
        proc.fetch.do_return = false;
        execute(&mut vm, &mut proc);
        assert_eq!(proc.vs.pop(), Some(42));
    }

    #[test]
    fn u32_add_uses_eldest_first_order() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.push_value(10);
        proc.push_value(3);
        execute_hard_op(&vm, &mut proc, HardOp::U32Sub, false);
        assert_eq!(proc.vs.pop(), Some(7)); // 10 - 3, s0=10 (older), s1=3 (newer)
        let _ = &vm;
    }

    #[test]
    fn division_by_zero_sets_flag_without_pushing() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.push_value(1);
        proc.push_value(0);
        execute_hard_op(&vm, &mut proc, HardOp::U32Div, false);
        assert!(proc.except.div_by_zero);
        assert_eq!(proc.vs.len(), 0);
    }

    #[test]
    fn shift_count_is_masked_to_five_bits() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.push_value(1);
        proc.push_value(33); // 33 & 0x1F == 1
        execute_hard_op(&vm, &mut proc, HardOp::U32Shl, false);
        assert_eq!(proc.vs.pop(), Some(2));
    }

    #[test]
    fn cond_call_pushes_return_unless_tail() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.push_value(1); // bool
        proc.push_value(5); // then-branch fp
        proc.push_value(9); // else-branch fp
        execute_hard_op(&vm, &mut proc, HardOp::Cond, false);
        assert_eq!(proc.fp, 5);
        assert_eq!(proc.rs.len(), 1);
    }

    #[test]
    fn cond_in_tail_position_does_not_grow_return_stack() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.push_value(0);
        proc.push_value(5);
        proc.push_value(9);
        execute_hard_op(&vm, &mut proc, HardOp::Cond, true);
        assert_eq!(proc.fp, 9);
        assert_eq!(proc.rs.len(), 0);
    }

    #[test]
    fn call_never_pushes_a_return_frame() {
        let mut vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        proc.push_value(3);
        execute_hard_op(&vm, &mut proc, HardOp::Call, false);
        assert_eq!(proc.fp, 3);
        assert_eq!(proc.rs.len(), 0);
    }

    #[test]
    fn fetch_marks_do_return_past_function_body_end() {
        let vm = Vm::new(&VmParameters::default());
        let mut proc = new_proc();
        // fp 0 is the "nop" hardware-opcode placeholder, a zero-body
        // function: any ip fetches past the end immediately.
        proc.fp = 0;
        proc.ip = 0;
        fetch(&vm, &mut proc);
        assert!(proc.fetch.do_return);
    }
}
