//! The 32-bit value type and the opcode bit-31 encoding.

/// A single cell on the value, local, or return stack. Always a raw u32;
/// callers reinterpret as signed, bool (0/nonzero), or dictionary index as
/// the opcode table dictates.
pub type Value = u32;

/// Bit 31 clear: the remaining 31 bits are a literal to push.
pub const OP_VALUE: u32 = 0x0000_0000;
/// Bit 31 set: the remaining 31 bits are a dictionary index to call.
pub const OP_CALL: u32 = 0x8000_0000;
pub const OP_CALL_MASK: u32 = 0x7FFF_FFFF;

#[inline(always)]
pub fn operation(opcode: u32) -> u32 {
    opcode & OP_CALL
}

#[inline(always)]
pub fn operand(opcode: u32) -> u32 {
    opcode & OP_CALL_MASK
}

#[inline(always)]
pub fn encode_call(index: u32) -> u32 {
    OP_CALL | (index & OP_CALL_MASK)
}

/// The hardware opcode table, in dictionary order. Indices below
/// `HardOp::COUNT` in the dictionary are these inline opcodes; the real
/// dictionary entries for them exist too (native, zero-effect callbacks)
/// so `lsws`/`see` can name them, but `vm::exec` dispatches on the index
/// directly rather than invoking the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HardOp {
    Nop = 0,
    VsDrop,
    VsDup,
    VsRevRead,
    U32Add,
    U32Sub,
    U32Mul,
    U32Div,
    U32Mod,
    U32And,
    U32Or,
    U32Xor,
    U32Not,
    U32Shl,
    U32Shr,
    U32Eq,
    U32Neq,
    U32Geq,
    U32Leq,
    U32Gt,
    U32Lt,
    Cond,
    Call,
    LsPush,
    LsRead,
    Yield,
}

impl HardOp {
    pub const COUNT: u32 = 26;

    pub fn from_index(idx: u32) -> Option<HardOp> {
        use HardOp::*;
        Some(match idx {
            0 => Nop,
            1 => VsDrop,
            2 => VsDup,
            3 => VsRevRead,
            4 => U32Add,
            5 => U32Sub,
            6 => U32Mul,
            7 => U32Div,
            8 => U32Mod,
            9 => U32And,
            10 => U32Or,
            11 => U32Xor,
            12 => U32Not,
            13 => U32Shl,
            14 => U32Shr,
            15 => U32Eq,
            16 => U32Neq,
            17 => U32Geq,
            18 => U32Leq,
            19 => U32Gt,
            20 => U32Lt,
            21 => Cond,
            22 => Call,
            23 => LsPush,
            24 => LsRead,
            25 => Yield,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use HardOp::*;
        match self {
            Nop => "nop",
            VsDrop => "vs.drop",
            VsDup => "vs.dup",
            VsRevRead => "vs.rev.read",
            U32Add => "u32.add",
            U32Sub => "u32.sub",
            U32Mul => "u32.mul",
            U32Div => "u32.div",
            U32Mod => "u32.mod",
            U32And => "u32.and",
            U32Or => "u32.or",
            U32Xor => "u32.xor",
            U32Not => "u32.not",
            U32Shl => "u32.shl",
            U32Shr => "u32.shr",
            U32Eq => "u32.eq",
            U32Neq => "u32.neq",
            U32Geq => "u32.geq",
            U32Leq => "u32.leq",
            U32Gt => "u32.gt",
            U32Lt => "u32.lt",
            Cond => "cond",
            Call => "call",
            LsPush => "ls.push",
            LsRead => "ls.read",
            Yield => "yield",
        }
    }

    /// (inVS, outVS) declared arity, matching `ncvm.c`'s `opcodes[]` table.
    /// `u32.not` is corrected to (1, 1): the reference table lists (2, 1)
    /// but the execute arm only ever reads `s0`, discarding a second popped
    /// value for a unary operator. That's a bug in the original, not a
    /// semantics this crate preserves.
    pub fn arity(self) -> (u32, u32) {
        use HardOp::*;
        match self {
            Nop => (0, 0),
            VsDrop => (1, 0),
            VsDup => (1, 1),
            VsRevRead => (1, 1),
            U32Add | U32Sub | U32Mul | U32Div | U32Mod => (2, 1),
            U32And | U32Or | U32Xor => (2, 1),
            U32Not => (1, 1),
            U32Shl | U32Shr => (2, 1),
            U32Eq | U32Neq | U32Geq | U32Leq | U32Gt | U32Lt => (2, 1),
            Cond => (3, 0),
            Call => (1, 0),
            LsPush => (1, 0),
            LsRead => (1, 1),
            Yield => (0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_and_operand_split_bit_31() {
        assert_eq!(operation(0x0000_002A), OP_VALUE);
        assert_eq!(operand(0x0000_002A), 42);
        assert_eq!(operation(0x8000_0003), OP_CALL);
        assert_eq!(operand(0x8000_0003), 3);
    }

    #[test]
    fn encode_call_sets_bit_31() {
        assert_eq!(encode_call(5), 0x8000_0005);
    }

    #[test]
    fn hard_op_round_trips_index() {
        for i in 0..HardOp::COUNT {
            let op = HardOp::from_index(i).unwrap();
            assert_eq!(op as u32, i);
        }
        assert!(HardOp::from_index(HardOp::COUNT).is_none());
    }

    #[test]
    fn u32_not_is_unary() {
        assert_eq!(HardOp::U32Not.arity(), (1, 1));
    }

    #[test]
    fn cond_takes_three_and_pushes_nothing() {
        assert_eq!(HardOp::Cond.arity(), (3, 0));
    }
}
