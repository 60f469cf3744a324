//! The append-only instruction heap. Interpreted function bodies are
//! contiguous `[ins_offset, ins_offset + ins_count)` slices into this
//! array, the same layout `ncvm.c`'s `vm->ins` gives them.

pub struct InstructionHeap {
    ins: Vec<u32>,
    cap: usize,
}

impl InstructionHeap {
    pub fn new(max_instruction_count: usize) -> Self {
        InstructionHeap {
            ins: Vec::with_capacity(max_instruction_count),
            cap: max_instruction_count,
        }
    }

    pub fn len(&self) -> u32 {
        self.ins.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.ins.is_empty()
    }

    /// `false` means the heap is full; the caller is responsible for
    /// reporting the overflow and aborting instead of corrupting a
    /// partially-copied function body.
    pub fn push(&mut self, opcode: u32) -> bool {
        if self.ins.len() >= self.cap {
            return false;
        }
        self.ins.push(opcode);
        true
    }

    pub fn remaining(&self) -> usize {
        self.cap - self.ins.len()
    }

    pub fn get(&self, offset: u32) -> u32 {
        self.ins[offset as usize]
    }

    pub fn slice(&self, offset: u32, count: u32) -> &[u32] {
        &self.ins[offset as usize..(offset + count) as usize]
    }
}
