//! Per-block next-use annotation.
//!
//! Walks a block's instructions from last to first, recording for each
//! value operand the index of the instruction that reads it next, and
//! for each result the index of its first reader. `None` means "no
//! further use in this block". Which slots count as reads and which as
//! result definitions comes from the opcode's [`FormatClass`] table;
//! labels and function references never participate.
//!
//! Values defined outside the block (constants, parameters, locals,
//! globals) simply start in the "no further use" state until first
//! seen, so the same walk covers them.
//!
//! The annotations are returned as a side table parallel to the
//! instruction list; the IR itself is not touched.

use rustc_hash::FxHashMap;

use crate::ir::{Block, Operand, ValueId};

/// Next-use record for one instruction: one entry per operand slot
/// plus one for the result. `None` marks a slot that is not a value
/// read (or result), or a value with no further use in the block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstrNextUse {
    pub ops: [Option<u32>; 3],
    pub res: Option<u32>,
}

/// Annotate every instruction of `block` with next-use information.
///
/// For a read of value `v` at index `i`, the recorded entry is the
/// smallest `j > i` at which `v` is read again within the block, or
/// `None` if there is none.
pub fn annotate_next_use(block: &Block) -> Vec<InstrNextUse> {
    let mut out = vec![InstrNextUse::default(); block.instrs.len()];
    let mut next_use: FxHashMap<ValueId, u32> = FxHashMap::default();

    for (index, instr) in block.instrs.iter().enumerate().rev() {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "block lengths never exceed u32"
        )]
        let index_u32 = index as u32;
        let class = instr.op.format_class();

        // The result is defined here: its first later reader is what
        // the map currently holds, and the definition kills the value
        // for anything above.
        if class.writes_result() {
            if let Some(res) = instr.res {
                out[index].res = next_use.remove(&res);
            }
        }

        for &slot in class.read_slots() {
            if let Operand::Value(value) = instr.ops[slot] {
                out[index].ops[slot] = next_use.get(&value).copied();
                next_use.insert(value, index_u32);
            }
        }
    }

    out
}
