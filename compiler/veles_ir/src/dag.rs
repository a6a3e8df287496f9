//! Per-block local optimiser.
//!
//! A value-numbering DAG in the classic form: leaves stand for values
//! defined outside the block (constants, parameters, locals, globals,
//! earlier blocks' temps), interior nodes for computations. Two
//! instructions with the same opcode and the same operand nodes denote
//! the same value, so the second one is collapsed onto the first and
//! its result id is rewritten to the canonical one at every later read
//! in the block.
//!
//! Side-effecting opcodes (stores, calls, pushes, returns, jumps,
//! labels, allocas) are never candidates and are emitted as they come;
//! `store` and `call` additionally invalidate memoised `load`s, since
//! memory may have changed. A `move` is not a candidate either, but it
//! does teach the DAG that its destination now denotes the source's
//! node.
//!
//! A collapsed result that some *later* block still reads cannot be
//! rewritten there (rewriting is block-local), so such duplicates are
//! kept. Next-use information drives the decision.
//!
//! Rewriting preserves the original instruction order; only collapsed
//! duplicates disappear, so the block's live-out behaviour is
//! unchanged and the pass is idempotent.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::ir::{Block, Function, Instr, Opcode, Operand, ValueId};
use crate::module::Module;
use crate::next_use::annotate_next_use;

/// Set of value ids read outside the block being optimised.
pub type UseSet = FxHashSet<ValueId>;

type NodeRef = usize;

/// Per-block value-numbering state.
#[derive(Default)]
struct BlockDag {
    node_count: usize,
    /// Which DAG node a value id currently denotes.
    value_node: FxHashMap<ValueId, NodeRef>,
    /// Computation lookup: (opcode, operand nodes) → node.
    instr_index: FxHashMap<(Opcode, SmallVec<[NodeRef; 2]>), NodeRef>,
    /// Canonical result id per computation node.
    node_result: FxHashMap<NodeRef, ValueId>,
    /// Collapsed result id → canonical result id.
    canonical: FxHashMap<ValueId, ValueId>,
}

impl BlockDag {
    fn fresh_node(&mut self) -> NodeRef {
        let node = self.node_count;
        self.node_count += 1;
        node
    }

    /// Node denoting `value`, inserting a leaf if it has none yet.
    fn node_for(&mut self, value: ValueId) -> NodeRef {
        if let Some(&node) = self.value_node.get(&value) {
            return node;
        }
        let node = self.fresh_node();
        self.value_node.insert(value, node);
        node
    }
}

/// Optimise every block of every function in place.
pub fn optimize_module(module: &mut Module) {
    for function in module.functions_mut() {
        optimize_function(function);
    }
}

/// Optimise every block of one function in place.
pub fn optimize_function(function: &mut Function) {
    tracing::debug!(
        blocks = function.blocks.len(),
        "optimising function blocks"
    );
    for index in 0..function.blocks.len() {
        let used_later = reads_after(function, index);
        function.blocks[index] = optimize_block(&function.blocks[index], &used_later);
    }
}

/// Value ids read by any block after `index`.
fn reads_after(function: &Function, index: usize) -> UseSet {
    let mut reads = UseSet::default();
    for block in &function.blocks[index + 1..] {
        for instr in &block.instrs {
            for &slot in instr.op.format_class().read_slots() {
                if let Operand::Value(value) = instr.ops[slot] {
                    reads.insert(value);
                }
            }
        }
    }
    reads
}

/// Rewrite one block into an equivalent one without redundant
/// computations. `used_later` lists the value ids some later block
/// reads; duplicates that produce one of those are kept.
pub fn optimize_block(block: &Block, used_later: &UseSet) -> Block {
    let uses = annotate_next_use(block);
    let mut dag = BlockDag::default();
    let mut out = Vec::with_capacity(block.instrs.len());

    for (index, instr) in block.instrs.iter().enumerate() {
        let remapped = remap(instr, &dag.canonical);

        if instr.op.is_value_numberable() {
            let Some(res) = instr.res else {
                unreachable!("value-numberable opcodes always produce a result");
            };

            let mut children: SmallVec<[NodeRef; 2]> = SmallVec::new();
            for &slot in instr.op.format_class().read_slots() {
                if let Operand::Value(value) = remapped.ops[slot] {
                    children.push(dag.node_for(value));
                }
            }
            let key = (instr.op, children);

            if let Some(&node) = dag.instr_index.get(&key) {
                dag.value_node.insert(res, node);
                if used_later.contains(&res) {
                    // The result escapes to a later block; rewriting
                    // cannot reach those reads, so the computation
                    // stays.
                    out.push(remapped);
                } else {
                    let canon = dag.node_result[&node];
                    dag.canonical.insert(res, canon);
                }
            } else if uses[index].res.is_none() && !used_later.contains(&res) {
                // Dead value: nothing ever reads the result. The node
                // is not registered, so a later identical computation
                // is emitted normally.
            } else {
                let node = dag.fresh_node();
                dag.instr_index.insert(key, node);
                dag.node_result.insert(node, res);
                dag.value_node.insert(res, node);
                out.push(remapped);
            }
            continue;
        }

        match instr.op {
            // Memory may have changed; memoised loads are stale.
            Opcode::Store | Opcode::Call => {
                dag.instr_index.retain(|&(op, _), _| op != Opcode::Load);
            }
            // The destination temp now denotes the source's value.
            Opcode::Move => {
                if let Operand::Value(src) = remapped.ops[0] {
                    let node = dag.node_for(src);
                    if let Operand::Value(dst) = remapped.ops[1] {
                        dag.value_node.insert(dst, node);
                    }
                }
            }
            _ => {}
        }
        out.push(remapped);
    }

    Block { instrs: out }
}

/// Rewrite collapsed result ids to their canonical ids in the read
/// slots. A `move`'s second slot is its destination and is left
/// untouched.
fn remap(instr: &Instr, canonical: &FxHashMap<ValueId, ValueId>) -> Instr {
    let mut remapped = instr.clone();
    for &slot in instr.op.format_class().read_slots() {
        if instr.op == Opcode::Move && slot == 1 {
            continue;
        }
        if let Operand::Value(value) = remapped.ops[slot] {
            if let Some(&canon) = canonical.get(&value) {
                remapped.ops[slot] = Operand::Value(canon);
            }
        }
    }
    remapped
}
