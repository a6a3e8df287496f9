use pretty_assertions::assert_eq;

use super::*;

const ALL_OPCODES: [Opcode; 33] = [
    Opcode::Nop,
    Opcode::Label,
    Opcode::Move,
    Opcode::Store,
    Opcode::Load,
    Opcode::Alloca,
    Opcode::Ptr,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::And,
    Opcode::Or,
    Opcode::Xor,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Fadd,
    Opcode::Fsub,
    Opcode::Fmul,
    Opcode::Fdiv,
    Opcode::Jmp,
    Opcode::Jmpz,
    Opcode::Jmpnz,
    Opcode::Jmpeq,
    Opcode::Jmplt,
    Opcode::Jmple,
    Opcode::Itof,
    Opcode::Ftoi,
    Opcode::Slt,
    Opcode::Push,
    Opcode::Call,
    Opcode::Ret,
];

#[test]
fn format_class_spot_checks() {
    assert_eq!(Opcode::Nop.format_class(), FormatClass::N);
    assert_eq!(Opcode::Label.format_class(), FormatClass::Bn);
    assert_eq!(Opcode::Move.format_class(), FormatClass::Rrn);
    assert_eq!(Opcode::Store.format_class(), FormatClass::Rln);
    assert_eq!(Opcode::Load.format_class(), FormatClass::Lr);
    assert_eq!(Opcode::Alloca.format_class(), FormatClass::Sl);
    assert_eq!(Opcode::Add.format_class(), FormatClass::Rrr);
    assert_eq!(Opcode::Fdiv.format_class(), FormatClass::Rrr);
    assert_eq!(Opcode::Jmp.format_class(), FormatClass::Bn);
    assert_eq!(Opcode::Jmpz.format_class(), FormatClass::Brn);
    assert_eq!(Opcode::Jmpeq.format_class(), FormatClass::Brrn);
    assert_eq!(Opcode::Itof.format_class(), FormatClass::Rr);
    assert_eq!(Opcode::Push.format_class(), FormatClass::Rn);
    assert_eq!(Opcode::Ret.format_class(), FormatClass::Rn);
    assert_eq!(Opcode::Call.format_class(), FormatClass::Fr);
    assert_eq!(Opcode::Slt.format_class(), FormatClass::Rrr);
}

#[test]
fn read_slots_match_result_flags() {
    // Classes with a trailing result letter write one; pure operand
    // classes do not.
    for op in ALL_OPCODES {
        let class = op.format_class();
        match class {
            FormatClass::Rr
            | FormatClass::Rrr
            | FormatClass::Lr
            | FormatClass::Sl
            | FormatClass::Fr => assert!(class.writes_result(), "{op:?}"),
            _ => assert!(!class.writes_result(), "{op:?}"),
        }
    }
    assert_eq!(FormatClass::Brrn.read_slots(), &[1, 2]);
    assert_eq!(FormatClass::Brn.read_slots(), &[1]);
    assert_eq!(FormatClass::Bn.read_slots(), &[] as &[usize]);
    assert_eq!(FormatClass::Fr.read_slots(), &[] as &[usize]);
    assert_eq!(FormatClass::Rrn.read_slots(), &[0, 1]);
}

#[test]
fn mnemonics_are_distinct() {
    for (i, a) in ALL_OPCODES.iter().enumerate() {
        for b in &ALL_OPCODES[i + 1..] {
            assert_ne!(a.mnemonic(), b.mnemonic());
        }
    }
}

#[test]
fn block_enders_are_jumps_and_calls() {
    for op in ALL_OPCODES {
        let expected = matches!(op.format_class(), FormatClass::Bn | FormatClass::Brn | FormatClass::Brrn)
            && op != Opcode::Label
            || op == Opcode::Call;
        assert_eq!(op.ends_block(), expected, "{op:?}");
    }
}

#[test]
fn value_numberable_excludes_side_effects() {
    for op in [
        Opcode::Store,
        Opcode::Call,
        Opcode::Push,
        Opcode::Ret,
        Opcode::Jmp,
        Opcode::Jmpz,
        Opcode::Label,
        Opcode::Alloca,
        Opcode::Move,
        Opcode::Nop,
    ] {
        assert!(!op.is_value_numberable(), "{op:?}");
    }
    for op in [Opcode::Add, Opcode::Fmul, Opcode::Load, Opcode::Ptr, Opcode::Itof] {
        assert!(op.is_value_numberable(), "{op:?}");
    }
}

#[test]
fn value_types() {
    use veles_types::Idx;

    assert_eq!(Value::ConstInt(4).ty(), Idx::INT);
    assert_eq!(Value::ConstFloat(0.5).ty(), Idx::FLOAT);
    let local = Value::Local {
        ty: Idx::CHAR,
        displ: 8,
    };
    assert_eq!(local.ty(), Idx::CHAR);
    assert!(!local.is_const());
    assert!(Value::ConstInt(0).is_const());
}

#[test]
fn label_display() {
    let label = Label {
        kind: LabelKind::BeginCycle,
        id: 7,
    };
    assert_eq!(label.to_string(), "BEGIN_CYCLE7");
    let label = Label {
        kind: LabelKind::Else,
        id: 0,
    };
    assert_eq!(label.to_string(), "ELSE0");
}

#[test]
fn function_starts_with_entry_block() {
    use veles_ast::IdentId;
    use veles_types::Idx;

    let function = Function::new(IdentId::new(0), Idx::VOID, 0);
    assert_eq!(function.blocks.len(), 1);
    assert!(function.is_leaf);
    assert_eq!(function.local_size, 0);
    assert_eq!(function.max_call_arguments, 0);
}
