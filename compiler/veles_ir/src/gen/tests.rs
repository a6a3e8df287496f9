use pretty_assertions::assert_eq;

use veles_ast::{BinaryOp, Expr, ExprKind, IdentId, UnaryOp};
use veles_types::Idx;

use crate::ir::{Extern, Function, Global, Instr, Opcode, Operand};
use crate::module::Module;
use crate::test_helpers::{
    assign, bin, call, compound, expr_stmt, func, ident, int, ret, unary, unit, var_decl, Fixture,
    RecordingBackend,
};

use super::*;

#[test]
fn module_brackets_in_order() {
    let mut module = Module::new();
    module.add_extern(Extern {
        ident: IdentId::new(0),
        ty: Idx::INT,
    });
    let init = module.intern_int(3);
    module.add_global(Global {
        ident: IdentId::new(1),
        ty: Idx::INT,
        init: Some(init),
    });
    let mut function = Function::new(IdentId::new(2), Idx::VOID, 0);
    function.blocks[0].instrs.push(Instr::new(
        Opcode::Ret,
        [Operand::None, Operand::None, Operand::None],
    ));
    module.add_function(function);

    let mut backend = RecordingBackend::default();
    generate(&module, &mut backend);

    assert_eq!(
        backend.calls,
        vec![
            "begin".to_owned(),
            "extern %0".to_owned(),
            "global %1 Some(Int(3))".to_owned(),
            "function_begin %2 params=0 leaf=true locals=0 maxargs=0".to_owned(),
            "ret None".to_owned(),
            "function_end %2".to_owned(),
            "end".to_owned(),
        ]
    );
}

#[test]
fn decoded_operand_forms() {
    let mut fx = Fixture::new();
    let f = fx.declare_fn("f", Idx::INT, &[Idx::INT]);
    let a = fx.declare_var("a", Idx::INT);
    let x = fx.declare_var("x", Idx::INT);

    let body = compound(vec![
        var_decl(x, Some(ident(a, Idx::INT))),
        ret(Some(ident(x, Idx::INT))),
    ]);
    let module = fx.lower(&unit(vec![func(f, vec![a], body)]));

    let mut backend = RecordingBackend::default();
    generate(&module, &mut backend);

    let has = |prefix: &str| backend.calls.iter().any(|c| c.starts_with(prefix));
    // alloca decodes its size and the local slot.
    assert!(has("alloca 4 -> Local"), "calls: {:#?}", backend.calls);
    // The initialiser load reads the parameter slot.
    assert!(has("load Param"), "calls: {:#?}", backend.calls);
    // The store writes the local.
    assert!(has("store Temp"), "calls: {:#?}", backend.calls);
    // The return value load reads the local back.
    assert!(has("load Local"), "calls: {:#?}", backend.calls);
}

#[test]
fn call_decodes_callee_ident() {
    let mut fx = Fixture::new();
    let g = fx.declare_fn("g", Idx::INT, &[Idx::INT]);
    let f = fx.declare_fn("f", Idx::INT, &[]);
    let g_ty = fx.sx.ident_type(g);

    let module = fx.lower(&unit(vec![func(
        f,
        vec![],
        compound(vec![ret(Some(call(g, g_ty, Idx::INT, vec![int(5)])))]),
    )]));

    let mut backend = RecordingBackend::default();
    generate(&module, &mut backend);

    let expected = format!("call %{} -> ", g.raw());
    assert!(
        backend.calls.iter().any(|c| c.starts_with(&expected)),
        "calls: {:#?}",
        backend.calls
    );
    assert!(backend.calls.iter().any(|c| c.starts_with("push Some(Int(5))")));
}

#[test]
fn computed_address_decodes_to_indirect() {
    let mut fx = Fixture::new();
    let arr = fx.types.array_of(Idx::INT, Some(8));
    let f = fx.declare_fn("f", Idx::INT, &[arr, Idx::INT]);
    let a = fx.declare_var("a", arr);
    let i = fx.declare_var("i", Idx::INT);

    let subscript = Expr {
        ty: Idx::INT,
        kind: ExprKind::Subscript {
            base: Box::new(ident(a, arr)),
            index: Box::new(ident(i, Idx::INT)),
        },
    };
    let module = fx.lower(&unit(vec![func(
        f,
        vec![a, i],
        compound(vec![ret(Some(subscript))]),
    )]));

    let mut backend = RecordingBackend::default();
    generate(&module, &mut backend);

    // ptr computes the address, the load goes through it.
    assert!(backend.calls.iter().any(|c| c.starts_with("ptr ")));
    assert!(
        backend
            .calls
            .iter()
            .any(|c| c.starts_with("load Indirect")),
        "calls: {:#?}",
        backend.calls
    );
}

#[test]
fn branch_callbacks_carry_labels() {
    let mut fx = Fixture::new();
    let f = fx.declare_fn("f", Idx::INT, &[Idx::INT, Idx::INT]);
    let a = fx.declare_var("a", Idx::INT);
    let b = fx.declare_var("b", Idx::INT);

    let module = fx.lower(&unit(vec![func(
        f,
        vec![a, b],
        compound(vec![ret(Some(bin(
            BinaryOp::Lt,
            Idx::BOOL,
            ident(a, Idx::INT),
            ident(b, Idx::INT),
        )))]),
    )]));

    let mut backend = RecordingBackend::default();
    generate(&module, &mut backend);

    assert!(backend.calls.iter().any(|c| c.starts_with("jmplt ELSE")));
    assert!(backend.calls.iter().any(|c| c.starts_with("jmp END")));
    assert!(backend.calls.iter().any(|c| c.starts_with("label ELSE")));
    assert!(backend.calls.iter().any(|c| c.starts_with("label END")));
}

#[test]
fn generation_is_deterministic() {
    let build = || {
        let mut fx = Fixture::new();
        let f = fx.declare_fn("f", Idx::INT, &[Idx::INT]);
        let n = fx.declare_var("n", Idx::INT);
        let s = fx.declare_var("s", Idx::INT);
        let body = compound(vec![
            var_decl(s, Some(int(0))),
            expr_stmt(assign(
                BinaryOp::AddAssign,
                ident(s, Idx::INT),
                unary(UnaryOp::Minus, Idx::INT, ident(n, Idx::INT)),
            )),
            ret(Some(ident(s, Idx::INT))),
        ]);
        fx.lower(&unit(vec![func(f, vec![n], body)]))
    };

    // The same tree lowers to the same callback stream, run after run.
    let first = {
        let module = build();
        let mut backend = RecordingBackend::default();
        generate(&module, &mut backend);
        backend.calls
    };
    let second = {
        let module = build();
        let mut backend = RecordingBackend::default();
        generate(&module, &mut backend);
        backend.calls
    };
    assert_eq!(first, second);

    // And generating one module twice is also stable.
    let module = build();
    let mut once = RecordingBackend::default();
    let mut twice = RecordingBackend::default();
    generate(&module, &mut once);
    generate(&module, &mut twice);
    assert_eq!(once.calls, twice.calls);
}
