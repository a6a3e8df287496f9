use pretty_assertions::assert_eq;
use proptest::prelude::*;

use veles_ast::BinaryOp;
use veles_types::Idx;

use crate::dag::optimize_module;
use crate::dump::dump_module;
use crate::gen::generate;
use crate::module::Module;
use crate::test_helpers::{
    assign, bin, compound, expr_stmt, func, ident, int, ret, unit, var_decl, Fixture,
    RecordingBackend,
};

fn dump(fx: &Fixture, module: &Module) -> String {
    let mut text = String::new();
    if dump_module(module, &fx.sx, &fx.types, &mut text).is_err() {
        panic!("dump failed");
    }
    text
}

#[test]
fn dump_literal_addition() {
    let mut fx = Fixture::new();
    let f = fx.declare_fn("f", Idx::INT, &[]);
    let module = fx.lower(&unit(vec![func(
        f,
        vec![],
        compound(vec![ret(Some(bin(BinaryOp::Add, Idx::INT, int(2), int(3))))]),
    )]));

    assert_eq!(
        dump(&fx, &module),
        "function f fn\n\
         {\n\
         \x20 block\n\
         \x20 {\n\
         \x20   %0 <- add 2, 3\n\
         \x20   ret %0\n\
         \x20 }\n\
         }\n"
    );
}

#[test]
fn dump_prints_externs_globals_and_labels() {
    let mut fx = Fixture::new();
    let g = fx.declare_var("счёт", Idx::INT);
    let f = fx.declare_fn("f", Idx::VOID, &[Idx::INT]);
    let n = fx.declare_var("n", Idx::INT);

    let module = fx.lower(&unit(vec![
        veles_ast::Decl::Var {
            ident: g,
            init: Some(int(1)),
        },
        func(
            f,
            vec![n],
            compound(vec![veles_ast::Stmt::While {
                cond: ident(n, Idx::INT),
                body: Box::new(expr_stmt(assign(
                    BinaryOp::Assign,
                    ident(g, Idx::INT),
                    ident(n, Idx::INT),
                ))),
            }]),
        ),
    ]));

    let text = dump(&fx, &module);
    assert!(text.contains("global int %"), "dump:\n{text}");
    assert!(text.contains("label BEGIN_CYCLE"), "dump:\n{text}");
    assert!(text.contains("jmpnz END"), "dump:\n{text}");
    // The global prints by its (Cyrillic) spelling in operand position.
    assert!(text.contains("store %"), "dump:\n{text}");
    assert!(text.contains("счёт"), "dump:\n{text}");
}

#[test]
fn pipeline_is_deterministic() {
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
                bin(
                    BinaryOp::Mul,
                    Idx::INT,
                    ident(n, Idx::INT),
                    ident(n, Idx::INT),
                ),
            )),
            ret(Some(ident(s, Idx::INT))),
        ]);
        let mut module = fx.lower(&unit(vec![func(f, vec![n], body)]));
        optimize_module(&mut module);
        module
    };

    let mut first = RecordingBackend::default();
    generate(&build(), &mut first);
    let mut second = RecordingBackend::default();
    generate(&build(), &mut second);
    assert_eq!(first.calls, second.calls);
}

#[test]
fn optimisation_keeps_callback_bracketing() {
    let mut fx = Fixture::new();
    let f = fx.declare_fn("f", Idx::INT, &[]);
    let mut module = fx.lower(&unit(vec![func(
        f,
        vec![],
        compound(vec![ret(Some(bin(BinaryOp::Add, Idx::INT, int(2), int(3))))]),
    )]));
    optimize_module(&mut module);

    let mut backend = RecordingBackend::default();
    generate(&module, &mut backend);
    assert_eq!(backend.calls.first().map(String::as_str), Some("begin"));
    assert_eq!(backend.calls.last().map(String::as_str), Some("end"));
    assert!(backend
        .calls
        .iter()
        .any(|c| c.starts_with("function_begin")));
}

fn arb_arith() -> impl Strategy<Value = veles_ast::Expr> {
    let leaf = (-100i64..100).prop_map(int);
    leaf.prop_recursive(4, 24, 2, |inner| {
        (
            prop_oneof![
                Just(BinaryOp::Add),
                Just(BinaryOp::Sub),
                Just(BinaryOp::Mul),
            ],
            inner.clone(),
            inner,
        )
            .prop_map(|(op, lhs, rhs)| bin(op, Idx::INT, lhs, rhs))
    })
}

proptest! {
    #[test]
    fn constant_interning_is_stable(values in proptest::collection::vec(any::<i64>(), 1..40)) {
        let mut module = Module::new();
        let first: Vec<_> = values.iter().map(|&v| module.intern_int(v)).collect();
        let second: Vec<_> = values.iter().map(|&v| module.intern_int(v)).collect();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn optimiser_is_idempotent_on_arithmetic(expr in arb_arith()) {
        let mut fx = Fixture::new();
        let f = fx.declare_fn("f", Idx::INT, &[]);
        let mut module = fx.lower(&unit(vec![func(
            f,
            vec![],
            compound(vec![ret(Some(expr))]),
        )]));

        optimize_module(&mut module);
        let after_one = module.functions().to_vec();
        optimize_module(&mut module);
        prop_assert_eq!(module.functions(), &after_one[..]);
    }
}
