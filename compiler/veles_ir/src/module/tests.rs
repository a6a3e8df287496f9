use pretty_assertions::assert_eq;

use veles_ast::{IdentId, StringId};
use veles_types::Idx;

use super::*;
use crate::ir::BlockId;

#[test]
fn integer_constants_are_deduplicated() {
    let mut module = Module::new();
    let a = module.intern_int(7);
    let b = module.intern_int(7);
    let c = module.intern_int(8);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(*module.value(a), Value::ConstInt(7));
}

#[test]
fn float_constants_key_by_bit_pattern() {
    let mut module = Module::new();
    let a = module.intern_float(1.5);
    let b = module.intern_float(1.5);
    let zero = module.intern_float(0.0);
    let neg_zero = module.intern_float(-0.0);
    assert_eq!(a, b);
    assert_ne!(zero, neg_zero);
}

#[test]
fn string_constants_are_deduplicated() {
    let mut module = Module::new();
    let a = module.intern_string(StringId::new(3));
    let b = module.intern_string(StringId::new(3));
    let c = module.intern_string(StringId::new(4));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn constants_of_different_variants_never_collide() {
    let mut module = Module::new();
    let int_zero = module.intern_int(0);
    let float_zero = module.intern_float(0.0);
    let str_zero = module.intern_string(StringId::new(0));
    assert_ne!(int_zero, float_zero);
    assert_ne!(int_zero, str_zero);
    assert_ne!(float_zero, str_zero);
}

#[test]
fn instruction_results_are_always_fresh() {
    let mut module = Module::new();
    let make = |module: &mut Module| {
        module.add_value(Value::InstrResult {
            ty: Idx::INT,
            block: BlockId::new(0),
            index: 0,
            temp: 0,
        })
    };
    let a = make(&mut module);
    let b = make(&mut module);
    assert_ne!(a, b);
}

#[test]
fn labels_get_sequential_ids() {
    let mut module = Module::new();
    let a = module.add_label(LabelKind::End);
    let b = module.add_label(LabelKind::Else);
    assert_ne!(a, b);
    assert_eq!(module.label(a).kind, LabelKind::End);
    assert_eq!(module.label(b).kind, LabelKind::Else);
    assert_ne!(module.label(a).id, module.label(b).id);
}

#[test]
fn ident_bindings_resolve() {
    let mut module = Module::new();
    let ident = IdentId::new(5);
    assert_eq!(module.ident_value(ident), None);
    let value = module.add_value(Value::Local {
        ty: Idx::INT,
        displ: 0,
    });
    module.bind_ident(ident, value);
    assert_eq!(module.ident_value(ident), Some(value));
}

#[test]
fn externs_and_globals_keep_registration_order() {
    let mut module = Module::new();
    module.add_extern(Extern {
        ident: IdentId::new(0),
        ty: Idx::INT,
    });
    module.add_extern(Extern {
        ident: IdentId::new(1),
        ty: Idx::FLOAT,
    });
    module.add_global(Global {
        ident: IdentId::new(2),
        ty: Idx::INT,
        init: None,
    });
    assert_eq!(module.externs().len(), 2);
    assert_eq!(module.externs()[0].ident, IdentId::new(0));
    assert_eq!(module.externs()[1].ident, IdentId::new(1));
    assert_eq!(module.globals().len(), 1);
}

#[test]
fn functions_are_indexed_by_id() {
    let mut module = Module::new();
    let f = module.add_function(Function::new(IdentId::new(0), Idx::VOID, 0));
    let g = module.add_function(Function::new(IdentId::new(1), Idx::VOID, 2));
    assert_ne!(f, g);
    assert_eq!(module.function(g).param_count, 2);
    module.function_mut(f).is_leaf = false;
    assert!(!module.function(f).is_leaf);
    assert_eq!(module.functions().len(), 2);
}
