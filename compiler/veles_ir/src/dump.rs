//! Textual IR dump.
//!
//! Human-readable form for debugging; not a stable on-disk contract.
//! Temps print as `%N`, locals as `(displ)`, globals by their source
//! spelling, labels as `<KIND><id>`. Result-producing instructions
//! print as `<dest> <- <opcode> <operands>`.

use std::fmt::{self, Write};

use veles_ast::SyntaxContext;
use veles_types::{Pool, Tag};

use crate::ir::{FormatClass, Function, Instr, Operand, Value, ValueId};
use crate::module::Module;

/// Write the whole module in textual form.
pub fn dump_module(
    module: &Module,
    sx: &SyntaxContext,
    types: &Pool,
    out: &mut dyn Write,
) -> fmt::Result {
    for ext in module.externs() {
        writeln!(
            out,
            "extern {} %{}",
            type_str(types, ext.ty),
            ext.ident.raw()
        )?;
    }
    for global in module.globals() {
        writeln!(
            out,
            "global {} %{}",
            type_str(types, global.ty),
            global.ident.raw()
        )?;
    }
    for function in module.functions() {
        dump_function(module, sx, types, function, out)?;
    }
    Ok(())
}

fn type_str(types: &Pool, ty: veles_types::Idx) -> &'static str {
    match types.tag(ty) {
        Tag::Void => "void",
        Tag::Int => "int",
        Tag::Float => "float",
        Tag::Bool => "bool",
        Tag::Char => "char",
        Tag::Pointer => "ptr",
        Tag::Array => "arr",
        Tag::Structure => "struct",
        Tag::Function => "fn",
    }
}

fn dump_function(
    module: &Module,
    sx: &SyntaxContext,
    types: &Pool,
    function: &Function,
    out: &mut dyn Write,
) -> fmt::Result {
    writeln!(
        out,
        "function {} {}",
        sx.ident_spelling(function.ident),
        type_str(types, function.ty)
    )?;
    writeln!(out, "{{")?;
    for block in &function.blocks {
        writeln!(out, "  block")?;
        writeln!(out, "  {{")?;
        for instr in &block.instrs {
            write!(out, "    ")?;
            dump_instr(module, sx, instr, out)?;
            writeln!(out)?;
        }
        writeln!(out, "  }}")?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

fn dump_value(module: &Module, sx: &SyntaxContext, id: ValueId, out: &mut dyn Write) -> fmt::Result {
    match *module.value(id) {
        Value::ConstInt(value) => write!(out, "{value}"),
        Value::ConstFloat(value) => write!(out, "{value}"),
        Value::ConstString(string) => write!(out, "str{}", string.raw()),
        Value::Param { index, displ, .. } => match displ {
            Some(displ) => write!(out, "p{index}+{displ}"),
            None => write!(out, "p{index}"),
        },
        Value::Local { displ, .. } => write!(out, "({displ})"),
        Value::Global { ident, displ, .. } => match displ {
            Some(displ) => write!(out, "{}+{displ}", sx.ident_spelling(ident)),
            None => write!(out, "{}", sx.ident_spelling(ident)),
        },
        Value::InstrResult { temp, .. } => write!(out, "%{temp}"),
    }
}

fn dump_operand(
    module: &Module,
    sx: &SyntaxContext,
    operand: Operand,
    out: &mut dyn Write,
) -> fmt::Result {
    match operand {
        Operand::None => Ok(()),
        Operand::Value(id) => dump_value(module, sx, id, out),
        Operand::Label(id) => write!(out, "{}", module.label(id)),
        Operand::Func(ident) => write!(out, "{}", sx.ident_spelling(ident)),
    }
}

fn dump_instr(
    module: &Module,
    sx: &SyntaxContext,
    instr: &Instr,
    out: &mut dyn Write,
) -> fmt::Result {
    // Result first, when the class produces one.
    if instr.op.format_class().writes_result() {
        if let Some(res) = instr.res {
            dump_value(module, sx, res, out)?;
            write!(out, " <- ")?;
        }
    }
    write!(out, "{}", instr.op.mnemonic())?;

    let used_slots: &[usize] = match instr.op.format_class() {
        FormatClass::N => &[],
        FormatClass::Rn => &[0],
        FormatClass::Rr | FormatClass::Lr | FormatClass::Sl | FormatClass::Fr | FormatClass::Bn => {
            &[0]
        }
        FormatClass::Rrn | FormatClass::Rln | FormatClass::Rrr | FormatClass::Brn => &[0, 1],
        FormatClass::Brrn => &[0, 1, 2],
    };

    let mut first = true;
    for &slot in used_slots {
        if instr.ops[slot] == Operand::None {
            continue;
        }
        if first {
            write!(out, " ")?;
            first = false;
        } else {
            write!(out, ", ")?;
        }
        dump_operand(module, sx, instr.ops[slot], out)?;
    }
    Ok(())
}
