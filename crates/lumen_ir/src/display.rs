//! Human-readable text form of a program.

use crate::function::{Body, CfNode};
use crate::ids::{RegisterId, VariableId};
use crate::instr::Instruction;
use crate::program::Program;
use crate::types::TypeDb;
use crate::value::{Deref, DerefLink, Dest, Operand, Register, RegisterRef};
use crate::variable::StorageClass;
use std::fmt::{self, Write};

/// Displays a program as indented text.
///
/// ```text
/// fn0 main() {
///   block0:
///     %0 = load_const [0x2a]
///     return
/// }
/// ```
pub struct ProgramPrinter<'a> {
    program: &'a Program,
    types: &'a TypeDb,
}

impl<'a> ProgramPrinter<'a> {
    /// Creates a printer that names types through `types`.
    pub fn new(program: &'a Program, types: &'a TypeDb) -> Self {
        Self { program, types }
    }
}

impl fmt::Display for ProgramPrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.program;
        write!(f, "program")?;
        if let Some(name) = &p.name {
            write!(f, " {name:?}")?;
        }
        if let Some(label) = &p.label {
            write!(f, " ({label})")?;
        }
        writeln!(f, " stage={:?}", p.info.stage)?;

        for class in StorageClass::GLOBAL {
            for &var in p.globals.list(class).into_iter().flatten() {
                self.variable(f, var, 0)?;
            }
        }
        for &reg in &p.registers {
            if let Some(r) = p.regs.try_get(reg) {
                writeln!(f, "{}", register_decl(reg, r))?;
            }
        }

        for (id, function) in p.functions_in_order() {
            let params: Vec<String> = function
                .params
                .iter()
                .map(|param| self.types.name(param.ty))
                .collect();
            write!(f, "{id} {}({})", function.name, params.join(", "))?;
            if let Some(ret) = function.return_type {
                write!(f, " -> {}", self.types.name(ret))?;
            }
            match &function.body {
                None => writeln!(f, ";")?,
                Some(body) => {
                    writeln!(f, " {{")?;
                    self.body(f, body)?;
                    writeln!(f, "}}")?;
                }
            }
        }
        Ok(())
    }
}

impl ProgramPrinter<'_> {
    fn variable(&self, f: &mut fmt::Formatter<'_>, var: VariableId, depth: usize) -> fmt::Result {
        let Some(v) = self.program.variables.try_get(var) else {
            return writeln!(f, "{:depth$}{var} <missing>", "", depth = depth * 2);
        };
        write!(
            f,
            "{:depth$}{:?} {var}: {}",
            "",
            v.storage,
            self.types.name(v.ty),
            depth = depth * 2
        )?;
        if let Some(name) = &v.name {
            write!(f, " {name:?}")?;
        }
        if v.constant_initializer.is_some() {
            write!(f, " = <const>")?;
        }
        writeln!(f)
    }

    fn body(&self, f: &mut fmt::Formatter<'_>, body: &Body) -> fmt::Result {
        for &var in body.params.iter().chain(&body.locals).chain(body.return_var.iter()) {
            self.variable(f, var, 1)?;
        }
        for &reg in &body.registers {
            if let Some(r) = self.program.regs.try_get(reg) {
                writeln!(f, "  {}", register_decl(reg, r))?;
            }
        }
        self.cf_list(f, &body.cf, 1)
    }

    fn cf_list(&self, f: &mut fmt::Formatter<'_>, list: &[CfNode], depth: usize) -> fmt::Result {
        let pad = depth * 2;
        for node in list {
            match node {
                CfNode::Block(block) => {
                    writeln!(f, "{:pad$}{block}:", "")?;
                    let Some(b) = self.program.blocks.try_get(*block) else {
                        continue;
                    };
                    for &instr in &b.instrs {
                        match self.program.instrs.try_get(instr) {
                            Some(i) => writeln!(f, "{:w$}{}", "", instruction(i), w = pad + 2)?,
                            None => writeln!(f, "{:w$}<missing {instr}>", "", w = pad + 2)?,
                        }
                    }
                }
                CfNode::If(node) => {
                    writeln!(f, "{:pad$}if {} {{", "", operand(&node.condition))?;
                    self.cf_list(f, &node.then_list, depth + 1)?;
                    if !node.else_list.is_empty() {
                        writeln!(f, "{:pad$}}} else {{", "")?;
                        self.cf_list(f, &node.else_list, depth + 1)?;
                    }
                    writeln!(f, "{:pad$}}}", "")?;
                }
                CfNode::Loop(node) => {
                    writeln!(f, "{:pad$}loop {{", "")?;
                    self.cf_list(f, &node.body, depth + 1)?;
                    writeln!(f, "{:pad$}}}", "")?;
                }
            }
        }
        Ok(())
    }
}

fn register_decl(id: RegisterId, r: &Register) -> String {
    let mut out = format!("reg {id}: {}x{}", r.bit_size, r.num_components);
    if r.num_array_elems > 0 {
        let _ = write!(out, "[{}]", r.num_array_elems);
    }
    if let Some(name) = &r.name {
        let _ = write!(out, " {name:?}");
    }
    out
}

fn register_ref(r: &RegisterRef) -> String {
    match &r.indirect {
        None => format!("{}[{}]", r.reg, r.base_offset),
        Some(ind) => format!("{}[{} + {}]", r.reg, r.base_offset, operand(ind)),
    }
}

fn operand(op: &Operand) -> String {
    match op {
        Operand::Value(v) => v.to_string(),
        Operand::Register(r) => register_ref(r),
    }
}

fn dest(d: &Dest) -> String {
    match d {
        Dest::Ssa(v) => v.to_string(),
        Dest::Register(r) => register_ref(r),
    }
}

fn deref(d: &Deref) -> String {
    let mut out = d.var.to_string();
    for link in &d.path {
        match link {
            DerefLink::Struct { field } => {
                let _ = write!(out, ".{field}");
            }
            DerefLink::Array {
                base_offset,
                indirect: None,
            } => {
                let _ = write!(out, "[{base_offset}]");
            }
            DerefLink::Array {
                base_offset,
                indirect: Some(ind),
            } => {
                let _ = write!(out, "[{base_offset} + {}]", operand(ind));
            }
        }
    }
    out
}

/// Renders one instruction on a single line.
pub fn instruction(instr: &Instruction) -> String {
    match instr {
        Instruction::Alu(alu) => {
            let srcs: Vec<String> = alu
                .srcs
                .iter()
                .map(|s| {
                    let mut text = operand(&s.operand);
                    if s.abs {
                        text = format!("|{text}|");
                    }
                    if s.negate {
                        text = format!("-{text}");
                    }
                    text
                })
                .collect();
            let sat = if alu.saturate { ".sat" } else { "" };
            format!("{} = {}{sat} {}", dest(&alu.dest), alu.op.name(), srcs.join(", "))
        }
        Instruction::Intrinsic(intr) => {
            let mut parts: Vec<String> = intr.srcs.iter().map(operand).collect();
            parts.extend(intr.variables.iter().map(deref));
            let lhs = match &intr.dest {
                Some(d) => format!("{} = ", dest(d)),
                None => String::new(),
            };
            let mut text = format!("{lhs}{} {}", intr.op.name(), parts.join(", "));
            if !intr.const_index.is_empty() {
                let _ = write!(text, " {:?}", intr.const_index);
            }
            text
        }
        Instruction::LoadConst(lc) => {
            let lanes: Vec<String> = lc.values.iter().map(|v| format!("{v:#x}")).collect();
            format!("{} = load_const [{}]", lc.dest, lanes.join(", "))
        }
        Instruction::Undef(u) => format!("{} = undef", u.dest),
        Instruction::Texture(tex) => {
            let mut parts: Vec<String> = tex
                .srcs
                .iter()
                .map(|s| format!("{}: {}", s.kind.name(), operand(&s.operand)))
                .collect();
            if let Some(t) = &tex.texture {
                parts.push(format!("texture: {}", deref(t)));
            }
            if let Some(s) = &tex.sampler {
                parts.push(format!("sampler: {}", deref(s)));
            }
            format!(
                "{} = {} {:?} ({}) t{} s{}",
                dest(&tex.dest),
                tex.op.name(),
                tex.sampler_dim,
                parts.join(", "),
                tex.texture_index,
                tex.sampler_index
            )
        }
        Instruction::Phi(phi) => {
            let srcs: Vec<String> = phi
                .srcs
                .iter()
                .map(|s| format!("{}: {}", s.pred, s.value))
                .collect();
            format!("{} = phi {}", phi.dest, srcs.join(", "))
        }
        Instruction::Jump(kind) => kind.name().to_string(),
        Instruction::Call(call) => {
            let mut args: Vec<String> = call.params.iter().map(deref).collect();
            if let Some(ret) = &call.ret {
                args.push(format!("-> {}", deref(ret)));
            }
            format!("call {} ({})", call.callee, args.join(", "))
        }
    }
}
