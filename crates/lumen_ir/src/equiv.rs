//! Structural equivalence of two programs.
//!
//! Two programs are equivalent when there is a one-to-one correspondence
//! between their nodes under which every record, every reference and every
//! use-list agrees. Handles themselves are free to differ, which is exactly
//! what a deserialized copy of a program looks like.
//!
//! Type handles belong to a [`TypeDb`] rather than to the program. Programs
//! that draw on one database compare them directly with [`equivalent`];
//! programs decoded into different databases need
//! [`equivalent_with_types`], which compares the types themselves.

use crate::function::{Body, CfNode, Function};
use crate::function::Param;
use crate::ids::{BlockId, FunctionId, InstrId, RegisterId, TypeId, ValueId, VariableId};
use crate::instr::Instruction;
use crate::program::Program;
use crate::types::{Type, TypeDb};
use crate::value::{Deref, DerefLink, Dest, Operand, RegisterRef};
use crate::variable::{StorageClass, Variable};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

/// The first point at which two programs differ.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct Divergence {
    /// Where in the program the difference was found.
    pub path: String,
    /// What differs.
    pub reason: String,
}

/// Checks that `a` and `b` are structurally equivalent.
///
/// Both programs must take their types from the same [`TypeDb`].
pub fn equivalent(a: &Program, b: &Program) -> Result<(), Divergence> {
    Checker::new(a, b, None).run()
}

/// Checks that `a`, whose types live in `types_a`, is structurally
/// equivalent to `b`, whose types live in `types_b`.
pub fn equivalent_with_types(
    a: &Program,
    types_a: &TypeDb,
    b: &Program,
    types_b: &TypeDb,
) -> Result<(), Divergence> {
    Checker::new(a, b, Some((types_a, types_b))).run()
}

/// Type trees deeper than this never compare equal.
const MAX_TYPE_DEPTH: usize = 64;

fn same_type(ta: &TypeDb, a: TypeId, tb: &TypeDb, b: TypeId, depth: usize) -> bool {
    if depth > MAX_TYPE_DEPTH {
        return false;
    }
    let (Some(x), Some(y)) = (ta.get(a), tb.get(b)) else {
        return false;
    };
    match (x, y) {
        (
            Type::Array {
                element: e,
                len: l,
            },
            Type::Array {
                element: f,
                len: m,
            },
        ) => l == m && same_type(ta, *e, tb, *f, depth + 1),
        (
            Type::Struct {
                name: n,
                fields: fa,
            },
            Type::Struct {
                name: m,
                fields: fb,
            },
        )
        | (
            Type::Interface {
                name: n,
                fields: fa,
            },
            Type::Interface {
                name: m,
                fields: fb,
            },
        ) => {
            n == m
                && fa.len() == fb.len()
                && fa.iter().zip(fb).all(|((na, ea), (nb, eb))| {
                    na == nb && same_type(ta, *ea, tb, *eb, depth + 1)
                })
        }
        // The remaining kinds hold no type handles.
        _ => x == y,
    }
}

struct Bijection<I> {
    forward: HashMap<I, I>,
    reverse: HashMap<I, I>,
}

impl<I: Copy + Eq + Hash + Display> Bijection<I> {
    fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    fn bind(&mut self, a: I, b: I) -> Result<(), String> {
        match (self.forward.get(&a), self.reverse.get(&b)) {
            (None, None) => {
                self.forward.insert(a, b);
                self.reverse.insert(b, a);
                Ok(())
            }
            (Some(&x), Some(&y)) if x == b && y == a => Ok(()),
            _ => Err(format!("{a} and {b} are bound inconsistently")),
        }
    }

    fn matches(&self, a: I, b: I) -> bool {
        self.forward.get(&a) == Some(&b)
    }

    fn image(&self, a: I) -> Option<I> {
        self.forward.get(&a).copied()
    }
}

macro_rules! ensure {
    ($self:ident, $cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($self.diverge(format!($($arg)+)));
        }
    };
}

struct Checker<'p> {
    a: &'p Program,
    b: &'p Program,
    types: Option<(&'p TypeDb, &'p TypeDb)>,
    path: Vec<String>,
    variables: Bijection<VariableId>,
    registers: Bijection<RegisterId>,
    functions: Bijection<FunctionId>,
    blocks: Bijection<BlockId>,
    instrs: Bijection<InstrId>,
    values: Bijection<ValueId>,
    instr_pairs: Vec<(InstrId, InstrId, String)>,
    value_pairs: Vec<(ValueId, ValueId, String)>,
    conditions: Vec<(Operand, Operand, String)>,
}

impl<'p> Checker<'p> {
    fn new(a: &'p Program, b: &'p Program, types: Option<(&'p TypeDb, &'p TypeDb)>) -> Self {
        Self {
            a,
            b,
            types,
            path: Vec::new(),
            variables: Bijection::new(),
            registers: Bijection::new(),
            functions: Bijection::new(),
            blocks: Bijection::new(),
            instrs: Bijection::new(),
            values: Bijection::new(),
            instr_pairs: Vec::new(),
            value_pairs: Vec::new(),
            conditions: Vec::new(),
        }
    }

    fn diverge(&self, reason: impl Into<String>) -> Divergence {
        let path = if self.path.is_empty() {
            "program".to_string()
        } else {
            self.path.join("/")
        };
        Divergence {
            path,
            reason: reason.into(),
        }
    }

    fn run(mut self) -> Result<(), Divergence> {
        let (a, b) = (self.a, self.b);
        ensure!(self, a.name == b.name, "names {:?} and {:?}", a.name, b.name);
        ensure!(self, a.label == b.label, "labels {:?} and {:?}", a.label, b.label);
        ensure!(self, a.info == b.info, "module info differs");
        ensure!(self, a.counters == b.counters, "module counters differ");

        for class in StorageClass::GLOBAL {
            let (Some(la), Some(lb)) = (a.globals.list(class), b.globals.list(class)) else {
                continue;
            };
            self.path.push(format!("{class:?}"));
            self.variable_list(la, lb)?;
            self.path.pop();
        }

        self.path.push("registers".to_string());
        self.register_list(&a.registers, &b.registers)?;
        self.path.pop();

        ensure!(
            self,
            a.function_order.len() == b.function_order.len(),
            "{} functions vs {}",
            a.function_order.len(),
            b.function_order.len()
        );
        for (&fa, &fb) in a.function_order.iter().zip(&b.function_order) {
            self.path.push(format!("{fa}"));
            self.functions.bind(fa, fb).map_err(|e| self.diverge(e))?;
            let (sa, sb) = (self.function(a, fa)?, self.function(b, fb)?);
            ensure!(self, sa.name == sb.name, "names {:?} and {:?}", sa.name, sb.name);
            ensure!(self, self.same_params(&sa.params, &sb.params), "parameters differ");
            ensure!(
                self,
                self.same_optional_type(sa.return_type, sb.return_type),
                "return types differ"
            );
            self.path.pop();
        }

        for (&fa, &fb) in a.function_order.iter().zip(&b.function_order) {
            self.path.push(format!("{fa}"));
            let (sa, sb) = (self.function(a, fa)?, self.function(b, fb)?);
            match (&sa.body, &sb.body) {
                (None, None) => {}
                (Some(ba), Some(bb)) => self.body(ba, bb)?,
                _ => return Err(self.diverge("only one side has a body")),
            }
            self.path.pop();
        }

        self.check_references()
    }

    fn function(&self, program: &'p Program, id: FunctionId) -> Result<&'p Function, Divergence> {
        program
            .functions
            .try_get(id)
            .ok_or_else(|| self.diverge(format!("{id} does not exist")))
    }

    fn variable_list(&mut self, la: &[VariableId], lb: &[VariableId]) -> Result<(), Divergence> {
        ensure!(self, la.len() == lb.len(), "{} variables vs {}", la.len(), lb.len());
        for (&va, &vb) in la.iter().zip(lb) {
            self.variables.bind(va, vb).map_err(|e| self.diverge(e))?;
            let same = match (self.a.variables.try_get(va), self.b.variables.try_get(vb)) {
                (Some(ra), Some(rb)) => self.same_variable(ra, rb),
                _ => false,
            };
            ensure!(self, same, "variables {va} and {vb} differ");
        }
        Ok(())
    }

    fn same_type(&self, a: TypeId, b: TypeId) -> bool {
        match self.types {
            None => a == b,
            Some((ta, tb)) => same_type(ta, a, tb, b, 0),
        }
    }

    fn same_optional_type(&self, a: Option<TypeId>, b: Option<TypeId>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => self.same_type(x, y),
            _ => false,
        }
    }

    fn same_params(&self, a: &[Param], b: &[Param]) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|(p, q)| {
                p.num_components == q.num_components
                    && p.bit_size == q.bit_size
                    && self.same_type(p.ty, q.ty)
            })
    }

    fn same_variable(&self, x: &Variable, y: &Variable) -> bool {
        x.name == y.name
            && x.storage == y.storage
            && x.data == y.data
            && x.constant_initializer == y.constant_initializer
            && self.same_type(x.ty, y.ty)
            && self.same_optional_type(x.interface_type, y.interface_type)
    }

    fn register_list(&mut self, la: &[RegisterId], lb: &[RegisterId]) -> Result<(), Divergence> {
        ensure!(self, la.len() == lb.len(), "{} registers vs {}", la.len(), lb.len());
        for (&ra, &rb) in la.iter().zip(lb) {
            self.registers.bind(ra, rb).map_err(|e| self.diverge(e))?;
            let (xa, xb) = (self.a.regs.try_get(ra), self.b.regs.try_get(rb));
            ensure!(self, xa.is_some() && xa == xb, "registers {ra} and {rb} differ");
        }
        Ok(())
    }

    fn body(&mut self, ba: &Body, bb: &Body) -> Result<(), Divergence> {
        ensure!(self, ba.reg_alloc == bb.reg_alloc, "register allocation counters differ");
        self.path.push("locals".to_string());
        self.variable_list(&ba.locals, &bb.locals)?;
        self.path.pop();
        self.path.push("params".to_string());
        self.variable_list(&ba.params, &bb.params)?;
        self.path.pop();
        match (ba.return_var, bb.return_var) {
            (None, None) => {}
            (Some(ra), Some(rb)) => self.variable_list(&[ra], &[rb])?,
            _ => return Err(self.diverge("only one side has a return variable")),
        }
        self.register_list(&ba.registers, &bb.registers)?;
        self.cf_list(&ba.cf, &bb.cf)
    }

    fn cf_list(&mut self, la: &[CfNode], lb: &[CfNode]) -> Result<(), Divergence> {
        ensure!(self, la.len() == lb.len(), "{} cf nodes vs {}", la.len(), lb.len());
        for (na, nb) in la.iter().zip(lb) {
            match (na, nb) {
                (CfNode::Block(xa), CfNode::Block(xb)) => {
                    self.path.push(format!("{xa}"));
                    self.block(*xa, *xb)?;
                    self.path.pop();
                }
                (CfNode::If(ia), CfNode::If(ib)) => {
                    self.path.push("if".to_string());
                    let here = self.path.join("/");
                    self.conditions
                        .push((ia.condition.clone(), ib.condition.clone(), here));
                    self.cf_list(&ia.then_list, &ib.then_list)?;
                    self.path.push("else".to_string());
                    self.cf_list(&ia.else_list, &ib.else_list)?;
                    self.path.pop();
                    self.path.pop();
                }
                (CfNode::Loop(la), CfNode::Loop(lb)) => {
                    self.path.push("loop".to_string());
                    self.cf_list(&la.body, &lb.body)?;
                    self.path.pop();
                }
                _ => return Err(self.diverge("control-flow node kinds differ")),
            }
        }
        Ok(())
    }

    fn block(&mut self, xa: BlockId, xb: BlockId) -> Result<(), Divergence> {
        let (pa, pb) = (self.a, self.b);
        self.blocks.bind(xa, xb).map_err(|e| self.diverge(e))?;
        let (Some(ba), Some(bb)) = (pa.blocks.try_get(xa), pb.blocks.try_get(xb)) else {
            return Err(self.diverge("block does not exist"));
        };
        ensure!(
            self,
            ba.instrs.len() == bb.instrs.len(),
            "{} instructions vs {}",
            ba.instrs.len(),
            bb.instrs.len()
        );
        for (&ia, &ib) in ba.instrs.iter().zip(&bb.instrs) {
            self.instrs.bind(ia, ib).map_err(|e| self.diverge(e))?;
            let (Some(ra), Some(rb)) = (pa.instrs.try_get(ia), pb.instrs.try_get(ib)) else {
                return Err(self.diverge(format!("{ia} does not exist")));
            };
            ensure!(
                self,
                ra.kind() == rb.kind(),
                "{ia} is {} but {ib} is {}",
                ra.kind().name(),
                rb.kind().name()
            );
            let here = format!("{}/{ia}", self.path.join("/"));
            match (ra.defined_value(), rb.defined_value()) {
                (None, None) => {}
                (Some(va), Some(vb)) => {
                    self.values.bind(va, vb).map_err(|e| self.diverge(e))?;
                    let (xa, xb) = (pa.values.try_get(va), pb.values.try_get(vb));
                    let same_shape = match (xa, xb) {
                        (Some(xa), Some(xb)) => {
                            xa.bit_size == xb.bit_size && xa.num_components == xb.num_components
                        }
                        _ => false,
                    };
                    ensure!(self, same_shape, "values {va} and {vb} differ in shape");
                    self.value_pairs.push((va, vb, here.clone()));
                }
                _ => return Err(self.diverge(format!("only one of {ia} and {ib} defines a value"))),
            }
            self.instr_pairs.push((ia, ib, here));
        }
        Ok(())
    }

    fn check_references(&mut self) -> Result<(), Divergence> {
        for (ca, cb, here) in std::mem::take(&mut self.conditions) {
            self.path = vec![here];
            ensure!(self, self.operand(&ca, &cb), "if conditions differ");
        }
        for (ia, ib, here) in std::mem::take(&mut self.instr_pairs) {
            self.path = vec![here];
            let (Some(ra), Some(rb)) = (self.a.instrs.try_get(ia), self.b.instrs.try_get(ib)) else {
                return Err(self.diverge("instruction vanished"));
            };
            ensure!(self, self.instruction(ra, rb), "instructions {ia} and {ib} differ");
        }
        for (va, vb, here) in std::mem::take(&mut self.value_pairs) {
            self.path = vec![here];
            let (Some(xa), Some(xb)) = (self.a.values.try_get(va), self.b.values.try_get(vb)) else {
                return Err(self.diverge("value vanished"));
            };
            let mut mapped = Vec::with_capacity(xa.uses.len());
            for u in &xa.uses {
                let Some(instr) = self.instrs.image(u.instr) else {
                    return Err(self.diverge(format!("{va} is used by unreachable {}", u.instr)));
                };
                mapped.push((instr, u.slot));
            }
            let mut other: Vec<_> = xb.uses.iter().map(|u| (u.instr, u.slot)).collect();
            mapped.sort();
            other.sort();
            ensure!(self, mapped == other, "use-lists of {va} and {vb} differ");
        }
        Ok(())
    }

    fn instruction(&self, ra: &Instruction, rb: &Instruction) -> bool {
        match (ra, rb) {
            (Instruction::Alu(x), Instruction::Alu(y)) => {
                x.op == y.op
                    && x.write_mask == y.write_mask
                    && x.saturate == y.saturate
                    && x.exact == y.exact
                    && x.no_signed_wrap == y.no_signed_wrap
                    && x.no_unsigned_wrap == y.no_unsigned_wrap
                    && self.dest(&x.dest, &y.dest)
                    && x.srcs.len() == y.srcs.len()
                    && x.srcs.iter().zip(&y.srcs).all(|(s, t)| {
                        s.negate == t.negate
                            && s.abs == t.abs
                            && s.swizzle == t.swizzle
                            && self.operand(&s.operand, &t.operand)
                    })
            }
            (Instruction::Intrinsic(x), Instruction::Intrinsic(y)) => {
                x.op == y.op
                    && x.num_components == y.num_components
                    && x.const_index == y.const_index
                    && match (&x.dest, &y.dest) {
                        (None, None) => true,
                        (Some(d), Some(e)) => self.dest(d, e),
                        _ => false,
                    }
                    && self.operands(&x.srcs, &y.srcs)
                    && self.derefs(&x.variables, &y.variables)
            }
            (Instruction::LoadConst(x), Instruction::LoadConst(y)) => {
                self.values.matches(x.dest, y.dest) && x.values == y.values
            }
            (Instruction::Undef(x), Instruction::Undef(y)) => self.values.matches(x.dest, y.dest),
            (Instruction::Texture(x), Instruction::Texture(y)) => {
                x.op == y.op
                    && x.sampler_dim == y.sampler_dim
                    && x.coord_components == y.coord_components
                    && x.is_array == y.is_array
                    && x.is_shadow == y.is_shadow
                    && x.component == y.component
                    && x.texture_index == y.texture_index
                    && x.sampler_index == y.sampler_index
                    && self.dest(&x.dest, &y.dest)
                    && x.srcs.len() == y.srcs.len()
                    && x.srcs
                        .iter()
                        .zip(&y.srcs)
                        .all(|(s, t)| s.kind == t.kind && self.operand(&s.operand, &t.operand))
                    && self.optional_deref(x.texture.as_ref(), y.texture.as_ref())
                    && self.optional_deref(x.sampler.as_ref(), y.sampler.as_ref())
            }
            (Instruction::Phi(x), Instruction::Phi(y)) => {
                self.values.matches(x.dest, y.dest)
                    && x.srcs.len() == y.srcs.len()
                    && x.srcs.iter().zip(&y.srcs).all(|(s, t)| {
                        self.blocks.matches(s.pred, t.pred) && self.values.matches(s.value, t.value)
                    })
            }
            (Instruction::Jump(x), Instruction::Jump(y)) => x == y,
            (Instruction::Call(x), Instruction::Call(y)) => {
                self.functions.matches(x.callee, y.callee)
                    && self.derefs(&x.params, &y.params)
                    && self.optional_deref(x.ret.as_ref(), y.ret.as_ref())
            }
            _ => false,
        }
    }

    fn dest(&self, a: &Dest, b: &Dest) -> bool {
        match (a, b) {
            (Dest::Ssa(x), Dest::Ssa(y)) => self.values.matches(*x, *y),
            (Dest::Register(x), Dest::Register(y)) => self.register_ref(x, y),
            _ => false,
        }
    }

    fn operand(&self, a: &Operand, b: &Operand) -> bool {
        match (a, b) {
            (Operand::Value(x), Operand::Value(y)) => self.values.matches(*x, *y),
            (Operand::Register(x), Operand::Register(y)) => self.register_ref(x, y),
            _ => false,
        }
    }

    fn operands(&self, a: &[Operand], b: &[Operand]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.operand(x, y))
    }

    fn register_ref(&self, a: &RegisterRef, b: &RegisterRef) -> bool {
        self.registers.matches(a.reg, b.reg)
            && a.base_offset == b.base_offset
            && match (&a.indirect, &b.indirect) {
                (None, None) => true,
                (Some(x), Some(y)) => self.operand(x, y),
                _ => false,
            }
    }

    fn deref(&self, a: &Deref, b: &Deref) -> bool {
        self.variables.matches(a.var, b.var)
            && a.path.len() == b.path.len()
            && a.path.iter().zip(&b.path).all(|(x, y)| match (x, y) {
                (DerefLink::Struct { field: f }, DerefLink::Struct { field: g }) => f == g,
                (
                    DerefLink::Array {
                        base_offset: o,
                        indirect: i,
                    },
                    DerefLink::Array {
                        base_offset: p,
                        indirect: j,
                    },
                ) => {
                    o == p
                        && match (i, j) {
                            (None, None) => true,
                            (Some(x), Some(y)) => self.operand(x, y),
                            _ => false,
                        }
                }
                _ => false,
            })
    }

    fn derefs(&self, a: &[Deref], b: &[Deref]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.deref(x, y))
    }

    fn optional_deref(&self, a: Option<&Deref>, b: Option<&Deref>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(x), Some(y)) => self.deref(x, y),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BodyBuilder;
    use crate::function::Function;
    use crate::instr::{AluOp, JumpKind};
    use crate::program::ModuleInfo;
    use crate::types::BaseType;

    fn counter_loop(pad: usize) -> Program {
        let mut program = Program::new(ModuleInfo::default());
        // Unreachable padding shifts every handle without changing structure.
        for _ in 0..pad {
            program.values.alloc(crate::value::Value::new(8, 1));
            program.blocks.alloc(crate::function::Block::default());
        }
        let main = program.declare_function(Function::declare("main", Vec::new(), None));
        let mut b = BodyBuilder::new(&mut program, main);
        let pre = b.block();
        let init = b.load_const(pre, 32, &[0]);
        b.begin_loop();
        let header = b.block();
        let (phi, i) = b.phi(header, 32, 1);
        let one = b.load_const(header, 32, &[1]);
        let next = b.alu(header, AluOp::Iadd, 32, 1, &[Operand::Value(i), Operand::Value(one)]);
        b.add_phi_src(phi, pre, init).unwrap();
        b.add_phi_src(phi, header, next).unwrap();
        b.jump(header, JumpKind::Break);
        b.end_loop().unwrap();
        b.finish().unwrap();
        program
    }

    #[test]
    fn identical_programs_are_equivalent() {
        let a = counter_loop(0);
        assert_eq!(equivalent(&a, &a.clone()), Ok(()));
    }

    #[test]
    fn renumbered_handles_are_equivalent() {
        assert_eq!(equivalent(&counter_loop(0), &counter_loop(3)), Ok(()));
    }

    #[test]
    fn constant_change_is_detected() {
        let a = counter_loop(0);
        let mut b = a.clone();
        for instr in b.instrs.iter().map(|(id, _)| id).collect::<Vec<_>>() {
            if let Instruction::LoadConst(lc) = &mut b.instrs[instr] {
                lc.values[0] += 10;
            }
        }
        let err = equivalent(&a, &b).unwrap_err();
        assert!(err.reason.contains("differ"), "{err}");
    }

    #[test]
    fn missing_use_is_detected() {
        let a = counter_loop(0);
        let mut b = a.clone();
        let used = b
            .values
            .iter()
            .find(|(_, v)| !v.uses.is_empty())
            .map(|(id, _)| id)
            .unwrap();
        b.values[used].uses.pop();
        let err = equivalent(&a, &b).unwrap_err();
        assert!(err.reason.contains("use-lists"), "{err}");
    }

    fn with_light_uniform(program: &mut Program, types: &mut TypeDb) {
        let vec4 = types.vector(BaseType::Float, 4);
        let lights = types.intern(Type::Array {
            element: vec4,
            len: 4,
        });
        let block = types.intern(Type::Struct {
            name: "Lights".to_string(),
            fields: vec![("color".to_string(), lights)],
        });
        program
            .add_global(Variable::new(Some("lights"), StorageClass::Uniform, block))
            .unwrap();
        let main = program.function_order[0];
        program.functions[main].return_type = Some(vec4);
    }

    #[test]
    fn types_from_separate_databases_compare_structurally() {
        let mut types_a = TypeDb::new();
        let mut a = counter_loop(0);
        with_light_uniform(&mut a, &mut types_a);

        // Unrelated types first, so every handle lands elsewhere.
        let mut types_b = TypeDb::new();
        types_b.scalar(BaseType::Int);
        types_b.scalar(BaseType::Uint);
        let mut b = counter_loop(0);
        with_light_uniform(&mut b, &mut types_b);

        assert!(equivalent(&a, &b).is_err());
        assert_eq!(equivalent_with_types(&a, &types_a, &b, &types_b), Ok(()));
    }

    #[test]
    fn differing_types_are_detected_across_databases() {
        let mut types_a = TypeDb::new();
        let mut a = counter_loop(0);
        with_light_uniform(&mut a, &mut types_a);

        let mut types_b = TypeDb::new();
        let mut b = counter_loop(0);
        with_light_uniform(&mut b, &mut types_b);
        let vec4 = types_b.vector(BaseType::Float, 4);
        let lights = types_b.intern(Type::Array {
            element: vec4,
            len: 4,
        });
        let uniform = b.globals.uniforms[0];
        b.variables[uniform].ty = types_b.intern(Type::Struct {
            name: "Lights".to_string(),
            fields: vec![("colour".to_string(), lights)],
        });

        let err = equivalent_with_types(&a, &types_a, &b, &types_b).unwrap_err();
        assert_eq!(err.path, "Uniform");
    }

    #[test]
    fn renamed_function_is_detected() {
        let a = counter_loop(0);
        let mut b = a.clone();
        let main = b.function_order[0];
        b.functions[main].name = "other".to_string();
        let err = equivalent(&a, &b).unwrap_err();
        assert_eq!(err.path, "fn0");
    }
}
