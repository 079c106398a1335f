use lumen_ir::{
    equivalent, equivalent_with_types, AluInstr, AluOp, AluSrc, BaseType, BodyBuilder, Deref,
    DerefLink, Dest, Function, Instruction, IntrinsicInstr, IntrinsicOp, JumpKind, ModuleInfo,
    Operand, Param, Program, Register, RegisterRef, SamplerDim, ShaderStage, StorageClass,
    TexInstr, TexOp, TexSrc, TexSrcKind, Type, TypeDb, Variable,
};
use lumen_serialize::{
    deserialize, object_count, round_trip, serialize, serialize_with, DecodeError,
    SerializeError, SerializeOptions,
};

fn scalar_param(types: &mut TypeDb) -> Param {
    Param {
        num_components: 1,
        bit_size: 32,
        ty: types.scalar(BaseType::Float),
    }
}

/// One function, one block: a 32-bit constant 42 and a return.
fn scenario_a() -> Program {
    let mut program = Program::new(ModuleInfo::default());
    program.name = Some("scenario_a".to_string());
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let block = b.block();
    b.load_const(block, 32, &[42]);
    b.jump(block, JumpKind::Return);
    b.finish().unwrap();
    program
}

/// A counting loop whose header phi merges the pre-loop constant with a
/// value computed later in the loop body.
fn scenario_b() -> Program {
    let mut program = Program::new(ModuleInfo::default());
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let pre = b.block();
    let zero = b.load_const(pre, 32, &[0]);
    b.begin_loop();
    let header = b.block();
    let (phi, counter) = b.phi(header, 32, 1);
    let limit = b.load_const(header, 32, &[10]);
    let done = b.alu(
        header,
        AluOp::Ige,
        1,
        1,
        &[Operand::Value(counter), Operand::Value(limit)],
    );
    b.begin_if(Operand::Value(done));
    let exit = b.block();
    b.jump(exit, JumpKind::Break);
    b.end_if().unwrap();
    let body = b.block();
    let one = b.load_const(body, 32, &[1]);
    let next = b.alu(
        body,
        AluOp::Iadd,
        32,
        1,
        &[Operand::Value(counter), Operand::Value(one)],
    );
    b.jump(body, JumpKind::Continue);
    b.end_loop().unwrap();
    b.add_phi_src(phi, pre, zero).unwrap();
    b.add_phi_src(phi, body, next).unwrap();
    let tail = b.block();
    b.jump(tail, JumpKind::Return);
    b.finish().unwrap();
    program
}

/// Two mutually recursive functions; `a` calls `b`, which is declared later.
fn scenario_c(types: &mut TypeDb) -> Program {
    let param = scalar_param(types);
    let float = param.ty;
    let mut program = Program::new(ModuleInfo::default());
    let fa = program.declare_function(Function::declare("a", vec![param], None));
    let fb = program.declare_function(Function::declare("b", Vec::new(), Some(float)));

    let mut b = BodyBuilder::new(&mut program, fa);
    b.add_param(Variable::new(Some("x"), StorageClass::Param, float));
    let result = b.add_local(Variable::new(Some("r"), StorageClass::Local, float));
    let block = b.block();
    b.call(block, fb, Vec::new(), Some(Deref::var(result)));
    b.jump(block, JumpKind::Return);
    b.finish().unwrap();

    let mut b = BodyBuilder::new(&mut program, fb);
    b.set_return_var(Variable::new(None, StorageClass::Return, float));
    let arg = b.add_local(Variable::new(Some("t"), StorageClass::Local, float));
    let block = b.block();
    b.call(block, fa, vec![Deref::var(arg)], None);
    b.jump(block, JumpKind::Return);
    b.finish().unwrap();
    program
}

/// Registers addressed through an indirect index that is itself indirect,
/// deref chains with struct and indirect array links, and a texture sample
/// with both deref chains.
fn addressing(types: &mut TypeDb) -> Program {
    let float = types.scalar(BaseType::Float);
    let vec4 = types.vector(BaseType::Float, 4);
    let light = types.intern(Type::Struct {
        name: "Light".to_string(),
        fields: vec![("color".to_string(), vec4), ("power".to_string(), float)],
    });
    let lights = types.intern(Type::Array {
        element: light,
        len: 8,
    });
    let sampler = types.intern(Type::Sampler {
        dim: SamplerDim::Dim2D,
        shadow: false,
        array: true,
        result: BaseType::Float,
    });

    let mut program = Program::new(ModuleInfo {
        stage: ShaderStage::Fragment,
        num_textures: 1,
        inputs_read: 0b1011,
        workgroup_size: [1, 1, 1],
        ..ModuleInfo::default()
    });
    let ubo = program
        .add_global(Variable::new(Some("lights"), StorageClass::Uniform, lights))
        .unwrap();
    let tex = program
        .add_global(Variable::new(Some("albedo"), StorageClass::Uniform, sampler))
        .unwrap();
    let main = program.declare_function(Function::declare("main", Vec::new(), None));

    let mut b = BodyBuilder::new(&mut program, main);
    let table = b.add_register(Register {
        name: Some("table".to_string()),
        bit_size: 32,
        num_components: 1,
        num_array_elems: 16,
        index: 0,
    });
    let scratch = b.add_register(Register {
        name: None,
        bit_size: 32,
        num_components: 4,
        num_array_elems: 4,
        index: 0,
    });
    let block = b.block();
    let i = b.load_const(block, 32, &[3]);

    // scratch[1 + table[2 + %i]] = mov %i
    let inner = Operand::Register(RegisterRef::indirect(table, 2, Operand::Value(i)));
    let dest = RegisterRef::indirect(scratch, 1, inner.clone());
    b.push(
        block,
        Instruction::Alu(AluInstr {
            op: AluOp::Mov,
            dest: Dest::Register(dest),
            write_mask: 0b1,
            saturate: false,
            exact: true,
            no_signed_wrap: false,
            no_unsigned_wrap: false,
            srcs: vec![AluSrc {
                operand: Operand::Value(i),
                negate: true,
                abs: false,
                swizzle: [0, 0, 0, 0],
            }],
        }),
    );
    let read_back = b.alu(block, AluOp::Mov, 32, 1, &[inner]);

    let power = b.new_value(32, 1);
    b.push(
        block,
        Instruction::Intrinsic(IntrinsicInstr {
            op: IntrinsicOp::LoadVar,
            num_components: 1,
            dest: Some(Dest::Ssa(power)),
            srcs: Vec::new(),
            const_index: Vec::new(),
            variables: vec![Deref {
                var: ubo,
                path: vec![
                    DerefLink::Array {
                        base_offset: 0,
                        indirect: Some(Operand::Value(read_back)),
                    },
                    DerefLink::Struct { field: 1 },
                ],
            }],
        }),
    );

    let coord = b.load_const(block, 32, &[0, 0x3f00_0000]);
    let texel = b.new_value(32, 4);
    b.push(
        block,
        Instruction::Texture(TexInstr {
            op: TexOp::Txb,
            dest: Dest::Ssa(texel),
            sampler_dim: SamplerDim::Dim2D,
            coord_components: 3,
            is_array: true,
            is_shadow: false,
            component: 0,
            texture_index: 0,
            sampler_index: 0,
            srcs: vec![
                TexSrc {
                    kind: TexSrcKind::Coord,
                    operand: Operand::Value(coord),
                },
                TexSrc {
                    kind: TexSrcKind::Bias,
                    operand: Operand::Value(power),
                },
            ],
            texture: Some(Deref::var(tex)),
            sampler: Some(Deref {
                var: tex,
                path: vec![DerefLink::Array {
                    base_offset: 0,
                    indirect: Some(Operand::Value(i)),
                }],
            }),
        }),
    );
    b.jump(block, JumpKind::Return);
    b.finish().unwrap();
    program
}

fn assert_round_trips(program: &Program, types: &mut TypeDb) -> Vec<u8> {
    let bytes = serialize(program, types).unwrap();
    let decoded = deserialize(&bytes, types).unwrap();
    if let Err(divergence) = equivalent(program, &decoded) {
        panic!("decoded program diverges: {divergence}");
    }
    bytes
}

#[test]
fn scenario_a_round_trips() {
    let mut types = TypeDb::new();
    let program = scenario_a();
    let bytes = assert_round_trips(&program, &mut types);
    let decoded = deserialize(&bytes, &mut types).unwrap();

    assert_eq!(decoded.name.as_deref(), Some("scenario_a"));
    let main = decoded.function_by_name("main").unwrap();
    let blocks = decoded.functions[main].body.as_ref().unwrap().blocks();
    assert_eq!(blocks.len(), 1);
    let instrs = &decoded.blocks[blocks[0]].instrs;
    assert_eq!(instrs.len(), 2);
    let Instruction::LoadConst(lc) = &decoded.instrs[instrs[0]] else {
        panic!("expected a constant load");
    };
    assert_eq!(lc.values, vec![42]);
    assert_eq!(decoded.values[lc.dest].bit_size, 32);
    assert_eq!(decoded.values[lc.dest].num_components, 1);
    assert_eq!(decoded.instrs[instrs[1]], Instruction::Jump(JumpKind::Return));
}

#[test]
fn scenario_b_round_trips() {
    let mut types = TypeDb::new();
    let program = scenario_b();
    let bytes = assert_round_trips(&program, &mut types);
    let decoded = deserialize(&bytes, &mut types).unwrap();

    let phi = decoded
        .instrs
        .values()
        .find_map(|i| match i {
            Instruction::Phi(phi) => Some(phi),
            _ => None,
        })
        .unwrap();
    assert_eq!(phi.srcs.len(), 2);
    // The second source is the increment computed after the phi.
    let next = &decoded.values[phi.srcs[1].value];
    assert_eq!(next.uses.len(), 1);
    assert_eq!(next.uses[0].slot, 1);
    // The counter feeds the exit test and the increment.
    assert_eq!(decoded.values[phi.dest].uses.len(), 2);
}

#[test]
fn scenario_c_round_trips() {
    let mut types = TypeDb::new();
    let program = scenario_c(&mut types);
    let bytes = assert_round_trips(&program, &mut types);
    let decoded = deserialize(&bytes, &mut types).unwrap();

    let fa = decoded.function_by_name("a").unwrap();
    let fb = decoded.function_by_name("b").unwrap();
    let calls: Vec<_> = decoded
        .instrs
        .values()
        .filter_map(|i| match i {
            Instruction::Call(call) => Some(call.callee),
            _ => None,
        })
        .collect();
    assert_eq!(calls, vec![fb, fa]);
}

#[test]
fn decoding_into_another_type_table_keeps_equivalence() {
    let mut src = TypeDb::new();
    let mut program = scenario_c(&mut src);
    let vec4 = src.vector(BaseType::Float, 4);
    program
        .add_global(Variable::new(Some("tint"), StorageClass::Uniform, vec4))
        .unwrap();
    let bytes = serialize(&program, &src).unwrap();

    let mut other = TypeDb::new();
    other.scalar(BaseType::Int);
    let decoded = deserialize(&bytes, &mut other).unwrap();
    assert_ne!(other.len(), src.len());
    assert_eq!(equivalent_with_types(&program, &src, &decoded, &other), Ok(()));
}

#[test]
fn addressing_round_trips() {
    let mut types = TypeDb::new();
    let program = addressing(&mut types);
    let bytes = assert_round_trips(&program, &mut types);
    let decoded = deserialize(&bytes, &mut types).unwrap();
    assert_eq!(decoded.info, program.info);
    assert_eq!(decoded.globals.uniforms.len(), 2);
}

#[test]
fn serialization_is_deterministic() {
    let mut types = TypeDb::new();
    for program in [scenario_a(), scenario_b(), scenario_c(&mut types), addressing(&mut types)] {
        let first = serialize(&program, &types).unwrap();
        let second = serialize(&program, &types).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn round_trip_is_idempotent() {
    let mut types = TypeDb::new();
    for program in [scenario_a(), scenario_b(), scenario_c(&mut types), addressing(&mut types)] {
        let once = round_trip(&program, &mut types).unwrap();
        let twice = round_trip(&once, &mut types).unwrap();
        equivalent(&once, &twice).unwrap();
        // Handles never reach the stream, so the bytes are stable too.
        assert_eq!(
            serialize(&program, &types).unwrap(),
            serialize(&twice, &types).unwrap()
        );
    }
}

#[test]
fn every_strict_prefix_is_truncated() {
    let mut types = TypeDb::new();
    for program in [scenario_a(), scenario_b(), scenario_c(&mut types), addressing(&mut types)] {
        let bytes = serialize(&program, &types).unwrap();
        for len in 0..bytes.len() {
            match deserialize(&bytes[..len], &mut types) {
                Err(DecodeError::Truncated { offset }) => assert!(offset <= len),
                other => panic!("prefix of {len}/{} bytes: {other:?}", bytes.len()),
            }
        }
    }
}

#[test]
fn object_counts_agree() {
    let mut types = TypeDb::new();
    let program = scenario_b();
    let out = serialize_with(&program, &types, &SerializeOptions::default()).unwrap();
    assert_eq!(object_count(&out.bytes), Some(out.object_count));

    // main, five blocks, and the phi, three constants and two ALU results.
    assert_eq!(out.object_count, 1 + 5 + 6);

    let decoded = deserialize(&out.bytes, &mut types).unwrap();
    let again = serialize_with(&decoded, &types, &SerializeOptions::default()).unwrap();
    assert_eq!(again.object_count, out.object_count);
}

#[test]
fn wrong_header_count_is_reported() {
    let types = TypeDb::new();
    let mut bytes = serialize(&scenario_a(), &types).unwrap();
    bytes[..8].copy_from_slice(&4u64.to_le_bytes());
    let err = deserialize(&bytes, &mut TypeDb::new()).unwrap_err();
    assert_eq!(
        err,
        DecodeError::ObjectCountMismatch {
            expected: 4,
            found: 3
        }
    );
}

#[test]
fn trailing_bytes_are_malformed() {
    let types = TypeDb::new();
    let mut bytes = serialize(&scenario_a(), &types).unwrap();
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    let err = deserialize(&bytes, &mut TypeDb::new()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)), "{err:?}");
}

fn self_calling() -> Program {
    let mut program = Program::new(ModuleInfo::default());
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let block = b.block();
    b.call(block, main, Vec::new(), None);
    b.finish().unwrap();
    program
}

#[test]
fn call_to_a_non_function_is_malformed() {
    let types = TypeDb::new();
    let bytes = serialize(&self_calling(), &types).unwrap();
    let callee = bytes.len() - 4;
    assert_eq!(bytes[callee..], 0u32.to_le_bytes());

    // Object #1 is main's only block.
    let mut corrupt = bytes.clone();
    corrupt[callee..].copy_from_slice(&1u32.to_le_bytes());
    let err = deserialize(&corrupt, &mut TypeDb::new()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)), "{err:?}");

    let mut corrupt = bytes;
    corrupt[callee..].copy_from_slice(&900u32.to_le_bytes());
    let err = deserialize(&corrupt, &mut TypeDb::new()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)), "{err:?}");
}

#[test]
fn strip_mode_drops_names_only() {
    let mut types = TypeDb::new();
    let program = scenario_c(&mut types);
    let full = serialize(&program, &types).unwrap();
    let stripped = serialize_with(&program, &types, &SerializeOptions { strip: true }).unwrap();
    assert!(stripped.bytes.len() < full.len());

    let decoded = deserialize(&stripped.bytes, &mut types).unwrap();
    assert!(decoded.functions_in_order().all(|(_, f)| f.name.is_empty()));
    assert!(decoded.variables.values().all(|v| v.name.is_none()));
    assert_eq!(decoded.instruction_count(), program.instruction_count());
    assert!(equivalent(&program, &decoded).is_err());
}

#[test]
fn source_count_mismatch_is_an_internal_error() {
    let types = TypeDb::new();
    let mut program = Program::new(ModuleInfo::default());
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let block = b.block();
    let one = b.load_const(block, 32, &[1]);
    // iadd takes two sources.
    b.alu(block, AluOp::Iadd, 32, 1, &[Operand::Value(one)]);
    b.finish().unwrap();

    let err = serialize(&program, &types).unwrap_err();
    assert!(matches!(err, SerializeError::Internal(_)), "{err:?}");
}

#[test]
fn reference_to_an_undefined_value_is_an_internal_error() {
    let types = TypeDb::new();
    let mut program = Program::new(ModuleInfo::default());
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let block = b.block();
    let dangling = b.new_value(32, 1);
    b.alu(block, AluOp::Mov, 32, 1, &[Operand::Value(dangling)]);
    b.finish().unwrap();

    let err = serialize(&program, &types).unwrap_err();
    assert!(
        err.to_string().contains("referenced before it was registered"),
        "{err}"
    );
}

#[test]
fn call_arity_mismatch_is_an_internal_error() {
    let mut types = TypeDb::new();
    let param = scalar_param(&mut types);
    let mut program = Program::new(ModuleInfo::default());
    let callee = program.declare_function(Function::declare("f", vec![param], None));
    let main = program.declare_function(Function::declare("main", Vec::new(), None));
    let mut b = BodyBuilder::new(&mut program, main);
    let block = b.block();
    b.call(block, callee, Vec::new(), None);
    b.finish().unwrap();

    let err = serialize(&program, &types).unwrap_err();
    assert!(matches!(err, SerializeError::Internal(_)), "{err:?}");
}
