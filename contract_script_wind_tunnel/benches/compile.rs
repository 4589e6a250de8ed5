// Copyright 2026 the Contract Script Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use contract_script::artifact::Artifact;
use contract_script::descriptor::{
    DescriptorCatalog, DescriptorId, DescriptorParam, LoweringStrategy, MethodDescriptor,
    PackPolicy, ResolvedCatalog,
};
use contract_script::disasm::{control_flow_graph, disassemble};
use contract_script::ir::{BinaryOp, ContractDef, Literal, MethodDef, Op, Param, ParamType, Slot};
use contract_script::token::{CallFlags, ScriptHash};
use contract_script::unit::{CompilationUnit, CompileOptions, CompiledContract};

fn bench_compile(c: &mut Criterion) {
    bench_straight_line(c);
    bench_branchy(c);
    bench_call_heavy(c);
    bench_hoisting(c);
    bench_artifact_encode(c);
    bench_disassemble(c);
    bench_cfg(c);
}

fn method(name: &str, params: usize, locals: u8, body: Vec<Op>) -> MethodDef {
    MethodDef {
        name: name.to_string(),
        params: (0..params)
            .map(|i| Param {
                name: format!("p{i}"),
                ty: ParamType::Integer,
            })
            .collect(),
        return_type: ParamType::Integer,
        locals,
        public: true,
        safe: false,
        body,
    }
}

fn transfer_catalog() -> (ResolvedCatalog, DescriptorId) {
    let mut cat = DescriptorCatalog::new();
    let id = cat
        .register(MethodDescriptor {
            public_id: "token.transfer".to_string(),
            params: vec![DescriptorParam {
                name: "to".to_string(),
                ty: ParamType::Hash160,
                default_bytecode: None,
            }],
            return_type: ParamType::Boolean,
            lowering: LoweringStrategy::ContractCall {
                hash: ScriptHash([0xEE; 20]),
                method: "transfer".to_string(),
                flags: CallFlags::ALL,
                token_eligible: true,
            },
            pack: PackPolicy::Positional,
            internal_call_arity: None,
        })
        .unwrap();
    (cat.resolve().unwrap(), id)
}

fn inline_catalog() -> (ResolvedCatalog, DescriptorId) {
    let mut cat = DescriptorCatalog::new();
    let id = cat
        .register(MethodDescriptor {
            public_id: "native.notify".to_string(),
            params: vec![],
            return_type: ParamType::Void,
            lowering: LoweringStrategy::ContractCall {
                hash: ScriptHash([0xEE; 20]),
                method: "notify".to_string(),
                flags: CallFlags::ALL,
                token_eligible: false,
            },
            pack: PackPolicy::Positional,
            internal_call_arity: None,
        })
        .unwrap();
    (cat.resolve().unwrap(), id)
}

fn build_straight_line(ops: u32) -> ContractDef {
    let mut body = Vec::new();
    for i in 0..ops {
        body.push(Op::Push(Literal::Int(i128::from(i))));
        body.push(Op::Push(Literal::Int(1)));
        body.push(Op::Binary(BinaryOp::Add));
        body.push(Op::Drop);
    }
    body.push(Op::Return);
    ContractDef {
        name: "bench".to_string(),
        static_slots: 0,
        methods: vec![method("chain", 0, 0, body)],
    }
}

fn build_branchy(depth: u32) -> ContractDef {
    let mut body = vec![Op::Push(Literal::Int(0))];
    for _ in 0..depth {
        body = vec![Op::If {
            cond: vec![Op::Load(Slot::Arg(0))],
            then_body: body,
            else_body: vec![Op::Push(Literal::Int(1)), Op::Drop],
        }];
    }
    body.push(Op::Return);
    ContractDef {
        name: "bench".to_string(),
        static_slots: 0,
        methods: vec![method("nested", 1, 0, body)],
    }
}

fn build_call_heavy(calls: u32, id: DescriptorId) -> ContractDef {
    let mut body = Vec::new();
    for _ in 0..calls {
        body.push(Op::Call {
            callee: id,
            args: vec![vec![Op::Load(Slot::Arg(0))]],
        });
        body.push(Op::Drop);
    }
    body.push(Op::Return);
    ContractDef {
        name: "bench".to_string(),
        static_slots: 0,
        methods: vec![method("caller", 1, 0, body)],
    }
}

fn build_inline_heavy(calls: u32, id: DescriptorId) -> ContractDef {
    let mut body = Vec::new();
    for _ in 0..calls {
        body.push(Op::Call {
            callee: id,
            args: vec![],
        });
    }
    body.push(Op::Return);
    ContractDef {
        name: "bench".to_string(),
        static_slots: 0,
        methods: vec![method("noisy", 0, 0, body)],
    }
}

fn compile(catalog: &ResolvedCatalog, input: &ContractDef) -> CompiledContract {
    CompilationUnit::new(catalog, CompileOptions::default())
        .compile(input)
        .unwrap()
}

fn bench_straight_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("straight_line");
    let catalog = DescriptorCatalog::new().resolve().unwrap();
    for &ops in &[10_u32, 100, 1000] {
        let input = build_straight_line(ops);
        group.bench_with_input(BenchmarkId::from_parameter(ops), &input, |b, input| {
            b.iter(|| black_box(compile(&catalog, input)));
        });
    }
    group.finish();
}

fn bench_branchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_if");
    let catalog = DescriptorCatalog::new().resolve().unwrap();
    for &depth in &[4_u32, 16, 64] {
        let input = build_branchy(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &input, |b, input| {
            b.iter(|| black_box(compile(&catalog, input)));
        });
    }
    group.finish();
}

fn bench_call_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_calls");
    let (catalog, id) = transfer_catalog();
    for &calls in &[10_u32, 100, 500] {
        let input = build_call_heavy(calls, id);
        group.bench_with_input(BenchmarkId::from_parameter(calls), &input, |b, input| {
            b.iter(|| black_box(compile(&catalog, input)));
        });
    }
    group.finish();
}

fn bench_hoisting(c: &mut Criterion) {
    // Inline-only calls repeat their preambles, so this exercises the
    // duplicate-preamble pass end to end.
    let mut group = c.benchmark_group("hoisting");
    let (catalog, id) = inline_catalog();
    for &calls in &[10_u32, 100] {
        let input = build_inline_heavy(calls, id);
        group.bench_with_input(BenchmarkId::from_parameter(calls), &input, |b, input| {
            b.iter(|| black_box(compile(&catalog, input)));
        });
        group.bench_with_input(
            BenchmarkId::new("disabled", calls),
            &input,
            |b, input| {
                b.iter(|| {
                    let unit = CompilationUnit::new(
                        &catalog,
                        CompileOptions {
                            hoist_duplicate_preambles: false,
                        },
                    );
                    black_box(unit.compile(input).unwrap())
                });
            },
        );
    }
    group.finish();
}

fn bench_artifact_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("artifact");
    let (catalog, id) = transfer_catalog();
    let compiled = compile(&catalog, &build_call_heavy(100, id));
    let artifact = Artifact::new("csc", &compiled);
    group.bench_function("encode", |b| {
        b.iter(|| black_box(artifact.encode()));
    });
    let bytes = artifact.encode();
    group.bench_function("decode", |b| {
        b.iter(|| black_box(Artifact::decode(&bytes).unwrap()));
    });
    group.finish();
}

fn bench_disassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("disassemble");
    let catalog = DescriptorCatalog::new().resolve().unwrap();
    for &ops in &[100_u32, 1000] {
        let compiled = compile(&catalog, &build_straight_line(ops));
        group.bench_with_input(
            BenchmarkId::from_parameter(ops),
            &compiled.script,
            |b, script| {
                b.iter(|| black_box(disassemble(script).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_cfg(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_flow_graph");
    let catalog = DescriptorCatalog::new().resolve().unwrap();
    for &depth in &[4_u32, 16, 64] {
        let compiled = compile(&catalog, &build_branchy(depth));
        group.bench_with_input(
            BenchmarkId::from_parameter(depth),
            &compiled.script,
            |b, script| {
                b.iter(|| black_box(control_flow_graph(script).unwrap()));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
