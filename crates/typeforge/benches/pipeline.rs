use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use typeforge::{
    render, CompilerLoader, FieldSpec, MemberSpec, MethodSpec, PropertySpec, TypeModel, TypeRef, Visibility,
};
use typeforge_engine::CORE_LOCATIONS;

fn model(members: usize) -> TypeModel {
    let mut model = TypeModel::new("Bench", "Generated", Visibility::Public).unwrap();
    model.add_import("System").unwrap();
    for i in 0..members {
        model
            .add_member(MemberSpec::Field(FieldSpec::new(format!("field{}", i), TypeRef::Int).with_default(i as i64)))
            .unwrap();
        model
            .add_member(MemberSpec::Property(PropertySpec::new(format!("Prop{}", i), TypeRef::String)))
            .unwrap();
        model
            .add_member(MemberSpec::Method(MethodSpec::new(format!(
                "public int Sum{i}(int n)\n{{\n    var total = field{i};\n    while (n > 0) {{ total += n; n -= 1; }}\n    return total;\n}}"
            ))))
            .unwrap();
    }
    model
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for members in [1, 10, 100] {
        let model = model(members);
        group.throughput(Throughput::Elements(members as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), &model, |b, model| {
            b.iter(|| render(black_box(model)));
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let loader = CompilerLoader::default();
    let core: Vec<String> = CORE_LOCATIONS.iter().map(|s| s.to_string()).collect();
    for members in [1, 10, 100] {
        let source = render(&model(members));
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), &source, |b, source| {
            b.iter(|| loader.compile(black_box(source), &core).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render, bench_compile);
criterion_main!(benches);
