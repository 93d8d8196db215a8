//! Performance benchmarks for module generation and the binding runtime.
//!
//! - Module size: synthetic libraries from 10 to 500 classes
//! - Features: heavy overloading, deep hierarchies, ownership directives
//! - Runtime: wrapper construction, parenting and teardown
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect per-phase timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use wrapgen::core::{
    ArgIndex, ArgumentEntry, ClassEntry, CppType, FunctionEntry, OwnershipModification, PrimitiveKind,
};
use wrapgen::runtime::BindingManager;
use wrapgen::{ApiModel, BindingUnit};

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

// =============================================================================
// Synthetic models
// =============================================================================

fn int() -> CppType {
    CppType::primitive(PrimitiveKind::Int)
}

fn double() -> CppType {
    CppType::primitive(PrimitiveKind::Double)
}

/// A value class with accessors and a small overload set.
fn value_class(index: usize) -> ClassEntry {
    let name = format!("Value{index}");
    ClassEntry::value(&name)
        .with_function(FunctionEntry::constructor(&name))
        .with_function(FunctionEntry::constructor(&name).with_arg(ArgumentEntry::new("x", double())))
        .with_function(FunctionEntry::method("x", double()).as_const())
        .with_function(FunctionEntry::method("setX", CppType::void()).with_arg(ArgumentEntry::new("x", double())))
        .with_function(FunctionEntry::method("scale", CppType::void()).with_arg(ArgumentEntry::new("by", int())))
        .with_function(FunctionEntry::method("scale", CppType::void()).with_arg(ArgumentEntry::new("by", double())))
}

fn library(classes: usize) -> ApiModel {
    ApiModel {
        classes: (0..classes).map(value_class).collect(),
        ..Default::default()
    }
}

/// One class whose `call` method has `count` overloads of growing arity.
fn overloaded(count: usize) -> ApiModel {
    let mut class = ClassEntry::object("Dispatcher").with_function(FunctionEntry::constructor("Dispatcher"));
    for arity in 0..count {
        let mut function = FunctionEntry::method("call", int());
        for position in 0..arity {
            let ty = if position % 2 == 0 { int() } else { CppType::cstring() };
            function = function.with_arg(ArgumentEntry::new(format!("a{position}"), ty));
        }
        class = class.with_function(function);
    }
    ApiModel {
        classes: vec![class],
        ..Default::default()
    }
}

/// A single-inheritance chain of polymorphic classes.
fn hierarchy(depth: usize) -> ApiModel {
    let classes = (0..depth)
        .map(|level| {
            let class = ClassEntry::object(format!("Level{level}"))
                .with_virtual_destructor()
                .with_function(FunctionEntry::method("update", int()).with_arg(ArgumentEntry::new("dt", double())).as_virtual());
            if level == 0 {
                class
            } else {
                class.with_base(format!("Level{}", level - 1))
            }
        })
        .collect();
    ApiModel {
        classes,
        ..Default::default()
    }
}

/// Object types whose methods carry parent and keep-alive directives.
fn ownership(classes: usize) -> ApiModel {
    let classes = (0..classes)
        .map(|index| {
            let name = format!("Node{index}");
            let node = CppType::object(&name);
            ClassEntry::object(&name)
                .with_virtual_destructor()
                .with_function(
                    FunctionEntry::constructor(&name)
                        .with_arg(ArgumentEntry::new("parent", node.clone()).with_default("0")),
                )
                .with_function(
                    FunctionEntry::method("setParent", CppType::void())
                        .with_arg(ArgumentEntry::new("parent", node.clone()))
                        .with_ownership(OwnershipModification::parent(ArgIndex::This, ArgIndex::Arg(1))),
                )
                .with_function(
                    FunctionEntry::method("attach", CppType::void())
                        .with_arg(ArgumentEntry::new("other", node))
                        .with_ownership(OwnershipModification::keep_reference(ArgIndex::Arg(1), None)),
                )
        })
        .collect();
    ApiModel {
        classes,
        ..Default::default()
    }
}

fn build(model: &ApiModel) -> usize {
    let mut unit = BindingUnit::for_module("bench");
    unit.add_model(model.clone()).unwrap();
    let output = unit.build().unwrap();
    end_profiling_frame();
    output.files.len()
}

// =============================================================================
// Benchmarks
// =============================================================================

/// Generation time as the number of classes grows.
fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("unit/module_size");

    for classes in [10, 100, 500] {
        let model = library(classes);
        group.throughput(Throughput::Elements(classes as u64));
        group.bench_function(format!("classes_{classes}"), |b| {
            b.iter(|| black_box(build(black_box(&model))));
        });
    }

    group.finish();
}

fn feature_specific_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("unit/features");

    let model = overloaded(24);
    group.bench_function("overloads_24", |b| {
        b.iter(|| black_box(build(black_box(&model))));
    });

    let model = hierarchy(32);
    group.bench_function("hierarchy_depth_32", |b| {
        b.iter(|| black_box(build(black_box(&model))));
    });

    let model = ownership(50);
    group.bench_function("ownership_50", |b| {
        b.iter(|| black_box(build(black_box(&model))));
    });

    group.finish();
}

/// Wrapper bookkeeping in the runtime model.
fn runtime_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("runtime/wrappers");

    const OBJECTS: usize = 1000;
    group.throughput(Throughput::Elements(OBJECTS as u64));
    group.bench_function("construct_parent_teardown", |b| {
        b.iter(|| {
            let manager = BindingManager::new();
            manager.with_types(|types| types.set_virtual_destructor("Node"));
            let root = manager.construct("Node", false, None, || Ok(0x10)).unwrap();
            for index in 1..OBJECTS {
                let child = manager
                    .construct("Node", false, None, || Ok(0x10 * (index + 1)))
                    .unwrap();
                manager.set_parent(Some(root), child).unwrap();
                manager.dec_ref(child);
            }
            black_box(manager.teardown())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    size_based_benchmarks,
    feature_specific_benchmarks,
    runtime_benchmarks
);

criterion_main!(benches);
