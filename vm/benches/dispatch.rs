use std::io;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use heap::MemorySettings;
use object::CodePointer;
use vm::{Vm, VmCreateInfo};

const SEND_LOOP: &str = "
        new-int 0
        push-local 0
loop:   new-int 1
        pop-local 0
        call add
        push-local 0
        pop-ref
        pop-ref
        pop-local 0
        new-int 2000
        jmp-lt-int @loop
        halt
";

const ALLOC_LOOP: &str = "
        new-int 0
        push-local 0
loop:   new-str \"garbage\"
        pop-ref
        pop-local 0
        new-int 1
        add-int
        push-local 0
        pop-local 0
        new-int 2000
        jmp-lt-int @loop
        halt
";

fn prepare(source: &str, heap_size: usize) -> (Vm, CodePointer) {
    let mut vm = Vm::new(VmCreateInfo {
        memory: MemorySettings {
            heap_size,
            ..MemorySettings::default()
        },
        output: Box::new(io::sink()),
        ..VmCreateInfo::default()
    })
    .expect("vm");
    let entry = vm.assemble(source).expect("assemble");
    (vm, entry)
}

fn bench_send_loop(c: &mut Criterion) {
    let (mut vm, entry) = prepare(SEND_LOOP, 64 * 1024);
    c.bench_function("send_loop_2000", |b| {
        b.iter(|| {
            vm.run(black_box(entry), 1).expect("run");
            // halt leaves the entry frame behind
            while vm.mm.discard_frame().expect("discard").is_some() {}
        })
    });
}

fn bench_alloc_loop(c: &mut Criterion) {
    let (mut vm, entry) = prepare(ALLOC_LOOP, 4 * 1024);
    c.bench_function("alloc_loop_small_heap", |b| {
        b.iter(|| {
            vm.run(black_box(entry), 1).expect("run");
            while vm.mm.discard_frame().expect("discard").is_some() {}
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_send_loop, bench_alloc_loop
}
criterion_main!(benches);
