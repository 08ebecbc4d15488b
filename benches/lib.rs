//! # Tickflow 性能基准测试
//!
//! 使用 Criterion.rs 进行性能基准测试。
//!
//! ## 基准测试分组
//! - `step`: 普通阶段步进（大量并行例程）
//! - `cascade`: 同一 tick 内的深层同步调用链
//! - `phase`: 备用阶段屏障
//!
//! ## 使用方法
//! ```bash
//! cargo bench          # 运行所有
//! cargo bench cascade  # 只运行调用链基准
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tickflow::runtime::{from_fn, Directive, PhaseId, Routine, Scheduler, Sequence, Step};

fn spinner() -> impl Routine {
    from_fn("spinner", |_| Ok(Step::Yield(Directive::Continue)))
}

fn chain(depth: usize) -> Box<dyn Routine> {
    if depth == 0 {
        return Box::new(Sequence::named("leaf"));
    }
    Box::new(Sequence::named("level").call(move || chain(depth - 1)))
}

fn bench_step_many_routines(c: &mut Criterion) {
    let mut scheduler = Scheduler::new();
    for _ in 0..1000 {
        scheduler.start(spinner(), None);
    }
    c.bench_function("step_1000_routines", |b| {
        b.iter(|| {
            scheduler.step();
            black_box(scheduler.len())
        })
    });
}

fn bench_synchronous_cascade(c: &mut Criterion) {
    c.bench_function("cascade_depth_256", |b| {
        b.iter(|| {
            let mut scheduler = Scheduler::new();
            let handle = scheduler.start(chain(256), None);
            black_box(handle.is_done())
        })
    });
}

fn bench_phase_barrier(c: &mut Criterion) {
    let mut scheduler = Scheduler::new();
    for _ in 0..1000 {
        scheduler.start(
            from_fn("late", |_| {
                Ok(Step::Yield(Directive::barrier(PhaseId::LATE_UPDATE)))
            }),
            None,
        );
    }
    c.bench_function("phase_1000_barriers", |b| {
        b.iter(|| {
            scheduler.tick(&[PhaseId::LATE_UPDATE, PhaseId::END_OF_FRAME]);
        })
    });
}

criterion_group!(
    benches,
    bench_step_many_routines,
    bench_synchronous_cascade,
    bench_phase_barrier
);
criterion_main!(benches);
