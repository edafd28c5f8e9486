use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tempo_scheduler::heap::{HeapEntry, MinHeap};
use tempo_scheduler::{Priority, ScheduleOptions, Scheduler, TaskResult, VirtualHost};

fn benchmark_schedule_and_flush(c: &mut Criterion) {
    c.bench_function("schedule_task 1000", |b| {
        b.iter(|| {
            let host = VirtualHost::new();
            let scheduler = Scheduler::new(host.clone());
            for _ in 0..1000 {
                scheduler.schedule_task(
                    Priority::Normal,
                    Box::new(|_| {
                        black_box(1 + 1);
                        TaskResult::Done
                    }),
                    ScheduleOptions::default(),
                );
            }
            host.flush_until_idle();
        })
    });
}

fn benchmark_mixed_priorities(c: &mut Criterion) {
    let tiers = [
        Priority::Immediate,
        Priority::UserBlocking,
        Priority::Normal,
        Priority::Low,
        Priority::Idle,
    ];
    c.bench_function("schedule_task mixed priorities 1000", |b| {
        b.iter(|| {
            let host = VirtualHost::new();
            let scheduler = Scheduler::new(host.clone());
            for i in 0..1000 {
                scheduler.schedule_task(
                    tiers[i % tiers.len()],
                    Box::new(|_| {
                        black_box(1 + 1);
                        TaskResult::Done
                    }),
                    ScheduleOptions::default(),
                );
            }
            host.flush_until_idle();
        })
    });
}

#[derive(Clone, Copy)]
struct Entry {
    sort_index: f64,
    id: u64,
}

impl HeapEntry for Entry {
    fn sort_index(&self) -> f64 {
        self.sort_index
    }

    fn id(&self) -> u64 {
        self.id
    }
}

fn benchmark_heap_churn(c: &mut Criterion) {
    c.bench_function("heap push/pop 1000", |b| {
        b.iter(|| {
            let mut heap = MinHeap::new();
            for i in 0..1000u64 {
                heap.push(Entry {
                    sort_index: ((i * 7919) % 1000) as f64,
                    id: i,
                });
            }
            while let Some(entry) = heap.pop() {
                black_box(entry.id);
            }
        })
    });
}

criterion_group!(
    benches,
    benchmark_schedule_and_flush,
    benchmark_mixed_priorities,
    benchmark_heap_churn
);
criterion_main!(benches);
