use common::{TrainId, TrainTypeId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Train, validate_seat};

fn bench_validate_seat(c: &mut Criterion) {
    let train = Train {
        id: TrainId::new(1),
        name: "Bench Express".to_string(),
        cargo_num: 12,
        places_in_cargo: 60,
        train_type_id: TrainTypeId::new(1),
    };

    c.bench_function("domain/validate_seat_ok", |b| {
        b.iter(|| validate_seat(std::hint::black_box(7), std::hint::black_box(33), &train));
    });

    c.bench_function("domain/validate_seat_out_of_range", |b| {
        b.iter(|| validate_seat(std::hint::black_box(13), std::hint::black_box(1), &train));
    });
}

fn bench_capacity(c: &mut Criterion) {
    let train = Train {
        id: TrainId::new(1),
        name: "Bench Express".to_string(),
        cargo_num: 12,
        places_in_cargo: 60,
        train_type_id: TrainTypeId::new(1),
    };

    c.bench_function("domain/capacity", |b| {
        b.iter(|| std::hint::black_box(&train).capacity());
    });
}

criterion_group!(benches, bench_validate_seat, bench_capacity);
criterion_main!(benches);
