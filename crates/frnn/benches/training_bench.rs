//! Benchmarks for training performance.
//!
//! Run with: cargo bench --bench training_bench

use std::hint::black_box;

use burn::optim::GradientsParams;
use burn::prelude::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use frnn::prelude::*;
use frnn::train::{CocobConfig, RegularizedLoss};
use frnn::models::tensor_from_array3;

/// Random padded inputs and targets with lengths spread over `1..=seq_len`.
fn synthetic_batch(
    batch_size: usize,
    seq_len: usize,
    input_size: usize,
    output_size: usize,
) -> (Array3<f32>, Array3<f32>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let inputs = Array3::from_shape_fn((batch_size, seq_len, input_size), |_| {
        rng.gen_range(-0.5f32..0.5)
    });
    let targets = Array3::from_shape_fn((batch_size, seq_len, output_size), |_| {
        rng.gen_range(-0.5f32..0.5)
    });
    let lengths = (0..batch_size).map(|i| 1 + i % seq_len).collect();
    (inputs, targets, lengths)
}

fn bench_forecast(c: &mut Criterion) {
    let mut group = c.benchmark_group("forecast");
    let device = <TrainBackend as Backend>::Device::default();

    for cell_type in [CellType::LSTM, CellType::GRU, CellType::RNN] {
        let model: Seq2SeqDense<TrainBackend> = ModelConfig::new(15, 12)
            .with_cell_dimension(32)
            .with_cell_type(cell_type)
            .init(&device);
        let inference = burn::module::AutodiffModule::valid(&model);
        let (inputs, _, lengths) = synthetic_batch(32, 20, 15, 12);

        group.bench_with_input(
            BenchmarkId::new("seq2seq_dense", cell_type),
            &inputs,
            |b, inputs| {
                b.iter(|| {
                    let x = tensor_from_array3(inputs, &device);
                    black_box(inference.forecast(x, &lengths))
                })
            },
        );
    }

    group.finish();
}

fn bench_train_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_step");
    group.sample_size(20);
    let device = <TrainBackend as Backend>::Device::default();
    let loss_fn = RegularizedLoss::new(1e-4);

    for batch_size in [8, 32] {
        let (inputs, targets, lengths) = synthetic_batch(batch_size, 20, 15, 12);

        group.bench_with_input(
            BenchmarkId::new("seq2seq_dense_cocob", batch_size),
            &batch_size,
            |b, _| {
                let mut model: Seq2SeqDense<TrainBackend> =
                    ModelConfig::new(15, 12).with_cell_dimension(32).init(&device);
                let mut optim = CocobConfig::default().init::<TrainBackend, Seq2SeqDense<TrainBackend>>();

                b.iter(|| {
                    let pairs = model.training_pairs(
                        tensor_from_array3(&inputs, &device),
                        tensor_from_array3(&targets, &device),
                        &lengths,
                    );
                    let loss = loss_fn.forward(&model, pairs);
                    let grads = GradientsParams::from_grads(loss.objective.backward(), &model);
                    model = burn::optim::Optimizer::step(&mut optim, 0.0, model.clone(), grads);
                    black_box(loss.total)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_forecast, bench_train_step);
criterion_main!(benches);
