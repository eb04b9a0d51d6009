//! Integration tests for the training pipeline.
//!
//! These tests write small record files, train through the dispatcher and
//! check the step counts, scores and forecasts that come back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use frnn::prelude::*;

/// Write records for one split with values drawn around a constant level.
///
/// Train records get outputs, validation records get outputs and metadata,
/// test records get metadata only.
fn write_split(
    dir: &Path,
    name: &str,
    split: Split,
    lengths: &[usize],
    input_size: usize,
    output_size: usize,
    seed: u64,
) -> PathBuf {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = |width: usize, length: usize| -> Vec<Vec<f32>> {
        (0..length)
            .map(|_| (0..width).map(|_| rng.gen_range(-0.2f32..0.2)).collect())
            .collect()
    };

    let records: Vec<EncodedRecord> = lengths
        .iter()
        .map(|&length| {
            let input = rows(input_size, length);
            let output = (split != Split::Test).then(|| rows(output_size, length));
            let metadata = (split != Split::Train).then(|| {
                (0..length)
                    .map(|_| {
                        let mut row = vec![2.0f32];
                        row.extend(std::iter::repeat(0.1f32).take(output_size));
                        row
                    })
                    .collect()
            });
            EncodedRecord {
                length,
                input,
                output,
                metadata,
            }
        })
        .collect();

    let path = dir.join(format!("{name}.tfrecords"));
    write_records(&path, &records).expect("Failed to write records");
    path
}

fn mapping(
    minibatch_size: f64,
    max_num_epochs: f64,
    max_epoch_size: f64,
) -> HashMap<String, f64> {
    [
        ("num_hidden_layers", 1.0),
        ("max_num_epochs", max_num_epochs),
        ("max_epoch_size", max_epoch_size),
        ("lstm_cell_dimension", 4.0),
        ("l2_regularization", 0.0),
        ("minibatch_size", minibatch_size),
        ("gaussian_noise_stdev", 0.0),
        ("random_normal_initializer_stdev", 0.1),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

struct Fixture {
    _dir: TempDir,
    options: TrainerOptions,
}

fn fixture(train_lengths: &[usize], eval_lengths: &[usize]) -> Fixture {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let train = write_split(dir.path(), "train", Split::Train, train_lengths, 1, 1, 1);
    let valid = write_split(dir.path(), "validation", Split::Valid, eval_lengths, 1, 1, 2);
    let test = write_split(dir.path(), "test", Split::Test, eval_lengths, 1, 1, 3);

    let options = TrainerOptions::new(1, 1, train)
        .with_validation_file(valid)
        .with_test_file(test);
    Fixture { _dir: dir, options }
}

fn dense_trainer(options: TrainerOptions) -> Box<dyn ForecastTrainer> {
    default_registry::<TrainBackend>()
        .create(
            ModelFamily::Seq2SeqWithDenseLayer,
            WindowMode::MovingWindow,
            options,
            &Default::default(),
        )
        .expect("Failed to build trainer")
}

#[test]
fn test_single_step_end_to_end() {
    let fixture = fixture(&[3, 5], &[3, 5]);
    let trainer = dense_trainer(fixture.options.clone());

    let params = HyperParameters::from_mapping(&mapping(2.0, 1.0, 1.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("cocob", None).unwrap();
    let report = trainer.train_model(&params, &optimizer).unwrap();

    assert_eq!(report.epochs, 1);
    assert_eq!(report.steps, 1);
    assert_eq!(report.batch_smapes.len(), 1);
    assert!(report.smape.is_finite());
    assert!((0.0..=2.0).contains(&report.smape));
    assert!(report.final_loss.is_some_and(f64::is_finite));
}

#[test]
fn test_same_seed_same_smape() {
    let fixture = fixture(&[2, 4, 6, 3], &[5, 1, 3]);
    let params = HyperParameters::from_mapping(&mapping(2.0, 2.0, 2.0)).unwrap();

    for name in ["adam", "adagrad", "cocob"] {
        let optimizer = OptimizerSettings::from_name(name, Some(0.01)).unwrap();

        let first = dense_trainer(fixture.options.clone())
            .train_model(&params, &optimizer)
            .unwrap();
        let second = dense_trainer(fixture.options.clone())
            .train_model(&params, &optimizer)
            .unwrap();

        assert_eq!(first.smape, second.smape, "{name} run was not reproducible");
        assert_eq!(first.batch_smapes, second.batch_smapes);
        assert_eq!(first.final_loss, second.final_loss);
    }
}

#[test]
fn test_different_seed_changes_the_run() {
    let fixture = fixture(&[2, 4, 6, 3], &[5, 1, 3]);
    let params = HyperParameters::from_mapping(&mapping(2.0, 1.0, 1.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("adam", Some(0.01)).unwrap();

    let a = dense_trainer(fixture.options.clone())
        .train_model(&params, &optimizer)
        .unwrap();
    let b = dense_trainer(fixture.options.clone().with_seed(Seed::new(7)))
        .train_model(&params, &optimizer)
        .unwrap();

    assert_ne!(a.final_loss, b.final_loss);
}

#[test]
fn test_epochs_are_bounded() {
    // 3 records repeated 3 times per epoch in batches of 2 gives 5 steps.
    let fixture = fixture(&[2, 3, 4], &[3, 3]);
    let params = HyperParameters::from_mapping(&mapping(2.0, 2.0, 3.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("adagrad", Some(0.01)).unwrap();

    let report = dense_trainer(fixture.options)
        .train_model(&params, &optimizer)
        .unwrap();

    assert_eq!(report.epochs, 2);
    assert_eq!(report.steps, 10);
    assert_eq!(report.batch_smapes.len(), 1);
}

#[test]
fn test_stacking_and_cell_types() {
    let fixture = fixture(&[1, 3, 5], &[1, 4]);
    let params = HyperParameters::from_mapping(&mapping(2.0, 1.0, 1.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("cocob", None).unwrap();
    let registry = default_registry::<TrainBackend>();

    for cell_type in [CellType::LSTM, CellType::GRU, CellType::RNN] {
        let options = fixture
            .options
            .clone()
            .with_cell_type(cell_type)
            .with_bias(true);
        let trainer = registry
            .create_by_name("stacking", "moving_window", options, &Default::default())
            .unwrap();

        let report = trainer.train_model(&params, &optimizer).unwrap();
        assert!(report.smape.is_finite(), "{cell_type} produced {}", report.smape);
        assert_eq!(report.batch_smapes.len(), 1);
    }
}

#[test]
fn test_unmapped_pair_fails_before_reading_files() {
    let options = TrainerOptions::new(1, 1, "/does/not/exist.tfrecords");
    let result = default_registry::<TrainBackend>().create_by_name(
        "attention",
        "non_moving_window",
        options,
        &Default::default(),
    );

    match result {
        Err(TrainError::Config(ConfigError::UnsupportedModel { family, window_mode })) => {
            assert_eq!(family, "attention");
            assert_eq!(window_mode, "non_moving_window");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("attention/non_moving_window should not be mapped"),
    }
}

#[test]
fn test_evaluate_configuration() {
    let fixture = fixture(&[3, 5], &[3, 5]);
    let trainer = dense_trainer(fixture.options.clone());

    let mut config = mapping(2.0, 1.0, 1.0);
    let missing_rate = evaluate_configuration(trainer.as_ref(), &config, OptimizerKind::Adam);
    assert!(matches!(
        missing_rate,
        Err(TrainError::Config(ConfigError::MissingKey(ref key))) if key == "learning_rate"
    ));

    config.insert("learning_rate".to_string(), 0.01);
    let smape = evaluate_configuration(trainer.as_ref(), &config, OptimizerKind::Adam).unwrap();
    assert!((0.0..=2.0).contains(&smape));
}

#[test]
fn test_model_returns_forecast_rows() {
    let dir = TempDir::new().unwrap();
    let train = write_split(dir.path(), "train", Split::Train, &[4, 6, 2], 3, 2, 11);
    let test = write_split(dir.path(), "test", Split::Test, &[5, 1, 3, 2], 3, 2, 12);
    let options = TrainerOptions::new(3, 2, train)
        .with_test_file(test)
        .with_zero_values(true);

    let params = HyperParameters::from_mapping(&mapping(3.0, 1.0, 1.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("cocob", None).unwrap();
    let forecasts = dense_trainer(options).test_model(&params, &optimizer).unwrap();

    assert_eq!(forecasts.dim(), (4, 2));
    assert!(forecasts.iter().all(|v| v.is_finite() && *v > -1.0));
}

#[test]
fn test_stop_flag_interrupts_training() {
    let fixture = fixture(&[3, 5], &[3, 5]);
    let stop = StopFlag::new();
    let trainer = MovingWindowTrainer::<TrainBackend, Seq2SeqDense<TrainBackend>>::new(
        ModelFamily::Seq2SeqWithDenseLayer,
        fixture.options.clone(),
        Default::default(),
    )
    .with_stop_flag(stop.clone());

    stop.stop();
    let params = HyperParameters::from_mapping(&mapping(2.0, 1.0, 1.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("cocob", None).unwrap();
    let result = trainer.train_model(&params, &optimizer);
    assert!(matches!(result, Err(TrainError::Interrupted(_))));

    stop.reset();
    assert!(trainer.train_model(&params, &optimizer).is_ok());
}

#[test]
fn test_missing_validation_file_is_a_config_error() {
    let fixture = fixture(&[3], &[3]);
    let mut options = fixture.options.clone();
    options.validation_file = None;

    let params = HyperParameters::from_mapping(&mapping(1.0, 1.0, 1.0)).unwrap();
    let optimizer = OptimizerSettings::from_name("cocob", None).unwrap();
    let result = dense_trainer(options).train_model(&params, &optimizer);
    assert!(matches!(
        result,
        Err(TrainError::Config(ConfigError::MissingKey(_)))
    ));
}
