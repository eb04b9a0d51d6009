//! frnn CLI for training, testing and encoding forecasting datasets.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ndarray::ArrayView2;
use polars::prelude::{Column, CsvReadOptions, CsvWriter, DataFrame, DataType, SerReader, SerWriter};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frnn::prelude::*;

#[derive(Parser)]
#[command(name = "frnn")]
#[command(author, version)]
#[command(about = "Recurrent forecasting CLI - train, score and test RNN forecasters")]
#[command(long_about = "frnn: recurrent neural network forecasters for time series.

EXAMPLES:
  # Score one hyperparameter configuration on the validation file
  frnn train --config configs/hp.json --train-file train.tfrecords \\
      --validation-file validation.tfrecords --input-size 15 --forecast-horizon 12

  # Train and write test forecasts
  frnn test --config configs/hp.json --dataset-name cif2016 --train-file train.tfrecords \\
      --test-file test.tfrecords --input-size 15 --forecast-horizon 12 --optimizer adam

  # Turn CSV rows into a record file
  frnn encode --input train.csv --output train.tfrecords --split train \\
      --input-size 15 --forecast-horizon 12

MODEL TYPES:
  seq2seqwithdenselayer - encoder with a dense projection of the final state [default]
  stacking              - encoder with a dense projection at every step")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train on the training file and print the validation SMAPE
    Train {
        #[command(flatten)]
        model: ModelArgs,

        /// Validation record file
        #[arg(long, value_name = "FILE")]
        validation_file: PathBuf,
    },
    /// Train on the training file and write forecasts for the test file
    Test {
        #[command(flatten)]
        model: ModelArgs,

        /// Test record file
        #[arg(long, value_name = "FILE")]
        test_file: PathBuf,

        /// Dataset name used in the forecast file name
        #[arg(long, value_name = "NAME")]
        dataset_name: String,

        /// Tuning method used in the forecast file name (e.g., smac, bayesian)
        #[arg(long, default_value = "smac")]
        hyperparameter_tuning: String,

        /// Directory for forecast files
        #[arg(long, default_value = "results/rnn_forecasts")]
        forecasts_dir: PathBuf,
    },
    /// Encode CSV rows into a record file
    Encode {
        /// CSV file, one time step per line: series id, inputs, outputs, metadata
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Record file to write
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Split the rows belong to: train, valid or test
        #[arg(long, default_value = "train")]
        split: String,

        /// Features per input step
        #[arg(long)]
        input_size: usize,

        /// Forecast horizon
        #[arg(long)]
        forecast_horizon: usize,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// JSON file with the hyperparameter mapping
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Training record file
    #[arg(long, value_name = "FILE")]
    train_file: PathBuf,

    /// Features per input step
    #[arg(long)]
    input_size: usize,

    /// Forecast horizon
    #[arg(long)]
    forecast_horizon: usize,

    /// Optimizer: cocob, adam or adagrad
    #[arg(long, default_value = "cocob")]
    optimizer: String,

    /// Architecture family
    #[arg(long, default_value = "seq2seqwithdenselayer")]
    model_type: String,

    /// Input window mode
    #[arg(long, default_value = "moving_window")]
    input_format: String,

    /// Recurrent cell: LSTM, GRU or RNN
    #[arg(long, default_value = "LSTM")]
    cell_type: String,

    /// Random seed
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Series were shifted by one before taking logs
    #[arg(long)]
    contain_zero_values: bool,

    /// Add a bias to the dense projection
    #[arg(long)]
    bias: bool,

    /// Disable LSTM peephole connections
    #[arg(long)]
    no_peepholes: bool,
}

impl ModelArgs {
    fn options(&self) -> Result<TrainerOptions> {
        let cell_type: CellType = self
            .cell_type
            .parse()
            .with_context(|| format!("Invalid cell type '{}'", self.cell_type))?;
        Ok(
            TrainerOptions::new(self.input_size, self.forecast_horizon, &self.train_file)
                .with_bias(self.bias)
                .with_peepholes(!self.no_peepholes)
                .with_zero_values(self.contain_zero_values)
                .with_seed(Seed::new(self.seed))
                .with_cell_type(cell_type),
        )
    }

    fn trainer(&self, options: TrainerOptions) -> Result<Box<dyn ForecastTrainer>> {
        default_registry::<TrainBackend>()
            .create_by_name(
                &self.model_type,
                &self.input_format,
                options,
                &Default::default(),
            )
            .with_context(|| {
                format!(
                    "No trainer for model type '{}' with input format '{}'",
                    self.model_type, self.input_format
                )
            })
    }

    fn hyper_parameters(&self) -> Result<(HyperParameters, OptimizerSettings)> {
        let mapping = read_mapping(&self.config)?;
        let params = HyperParameters::from_mapping(&mapping)
            .with_context(|| format!("Invalid configuration in {}", self.config.display()))?;
        let optimizer = OptimizerSettings::from_name(&self.optimizer, params.learning_rate)
            .with_context(|| format!("Invalid optimizer settings for '{}'", self.optimizer))?;
        Ok((params, optimizer))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Train {
            model,
            validation_file,
        } => handle_train(model, validation_file),
        Commands::Test {
            model,
            test_file,
            dataset_name,
            hyperparameter_tuning,
            forecasts_dir,
        } => handle_test(
            model,
            test_file,
            dataset_name,
            hyperparameter_tuning,
            forecasts_dir,
        ),
        Commands::Encode {
            input,
            output,
            split,
            input_size,
            forecast_horizon,
        } => handle_encode(input, output, split, input_size, forecast_horizon),
    }
}

fn handle_train(model: ModelArgs, validation_file: PathBuf) -> Result<()> {
    let options = model.options()?.with_validation_file(validation_file);
    let trainer = model.trainer(options)?;
    let (params, optimizer) = model.hyper_parameters()?;

    println!(
        "Model Training Started for {}_{}_{}",
        model.model_type, model.input_format, model.optimizer
    );
    let report = trainer
        .train_model(&params, &optimizer)
        .context("Training failed")?;

    println!("  Epochs: {}", report.epochs);
    println!("  Optimizer steps: {}", report.steps);
    println!("  Validation batches: {}", report.batch_smapes.len());
    println!("  Training time: {:.2}s", report.training_time_secs);
    println!("SMAPE value: {}", report.smape);
    Ok(())
}

fn handle_test(
    model: ModelArgs,
    test_file: PathBuf,
    dataset_name: String,
    hyperparameter_tuning: String,
    forecasts_dir: PathBuf,
) -> Result<()> {
    let options = model.options()?.with_test_file(test_file);
    let trainer = model.trainer(options)?;
    let (params, optimizer) = model.hyper_parameters()?;

    let run_name = format!(
        "{}_{}_{}_{}_{}",
        dataset_name, model.model_type, model.input_format, hyperparameter_tuning, model.optimizer
    );
    println!("Model Testing Started for {run_name}");

    let forecasts = trainer
        .test_model(&params, &optimizer)
        .context("Testing failed")?;

    std::fs::create_dir_all(&forecasts_dir).with_context(|| {
        format!("Failed to create forecasts directory {}", forecasts_dir.display())
    })?;
    let path = forecasts_dir.join(format!("{run_name}.txt"));
    write_forecasts(&path, forecasts.view())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {} forecast rows to {}", forecasts.nrows(), path.display());
    Ok(())
}

fn handle_encode(
    input: PathBuf,
    output: PathBuf,
    split: String,
    input_size: usize,
    output_size: usize,
) -> Result<()> {
    let split = match split.to_lowercase().as_str() {
        "train" => Split::Train,
        "valid" | "validation" => Split::Valid,
        "test" => Split::Test,
        other => bail!("Unknown split '{other}', expected train, valid or test"),
    };

    let records = read_csv_records(&input, split, input_size, output_size)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    write_records(&output, &records)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Encoded {} {} records into {}",
        records.len(),
        split,
        output.display()
    );
    Ok(())
}

fn read_mapping(path: &Path) -> Result<HashMap<String, f64>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} is not a JSON object of numbers", path.display()))
}

/// Group CSV rows into records by their leading series id.
///
/// The file has no header. Each row holds the series id, `input_size`
/// inputs, then `output_size` outputs for train and validation rows, then
/// `output_size + 1` metadata values for validation and test rows.
fn read_csv_records(
    path: &Path,
    split: Split,
    input_size: usize,
    output_size: usize,
) -> Result<Vec<EncodedRecord>> {
    let output_width = if split.requires_output() { output_size } else { 0 };
    let metadata_width = if split.requires_metadata() { output_size + 1 } else { 0 };
    let width = 1 + input_size + output_width + metadata_width;

    let df = CsvReadOptions::default()
        .with_has_header(false)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .context("Failed to create CSV reader")?
        .finish()
        .context("Failed to read CSV")?;

    if df.height() == 0 {
        bail!("no rows found");
    }
    if df.width() != width {
        bail!("expected {width} columns, found {}", df.width());
    }

    let columns = df.get_columns();
    let ids = columns[0].cast(&DataType::String)?;
    let ids = ids.str()?;
    let values = columns[1..]
        .iter()
        .map(|column| Ok(column.cast(&DataType::Float32)?.f32()?.clone()))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    let mut current: Option<(String, EncodedRecord)> = None;

    for row in 0..df.height() {
        let id = ids
            .get(row)
            .with_context(|| format!("row {}: missing series id", row + 1))?;
        let row_values = values
            .iter()
            .enumerate()
            .map(|(col, column)| {
                column
                    .get(row)
                    .with_context(|| format!("row {}, column {}: invalid number", row + 1, col + 2))
            })
            .collect::<Result<Vec<f32>>>()?;
        let (inputs, rest) = row_values.split_at(input_size);
        let (outputs, metadata) = rest.split_at(output_width);

        if current.as_ref().is_some_and(|(current_id, _)| current_id != id) {
            if let Some((_, record)) = current.take() {
                records.push(record);
            }
        }
        let (_, record) = current.get_or_insert_with(|| {
            (
                id.to_string(),
                EncodedRecord {
                    length: 0,
                    input: Vec::new(),
                    output: split.requires_output().then(Vec::new),
                    metadata: split.requires_metadata().then(Vec::new),
                },
            )
        });

        record.length += 1;
        record.input.push(inputs.to_vec());
        if let Some(rows) = record.output.as_mut() {
            rows.push(outputs.to_vec());
        }
        if let Some(rows) = record.metadata.as_mut() {
            rows.push(metadata.to_vec());
        }
    }

    if let Some((_, record)) = current {
        records.push(record);
    }
    Ok(records)
}

/// Write one headerless CSV line of horizon values per forecast row.
fn write_forecasts(path: &Path, forecasts: ArrayView2<'_, f64>) -> Result<()> {
    let columns: Vec<Column> = forecasts
        .columns()
        .into_iter()
        .enumerate()
        .map(|(step, values)| Column::new(format!("h{}", step + 1).into(), values.to_vec()))
        .collect();
    let mut df = DataFrame::new(columns)?;

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(false)
        .finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_rows_group_by_series_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("valid.csv");
        std::fs::write(
            &path,
            "a,0.1,0.2,1.0,2.0,0.5\na,0.3,0.4,1.5,2.5,0.6\nb,0.5,0.6,3.0,4.0,0.7\n",
        )
        .unwrap();

        let records = read_csv_records(&path, Split::Valid, 2, 1).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].length, 2);
        assert_eq!(records[0].input, vec![vec![0.1f32, 0.2], vec![0.3, 0.4]]);
        assert_eq!(records[0].output, Some(vec![vec![1.0f32], vec![1.5]]));
        assert_eq!(
            records[0].metadata,
            Some(vec![vec![2.0f32, 0.5], vec![2.5, 0.6]])
        );
        assert_eq!(records[1].length, 1);
    }

    #[test]
    fn test_test_split_rows_skip_outputs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.csv");
        std::fs::write(&path, "7,0.1,2.0,0.5\n7,0.2,2.1,0.4\n").unwrap();

        let records = read_csv_records(&path, Split::Test, 1, 1).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].output.is_none());
        assert_eq!(records[0].metadata.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_wrong_width_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(&path, "a,0.1,0.2\n").unwrap();

        let err = read_csv_records(&path, Split::Train, 2, 1).unwrap_err();
        assert!(err.to_string().contains("expected 4 columns"));
    }

    #[test]
    fn test_forecasts_written_one_row_per_series() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("forecasts.txt");
        write_forecasts(&path, array![[1.5, 2.0, 3.25], [4.0, 5.5, 6.0]].view()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<Vec<f64>> = text
            .lines()
            .map(|line| line.split(',').map(|v| v.parse().unwrap()).collect())
            .collect();
        assert_eq!(rows, vec![vec![1.5, 2.0, 3.25], vec![4.0, 5.5, 6.0]]);
    }
}
