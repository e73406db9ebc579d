use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use realfake_nn::data::{
    build_label_table, random_split, BatchLoader, LabeledImageDataset, ResizeToTensor,
};
use realfake_nn::{train_val, Adam, Dataset, Device, Network, NllLoss, ReduceLrOnPlateau, RunConfig};

#[derive(Parser)]
#[command(
    name = "realfake-nn",
    version,
    about = "Train a CNN to tell real images from generated ones"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on `<data-dir>/<split>` labelled by `<data-dir>/train_labels.csv`
    Train(TrainArgs),
    /// Write `train_labels.csv` from a directory of real and one of fake images
    Labels {
        #[arg(long)]
        real_dir: PathBuf,
        #[arg(long)]
        fake_dir: PathBuf,
        #[arg(long, default_value = "train_labels.csv")]
        out: PathBuf,
    },
}

#[derive(clap::Args)]
struct TrainArgs {
    #[arg(long)]
    data_dir: PathBuf,
    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    epochs: Option<usize>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f64>,
    #[arg(long)]
    weight_path: Option<PathBuf>,
    /// Stop every pass after its first batch
    #[arg(long)]
    check: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    device: Option<Device>,
    /// Write the loss/accuracy history here as JSON
    #[arg(long)]
    history: Option<PathBuf>,
    /// Use a single linear layer instead of the CNN
    #[arg(long)]
    linear: bool,
}

/// Seed for the `n`-th RNG consumer of a run, so the file order, split,
/// shuffles and weight init do not share one stream.
fn derive_seed(seed: u64, n: u64) -> u64 {
    seed.wrapping_add(n)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Train(args) => train(args),
        Command::Labels { real_dir, fake_dir, out } => {
            let rows = build_label_table(&real_dir, &fake_dir, &out)
                .with_context(|| format!("failed to build {}", out.display()))?;
            println!("{} labels written to {}", rows, out.display());
            Ok(())
        }
    }
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load_json(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => RunConfig::default(),
    };
    let tc = &mut config.train;
    if let Some(epochs) = args.epochs {
        tc.epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        tc.batch_size = batch_size;
    }
    if let Some(lr) = args.learning_rate {
        tc.learning_rate = lr;
    }
    if let Some(path) = args.weight_path {
        tc.weight_path = path;
    }
    if let Some(seed) = args.seed {
        tc.seed = seed;
    }
    if let Some(device) = args.device {
        tc.device = device;
    }
    tc.check |= args.check;
    config.validate()?;
    let tc = &config.train;
    let stream = |n: u64| derive_seed(tc.seed, n);

    let dataset = LabeledImageDataset::new(
        &args.data_dir,
        ResizeToTensor::square(config.data.image_size),
        &config.data.split,
        stream(0),
    )
    .with_context(|| format!("failed to index {}", args.data_dir.display()))?;
    if dataset.is_empty() {
        bail!("no images found under {}", args.data_dir.join(&config.data.split).display());
    }

    let (train_ds, val_ds) = random_split(dataset, 1.0 - tc.val_split, stream(1))?;
    println!("train dataset size: {}", train_ds.len());
    println!("validation dataset size: {}", val_ds.len());

    let mut train_dl = BatchLoader::new(train_ds, tc.batch_size, true, stream(2))?;
    let mut val_dl = BatchLoader::new(val_ds, tc.batch_size, false, stream(3))?;

    let mut model = if args.linear {
        Network::linear(config.model.shape_in, config.model.num_classes, stream(4))
    } else {
        Network::conv_net(&config.model, stream(4))?
    };
    log::info!("layers: {}", model.layer_names().join(" → "));

    let mut optimizer = Adam::new(tc.learning_rate);
    let mut scheduler = ReduceLrOnPlateau::new(tc.plateau_config());
    let history = train_val(
        &mut model,
        &NllLoss,
        &mut optimizer,
        &mut scheduler,
        &mut train_dl,
        &mut val_dl,
        tc,
    )?;

    if let Some(path) = &args.history {
        history
            .save_json(path)
            .with_context(|| format!("failed to write history {}", path.display()))?;
    }

    for report in &history.epochs {
        println!(
            "epoch {:>3}  train loss {:.6}  val loss {:.6}  train acc {:.2}%  val acc {:.2}%",
            report.epoch,
            report.train.loss,
            report.val.loss,
            100.0 * report.train.accuracy,
            100.0 * report.val.accuracy
        );
    }
    if let Some(best) = history.best_val_loss() {
        println!("best validation loss {:.6}, weights in {}", best, tc.weight_path.display());
    }
    Ok(())
}
