// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands off to the
// application layer:
//
//   1. `train`     — trains a caption model on a manifest
//   2. `caption`   — describes images with a trained checkpoint
//   3. `normalize` — rescales a word-vector file
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{CaptionArgs, Commands, NormalizeArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "cacao",
    version = "0.1.0",
    about = "Train an image-captioning network, then caption images with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Caption(args)   => run_caption(args),
            Commands::Normalize(args) => run_normalize(args),
        }
    }
}

fn run_train(mut args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    // The recurrent models cannot be replicated; keep the first device only
    if args.devices > 1 {
        tracing::warn!(
            "{} devices requested, but the {} model trains on a single device; using the first",
            args.devices,
            args.model
        );
        args.devices = 1;
    }

    tracing::info!("Starting {} training on '{}'", args.model, args.manifest);
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Checkpoint saved.");
    Ok(())
}

fn run_caption(args: CaptionArgs) -> Result<()> {
    use crate::application::caption_use_case::CaptionUseCase;

    let captions = CaptionUseCase::new(&args.checkpoint_dir).caption(&args.images)?;
    for (path, caption) in captions {
        println!("{}: {}", path.display(), caption);
    }
    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    use crate::application::normalize_use_case::NormalizeUseCase;

    let written = NormalizeUseCase::new(args.input, &args.output, args.method).execute()?;
    println!("Wrote {} vectors to {}", written, args.output.display());
    Ok(())
}
