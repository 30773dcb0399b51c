use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;

use typist::engine::{TypeOpts, Typist};
use typist::options::{DelayRange, Options, RenderCallback};
use typist::script::{self, Script};

#[derive(Debug, Parser)]
#[command(name = "typist")]
#[command(about = "Simulated human typing with realistic mistakes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args, Clone)]
struct SpeedArgs {
    /// Optional RNG seed (for reproducible runs)
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum per-letter delay in milliseconds
    #[arg(long, default_value_t = 40)]
    letter_delay_min: u64,

    /// Maximum per-letter delay in milliseconds
    #[arg(long, default_value_t = 150)]
    letter_delay_max: u64,

    /// Minimum erase delay in milliseconds
    #[arg(long, default_value_t = 150)]
    erase_delay_min: u64,

    /// Maximum erase delay in milliseconds
    #[arg(long, default_value_t = 250)]
    erase_delay_max: u64,

    /// Mistake probability multiplier (0 disables mistakes)
    #[arg(long, default_value_t = 1.0)]
    error_multiplier: f64,

    /// Never mistype punctuation or other special characters
    #[arg(long)]
    no_special_char_errors: bool,

    /// Shorten all delays and skip waits
    #[arg(long)]
    fast_forward: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type a text file into the terminal
    Run {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Span class applied to the whole text.
        ///
        /// Classed snapshots are serialized with `<span>` markup; without a
        /// class the snapshots are plain text.
        #[arg(long)]
        class: Option<String>,

        /// Print every snapshot on its own line instead of redrawing one
        #[arg(long)]
        snapshots: bool,

        #[command(flatten)]
        speed: SpeedArgs,
    },

    /// Play a typing script (JSON)
    Play {
        /// Script file (JSON)
        #[arg(long, value_name = "PATH")]
        script: PathBuf,

        /// Optional RNG seed (for reproducible runs)
        #[arg(long)]
        seed: Option<u64>,

        /// Shorten all delays and skip waits
        #[arg(long)]
        fast_forward: bool,

        /// Print every snapshot on its own line instead of redrawing one
        #[arg(long)]
        snapshots: bool,
    },

    /// Show script statistics without typing anything
    Stats {
        /// Script file (JSON)
        #[arg(long, value_name = "PATH")]
        script: PathBuf,
    },
}

fn read_input(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == std::ffi::OsStr::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_script(path: &PathBuf) -> Result<Script> {
    let json =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Script::from_json(&json)
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn build_options(speed: &SpeedArgs) -> Result<Options> {
    let options = Options {
        per_letter_delay: Some(DelayRange::new(
            speed.letter_delay_min,
            speed.letter_delay_max,
        )),
        erase_delay: Some(DelayRange::new(speed.erase_delay_min, speed.erase_delay_max)),
        error_multiplier: Some(speed.error_multiplier),
        no_special_char_errors: Some(speed.no_special_char_errors),
        ..Default::default()
    };
    options.validate()?;
    Ok(options)
}

fn render_callback(snapshots: bool) -> RenderCallback {
    if snapshots {
        Arc::new(|rendered: &str| println!("{rendered}"))
    } else {
        Arc::new(|rendered: &str| {
            let mut out = io::stdout().lock();
            let _ = write!(out, "\r\x1b[2K{rendered}");
            let _ = out.flush();
        })
    }
}

fn print_stats(stats: &script::ScriptStats) {
    eprintln!(
        "Queued: {} instructions, {} letters, {} backspaces, {} waits, ~{:.1}s expected",
        stats.instructions,
        stats.letters,
        stats.backspaces,
        stats.waits,
        (stats.expected_ms as f64) / 1000.0
    );
}

fn drive(mut typist: Typist, base: &Options, fast_forward: bool, snapshots: bool) -> Result<()> {
    print_stats(&script::stats(typist.queue(), base));

    let handle = typist.handle();
    {
        let handle = handle.clone();
        ctrlc::set_handler(move || handle.reset()).context("failed to install Ctrl+C handler")?;
    }

    if fast_forward {
        typist.fast_forward(true);
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(typist.run())?;

    if !snapshots {
        println!();
    }
    if handle.is_reset() {
        eprintln!("Aborted.");
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            input,
            class,
            snapshots,
            speed,
        } => {
            let text = read_input(&input)?;
            let mut options = build_options(&speed)?;
            options.callback = Some(render_callback(snapshots));

            let mut typist = Typist::with_rng(options.clone(), rng_from_seed(speed.seed));
            typist.type_with(
                text,
                TypeOpts {
                    class_name: class,
                    overrides: Options::default(),
                },
            );

            drive(typist, &options, speed.fast_forward, snapshots)
        }
        Command::Play {
            script,
            seed,
            fast_forward,
            snapshots,
        } => {
            let script = load_script(&script)?;
            let mut options = script.options.clone();
            options.callback = Some(render_callback(snapshots));

            let mut typist = Typist::with_rng(options.clone(), rng_from_seed(seed));
            typist.extend(script.instructions);

            drive(typist, &options, fast_forward, snapshots)
        }
        Command::Stats { script } => {
            let script = load_script(&script)?;
            print_stats(&script::stats(&script.instructions, &script.options));
            Ok(())
        }
    }
}
