use std::{io, path::PathBuf};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use ffsnap::{IndexingProgress, SeekIndex, SnapshotWriter, VideoSource, extract_frames};
use indicatif::{ProgressBar, ProgressStyle};

const CLI_AFTER_HELP: &str = "Examples:\n  ffsnap input.mkv -f 42\n  ffsnap input.mkv -f 0 -f 120 -f 240 -o shots/take1\n  ffsnap input.mkv -f 42 --index input.ffindex --debug\n  ffsnap --completions zsh > _ffsnap";

#[derive(Debug, Parser)]
#[command(
    name = "ffsnap",
    version,
    about = "Create high quality, frame accurate snapshots of video files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input video file.
    input: Option<PathBuf>,

    /// Frame number to extract; may be given multiple times.
    #[arg(short = 'f', long = "frame", value_name = "N")]
    frames: Vec<usize>,

    /// Output base name; snapshots are written as {OUTPUT}_{FRAME}{TYPE}.png.
    #[arg(short, long, default_value = "snapshot")]
    output: String,

    /// Seek index file: read if valid for the input, else written after
    /// indexing.
    #[arg(long, value_name = "PATH")]
    index: Option<PathBuf>,

    /// Print verbose diagnostics (geometry, pixel formats, colorspace).
    #[arg(short, long)]
    debug: bool,

    /// Generate shell completion scripts and exit.
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

/// Renders indexing progress as a terminal bar.
struct IndexingBar {
    bar: ProgressBar,
}

impl IndexingProgress for IndexingBar {
    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "ffsnap", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();

    let Some(input) = cli.input else {
        Cli::command().print_help()?;
        return Err("missing required argument: INPUT".into());
    };
    if cli.frames.is_empty() {
        Cli::command().print_help()?;
        return Err("missing required option: --frame".into());
    }

    // Reuse a persisted seek index when it is valid for the input file,
    // else build one from scratch with a progress bar.
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template("Indexing {bar:40.cyan/blue} {pos:>3}%")?;
    bar.set_style(style.progress_chars("##-"));
    let observer = IndexingBar { bar };

    let (index, built_fresh) = SeekIndex::acquire(&input, cli.index.as_deref(), &observer)?;
    if built_fresh {
        observer.bar.finish();
    } else {
        observer.bar.finish_and_clear();
    }

    let mut source = VideoSource::open(&input, &index)?;

    // A freshly built index is persisted only after the source is up; a
    // failure here leaves the in-memory index fully usable.
    if built_fresh {
        if let Some(index_path) = &cli.index {
            match index.write_to(index_path) {
                Ok(()) => log::debug!("wrote seek index to {}", index_path.display()),
                Err(error) => eprintln!(
                    "{} {}",
                    "warning:".yellow().bold(),
                    error.to_string().yellow()
                ),
            }
        }
    }
    log::debug!("dropping seek index");
    drop(index);

    let spec = source.negotiate_format()?;
    if cli.debug {
        println!("Width: {}", spec.width);
        println!("Height: {}", spec.height);
        if let Some(pixel_format) = source.source_pixel_format() {
            println!("Source pixel format: {pixel_format:?}");
        }
        println!("Color matrix: {:?}", spec.color_matrix);
    }

    let writer = SnapshotWriter::new(cli.output);
    let summary = extract_frames(&mut source, &cli.frames, &writer, |report| {
        println!(
            "Current Frame: {}\tFrame Type: {}",
            report.frame_number, report.picture_type
        );
        if let Some(name) = report.color_space.name() {
            println!("Using colorspace {name}");
        }
        if cli.debug {
            println!(
                "Encoded dimensions: {}x{}",
                report.encoded_width, report.encoded_height
            );
            println!("Scaled dimensions: {}x{}", spec.width, spec.height);
        }
    });

    if !summary.failed.is_empty() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("skipped {} frame(s)", summary.failed.len()).yellow()
        );
    }

    println!(
        "{} {}",
        "success:".green().bold(),
        format!("Wrote {} snapshot(s)", summary.written.len()).green()
    );

    // Per-frame failures do not change the exit code.
    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            std::process::exit(1);
        }
    };

    if let Err(error) = run(cli) {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn repeated_frames_keep_caller_order() {
        let cli =
            Cli::try_parse_from(["ffsnap", "in.mkv", "-f", "3", "-f", "1", "-f", "3"]).unwrap();
        assert_eq!(cli.frames, vec![3, 1, 3]);
    }

    #[test]
    fn output_defaults_to_snapshot() {
        let cli = Cli::try_parse_from(["ffsnap", "in.mkv", "-f", "0"]).unwrap();
        assert_eq!(cli.output, "snapshot");
        assert!(cli.index.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn negative_frame_numbers_are_rejected() {
        assert!(Cli::try_parse_from(["ffsnap", "in.mkv", "-f", "-1"]).is_err());
    }

    #[test]
    fn long_options_parse() {
        let cli = Cli::try_parse_from([
            "ffsnap", "in.mkv", "--frame", "7", "--output", "shot", "--index", "in.ffindex",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.frames, vec![7]);
        assert_eq!(cli.output, "shot");
        assert_eq!(cli.index.as_deref().unwrap().to_str(), Some("in.ffindex"));
        assert!(cli.debug);
    }
}
