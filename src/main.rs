mod error;
mod logging;

use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use shoebox_config::Config;
use shoebox_library::{Context, Event, EventSink, Summary};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

#[derive(Parser, Debug)]
#[command(name = "shoebox", version, about = "Normalize a tree of photos and videos by their date folders")]
struct Args {
    /// Directory to normalize; results are written beneath it.
    source_root: PathBuf,

    /// Configuration file (.toml, .yaml or .json), layered over the defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log debug detail (including external tool command lines) to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.verbose) {
        eprintln!("Warning: {e:?}");
    }
    match launch(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        },
    }
}

fn launch(args: &Args) -> Result<Summary> {
    let config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(?config, "Configuration loaded");
    let context = Context::from_config(&config);
    let source_root = args.source_root.clone();

    let (tx, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("pipeline".to_string())
        .spawn(move || shoebox_library::run(&context, &source_root, &EventSink::new(tx)))
        .or_raise(|| ErrorKind::Worker)?;

    consume(rx);

    let Ok(outcome) = worker.join() else {
        exn::bail!(ErrorKind::Worker);
    };
    outcome.or_raise(|| ErrorKind::Run)
}

/// Prints events until the worker hangs up: log lines on stdout, progress as
/// a single line rewritten in place on stderr.
fn consume(rx: mpsc::Receiver<Event>) {
    let mut progress_shown = false;
    for event in rx {
        if progress_shown && !matches!(event, Event::Progress { .. }) {
            eprintln!();
            progress_shown = false;
        }
        match event {
            Event::Log(message) => println!("{message}"),
            Event::Progress { text, .. } => {
                eprint!("\rProgress: {text}");
                _ = std::io::stderr().flush();
                progress_shown = true;
            },
            Event::Done(message) => println!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["shoebox", "/photos"], None, false)]
    #[case(&["shoebox", "-v", "/photos"], None, true)]
    #[case(&["shoebox", "--config", "shoebox.yaml", "--verbose", "/photos"], Some("shoebox.yaml"), true)]
    fn test_args(#[case] argv: &[&str], #[case] config: Option<&str>, #[case] verbose: bool) {
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!(args.source_root, PathBuf::from("/photos"));
        assert_eq!(args.config, config.map(PathBuf::from));
        assert_eq!(args.verbose, verbose);
    }

    #[test]
    fn test_source_root_is_required() {
        assert!(Args::try_parse_from(["shoebox"]).is_err());
    }
}
