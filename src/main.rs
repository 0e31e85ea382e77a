//! Binary entry point: hand-rolled CLI parsing (the exact `invalid
//! argument: <arg>` text and exit codes are part of the wire contract, so
//! `clap` is not used here), then the protocol dispatcher.

use serial_discovery::protocol::{self, Dispatcher};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    // stdout is the protocol wire; all diagnostics go to stderr.
    let stderr = fmt::layer().with_writer(io::stderr).with_target(true);
    tracing_subscriber::registry()
        .with(stderr)
        .with(EnvFilter::from_default_env())
        .init();

    match parse_args(std::env::args().skip(1)) {
        ArgsOutcome::Run => run(),
        ArgsOutcome::PrintVersion => {
            println!("{}", protocol::version_line());
            ExitCode::SUCCESS
        }
        ArgsOutcome::Invalid(arg) => {
            eprintln!("invalid argument: {arg}");
            ExitCode::FAILURE
        }
    }
}

enum ArgsOutcome {
    Run,
    PrintVersion,
    Invalid(String),
}

fn parse_args(args: impl Iterator<Item = String>) -> ArgsOutcome {
    let mut show_version = false;
    for arg in args {
        if arg.is_empty() {
            continue;
        }
        match arg.as_str() {
            "-v" | "--version" => show_version = true,
            other => return ArgsOutcome::Invalid(other.to_string()),
        }
    }
    if show_version {
        ArgsOutcome::PrintVersion
    } else {
        ArgsOutcome::Run
    }
}

fn run() -> ExitCode {
    let stdin = io::stdin();
    let dispatcher = Dispatcher::new(stdin.lock(), io::stdout());
    match dispatcher.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "fatal i/o error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argument_is_ignored() {
        let outcome = parse_args(vec!["".to_string()].into_iter());
        assert!(matches!(outcome, ArgsOutcome::Run));
    }

    #[test]
    fn version_flag_is_recognized() {
        let outcome = parse_args(vec!["--version".to_string()].into_iter());
        assert!(matches!(outcome, ArgsOutcome::PrintVersion));
    }

    #[test]
    fn unknown_flag_is_invalid() {
        let outcome = parse_args(vec!["--bogus".to_string()].into_iter());
        assert!(matches!(outcome, ArgsOutcome::Invalid(arg) if arg == "--bogus"));
    }
}
