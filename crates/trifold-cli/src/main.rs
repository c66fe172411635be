use std::env;
use std::fs;
use std::process::ExitCode;

use trifold::{parse, run_program, EngineOptions, RunStats, StdInput, StdStreams};

const STATUS_USAGE: u8 = 10;
const STATUS_UNREADABLE_SOURCE: u8 = 11;
const STATUS_UNWRITABLE_STATS: u8 = 12;

/// Which statistics to report, in the order they were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Insts,
    Vars,
}

#[derive(Debug, Default)]
struct CliArgs {
    help: bool,
    source_path: Option<String>,
    stats_path: Option<String>,
    metrics: Vec<Metric>,
}

fn main() -> ExitCode {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("{}", usage());
            return ExitCode::from(STATUS_USAGE);
        }
    };
    if args.help {
        println!("{}", usage());
        return ExitCode::SUCCESS;
    }
    let Some(source_path) = args.source_path else {
        eprintln!("{}", usage());
        return ExitCode::from(STATUS_USAGE);
    };

    let source = match fs::read_to_string(&source_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {source_path}: {err}");
            return ExitCode::from(STATUS_UNREADABLE_SOURCE);
        }
    };

    let program = match parse(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{source_path}: {err}");
            return ExitCode::from(err.exit_status());
        }
    };

    let mut input = StdInput;
    let mut output = StdStreams;
    let stats = match run_program(&program, EngineOptions::default(), &mut input, &mut output) {
        Ok(stats) => stats,
        Err(fault) => {
            eprintln!("error: {fault}");
            return ExitCode::from(fault.exit_status());
        }
    };

    if let Some(stats_path) = args.stats_path {
        if let Err(err) = write_stats(&stats_path, &args.metrics, stats) {
            eprintln!("error: cannot write {stats_path}: {err}");
            return ExitCode::from(STATUS_UNWRITABLE_STATS);
        }
    }
    ExitCode::SUCCESS
}

fn usage() -> &'static str {
    "usage: trifold <source> [--stats FILE [--insts] [--vars]]\n\n\
     Runs a program, reading its input from stdin and writing its output to\n\
     stdout. With --stats, writes one line per requested metric to FILE after\n\
     a successful run, in the order the flags were given."
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => parsed.help = true,
            "--stats" => {
                if parsed.stats_path.is_some() {
                    return Err("--stats given twice".to_string());
                }
                let Some(path) = args.next() else {
                    return Err("--stats requires a file argument".to_string());
                };
                parsed.stats_path = Some(path);
            }
            "--insts" => parsed.metrics.push(Metric::Insts),
            "--vars" => parsed.metrics.push(Metric::Vars),
            _ if arg.starts_with('-') => {
                return Err(format!("unknown option {arg}"));
            }
            _ => {
                if parsed.source_path.is_some() {
                    return Err(format!("unexpected extra argument {arg}"));
                }
                parsed.source_path = Some(arg);
            }
        }
    }
    // Combination checks run after the scan, so flag order does not matter.
    if parsed.help {
        if parsed.source_path.is_some() || parsed.stats_path.is_some() || !parsed.metrics.is_empty()
        {
            return Err("--help cannot be combined with other arguments".to_string());
        }
        return Ok(parsed);
    }
    if !parsed.metrics.is_empty() && parsed.stats_path.is_none() {
        return Err("--insts and --vars require --stats".to_string());
    }
    if parsed.source_path.is_none() && parsed.stats_path.is_some() {
        return Err("no source file given".to_string());
    }
    Ok(parsed)
}

fn write_stats(path: &str, metrics: &[Metric], stats: RunStats) -> std::io::Result<()> {
    let mut text = String::new();
    for metric in metrics {
        let value = match metric {
            Metric::Insts => stats.executed,
            Metric::Vars => stats.max_vars,
        };
        text.push_str(&value.to_string());
        text.push('\n');
    }
    fs::write(path, text)
}
