// Re-runs a JSONL decision log through the engine and prints what changed
//
//   replay <log_file> [--turns 3,7,12] [--config Snake.toml] [--verbose]

use std::env;
use std::process;

use minimax_snake::config::Config;
use minimax_snake::replay::{load_log, ReplaySummary, Replayer};

const USAGE: &str = "usage: replay <log_file> [--turns T1,T2,...] [--config <path>] [--verbose]";

#[derive(Debug)]
struct Args {
    log_file: String,
    turns: Option<Vec<i32>>,
    config_path: String,
    verbose: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let log_file = args.next().ok_or_else(|| USAGE.to_string())?;
    let mut parsed = Args {
        log_file,
        turns: None,
        config_path: "Snake.toml".to_string(),
        verbose: false,
    };

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--turns" => {
                let list = args.next().ok_or("--turns needs a comma-separated list")?;
                let turns = list
                    .split(',')
                    .map(|t| t.trim().parse::<i32>().map_err(|e| format!("bad turn '{}': {}", t, e)))
                    .collect::<Result<_, _>>()?;
                parsed.turns = Some(turns);
            }
            "--config" => {
                parsed.config_path = args.next().ok_or("--config needs a path")?;
            }
            "--verbose" => parsed.verbose = true,
            other => return Err(format!("unknown option '{}'\n{}", other, USAGE)),
        }
    }

    Ok(parsed)
}

fn run(args: Args) -> Result<(), String> {
    let config = Config::from_file(&args.config_path)?;
    let entries = load_log(&args.log_file).map_err(|e| e.to_string())?;

    let replayer = Replayer::new(config);
    let turns = replayer
        .replay_log(&entries, args.turns.as_deref())
        .map_err(|e| e.to_string())?;

    if args.verbose {
        for turn in &turns {
            println!("{}", turn);
        }
        println!();
    }
    println!("{}", ReplaySummary::from_turns(&turns));
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let result = parse_args(env::args().skip(1)).and_then(run);
    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}
