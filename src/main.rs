mod logger;
mod utils;
mod users;
mod bidder;
mod bidders;
mod settlement;
mod auction;
mod simulationrun;
mod scenarios;
mod charts;

use logger::{Logger, LogEvent, ConsoleReceiver, FileReceiver, sanitize_filename};
use scenarios::{get_scenario_catalog, ScenarioEntry};
use utils::{RAND_SEED, TOTAL_SIMULATION_RUNS, VERBOSE_AUCTION};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

const USAGE: &str = "Usage: secondprice [<scenario>|all [iterations] [start_iteration]] [--verbose auction] [--fastbreak]
       secondprice charts";

/// What the command line asks for
#[derive(Debug, PartialEq)]
enum Command {
    /// No arguments: the adaptive scenario with final balances on the console
    Default,
    Charts,
    Scenarios {
        selection: String,
        iterations: u64,
        start_iteration: u64,
    },
}

#[derive(Debug, PartialEq)]
struct CliOptions {
    command: Command,
    verbose_auction: bool,
    fastbreak: bool,
}

/// Parse an optional positional number, falling back to `default` when it is absent
fn parse_count(positional: &[&str], index: usize, name: &str, default: u64) -> Result<u64, String> {
    match positional.get(index) {
        None => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| format!("Invalid {} '{}', expected a number", name, value)),
    }
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut verbose_auction = false;
    let mut fastbreak = false;
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" => {
                if iter.next_if(|next| next.as_str() == "auction").is_some() {
                    verbose_auction = true;
                }
            }
            "--fastbreak" => fastbreak = true,
            other => positional.push(other),
        }
    }

    let command = match positional.first() {
        None => Command::Default,
        Some(&"charts") => Command::Charts,
        Some(selection) => {
            let iterations = parse_count(&positional, 1, "iterations", 1)?;
            if iterations == 0 {
                return Err("Iterations must be at least 1".to_string());
            }
            Command::Scenarios {
                selection: selection.to_string(),
                iterations,
                start_iteration: parse_count(&positional, 2, "start iteration", 0)?,
            }
        }
    };

    Ok(CliOptions { command, verbose_auction, fastbreak })
}

fn select_scenarios(selection: &str) -> Result<Vec<ScenarioEntry>, String> {
    let catalog = get_scenario_catalog();
    if selection == "all" {
        return Ok(catalog);
    }
    match catalog.iter().find(|entry| entry.short_name == selection) {
        Some(entry) => Ok(vec![entry.clone()]),
        None => {
            let names: Vec<&str> = catalog.iter().map(|entry| entry.short_name).collect();
            Err(format!("Scenario '{}' not found. Available: {}", selection, names.join(", ")))
        }
    }
}

/// Run every selected scenario for each seed in start_iteration..start_iteration + iterations
/// Returns false when any run failed
fn run_scenarios(scenarios: &[ScenarioEntry], iterations: u64, start_iteration: u64, fastbreak: bool, logger: &mut Logger) -> bool {
    let mut all_passed = true;

    'scenarios: for scenario in scenarios {
        log!(logger, LogEvent::Validation, "{}: ", scenario.short_name);

        let mut scenario_events = vec![LogEvent::Round, LogEvent::Simulation, LogEvent::Scenario];
        if VERBOSE_AUCTION.load(Ordering::Relaxed) {
            scenario_events.push(LogEvent::Auction);
        }
        let scenario_receiver_id = logger.add_receiver(FileReceiver::new(
            &PathBuf::from(format!("log/{}/scenario.log", sanitize_filename(scenario.short_name))),
            scenario_events,
        ));

        for seed in start_iteration..start_iteration + iterations {
            RAND_SEED.store(seed, Ordering::Relaxed);
            let outcome = (scenario.run)(scenario.short_name, logger);

            match (&outcome, iterations) {
                (Ok(()), 1) => logln!(logger, LogEvent::Validation, "✓ PASSED"),
                (Ok(()), _) => log!(logger, LogEvent::Validation, "✓"),
                (Err(e), 1) => logln!(logger, LogEvent::Validation, "✗ FAILED: {}", e),
                (Err(_), _) => log!(logger, LogEvent::Validation, "✗"),
            }
            let _ = logger.flush();

            if let Err(e) = outcome {
                all_passed = false;
                if fastbreak {
                    logger.remove_receiver(scenario_receiver_id);
                    warnln!(logger, LogEvent::Validation, "\nStopped at seed {} (--fastbreak): {}", seed, e);
                    break 'scenarios;
                }
            }
        }
        if iterations > 1 {
            logln!(logger, LogEvent::Validation, "");
        }

        logger.remove_receiver(scenario_receiver_id);
    }

    all_passed
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}\n{}", e, USAGE);
            std::process::exit(1);
        }
    };
    VERBOSE_AUCTION.store(options.verbose_auction, Ordering::Relaxed);

    match options.command {
        Command::Default => {
            let mut logger = Logger::new();
            logger.add_receiver(ConsoleReceiver::new(vec![LogEvent::Simulation, LogEvent::Scenario]));
            if let Err(e) = scenarios::adaptive::run("adaptive", &mut logger) {
                eprintln!("Error running scenario: {}", e);
                std::process::exit(1);
            }
        }
        Command::Charts => {
            if let Err(e) = charts::generate_balance_charts() {
                eprintln!("Error generating charts: {}", e);
                std::process::exit(1);
            }
            println!("Balance charts generated successfully.");
        }
        Command::Scenarios { selection, iterations, start_iteration } => {
            let scenarios = match select_scenarios(&selection) {
                Ok(scenarios) => scenarios,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let mut logger = Logger::new();
            // One scenario run once: show the individual checks and final balances too
            let console_events = if scenarios.len() == 1 && iterations == 1 {
                vec![LogEvent::Validation, LogEvent::Scenario, LogEvent::Simulation]
            } else {
                vec![LogEvent::Validation]
            };
            logger.add_receiver(ConsoleReceiver::new(console_events));
            logger.add_receiver(FileReceiver::new(&PathBuf::from("log/summary.log"), vec![LogEvent::Validation]));

            TOTAL_SIMULATION_RUNS.store(0, Ordering::Relaxed);
            logln!(&mut logger, LogEvent::Validation, "Running '{}' with seeds {}..{}\n",
                selection, start_iteration, start_iteration + iterations);

            let all_passed = run_scenarios(&scenarios, iterations, start_iteration, options.fastbreak, &mut logger);

            logln!(&mut logger, LogEvent::Validation, "\nTotal simulation runs completed: {}",
                TOTAL_SIMULATION_RUNS.load(Ordering::Relaxed));
            let _ = logger.flush();
            if !all_passed {
                std::process::exit(1);
            }
        }
    }
}
