mod chef;
mod config;
mod kitchen;
mod logging;
mod reporter;
mod sim;
mod sweeper;
mod types;

use clap::{Arg, ArgAction, Command};

fn build_cli() -> Command {
    Command::new("kitchen_sim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Shared-kitchen resource contention simulator")
        .subcommand(
            Command::new("demo")
                .about("Run the demo kitchen with scaled-down timings")
                .arg(chefs_arg())
                .arg(run_ms_arg()),
        )
        .subcommand(
            Command::new("bench")
                .about("Run a throughput benchmark and print CSV output")
                .arg(chefs_arg())
                .arg(run_ms_arg())
                .arg(
                    Arg::new("unit-ms")
                        .long("unit-ms")
                        .value_name("MS")
                        .help("Length of one time unit in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("validate")
                        .long("validate")
                        .help("Report exclusivity violations on stderr")
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn chefs_arg() -> Arg {
    Arg::new("chefs")
        .long("chefs")
        .value_name("N")
        .help("Number of chef agents to spawn")
        .value_parser(clap::value_parser!(usize))
}

fn run_ms_arg() -> Arg {
    Arg::new("run-ms")
        .long("run-ms")
        .value_name("MS")
        .help("Wall-clock run length in milliseconds")
        .value_parser(clap::value_parser!(u64))
}

fn main() {
    logging::init();
    let matches = build_cli().get_matches();
    match matches.subcommand() {
        Some(("demo", matches)) => sim::run_demo(
            matches.get_one::<usize>("chefs").copied(),
            matches.get_one::<u64>("run-ms").copied(),
        ),
        Some(("bench", matches)) => sim::run_bench(
            matches.get_one::<usize>("chefs").copied(),
            matches.get_one::<u64>("run-ms").copied(),
            matches.get_one::<u64>("unit-ms").copied(),
            matches.get_flag("validate"),
        ),
        // No subcommand runs the demo with defaults.
        _ => sim::run_demo(None, None),
    }
}
