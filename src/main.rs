use std::process::ExitCode;

use clap::Parser;
use coremap::{ allocated_cores, allocated_cores_by_package, parse_ranges, sys, CoreList, CoreMask };

/// Cores given on the command line, e.g. `0-3,8`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selection(Vec<usize>);

fn parse_selection(list: &str) -> coremap::Result<Selection> {
    parse_ranges(list).map(Selection)
}

/// Show the cores this process may run on, grouped by physical package.
#[derive(Parser, Debug)]
#[command(version, name = "coremap", about, long_about = None)]
struct Cli {
    /// Restrict the process to these cores first (e.g. `0-3,8`)
    #[arg(long, value_name = "LIST", value_parser = parse_selection)]
    restrict: Option<Selection>,

    /// Spawn one thread per core and pin each to its core
    #[arg(long)]
    pin: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("coremap: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> coremap::Result<()> {
    if let Some(Selection(cores)) = &cli.restrict {
        let mask = CoreMask::from_cores(cores, CoreMask::platform().max())?;
        sys::set_affinity(None, &mask)?;
    }

    let cores = allocated_cores(None)?;
    println!("allocated cores: {}", CoreList(&cores));

    let ordered = allocated_cores_by_package();
    if ordered.is_empty() {
        println!("package order: unavailable");
    } else {
        println!("package order: {}", CoreList(&ordered));
    }

    if !cli.pin {
        return Ok(());
    }

    let workers = if ordered.is_empty() { cores } else { ordered };
    crossbeam_utils::thread::scope(|scope| {
        for (index, &core) in workers.iter().enumerate() {
            scope.spawn(move |_| {
                let result = sys::pin_current_thread(core).and_then(|()| allocated_cores(None));
                match result {
                    Ok(now) => println!("worker #{} pinned to {}", index, CoreList(&now)),
                    Err(err) => log::warn!("worker #{} cannot pin to cpu {}: {}", index, core, err),
                }
            });
        }
    }).expect("worker thread panicked");
    Ok(())
}
