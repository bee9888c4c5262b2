use clap::{Arg, ArgAction, ArgMatches, Command};
use hashjoin::{hash_join, Error, JoinConfig, JoinStats, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use tracing_subscriber::EnvFilter;

/// Chunked hash join CLI
///
/// Joins two delimited text files on one column each, writing matched rows
/// to an output file while keeping the in-memory lookup table under a fixed
/// byte budget. Exits 0 on success; each failure category has its own
/// status code (see `Error::exit_code`).

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = create_cli().get_matches();

    match run_join(&matches) {
        Ok(stats) => println!("{}", stats),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn create_cli() -> Command {
    Command::new("hashjoin-cli")
        .about("Bounded-memory hash join over delimited text files")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("build")
                .help("Build-side input file (keys are expected unique)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("probe")
                .help("Probe-side input file (may repeat keys)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::new("output")
                .help("Output file for joined rows")
                .required(true)
                .index(3),
        )
        .arg(
            Arg::new("build-column")
                .help("0-based join column in the build input")
                .long("build-column")
                .value_parser(clap::value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("probe-column")
                .help("0-based join column in the probe input")
                .long("probe-column")
                .value_parser(clap::value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("memory")
                .help("Memory budget for the lookup table, in bytes")
                .long("memory")
                .value_parser(clap::value_parser!(usize))
                .required(true),
        )
        .arg(
            Arg::new("delimiter")
                .help("Field separator character")
                .long("delimiter")
                .value_parser(parse_delimiter)
                .default_value(","),
        )
        .arg(
            Arg::new("max-record-len")
                .help("Reject records longer than this many bytes")
                .long("max-record-len")
                .value_parser(clap::value_parser!(usize))
                .default_value("1048576"),
        )
        .arg(
            Arg::new("no-first-row-guard")
                .help("Join even when the first record pair's join fields differ")
                .long("no-first-row-guard")
                .action(ArgAction::SetTrue),
        )
}

fn parse_delimiter(raw: &str) -> std::result::Result<char, String> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("must be a single character, got {:?}", raw)),
    }
}

fn run_join(matches: &ArgMatches) -> Result<JoinStats> {
    let build_path = matches.get_one::<String>("build").unwrap();
    let probe_path = matches.get_one::<String>("probe").unwrap();
    let output_path = matches.get_one::<String>("output").unwrap();

    let config = JoinConfig {
        build_column: *matches.get_one::<usize>("build-column").unwrap(),
        probe_column: *matches.get_one::<usize>("probe-column").unwrap(),
        memory_budget: *matches.get_one::<usize>("memory").unwrap(),
        delimiter: *matches.get_one::<char>("delimiter").unwrap(),
        max_record_len: *matches.get_one::<usize>("max-record-len").unwrap(),
        first_row_guard: !matches.get_flag("no-first-row-guard"),
    };

    let build = File::open(build_path)
        .map_err(|e| Error::InvalidHandle(format!("{}: {}", build_path, e)))?;
    let probe = File::open(probe_path)
        .map_err(|e| Error::InvalidHandle(format!("{}: {}", probe_path, e)))?;
    let output = File::create(output_path)
        .map_err(|e| Error::InvalidHandle(format!("{}: {}", output_path, e)))?;

    hash_join(
        BufReader::new(build),
        BufReader::new(probe),
        &mut BufWriter::new(output),
        &config,
    )
}
