//! The kvs-client executable talks to a running kvs-server over its HTTP API.
//! It supports the following command line arguments:
//!
//! `kvs-client list [--limit N] [--url URL]`
//!
//!     List up to N records (the server's default is 50), starting from the first key.
//!
//! `kvs-client get <KEY> [--url URL]`
//!
//!     Get the string value of a given string key. Prints "Key not found" if there is none.
//!
//! `kvs-client set <KEY> <VALUE> [--url URL]`
//!
//!     Set the value of a string key to a string, overwriting any existing value.
//!
//! `kvs-client update <KEY> <VALUE> [--url URL]`
//!
//!     Replace the value of a string key, creating the key if it does not exist.
//!
//! `kvs-client rm <KEY> [--url URL]`
//!
//!     Remove a given string key. A "key not found" is treated as an error.
//!
//! `kvs-client search <QUERY> [--url URL]`
//!
//!     List every record whose key contains QUERY, ignoring case.
//!
//! `kvs-client stats [--url URL]`
//!
//!     Print the number of keys and the size of the store on disk.
//!
//! --url is the base URL of the server and defaults to http://127.0.0.1:8080.
//! An error is printed, with a non-zero exit code, on server errors or if the URL is invalid.

use std::process::exit;

use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use kvs_web::{KvsClient, KvsError, Record, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_URL: &str = "http://127.0.0.1:8080";

/// the operation requested on the command line
#[derive(Debug)]
enum Command {
    List { limit: Option<i64> },
    Get { key: String },
    Set { key: String, value: String },
    Update { key: String, value: String },
    Remove { key: String },
    Search { query: String },
    Stats,
}

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    /// the server's base url
    url: String,
    cmd: Command,
}

fn main() {
    // configure a subscriber that will log messages to STDERR
    subscriber_config();

    let key_arg = || Arg::with_name("KEY").required(true).index(1);
    let value_arg = || Arg::with_name("VALUE").required(true).index(2);

    let matches = App::new("kvs-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a client for the kvs web server")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommands(vec![
            SubCommand::with_name("list")
                .about("List records, starting from the first key")
                .arg(
                    Arg::with_name("limit")
                        .long("limit")
                        .value_name("N")
                        .help("the maximum number of records to list"),
                ),
            SubCommand::with_name("get")
                .about("Get the string value of a given string key")
                .arg(key_arg()),
            SubCommand::with_name("set")
                .about("Set the value of a string key to a string")
                .arg(key_arg())
                .arg(value_arg()),
            SubCommand::with_name("update")
                .about("Replace the value of a string key")
                .arg(key_arg())
                .arg(value_arg()),
            SubCommand::with_name("rm")
                .about("Removes a given key")
                .arg(key_arg()),
            SubCommand::with_name("search")
                .about("Find records whose key contains a string, ignoring case")
                .arg(Arg::with_name("QUERY").required(true).index(1)),
            SubCommand::with_name("stats").about("Show store statistics"),
        ])
        .arg(
            Arg::with_name("url")
                .long("url")
                .value_name("URL")
                .global(true)
                .help("sets the base URL of the server to connect to")
                .default_value(DEFAULT_URL),
        )
        .get_matches();

    let result = parse_options(&matches).and_then(run);
    if let Err(e) = result {
        eprintln!("{}", e);
        exit(1);
    }
}

/// runs the requested command against the server
fn run(opt: Opt) -> Result<()> {
    let client = KvsClient::new(&opt.url)?;
    match opt.cmd {
        Command::List { limit } => print_records(&client.list(limit)?),
        Command::Get { key } => match client.get(&key)? {
            Some(record) => println!("{}", record.value),
            None => println!("Key not found"),
        },
        Command::Set { key, value } => {
            client.set(&key, &value)?;
        }
        Command::Update { key, value } => {
            client.update(&key, &value)?;
        }
        Command::Remove { key } => client.remove(&key)?,
        Command::Search { query } => print_records(&client.search(&query)?),
        Command::Stats => {
            let stats = client.stats()?;
            println!("keys: {}", stats.num_keys);
            println!("size: {} bytes", stats.database_size);
        }
    }
    Ok(())
}

fn print_records(records: &[Record]) {
    for record in records {
        println!("{}\t{}\t{}", record.key, record.value, record.created_at.to_rfc3339());
    }
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    let url = matches.value_of("url").unwrap_or(DEFAULT_URL).to_owned();
    let arg = |args: &ArgMatches, name: &str| args.value_of(name).unwrap_or_default().to_owned();

    let cmd = match matches.subcommand() {
        ("list", Some(args)) => {
            let limit = match args.value_of("limit") {
                Some(limit) => Some(limit.parse::<i64>().map_err(|_| {
                    KvsError::Parsing(format!("could not parse {} into a limit", limit))
                })?),
                None => None,
            };
            Command::List { limit }
        }
        ("get", Some(args)) => Command::Get {
            key: arg(args, "KEY"),
        },
        ("set", Some(args)) => Command::Set {
            key: arg(args, "KEY"),
            value: arg(args, "VALUE"),
        },
        ("update", Some(args)) => Command::Update {
            key: arg(args, "KEY"),
            value: arg(args, "VALUE"),
        },
        ("rm", Some(args)) => Command::Remove {
            key: arg(args, "KEY"),
        },
        ("search", Some(args)) => Command::Search {
            query: arg(args, "QUERY"),
        },
        ("stats", Some(_)) => Command::Stats,
        (other, _) => return Err(KvsError::Parsing(format!("unknown command: {}", other))),
    };

    Ok(Opt { url, cmd })
}

/// configures a tracing subscriber that will log warnings to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting tracing default subscriber failed: {}", e);
    }
}
