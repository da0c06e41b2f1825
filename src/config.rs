//! Configuration of the `kvs-server` executable.
//!
//! Every option can be given on the command line or through an environment variable, the
//! command line taking precedence. An empty environment variable counts as unset.
use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{crate_version, App, Arg, ArgMatches};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::{KvsError, Result};

/// default directory of the storage engine
pub const DEFAULT_DB_PATH: &str = "./badger-data";
/// default port the HTTP server listens on
pub const DEFAULT_PORT: &str = "8080";
/// default IP address the HTTP server binds to
pub const DEFAULT_BIND_IP: &str = "0.0.0.0";
/// default directory holding the index page
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";
/// default directory static assets are served from
pub const DEFAULT_STATIC_DIR: &str = "static";
// log level used when RUST_LOG is unset or invalid
const DEFAULT_LOG: &str = "info";

/// holds parsed and validated options for the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// directory of the storage engine
    pub db_path: PathBuf,
    /// whether the storage engine's own log output is shown
    pub engine_log: bool,
    /// the address the HTTP server listens on
    pub addr: SocketAddr,
    /// directory holding the index page
    pub templates_dir: PathBuf,
    /// directory static assets are served from
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// parses and validates the server options from the given command line `args`
    /// (the first element being the program name), falling back to the process environment and
    /// then to the defaults.
    ///
    /// # Errors
    /// returns [`KvsError::Cli`] if clap rejected the arguments (this includes `--help`), or
    /// [`KvsError::Parsing`] if one of the values is invalid
    pub fn from_args<I, T>(args: I) -> Result<ServerConfig>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ServerConfig::from_sources(args, |name| std::env::var(name).ok())
    }

    /// like [`ServerConfig::from_args`], but environment variables are looked up with `env`
    pub fn from_sources<I, T, F>(args: I, env: F) -> Result<ServerConfig>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        F: Fn(&str) -> Option<String>,
    {
        let matches = app().get_matches_from_safe(args)?;
        let opts = Options {
            matches: &matches,
            env: &env,
        };

        let port = opts.value("port", "PORT", DEFAULT_PORT);
        let port: u16 = port
            .parse()
            .map_err(|_| KvsError::Parsing(format!("could not parse {} into a port", port)))?;

        let ip = opts.value("addr", "KVS_ADDR", DEFAULT_BIND_IP);
        let ip: IpAddr = ip
            .parse()
            .map_err(|_| KvsError::Parsing(format!("could not parse {} into an IP address", ip)))?;

        Ok(ServerConfig {
            db_path: PathBuf::from(opts.value("db-path", "BADGER_DB_PATH", DEFAULT_DB_PATH)),
            // anything but the literal "true" leaves the engine quiet
            engine_log: opts.value("engine-log", "BADGER_LOG", "false") == "true",
            addr: SocketAddr::new(ip, port),
            templates_dir: PathBuf::from(opts.value(
                "templates",
                "KVS_TEMPLATES_DIR",
                DEFAULT_TEMPLATES_DIR,
            )),
            static_dir: PathBuf::from(opts.value("static", "KVS_STATIC_DIR", DEFAULT_STATIC_DIR)),
        })
    }

    /// builds the log filter for the server.
    ///
    /// `rust_log` holds the usual `RUST_LOG` directives; `info` is used when it is missing,
    /// empty or invalid. The storage engine's own records are turned off unless
    /// [`ServerConfig::engine_log`] is set.
    pub fn log_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter> {
        let filter = rust_log
            .filter(|dirs| !dirs.is_empty())
            .and_then(|dirs| EnvFilter::try_new(dirs).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG));
        if self.engine_log {
            return Ok(filter);
        }

        let directive = "sled=off"
            .parse::<Directive>()
            .map_err(|e| KvsError::Parsing(format!("invalid log directive: {}", e)))?;
        Ok(filter.add_directive(directive))
    }
}

/// option lookup in order: command line, non-empty environment variable, default
struct Options<'a, F> {
    matches: &'a ArgMatches<'a>,
    env: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Options<'_, F> {
    fn value(&self, name: &str, var: &str, default: &str) -> String {
        if self.matches.occurrences_of(name) > 0 {
            if let Some(value) = self.matches.value_of(name) {
                return value.to_owned();
            }
        }
        (self.env)(var)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_owned())
    }
}

fn app() -> App<'static, 'static> {
    App::new("kvs-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a web based key-value store")
        .arg(
            Arg::with_name("db-path")
                .long("db-path")
                .value_name("DIR")
                .help("sets the directory the storage engine keeps its files in [env: BADGER_DB_PATH]")
                .default_value(DEFAULT_DB_PATH),
        )
        .arg(
            Arg::with_name("engine-log")
                .long("engine-log")
                .value_name("true|false")
                .help("shows the storage engine's own log output when set to 'true' [env: BADGER_LOG]")
                .default_value("false"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .value_name("PORT")
                .help("sets the port the server listens on [env: PORT]")
                .default_value(DEFAULT_PORT),
        )
        .arg(
            Arg::with_name("addr")
                .long("addr")
                .value_name("IP_ADDR")
                .help("sets the IP address the server binds to [env: KVS_ADDR]")
                .default_value(DEFAULT_BIND_IP),
        )
        .arg(
            Arg::with_name("templates")
                .long("templates")
                .value_name("DIR")
                .help("sets the directory holding index.html [env: KVS_TEMPLATES_DIR]")
                .default_value(DEFAULT_TEMPLATES_DIR),
        )
        .arg(
            Arg::with_name("static")
                .long("static")
                .value_name("DIR")
                .help("sets the directory static assets are served from [env: KVS_STATIC_DIR]")
                .default_value(DEFAULT_STATIC_DIR),
        )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn with_env(args: Vec<&str>, vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_sources(args, |name| vars.get(name).cloned())
    }

    #[test]
    fn command_line_overrides_defaults() {
        let config = with_env(
            vec![
                "kvs-server",
                "--db-path",
                "/tmp/kvs",
                "--engine-log",
                "true",
                "--port",
                "9000",
                "--addr",
                "127.0.0.1",
                "--templates",
                "/srv/templates",
                "--static",
                "/srv/static",
            ],
            &[("PORT", "7000"), ("BADGER_DB_PATH", "/var/kvs")],
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/kvs"));
        assert!(config.engine_log);
        assert_eq!(config.addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.templates_dir, PathBuf::from("/srv/templates"));
        assert_eq!(config.static_dir, PathBuf::from("/srv/static"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = with_env(
            vec!["kvs-server"],
            &[
                ("PORT", "7000"),
                ("BADGER_DB_PATH", "/var/kvs"),
                ("BADGER_LOG", "true"),
            ],
        )
        .unwrap();

        assert_eq!(config.addr.port(), 7000);
        assert_eq!(config.db_path, PathBuf::from("/var/kvs"));
        assert!(config.engine_log);
    }

    #[test]
    fn empty_environment_variables_use_defaults() {
        let config = with_env(
            vec!["kvs-server"],
            &[("PORT", ""), ("BADGER_DB_PATH", ""), ("KVS_STATIC_DIR", "")],
        )
        .unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));
    }

    #[test]
    fn engine_log_is_only_enabled_by_true() {
        let config = with_env(vec!["kvs-server", "--engine-log", "yes"], &[]).unwrap();
        assert!(!config.engine_log);
        let config = with_env(vec!["kvs-server"], &[("BADGER_LOG", "TRUE")]).unwrap();
        assert!(!config.engine_log);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = with_env(vec!["kvs-server", "--port", "eighty"], &[]).unwrap_err();
        assert!(matches!(err, KvsError::Parsing(_)));
        let err = with_env(vec!["kvs-server"], &[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, KvsError::Parsing(_)));
    }

    #[test]
    fn engine_records_are_off_unless_enabled() {
        let quiet = with_env(vec!["kvs-server"], &[]).unwrap();
        let filter = quiet.log_filter(None).unwrap().to_string();
        assert!(filter.contains("sled=off"), "{}", filter);
        assert!(filter.contains("info"), "{}", filter);

        let loud = with_env(vec!["kvs-server", "--engine-log", "true"], &[]).unwrap();
        let filter = loud.log_filter(Some("debug")).unwrap().to_string();
        assert!(!filter.contains("sled=off"), "{}", filter);
        assert!(filter.contains("debug"), "{}", filter);
    }

    #[test]
    fn empty_rust_log_uses_info() {
        let config = with_env(vec!["kvs-server"], &[]).unwrap();
        let filter = config.log_filter(Some("")).unwrap().to_string();
        assert!(filter.contains("info"), "{}", filter);
    }
}
