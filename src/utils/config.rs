#![forbid(unsafe_code)]

use anyhow::{anyhow, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use serde::Deserialize;
use std::{env, fs};

use crate::server::ServiceKind;
use crate::utils::{demo_utils::get_absolute_path, errors::Errors};

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Environment variables that override command line arguments.
pub const ENV_CONFIG_FILE     : &str = "KUBE_DEMO_CONFIG";
pub const ENV_LOG_CONFIG_FILE : &str = "KUBE_DEMO_LOG_CONFIG";

// Configuration files live here unless told otherwise.
const DEFAULT_CONFIG_DIR      : &str = "~/.kube_demo";

// Networking.
const DEFAULT_BIND_ADDR       : &str = "0.0.0.0";
const DEFAULT_HTTP_PORT       : u16  = 8080;

// Used when no log4rs file is configured.
const CONSOLE_LOG_PATTERN     : &str = "{d(%Y-%m-%dT%H:%M:%S%.3f)(utc)} {h({l})} {t} - {m}{n}";

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// DemoArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, Default, Parser)]
#[command(about = "Command line arguments for the kube demo services.")]
pub struct DemoArgs {
    /// Path to the service's TOML configuration file.
    ///
    /// The configuration file is located using the following priority order:
    ///
    ///   1. If set, the value of the KUBE_DEMO_CONFIG environment variable,
    ///
    ///   2. Otherwise, if set, the value of this argument,
    ///
    ///   3. Otherwise, ~/.kube_demo/<service>.toml
    #[arg(short, long)]
    pub config_file: Option<String>,

    /// Path to a log4rs YAML configuration file.
    ///
    /// KUBE_DEMO_LOG_CONFIG takes precedence.  When neither is set, logs go
    /// to the console at info level.
    #[arg(short, long)]
    pub log_config: Option<String>,

    /// Listen on this port instead of the configured one.
    #[arg(short, long)]
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct RuntimeCtx {
    pub service: ServiceKind,
    pub parms: Parms,
    pub args: &'static DemoArgs,
}

impl RuntimeCtx {
    /// The socket address the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.parms.config.bind_addr, self.parms.config.http_port)
    }
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub bind_addr: String,
    pub http_port: u16,
}

impl Config {
    pub fn new(service: ServiceKind) -> Self {
        Self { title: service.default_title().to_string(), ..Default::default() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: String::new(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from a YAML file if one was specified, otherwise log to
 * the console at info level.
 */
pub fn init_log(args: &DemoArgs) -> Result<()> {
    match resolve_path(env::var(ENV_LOG_CONFIG_FILE).ok(), args.log_config.clone()) {
        Some(logconfig) => {
            if let Err(e) = log4rs::init_file(&logconfig, Default::default()) {
                return Err(anyhow!("{}\n   {}", Errors::Log4rsInitialization(logconfig), e));
            }
            info!("Log4rs initialized using: {}", logconfig);
        },
        None => {
            let config = console_log_config(LevelFilter::Info)?;
            if let Err(e) = log4rs::init_config(config) {
                return Err(anyhow!("{}\n   {}", Errors::Log4rsInitialization("console".to_string()), e));
            }
            info!("Log4rs initialized using console appender.");
        },
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// console_log_config:
// ---------------------------------------------------------------------------
fn console_log_config(level: LevelFilter) -> Result<LogConfig> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_LOG_PATTERN)))
        .build();

    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    Ok(config)
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Read the service's configuration file.  A missing or unreadable file is
 * not an error; the defaults are used.  A file that cannot be parsed is.
 */
fn get_parms(service: ServiceKind, args: &DemoArgs) -> Result<Parms> {
    let config_file = resolve_path(env::var(ENV_CONFIG_FILE).ok(), args.config_file.clone())
        .unwrap_or_else(|| default_config_file(service));

    info!("{}", Errors::ReadingConfigFile(config_file.clone()));
    let mut config = match fs::read_to_string(&config_file) {
        Ok(contents) => parse_config(service, &config_file, &contents)?,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: apply_args(Config::new(service), args) });
        }
    };
    config = apply_args(config, args);

    Ok(Parms { config_file, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(service: ServiceKind, config_file: &str, contents: &str) -> Result<Config> {
    let mut config: Config = match toml::from_str(contents) {
        Ok(c)  => c,
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.to_string()), e);
            error!("{}", msg);
            return Err(anyhow!(msg));
        }
    };

    if config.title.is_empty() {
        config.title = service.default_title().to_string();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// apply_args:
// ---------------------------------------------------------------------------
fn apply_args(mut config: Config, args: &DemoArgs) -> Config {
    if let Some(port) = args.port {
        config.http_port = port;
    }
    config
}

// ---------------------------------------------------------------------------
// resolve_path:
// ---------------------------------------------------------------------------
// The environment value wins over the command line value.
fn resolve_path(env_value: Option<String>, arg_value: Option<String>) -> Option<String> {
    env_value
        .filter(|s| !s.is_empty())
        .or(arg_value)
        .map(|p| get_absolute_path(&p))
}

// ---------------------------------------------------------------------------
// default_config_file:
// ---------------------------------------------------------------------------
fn default_config_file(service: ServiceKind) -> String {
    get_absolute_path(&format!("{}/{}.toml", DEFAULT_CONFIG_DIR, service.binary_name()))
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
pub fn init_runtime_context(service: ServiceKind, args: &'static DemoArgs) -> Result<RuntimeCtx> {
    let parms = get_parms(service, args)?;
    Ok(RuntimeCtx { service, parms, args })
}
