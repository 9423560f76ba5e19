use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use polycall_runtime::{Runtime, RuntimeConfig, Value};
use polycall_utils::logger;
use polycall_utils::timer::Stopwatch;

#[derive(Parser, Debug)]
#[command(name = "polycall", version, about = "Load code and call its functions by name")]
pub struct PolycallCli {
    #[arg(long, global = true)]
    /// TOML configuration file; environment variables still override it.
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    /// Log loader and dispatch activity at debug level.
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

impl PolycallCli {
    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[arg(long, short)]
    /// Loader tag the files are handed to.
    pub tag: String,

    #[arg(required = true)]
    /// Files loaded together in one request.
    pub files: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prints the runtime's diagnostic string.
    Info,
    /// Loads files and prints the functions they expose.
    List {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Loads files and invokes one function, printing its JSON result.
    Call {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(long, short)]
        function: String,
        #[arg(last = true, allow_hyphen_values = true)]
        /// Arguments as JSON; anything that is not valid JSON is passed as a string.
        args: Vec<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = PolycallCli::parse();
    logger::init_logging(cli.verbose.then_some("polycall=debug"));

    match &cli.command {
        Command::Info => handle_info(&cli),
        Command::List { load } => handle_list(&cli, load),
        Command::Call {
            load,
            function,
            args,
        } => handle_call(&cli, load, function, args),
    }
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))
            .map(RuntimeConfig::merge_with_env),
        None => Ok(RuntimeConfig::from_env()),
    }
}

fn start_runtime(cli: &PolycallCli, load: &LoadArgs) -> Result<Runtime> {
    let mut stopwatch = Stopwatch::start_new();
    let runtime = Runtime::with_config(load_config(cli.config.as_deref())?);
    runtime.initialize()?;
    let init_ms = stopwatch.lap_ms();

    let count = runtime
        .load_from_file(&load.tag, &load.files)
        .with_context(|| format!("failed to load files with loader `{}`", load.tag))?;
    debug!(count, init_ms, load_ms = stopwatch.lap_ms(), "files loaded");
    Ok(runtime)
}

fn handle_info(cli: &PolycallCli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    println!("{}", Runtime::print_info());
    println!("args size: {}", config.args_size);
    if !config.preload.is_empty() {
        println!("preload:   {}", config.preload.join(", "));
    }
    Ok(())
}

fn handle_list(cli: &PolycallCli, load: &LoadArgs) -> Result<()> {
    let runtime = start_runtime(cli, load)?;
    for function in runtime.inspect()? {
        let origin = function.loader.as_deref().unwrap_or("native");
        println!("{}{} [{origin}]", function.name, function.signature);
    }
    runtime.destroy()?;
    Ok(())
}

fn handle_call(cli: &PolycallCli, load: &LoadArgs, function: &str, args: &[String]) -> Result<()> {
    let runtime = start_runtime(cli, load)?;
    let args = args.iter().map(|arg| parse_arg(arg)).collect::<Vec<_>>();

    let result = runtime.metacallv(function, &args)?;
    let json = result
        .to_json()
        .with_context(|| format!("`{function}` returned a value without a JSON form"))?;
    println!("{json}");
    runtime.destroy()?;
    Ok(())
}

fn parse_arg(arg: &str) -> Value {
    serde_json::from_str(arg)
        .map(|json| Value::from_json(&json))
        .unwrap_or_else(|_| Value::from(arg))
}
