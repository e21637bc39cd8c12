use anyhow::Context;
use pgsh::config::version_string;
use pgsh::{Args, Environment, Interpreter, RustylineInput, Session, ShellConfig};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if args.version {
        println!("{}", version_string());
        return Ok(());
    }

    let default_level = if args.debug { "debug" } else { "warn" };
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = ShellConfig::from(&args);
    let env = Environment::from_process();
    let input = RustylineInput::new(config.history_file.clone())
        .context("failed to set up line editing")?;
    let session = Session::init(&config, &env).context("failed to initialize the shell")?;
    info!("starting {}", version_string());

    let mut shell = Interpreter::new(session, env, Box::new(input));
    if let Some(limit) = config.arg_max {
        shell = shell.with_arg_limit(limit);
    }
    let result = shell.repl();
    shell.finish();
    result
}
