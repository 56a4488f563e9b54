use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use ofh_core::{Assessment, RecoveryRequest};
use ofh_server::{build_procedure, serve, Overrides, ServiceConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("ofh")
        .version(ofh_core::VERSION)
        .about("onFailure handler for failed releases")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .env("OFH_CONFIG")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .env("OFH_BIND")
                .global(true)
                .value_parser(value_parser!(SocketAddr))
                .help("Address the HTTP endpoint listens on"),
        )
        .arg(
            Arg::new("engine-url")
                .long("engine-url")
                .env("OFH_ENGINE_URL")
                .global(true)
                .help("Base URL of the release engine"),
        )
        .arg(
            Arg::new("engine-password")
                .long("engine-password")
                .env("OFH_ENGINE_PASSWORD")
                .hide_env_values(true)
                .global(true)
                .help("Password of the engine service user"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("serve").about("Serve the HTTP endpoint and release listener"))
        .subcommand(
            Command::new("invoke")
                .about("Run the handler once for a release")
                .arg(
                    Arg::new("release-id")
                        .long("release-id")
                        .required(true)
                        .help("Release id, with or without namespace prefix"),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .required(true)
                        .help("User that owns the recovery actions"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the recovery plan without changing the release"),
                ),
        )
        .subcommand(
            Command::new("check-config").about("Validate and print the effective configuration"),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn overrides(matches: &ArgMatches) -> Overrides {
    Overrides {
        bind: matches.get_one::<SocketAddr>("bind").copied(),
        engine_url: matches.get_one::<String>("engine-url").cloned(),
        engine_password: matches.get_one::<String>("engine-password").cloned(),
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ServiceConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let config =
        ServiceConfig::load(path.map(PathBuf::as_path))?.with_overrides(overrides(matches));
    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("serve", args)) => {
            let config = load_config(args)?;
            let procedure = build_procedure(&config)?;
            serve(&config, procedure, shutdown_signal())
                .await
                .context("HTTP server failed")?;
        }
        Some(("invoke", args)) => {
            let config = load_config(args)?;
            let procedure = build_procedure(&config)?;
            let release_id = args
                .get_one::<String>("release-id")
                .context("--release-id is required")?;
            let user = args.get_one::<String>("user").context("--user is required")?;
            let request = RecoveryRequest::new(release_id, user);

            if args.get_flag("dry-run") {
                match procedure.prepare(&request).await? {
                    Assessment::Inapplicable(outcome) => println!("{}", outcome.message()),
                    Assessment::Recoverable(plan) => {
                        println!("{}", serde_json::to_string_pretty(&plan)?);
                    }
                }
            } else {
                let outcome = procedure.run(&request).await?;
                println!("{}", outcome.message());
            }
        }
        Some(("check-config", args)) => {
            let config = load_config(args)?;
            if config.engine.password.is_none() {
                tracing::warn!("engine.password is not set");
            }
            print!("{}", config.to_masked_toml()?);
        }
        _ => {}
    }
    Ok(())
}
