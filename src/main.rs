use argo_console::modules::api::GatewayClient;
use argo_console::modules::form::{ConfigForm, FieldId};
use argo_console::modules::serialize::{
    ConsoleSettings, is_not_found, load_form_profile, load_settings, save_settings,
};
use argo_console::modules::session::ConsoleSession;
use argo_console::modules::stats::stats_url;
use clap::{Parser, Subcommand};
use log::{error, info};
use simplelog::*;
use std::error::Error;
use std::fs::OpenOptions;
use url::Url;

#[derive(Parser)]
#[command(
    name = "argo-console",
    version,
    about = "Admin console for the Argo vessel data gateway"
)]
struct Cli {
    #[arg(short = 'l', long = "log-file", default_value = "argo-console.log")]
    log_file: String,

    #[arg(short = 's', long = "settings", default_value = "./console.toml")]
    settings: String,

    /// Gateway base URL; overrides the settings file.
    #[arg(short = 'g', long = "gateway")]
    gateway: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the live statistics table until Ctrl-C or the socket closes.
    Stats,
    /// Show the metadata of one message type.
    Pgn { key: String },
    /// Ask the gateway for a new vessel identifier.
    Uuid,
    /// Print the payload a profile would submit, without sending it.
    Form {
        #[arg(short = 'p', long = "profile")]
        profile: Option<String>,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Submit a configuration profile to the gateway.
    Submit {
        #[arg(short = 'p', long = "profile")]
        profile: Option<String>,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Add the selected interface to the provider list first.
        #[arg(long = "add-provider")]
        add_provider: bool,
        /// Fill the identifier from the gateway before submitting.
        #[arg(long = "new-uuid")]
        new_uuid: bool,
    },
    /// Install a web application package on the gateway.
    Install { package: String, version: String },
    /// Write the effective settings to the settings file.
    Init,
}

fn init_logger(log_path: &str, level: LevelFilter) -> Result<(), Box<dyn Error>> {
    WriteLogger::init(
        level,
        ConfigBuilder::new()
            .set_time_format_rfc3339()
            .build(),
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?,
    )?;
    Ok(())
}

fn read_settings(path: &str) -> Result<ConsoleSettings, Box<dyn Error>> {
    match load_settings(path) {
        Ok(settings) => Ok(settings),
        Err(err) if is_not_found(&err) => Ok(ConsoleSettings::default()),
        Err(err) => Err(format!("cannot read settings {path}: {err}").into()),
    }
}

fn build_form(profile: Option<&str>) -> Result<ConfigForm, Box<dyn Error>> {
    match profile {
        Some(path) => load_form_profile(path),
        None => Ok(ConfigForm::default()),
    }
}

/// Applies `--set FIELD=VALUE` pairs the way typing into the page would.
fn apply_assignments(session: &mut ConsoleSession, assignments: &[String]) -> Result<(), Box<dyn Error>> {
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got `{assignment}`"))?;
        let field: FieldId = field.trim().parse()?;
        session.view_mut().set_field(field, value)?;
    }
    Ok(())
}

fn open_session(settings: &ConsoleSettings, form: ConfigForm) -> Result<ConsoleSession, Box<dyn Error>> {
    let base = Url::parse(&settings.gateway)?;
    let socket = match &settings.stats_url {
        Some(explicit) => Url::parse(explicit)?,
        None => stats_url(&base)?,
    };
    let client = GatewayClient::new(base, settings.request_timeout())?;
    info!("Gateway {}, stats socket {socket}", client.base());
    Ok(ConsoleSession::new(client, socket, form))
}

fn print_notices(session: &mut ConsoleSession) {
    for notice in session.view_mut().take_notices() {
        eprintln!("{notice}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut settings = read_settings(&cli.settings)?;
    if let Some(gateway) = cli.gateway {
        settings.gateway = gateway;
    }
    init_logger(&cli.log_file, settings.level_filter())?;
    info!("Console started against {}", settings.gateway);

    match cli.command {
        Command::Stats => {
            let mut session = open_session(&settings, ConfigForm::default())?;
            let token = session.token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            });
            session.open_stats()?;
            while session.next_stats_event().await {
                print_notices(&mut session);
                let stats = &session.view().stats;
                println!("--- snapshot {} ---", stats.generation());
                print!("{stats}");
            }
            print_notices(&mut session);
            session.shutdown().await;
        }
        Command::Pgn { key } => {
            let mut session = open_session(&settings, ConfigForm::default())?;
            if session.show_pgn(&key).await?.is_some() {
                print!("{}", session.view().modal);
            }
            print_notices(&mut session);
        }
        Command::Uuid => {
            let mut session = open_session(&settings, ConfigForm::default())?;
            if let Some(uuid) = session.generate_uuid().await? {
                println!("{uuid}");
            }
            print_notices(&mut session);
        }
        Command::Form { profile, set } => {
            let form = build_form(profile.as_deref())?;
            let mut session = open_session(&settings, form)?;
            apply_assignments(&mut session, &set)?;
            let visible = session.view().visibility().visible_sections();
            let names: Vec<String> = visible.iter().map(ToString::to_string).collect();
            println!("visible: [{}]", names.join(", "));
            println!("{}", serde_json::to_string_pretty(&session.payload())?);
        }
        Command::Submit {
            profile,
            set,
            add_provider,
            new_uuid,
        } => {
            let form = build_form(profile.as_deref())?;
            let mut session = open_session(&settings, form)?;
            apply_assignments(&mut session, &set)?;
            if add_provider {
                session.add_provider();
            }
            if new_uuid && session.generate_uuid().await?.is_none() {
                print_notices(&mut session);
                return Err("identifier request failed, nothing submitted".into());
            }
            match session.submit().await? {
                Some(body) => println!("submitted: {body}"),
                None => error!("Configuration was not accepted"),
            }
            print_notices(&mut session);
        }
        Command::Install { package, version } => {
            let mut session = open_session(&settings, ConfigForm::default())?;
            if session.install_app(&package, &version).await?.is_some() {
                println!("install requested: {package}@{version}");
            }
            print_notices(&mut session);
        }
        Command::Init => {
            save_settings(&cli.settings, &settings)?;
            println!("settings written to {}", cli.settings);
        }
    }

    Ok(())
}
