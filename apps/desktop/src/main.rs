use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    config::load_settings_from, ui_channel, ApiService, AuthService, HttpEnvironmentLookup,
    LoginBindings, LoginDependencies, LoginFlowController, LoginFlowOptions, LoginInputs,
};
use crossbeam_channel::{bounded, Receiver, Sender};
use shared::domain::PartnerEnvironment;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{checkbox, parse_command, ConsoleCommand, HELP};

const UI_QUEUE_CAPACITY: usize = 256;
const UI_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = client_core::config::SETTINGS_FILE)]
    config: PathBuf,
    #[arg(long)]
    registration_url: Option<String>,
    #[arg(long)]
    environment: Option<PartnerEnvironment>,
    #[arg(long)]
    debounce_ms: Option<u64>,
}

/// Sign-in itself lives outside this screen; the console only records the tap.
struct ConsoleAuth;

impl AuthService for ConsoleAuth {
    fn login(&self) {
        info!("login requested");
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings_from(&args.config);
    if let Some(url) = args.registration_url {
        settings.registration_url = url;
    }
    if let Some(environment) = args.environment {
        settings.environment = environment;
    }
    if let Some(debounce_ms) = args.debounce_ms {
        settings.debounce_ms = debounce_ms;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build login flow runtime")?;
    let guard = runtime.enter();

    let lookup = HttpEnvironmentLookup::new(
        ApiService::new(settings.registration_url.clone(), settings.environment),
        settings.request_timeout(),
    )
    .context("failed to build http client")?;

    let (dispatcher, ui_queue) = ui_channel(UI_QUEUE_CAPACITY);
    let (inputs, bindings) = LoginBindings::channels();
    let mut controller = LoginFlowController::spawn(
        LoginDependencies {
            auth: Arc::new(ConsoleAuth),
            lookup: Arc::new(lookup),
        },
        bindings,
        Arc::new(dispatcher),
        LoginFlowOptions::from(&settings),
    );

    let (quit_tx, quit_rx) = bounded::<()>(1);
    spawn_stdin_reader(inputs, quit_tx);

    println!("{HELP}");
    info!(
        registration_url = %settings.registration_url,
        environment = %settings.environment,
        debounce_ms = settings.debounce_ms,
        "login screen ready"
    );

    let mut login_results = controller.subscribe_login_results();
    let mut remember = controller.remember_state();
    let mut resolved = controller.resolved_environment();
    println!("remember me {}", checkbox(*remember.borrow_and_update()));

    while !should_quit(&quit_rx) {
        if !ui_queue.run_next_timeout(UI_POLL_INTERVAL) {
            continue;
        }
        ui_queue.run_pending();

        loop {
            match login_results.try_recv() {
                Ok(_) => println!("login triggered"),
                Err(TryRecvError::Lagged(skipped)) => println!("login triggered (x{skipped})"),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        if remember.has_changed().unwrap_or(false) {
            println!("remember me {}", checkbox(*remember.borrow_and_update()));
        }
        if resolved.has_changed().unwrap_or(false) {
            if let Some(env) = resolved.borrow_and_update().as_ref() {
                println!("{} -> {}", env.username, env.base_url);
            }
        }
    }

    controller.dispose();
    runtime.block_on(controller.join());
    drop(guard);
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}

fn should_quit(quit_rx: &Receiver<()>) -> bool {
    !matches!(
        quit_rx.try_recv(),
        Err(crossbeam_channel::TryRecvError::Empty)
    )
}

fn spawn_stdin_reader(inputs: LoginInputs, quit_tx: Sender<()>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let delivered = match parse_command(&line) {
                Some(ConsoleCommand::Username(text)) => inputs.change_username(Some(text)),
                Some(ConsoleCommand::ClearUsername) => inputs.change_username(None),
                Some(ConsoleCommand::Password(text)) => {
                    println!("password set ({} chars)", text.chars().count());
                    true
                }
                Some(ConsoleCommand::ToggleRemember) => inputs.toggle_remember(),
                Some(ConsoleCommand::Login) => inputs.tap_login(),
                Some(ConsoleCommand::Help) => {
                    println!("{HELP}");
                    true
                }
                Some(ConsoleCommand::Quit) => break,
                None => {
                    if !line.trim().is_empty() {
                        println!("unknown command; type 'help'");
                    }
                    true
                }
            };
            if !delivered {
                break;
            }
        }
        let _ = quit_tx.try_send(());
    });
}
