use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use scripter::config::{ConfigEngine, State};
use scripter::console::Console;
use scripter::host::DylibLoader;
use scripter::input::{self, Flow};
use scripter::recovery;
use scripter::session::Session;
use scripter::toolchain::CcToolchain;

#[derive(Parser, Debug)]
#[command(name = "scripter")]
#[command(about = "Edit, compile and hot-reload C scripts", long_about = None)]
struct Args {
    /// Script to open (defaults to the last one used)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Only parse on request
    #[arg(long)]
    no_auto_parse: bool,

    /// Config script to use instead of ~/.config/scripter/init.rhai
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = ConfigEngine::new();
    let loaded = match &args.config {
        Some(path) => config.load_file(path),
        None => config.load_default(),
    };
    if let Err(e) = loaded {
        log::warn!("{}, using default settings", e);
    }
    let mut settings = config.settings();
    if args.no_auto_parse {
        settings.auto_parse = false;
    }

    let toolchain = CcToolchain::from_settings(&settings);
    if !toolchain.is_available() {
        log::warn!("Compiler `{}` could not be run", toolchain.compiler());
    }
    let watch_interval = settings.watch_interval();
    let console = Console::stdout();
    let mut session = Session::new(
        settings,
        Arc::new(toolchain),
        Arc::new(DylibLoader),
        console.clone(),
    );
    recovery::install_panic_hook(session.recovery_slot());

    let mut state = State::load();
    let explicit = args.path.is_some();
    if let Some(path) = args.path.or_else(|| state.last_file.clone()) {
        let log = console.start_log();
        if path.exists() {
            if let Err(e) = session.open(&path).await {
                log.out_exception(&e, "Opening");
            }
        } else if explicit {
            if let Err(e) = session.save_as(&path).await {
                log.out_exception(&e, "Creating");
            }
        }
    }
    console.out(":help lists commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(watch_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if input::handle_line(&mut session, &line).await == Flow::Quit {
                    break;
                }
            }
            Some(event) = session.next_event() => {
                session.handle_event(event);
            }
            _ = ticker.tick() => {
                if let Err(e) = session.check_external_edit().await {
                    log::warn!("Checking for outside edits: {}", e);
                }
            }
        }
    }

    session.shutdown().await;

    state.last_file = session.file().map(|p| p.to_path_buf());
    if let Err(e) = state.save() {
        log::warn!("{}", e);
    }

    Ok(())
}
