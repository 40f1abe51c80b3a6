use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use highlight_overlay::client::HttpReviewSource;
use highlight_overlay::config::{Cli, Config, default_config_path};
use highlight_overlay::drag::{PRIMARY_BUTTON, PointerEvent, PointerType};
use highlight_overlay::model::Point;
use highlight_overlay::navigation::NavigationEvents;
use highlight_overlay::runtime::{OverlayHost, OverlayRuntime, UiEvent};
use highlight_overlay::view::{OverlayView, render_text};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const HELP: &str = "commands: down X Y [mouse|touch|pen] [BUTTON] | move X Y | up | r | d | nav | o | q";

struct TerminalHost;

impl OverlayHost for TerminalHost {
    fn render(&mut self, view: Option<&OverlayView>) {
        let text = render_text(view);
        if !text.is_empty() {
            println!("{text}\n");
        }
    }

    fn open_link(&mut self, url: &str) {
        if let Err(e) = open::that(url) {
            tracing::warn!(error = %e, url, "failed to open review page");
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Ui(UiEvent),
    Navigate,
    Quit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();
    let config_path = args
        .config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("highlight_overlay starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let source = Arc::new(
        HttpReviewSource::new(cfg.overlay.endpoint_url.as_str(), cfg.app.request_timeout()).unwrap_or_else(
            |e| {
                tracing::error!(error = %e, "failed to setup http client");
                std::process::exit(1);
            },
        ),
    );

    let router = NavigationEvents::new();
    let shutdown = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(64);

    let ctrl_c_token = shutdown.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl+c signal received, tearing down overlay");
            ctrl_c_token.cancel();
        }
    });

    tokio::spawn(read_commands(events_tx, router.clone(), shutdown.clone()));

    eprintln!("{HELP}");
    let runtime = OverlayRuntime::new(cfg.overlay.clone(), source, cfg.app.frame_interval());
    let overlay = runtime
        .run(events_rx, router.subscribe(), shutdown, TerminalHost)
        .await;

    tracing::info!(phase = ?overlay.phase(), "highlight_overlay stopped");
}

async fn read_commands(events: mpsc::Sender<UiEvent>, router: NavigationEvents, shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };

        match parse_command(&line) {
            Some(Command::Ui(event)) => {
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Some(Command::Navigate) => {
                router.emit();
            }
            Some(Command::Quit) => {
                shutdown.cancel();
                break;
            }
            None if line.trim().is_empty() => {}
            None => eprintln!("{HELP}"),
        }
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "down" => {
            let position = parse_point(words.next(), words.next())?;
            let pointer_type = match words.next() {
                None | Some("mouse") => PointerType::Mouse,
                Some("touch") => PointerType::Touch,
                Some("pen") => PointerType::Pen,
                Some(_) => return None,
            };
            let button = match words.next() {
                Some(button) => button.parse().ok()?,
                None => PRIMARY_BUTTON,
            };
            Command::Ui(UiEvent::PointerDown(PointerEvent {
                pointer_type,
                button,
                position: Some(position),
            }))
        }
        "move" => {
            let position = parse_point(words.next(), words.next())?;
            Command::Ui(UiEvent::PointerMove(PointerEvent::mouse(position.x, position.y)))
        }
        "up" => Command::Ui(UiEvent::PointerUp(PointerEvent {
            pointer_type: PointerType::Mouse,
            button: PRIMARY_BUTTON,
            position: parse_point(words.next(), words.next()),
        })),
        "r" => Command::Ui(UiEvent::Reselect),
        "d" => Command::Ui(UiEvent::Dismiss),
        "o" => Command::Ui(UiEvent::OpenReview),
        "nav" => Command::Navigate,
        "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn parse_point(x: Option<&str>, y: Option<&str>) -> Option<Point> {
    Some(Point::new(x?.parse().ok()?, y?.parse().ok()?))
}
