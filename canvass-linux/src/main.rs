// Canvass Linux daemon: presence discovery, questionnaire transport, and
// the console UI context.

mod config;
mod console;
mod discovery;
mod frame;
mod transport;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use canvass_core::{Action, MeshEvent, PeerId, Session, QUESTIONNAIRE_PORT};
use tokio::sync::{mpsc, Mutex};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("canvass-linux {VERSION}");
            return Ok(());
        }
    }

    env_logger::init();
    let cfg = config::load();
    let local_id = PeerId::random();
    log::info!("canvass-linux {VERSION} starting as {local_id}");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cfg, local_id))
}

async fn run(cfg: config::Config, local_id: PeerId) -> anyhow::Result<()> {
    let listener = transport::bind(QUESTIONNAIRE_PORT)
        .await
        .context("binding questionnaire port")?;
    let mut session = Session::new();
    session.on_bound();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<MeshEvent>();
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<console::UiOp>();
    let (submit_tx, mut submit_rx) = mpsc::unbounded_channel();
    let peer_addrs: discovery::PeerAddrs = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(transport::recv_loop(listener, event_tx.clone()));
    tokio::spawn(discovery::run_discovery(
        local_id,
        cfg.discovery_port,
        QUESTIONNAIRE_PORT,
        peer_addrs.clone(),
        event_tx,
    ));
    tokio::spawn(console::run_ui(ui_rx, submit_tx, cfg.bell));

    // Receive plumbing is in place; the session accepts events now.
    session.activate();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    // Sole writer of the session (and through it the peer registry):
    // transport tasks only enqueue events, the UI task only enqueues
    // completed sheets.
    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match session.handle_event(event) {
                    Ok(actions) => dispatch(actions, &ui_tx, &peer_addrs).await,
                    Err(e) => log::warn!("dropping malformed payload: {e}"),
                }
            }
            Some(sheet) = submit_rx.recv() => {
                let actions = session.submit(&sheet);
                if actions.is_empty() {
                    log::warn!("no peers in range; answers not sent");
                }
                dispatch(actions, &ui_tx, &peer_addrs).await;
            }
            _ = &mut shutdown => break,
        }
    }

    let _ = discovery::announce_leave(cfg.discovery_port, local_id).await;
    session.stop();
    log::info!("session stopped");
    Ok(())
}

/// Execute actions: UI work goes to the UI context; sends fan out on their
/// own task so a slow peer never stalls event handling.
async fn dispatch(
    actions: Vec<Action>,
    ui: &mpsc::UnboundedSender<console::UiOp>,
    peer_addrs: &discovery::PeerAddrs,
) {
    let mut sends = Vec::new();
    for action in actions {
        match action {
            Action::RenderForm(form) => {
                let _ = ui.send(console::UiOp::RenderForm(form));
            }
            Action::ShowAnswers(sheet) => {
                let _ = ui.send(console::UiOp::ShowAnswers(sheet));
            }
            Action::PlayNotification => {
                let _ = ui.send(console::UiOp::PlayNotification);
            }
            Action::SetConfigureVisibility(visible) => {
                let _ = ui.send(console::UiOp::SetConfigureVisibility(visible));
            }
            Action::SendReliable {
                peer,
                port,
                payload,
            } => sends.push((peer, port, payload)),
        }
    }

    // A submit emits one send per peer with a shared payload.
    let payload = match sends.first() {
        Some((_, _, payload)) => payload.clone(),
        None => return,
    };
    let targets: Vec<(PeerId, Option<SocketAddr>)> = {
        let addrs = peer_addrs.lock().await;
        sends
            .iter()
            .map(|(peer, port, _)| {
                let addr = addrs.get(peer).map(|a| SocketAddr::new(a.ip(), *port));
                (*peer, addr)
            })
            .collect()
    };
    tokio::spawn(async move {
        transport::fan_out(&targets, &payload).await;
    });
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
