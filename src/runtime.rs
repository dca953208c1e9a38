//! Async host loop
//!
//! Drives an [`Engine`] from a tokio task: compositor events and panel button
//! presses arrive over a channel, scheduler deadlines are slept on, and panel
//! updates are forwarded to the host as they are published.

use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::compositor::{Compositor, CompositorEvent};
use crate::config::Settings;
use crate::wm::Engine;
use crate::wm::panel::{PanelButton, PanelUpdate};

/// Input from the host
#[derive(Debug, Clone)]
pub enum HostMessage {
    Compositor(CompositorEvent),
    Button(PanelButton),
    ReloadSettings(Settings),
    Shutdown,
}

/// Run `engine` until [`HostMessage::Shutdown`] or the sender is dropped.
///
/// Time is measured from the moment the loop starts. The engine is shut down
/// before it is handed back.
pub async fn run<C: Compositor>(
    mut engine: Engine<C>,
    mut rx: UnboundedReceiver<HostMessage>,
    panel_tx: UnboundedSender<PanelUpdate>,
) -> Engine<C> {
    let start = Instant::now();
    engine.start(Duration::ZERO);
    forward_panel(&mut engine, &panel_tx);

    loop {
        let deadline = engine.next_deadline();
        let timer = async move {
            match deadline {
                Some(deadline) => sleep_until(start + deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            message = rx.recv() => {
                let now = start.elapsed();
                match message {
                    Some(HostMessage::Compositor(event)) => engine.handle_event(now, event),
                    Some(HostMessage::Button(button)) => {
                        engine.advance_to(now);
                        engine.press(button);
                    }
                    Some(HostMessage::ReloadSettings(settings)) => {
                        engine.advance_to(now);
                        engine.update_settings(settings);
                    }
                    Some(HostMessage::Shutdown) => {
                        info!("Shutdown requested");
                        break;
                    }
                    None => {
                        debug!("Host channel closed");
                        break;
                    }
                }
            }
            () = timer => engine.advance_to(start.elapsed()),
        }
        forward_panel(&mut engine, &panel_tx);
    }

    engine.shutdown();
    forward_panel(&mut engine, &panel_tx);
    engine
}

fn forward_panel<C: Compositor>(engine: &mut Engine<C>, panel_tx: &UnboundedSender<PanelUpdate>) {
    for update in engine.take_panel_updates() {
        if panel_tx.send(update).is_err() {
            debug!("Panel receiver dropped");
        }
    }
}
