//! Hub runtime
//!
//! Spawns the task that owns the [`Hub`] and hands out cloneable
//! [`GatewayHandle`]s for everything outside it.

use std::sync::Arc;

use teamchat_common::RealtimeConfig;
use teamchat_core::{ConnectionId, DomainEvent, PresenceStore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::command::{HubCommand, HubStats};
use super::hub::{Hub, HubSettings};
use super::persistence::PresenceWriter;
use super::timers::{TimerFired, Timers};
use crate::broadcast::Envelope;
use crate::error::{GatewayError, GatewayResult};

/// Cloneable entry point into the hub
#[derive(Debug, Clone)]
pub struct GatewayHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl GatewayHandle {
    /// Queue a command; waits if the hub's queue is full
    pub async fn send(&self, command: HubCommand) -> GatewayResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GatewayError::HubClosed)
    }

    /// Feed an event from outside the gateway into the ordered dispatch loop
    pub async fn publish(&self, event: DomainEvent) -> GatewayResult<()> {
        self.send(HubCommand::Publish {
            origin: None,
            envelope: Envelope::new(event),
        })
        .await
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) -> GatewayResult<()> {
        self.send(HubCommand::Disconnect { connection_id }).await
    }

    pub async fn stats(&self) -> GatewayResult<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| GatewayError::HubClosed)
    }
}

/// Start the hub task
///
/// The task runs until every [`GatewayHandle`] is dropped.
pub fn spawn_hub(
    config: &RealtimeConfig,
    presence_store: Arc<dyn PresenceStore>,
) -> (GatewayHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(config.hub_command_buffer);
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let (writer, _writer_task) = PresenceWriter::spawn(presence_store, config.collaborator_timeout);

    let settings = HubSettings::from(config);
    let hub = Hub::new(settings, Timers::new(fired_tx), writer);
    let task = tokio::spawn(run(hub, commands_rx, fired_rx));

    tracing::info!(
        presence_grace_ms = settings.presence_grace.as_millis() as u64,
        typing_timeout_ms = settings.typing_timeout.as_millis() as u64,
        idle_timeout_ms = settings.idle_timeout.as_millis() as u64,
        "Gateway hub started"
    );

    (
        GatewayHandle {
            commands: commands_tx,
        },
        task,
    )
}

async fn run(
    mut hub: Hub,
    mut commands: mpsc::Receiver<HubCommand>,
    mut fired: mpsc::UnboundedReceiver<TimerFired>,
) {
    let mut sweep = interval(hub.settings().idle_timeout / 2);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => hub.handle(command),
                None => break,
            },
            Some(timer) = fired.recv() => hub.on_timer(timer),
            _ = sweep.tick() => hub.sweep_idle(Instant::now()),
        }
    }

    tracing::info!(stats = ?hub.stats(), "Gateway hub stopped");
}
