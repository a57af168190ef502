//! The team client: one dispatcher task that feeds bus messages, user
//! commands and timer expirations into a [`GameSession`] and carries out the
//! resulting effects.

use anyhow::anyhow;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

use crate::config::{AppConfig, Timing};
use crate::game::{Command, Effect, GameSession, Notice};
use crate::protocol::{Codec, Outbound};
use crate::transport::gateway::{spawn_gateway, Gateway, GatewayHandle};
use crate::transport::liveness::spawn_liveness;
use crate::transport::{Inbound, Transport};

/// Why [`TeamNode::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A reset was requested; the process should start over.
    Relaunch,
}

pub struct TeamNode {
    session: GameSession,
    codec: Codec,
    timing: Timing,
    gateway: Gateway,
    commands: mpsc::UnboundedReceiver<Command>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl TeamNode {
    /// Subscribe to this team's inbound topics and build the node.
    pub async fn connect(
        config: &AppConfig,
        transport: Box<dyn Transport>,
        commands: mpsc::UnboundedReceiver<Command>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> anyhow::Result<Self> {
        let topics = [
            config.topics.play_flow.clone(),
            config.topics.game_data.clone(),
        ];
        let gateway = spawn_gateway(transport, &topics).await?;
        info!("client {} connected to {}", config.client_id, config.broker);
        Ok(Self {
            session: GameSession::new(config),
            codec: Codec::new(config.topics.clone(), config.keywords.clone()),
            timing: config.timing,
            gateway,
            commands,
            notices,
        })
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn gateway(&self) -> GatewayHandle {
        self.gateway.handle.clone()
    }

    /// Run until a reset is requested or the bus connection is lost.
    pub async fn run(&mut self) -> anyhow::Result<Exit> {
        let liveness = spawn_liveness(
            self.gateway.handle.clone(),
            self.codec.encode(&Outbound::Alive),
            self.timing.liveness_interval(),
            self.timing.liveness_retry(),
        );
        let result = self.dispatch().await;
        liveness.abort();
        result
    }

    async fn dispatch(&mut self) -> anyhow::Result<Exit> {
        let window = self.timing.placement_window();
        let deadline = sleep(window);
        tokio::pin!(deadline);
        let mut clock = interval(self.timing.clock_tick());
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            let window_open = self.session.placement().is_window_open();
            let clock_running = self.session.clock().is_running();

            let effects = tokio::select! {
                msg = self.gateway.inbound.recv() => match msg {
                    Some(msg) => self.route(msg),
                    None => return Err(anyhow!("bus connection lost")),
                },
                cmd = self.commands.recv(), if commands_open => match cmd {
                    Some(cmd) => {
                        debug!("command {cmd:?}");
                        self.session.handle_command(cmd)
                    }
                    None => {
                        commands_open = false;
                        Vec::new()
                    }
                },
                () = &mut deadline, if window_open => self.session.placement_deadline(),
                _ = clock.tick(), if clock_running => self.session.clock_tick(),
            };

            for effect in effects {
                match effect {
                    Effect::Publish(out) => self.publish(&out),
                    Effect::Notify(notice) => {
                        let _ = self.notices.send(notice);
                    }
                    Effect::ArmPlacementDeadline => deadline.as_mut().reset(Instant::now() + window),
                    Effect::StartClock => clock.reset(),
                    Effect::Relaunch => return Ok(Exit::Relaunch),
                }
            }
        }
    }

    fn route(&mut self, msg: Inbound) -> Vec<Effect> {
        match self.codec.route(&msg.topic, &msg.payload) {
            Ok(Some(event)) => self.session.handle_event(event),
            Ok(None) => {
                debug!("ignoring message on unrouted topic {}", msg.topic);
                Vec::new()
            }
            Err(e) if e.is_unknown() => {
                debug!("ignoring {} on {}", msg.payload, msg.topic);
                Vec::new()
            }
            Err(e) => {
                warn!("dropping `{}` on {}: {e}", msg.payload, msg.topic);
                Vec::new()
            }
        }
    }

    /// Queue `out` on the gateway. The write happens in the gateway task so
    /// a slow broker never stalls the session.
    fn publish(&self, out: &Outbound) {
        let msg = self.codec.encode(out);
        if let Err(e) = self.gateway.handle.send(msg) {
            error!("failed to publish {out:?}: {e}");
        }
    }
}
