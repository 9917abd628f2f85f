use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use bevy::app::AppExit;
use bevy::prelude::*;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, trace, warn};

use veil_core::{
    build_headless_app, run_tick, toggle_selected, unload, CenterHtmlMessage, HeldItems,
    MapStarted, PlayerController, PlayerHost, PlayerPawn, RenderColor, RevealEvent, RoundRules,
    ServerClock, SpottedState, TransmitFrame, VeilConfigHandle, VeilConfigMetadata, VeilMetrics,
    VisibilityRegistry,
};
use veil_runtime::{parse_host_command, HostCommand, TeamSide};

const DEFAULT_COMMAND_BIND: &str = "127.0.0.1:41001";
const DEFAULT_TICK_HZ: f32 = 64.0;
const ITEMS_PER_PAWN: usize = 2;
const ROUND_RESTART_DELAY: f32 = 3.0;

/// A line from a connected client together with the socket to reply on.
struct Request {
    line: String,
    reply: Option<TcpStream>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bind = std::env::var("VEIL_COMMAND_BIND")
        .ok()
        .and_then(|value| value.parse::<SocketAddr>().ok())
        .unwrap_or_else(|| {
            DEFAULT_COMMAND_BIND
                .parse()
                .unwrap_or(SocketAddr::from(([127, 0, 0, 1], 41001)))
        });
    let tick_hz = std::env::var("VEIL_TICK_HZ")
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .filter(|hz| *hz > 0.0)
        .unwrap_or(DEFAULT_TICK_HZ);

    let command_rx = match spawn_command_listener(bind) {
        Ok(rx) => rx,
        Err(err) => {
            warn!(target: "veil::host", %bind, error = %err, "host.bind_failed");
            return;
        }
    };

    let mut app = build_headless_app();
    app.add_systems(Update, log_center_messages);
    let mut host = DemoHost::default();
    host.start_map(&mut app, "de_dust2");

    let config_source = app
        .world
        .resource::<VeilConfigMetadata>()
        .path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "builtin".to_string());
    let dormant = app.world.resource::<VeilConfigHandle>().0.dormant_visibility;
    info!(
        target: "veil::host",
        %bind,
        tick_hz,
        config = %config_source,
        ?dormant,
        "Veil demo host ready"
    );

    let tick = Duration::from_secs_f32(1.0 / tick_hz);
    let mut deadline = Instant::now() + tick;
    let mut ticks: u64 = 0;
    loop {
        match command_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(request) => {
                if !host.handle(&mut app, request) {
                    break;
                }
                continue;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        host.fill_transmit_frame(&mut app.world);
        run_tick(&mut app, tick.as_secs_f32());
        ticks += 1;
        host.log_frame(&app.world, ticks, tick_hz as u64);
        deadline += tick;
    }

    app.world.send_event(AppExit);
    app.update();
    let restored = unload(&mut app.world);
    info!(target: "veil::host", restored, "Veil demo host stopped");
}

#[derive(Default)]
struct DemoHost {
    next_user_id: u32,
    players: HashMap<u32, Entity>,
}

impl DemoHost {
    /// Returns `false` once the host should stop.
    fn handle(&mut self, app: &mut App, request: Request) -> bool {
        let (reply, keep_running) = match parse_host_command(&request.line) {
            Ok(HostCommand::Quit) => ("bye".to_string(), false),
            Ok(command) => (self.apply(app, command), true),
            Err(err) => (err.to_string(), true),
        };
        if let Some(mut stream) = request.reply {
            if let Err(err) = writeln!(stream, "{reply}") {
                debug!(target: "veil::host", error = %err, "host.reply_failed");
            }
        }
        keep_running
    }

    fn apply(&mut self, app: &mut App, command: HostCommand) -> String {
        match command {
            HostCommand::Join { name, side } => {
                let user_id = self.join(&mut app.world, &name, side);
                info!(target: "veil::host", user_id, %name, %side, "command.applied=join");
                format!("joined #{user_id} {name} ({side})")
            }
            HostCommand::Leave { user_id } => {
                if self.leave(&mut app.world, user_id) {
                    info!(target: "veil::host", user_id, "command.applied=leave");
                    format!("#{user_id} left")
                } else {
                    format!("no player #{user_id}")
                }
            }
            HostCommand::Invis { target } => {
                match toggle_selected(&mut app.world, None, &target) {
                    Ok(summary) => summary.feedback(),
                    Err(err) => err.to_string(),
                }
            }
            HostCommand::Act { user_id, action } => match self.players.get(&user_id) {
                Some(player) => {
                    app.world.send_event(RevealEvent::new(*player, action));
                    format!("#{user_id} {}", action.label())
                }
                None => format!("no player #{user_id}"),
            },
            HostCommand::Map { name } => {
                self.start_map(app, &name);
                format!("map {name}")
            }
            HostCommand::Quit => "bye".to_string(),
        }
    }

    fn join(&mut self, world: &mut World, name: &str, side: TeamSide) -> u32 {
        self.next_user_id += 1;
        let user_id = self.next_user_id;
        let items: Vec<Entity> = (0..ITEMS_PER_PAWN)
            .map(|_| world.spawn(RenderColor::WHITE).id())
            .collect();
        let controller = world.spawn_empty().id();
        let pawn = world
            .spawn((
                PlayerPawn { controller },
                HeldItems(items),
                RenderColor::WHITE,
                SpottedState::default(),
            ))
            .id();
        world.entity_mut(controller).insert(PlayerController {
            user_id,
            name: name.to_string(),
            side: Some(side),
            pawn: Some(pawn),
        });
        self.players.insert(user_id, controller);
        user_id
    }

    fn leave(&mut self, world: &mut World, user_id: u32) -> bool {
        let Some(controller) = self.players.remove(&user_id) else {
            return false;
        };
        if let Some(pawn) = world.pawn_of(controller) {
            for item in world.held_items(pawn) {
                world.despawn(item);
            }
            world.despawn(pawn);
        }
        world.despawn(controller);
        true
    }

    fn start_map(&mut self, app: &mut App, name: &str) {
        let mut rules = app.world.query_filtered::<Entity, With<RoundRules>>();
        let stale: Vec<Entity> = rules.iter(&app.world).collect();
        for entity in stale {
            app.world.despawn(entity);
        }
        let now = app.world.resource::<ServerClock>().now;
        app.world.spawn(RoundRules {
            restart_round_time: now + ROUND_RESTART_DELAY,
            game_restart: false,
        });
        app.world.send_event(MapStarted {
            name: name.to_string(),
        });
    }

    /// Every valid receiver is offered every pawn and held item.
    fn fill_transmit_frame(&self, world: &mut World) {
        let mut everything = Vec::new();
        let mut receivers = Vec::new();
        for controller in self.players.values() {
            let Some(pawn) = world.pawn_of(*controller) else {
                continue;
            };
            receivers.push(*controller);
            everything.push(pawn);
            everything.extend(world.held_items(pawn));
        }
        let mut frame = world.resource_mut::<TransmitFrame>();
        frame.clear();
        for receiver in receivers {
            frame.push(receiver, everything.iter().copied());
        }
    }

    fn log_frame(&self, world: &World, ticks: u64, every: u64) {
        let frame = world.resource::<TransmitFrame>();
        for info in &frame.infos {
            trace!(
                target: "veil::host",
                receiver = ?info.receiver,
                visible = info.entities.len(),
                "transmit.frame"
            );
        }
        if every == 0 || ticks % every != 0 {
            return;
        }
        let metrics = world.resource::<VeilMetrics>();
        info!(
            target: "veil::host",
            ticks,
            players = self.players.len(),
            managed = world.resource::<VisibilityRegistry>().len(),
            fully_hidden = metrics.fully_hidden,
            hidden_from_t = metrics.hidden_from_terrorists,
            hidden_from_ct = metrics.hidden_from_counter_terrorists,
            reveals_total = metrics.reveals_total,
            purged_total = metrics.purged_total,
            withheld_total = metrics.withheld_total,
            "metrics"
        );
    }
}

fn log_center_messages(mut messages: EventReader<CenterHtmlMessage>) {
    for message in messages.read() {
        trace!(
            target: "veil::host",
            recipient = ?message.recipient,
            html = %message.html,
            "hud.center_html"
        );
    }
}

fn spawn_command_listener(bind_addr: SocketAddr) -> io::Result<Receiver<Request>> {
    let listener = TcpListener::bind(bind_addr)?;
    listener.set_nonblocking(true)?;

    let (sender, receiver) = unbounded::<Request>();
    thread::spawn(move || loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                info!(target: "veil::host", %addr, "Command client connected");
                let sender = sender.clone();
                thread::spawn(move || handle_client(stream, sender));
            }
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                warn!(target: "veil::host", error = %err, "Error accepting command client");
                thread::sleep(Duration::from_millis(200));
            }
        }
    });

    Ok(receiver)
}

fn handle_client(stream: TcpStream, sender: Sender<Request>) {
    if let Err(err) = stream.set_nonblocking(false) {
        warn!(target: "veil::host", error = %err, "host.client_setup_failed");
        return;
    }
    let reply = stream.try_clone().ok();
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let request = Request {
                    line: trimmed.to_string(),
                    reply: reply.as_ref().and_then(|stream| stream.try_clone().ok()),
                };
                if sender.send(request).is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!(target: "veil::host", error = %err, "Command client error");
                break;
            }
        }
    }
}
