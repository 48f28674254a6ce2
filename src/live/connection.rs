use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use futures_util::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::AppConfig;
use crate::error::FeedError;

use super::engine::LiveEngine;
use super::snapshot::{parse_message, Frame};

/// Messages from the feed thread to the app.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Snapshot(Vec<Frame>),
    Status(FeedStatus),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedStatus {
    #[default]
    Connecting,
    Connected {
        frames: usize,
        aircraft: usize,
    },
    Error(String),
    /// Terminal. The client does not reconnect.
    Disconnected,
}

impl FeedStatus {
    pub fn text(&self) -> String {
        match self {
            FeedStatus::Connecting => "Feed: Connecting...".to_string(),
            FeedStatus::Connected { frames, aircraft } => {
                format!("Feed: {} aircraft, {} frames", aircraft, frames)
            }
            FeedStatus::Error(msg) => format!("Feed: Error - {}", msg),
            FeedStatus::Disconnected => "Feed: Disconnected, restart to reconnect".to_string(),
        }
    }

    pub fn color(&self) -> Color {
        match self {
            FeedStatus::Connected { .. } => Color::srgb(0.4, 0.9, 0.5),
            FeedStatus::Connecting => Color::srgb(1.0, 0.8, 0.3),
            FeedStatus::Error(_) | FeedStatus::Disconnected => Color::srgb(1.0, 0.4, 0.4),
        }
    }
}

/// Receiving end of the feed thread.
#[derive(Resource)]
pub struct FeedChannel {
    pub receiver: Receiver<FeedEvent>,
}

/// Last status reported by the feed thread.
#[derive(Resource, Default, Debug)]
pub struct FeedState {
    pub status: FeedStatus,
    pub snapshots_received: u64,
}

/// Component to mark the feed status UI text
#[derive(Component)]
pub struct FeedStatusText;

/// Connect to `endpoint` on a background thread with its own tokio runtime.
pub fn spawn_feed_client(endpoint: String) -> Receiver<FeedEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();

    std::thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                error!("Failed to create tokio runtime for the feed client: {}", e);
                let _ = tx.send(FeedEvent::Status(FeedStatus::Error(e.to_string())));
                return;
            }
        };
        rt.block_on(run_feed_client(endpoint, tx));
    });

    rx
}

async fn run_feed_client(endpoint: String, tx: Sender<FeedEvent>) {
    info!("Connecting to snapshot feed at {}", endpoint);
    if send(&tx, FeedEvent::Status(FeedStatus::Connecting)).is_err() {
        return;
    }

    match read_feed(&endpoint, &tx).await {
        Ok(()) => info!("Snapshot feed closed"),
        Err(FeedError::Closed) => return,
        Err(e) => {
            warn!("Snapshot feed failed: {}", e);
            let _ = send(&tx, FeedEvent::Status(FeedStatus::Error(e.to_string())));
        }
    }
    let _ = send(&tx, FeedEvent::Status(FeedStatus::Disconnected));
}

async fn read_feed(endpoint: &str, tx: &Sender<FeedEvent>) -> Result<(), FeedError> {
    let (mut ws, _) = connect_async(endpoint).await?;
    info!("Connected to snapshot feed");
    send(tx, FeedEvent::Status(FeedStatus::Connected { frames: 0, aircraft: 0 }))?;

    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => match parse_message(&text) {
                Ok(frames) => {
                    let status = FeedStatus::Connected {
                        frames: frames.len(),
                        aircraft: frames.last().map(Frame::len).unwrap_or(0),
                    };
                    send(tx, FeedEvent::Snapshot(frames))?;
                    send(tx, FeedEvent::Status(status))?;
                }
                Err(e) => {
                    warn!("Malformed snapshot: {}", e);
                    send(tx, FeedEvent::Status(FeedStatus::Error(e.to_string())))?;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

fn send(tx: &Sender<FeedEvent>, event: FeedEvent) -> Result<(), FeedError> {
    tx.send(event).map_err(|_| FeedError::Closed)
}

/// Start the feed client unless a channel was provided up front.
pub fn setup_feed_client(mut commands: Commands, config: Res<AppConfig>, existing: Option<Res<FeedChannel>>) {
    commands.insert_resource(LiveEngine::from_config(&config.feed));
    if existing.is_some() {
        return;
    }
    let receiver = spawn_feed_client(config.feed.endpoint_url.clone());
    commands.insert_resource(FeedChannel { receiver });
    info!("Feed client background thread started");
}

pub fn spawn_status_text(mut commands: Commands) {
    commands.spawn((
        Text::new(FeedStatus::Connecting.text()),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(FeedStatus::Connecting.color()),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
        FeedStatusText,
    ));
}

/// Apply everything the feed thread sent since the last tick.
pub fn drain_feed_events(
    time: Res<Time>,
    channel: Option<Res<FeedChannel>>,
    engine: Option<ResMut<LiveEngine>>,
    mut state: ResMut<FeedState>,
) {
    let (Some(channel), Some(mut engine)) = (channel, engine) else {
        return;
    };
    let now_ms = time.elapsed_secs_f64() * 1000.0;

    for event in channel.receiver.try_iter() {
        match event {
            FeedEvent::Snapshot(frames) => {
                engine.apply_snapshot(frames, now_ms);
                state.snapshots_received += 1;
            }
            FeedEvent::Status(status) => {
                if status != state.status {
                    info!("{}", status.text());
                }
                state.status = status;
            }
        }
    }
}

pub fn update_feed_status_text(
    state: Res<FeedState>,
    mut status_query: Query<(&mut Text, &mut TextColor), With<FeedStatusText>>,
) {
    if !state.is_changed() {
        return;
    }
    for (mut text, mut color) in status_query.iter_mut() {
        **text = state.status.text();
        *color = TextColor(state.status.color());
    }
}
