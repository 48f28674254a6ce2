use bevy::prelude::*;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::AppConfig;
use crate::error::FeedError;
use crate::live::Observation;

use super::demo::DemoTraffic;
use super::opensky::OpenSkyClient;
use super::store::FrameStore;

pub type SharedStore = Arc<RwLock<FrameStore>>;

/// Produces one frame per poll, from OpenSky until it fails too often,
/// then from demo traffic for the rest of the run.
pub struct Poller {
    upstream: Option<OpenSkyClient>,
    demo: Option<DemoTraffic>,
    failures: u32,
    max_failures: u32,
    demo_flights: usize,
    seed: Option<u64>,
}

impl Poller {
    pub fn new(config: &AppConfig, force_demo: bool, now_ms: f64) -> Result<Self, FeedError> {
        let mut poller = Self {
            upstream: None,
            demo: None,
            failures: 0,
            max_failures: config.server.max_failures.max(1),
            demo_flights: config.server.demo_flights,
            seed: config.simulation.seed,
        };
        if force_demo {
            poller.switch_to_demo(now_ms);
        } else {
            poller.upstream = Some(OpenSkyClient::new(
                config.server.opensky_url.clone(),
                config.map.bounds,
                Duration::from_secs(config.server.request_timeout_secs),
            )?);
        }
        Ok(poller)
    }

    pub fn is_demo(&self) -> bool {
        self.demo.is_some()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn switch_to_demo(&mut self, now_ms: f64) {
        self.upstream = None;
        self.demo = Some(DemoTraffic::new(self.demo_flights, now_ms, self.seed));
    }

    /// Count an upstream failure. Returns `true` when this one tipped the
    /// poller into demo mode.
    pub fn record_failure(&mut self, err: &FeedError, now_ms: f64) -> bool {
        self.failures += 1;
        warn!("Upstream poll failed ({}/{}): {}", self.failures, self.max_failures, err);
        if self.failures >= self.max_failures && !self.is_demo() {
            warn!("Switching to demo traffic after repeated failures");
            self.switch_to_demo(now_ms);
            return true;
        }
        false
    }

    /// Demo traffic to serve before the first poll lands, so early clients
    /// see aircraft straight away. Upstream mode draws it from a throwaway
    /// fleet that the first real frame supersedes.
    pub fn startup_frame(&mut self, now_ms: f64) -> Vec<Observation> {
        match self.demo.as_mut() {
            Some(demo) => demo.step(now_ms),
            None => DemoTraffic::new(self.demo_flights, now_ms, self.seed).step(now_ms),
        }
    }

    /// Observations for this poll, or `None` when the upstream failed and
    /// there is nothing to store.
    pub async fn poll(&mut self, now_ms: f64) -> Option<Vec<Observation>> {
        if let Some(upstream) = &self.upstream {
            match upstream.fetch().await {
                Ok(observations) => {
                    self.failures = 0;
                    return Some(observations);
                }
                Err(e) => {
                    if !self.record_failure(&e, now_ms) {
                        return None;
                    }
                }
            }
        }
        self.demo.as_mut().map(|demo| demo.step(now_ms))
    }
}

async fn poll_loop(mut poller: Poller, store: SharedStore, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let now = chrono::Utc::now();
        let now_ms = now.timestamp_millis() as f64;

        if let Some(observations) = poller.poll(now_ms).await {
            let count = observations.len();
            let mut store = store.write().await;
            store.insert(now.timestamp(), observations);
            let pruned = store.prune(now.timestamp());
            info!(
                "Stored {} aircraft @ {}, {} frames in memory{}",
                count,
                now.format("%H:%M:%S"),
                store.len(),
                if poller.is_demo() { " (demo)" } else { "" }
            );
            if pruned > 0 {
                debug!("Pruned {} frames", pruned);
            }
        }
    }
}

/// Send the whole store on connect and again every interval until the
/// client goes away.
async fn serve_client(stream: TcpStream, peer: SocketAddr, store: SharedStore, interval: Duration) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Websocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    info!("Client {} connected", peer);

    let (mut sink, mut incoming) = ws.split();
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let payload = {
                    let store = store.read().await;
                    debug!("Sending {} frames with {} positions to {}", store.len(), store.position_count(), peer);
                    store.encode()
                };
                match payload {
                    Ok(text) => {
                        if let Err(e) = sink.send(Message::text(text)).await {
                            debug!("Send to {} failed: {}", peer, e);
                            break;
                        }
                    }
                    Err(e) => error!("Failed to encode snapshot: {}", e),
                }
            }
            message = incoming.next() => match message {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    }

    info!("Client {} disconnected", peer);
}

/// Run the snapshot feed until the listener fails.
pub async fn run(config: AppConfig, force_demo: bool) -> Result<(), FeedError> {
    let interval = config.feed.poll_interval();
    let store: SharedStore = Arc::new(RwLock::new(FrameStore::new(config.feed.history_window_secs)));

    let now = chrono::Utc::now();
    let now_ms = now.timestamp_millis() as f64;
    let mut poller = Poller::new(&config, force_demo, now_ms)?;

    let initial = poller.startup_frame(now_ms);
    info!("Generated {} initial demo flights", initial.len());
    store.write().await.insert(now.timestamp(), initial);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    info!("Snapshot feed running at ws://{}", listener.local_addr()?);
    info!(
        "Tracking {:?}, keeping {} minutes of history, polling every {}s",
        config.map.bounds,
        config.feed.history_window_secs / 60,
        interval.as_secs()
    );

    tokio::spawn(poll_loop(poller, Arc::clone(&store), interval));

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(serve_client(stream, peer, Arc::clone(&store), interval));
            }
            Err(e) => warn!("Accept error: {}", e),
        }
    }
}
