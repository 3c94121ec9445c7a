//! Online/offline signal shared between the host and the orchestrator.

use std::{sync::Arc, time::Duration};

use reqwest::Client;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};
use url::Url;

/// Writer side of the connectivity signal.
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn watch(&self) -> ConnectivityWatch {
        ConnectivityWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Publish a new reading; observers only wake on an actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }
}

/// Reader side of the connectivity signal.
#[derive(Debug, Clone)]
pub struct ConnectivityWatch {
    rx: watch::Receiver<bool>,
}

impl ConnectivityWatch {
    /// A watch that reports online forever.
    pub fn always_online() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next change. `None` once the signal is gone.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Any HTTP answer counts as online; only transport failures count as offline.
pub async fn probe_once(client: &Client, url: &Url) -> bool {
    match client.head(url.clone()).send().await {
        Ok(response) => {
            debug!(status = %response.status(), "connectivity probe answered");
            true
        }
        Err(err) => {
            debug!(error = %err, "connectivity probe failed");
            false
        }
    }
}

/// Poll `url` every `every` and feed the readings into `signal`.
///
/// The task ends once no [`ConnectivityWatch`] is left to observe it.
pub fn spawn_probe(
    signal: ConnectivitySignal,
    client: Client,
    url: Url,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if signal.tx.is_closed() {
                debug!("connectivity probe stopped; no observers left");
                break;
            }
            let online = probe_once(&client, &url).await;
            signal.set_online(online);
        }
    })
}
