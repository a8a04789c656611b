pub mod migrations;
pub mod models;
pub mod nodes;
pub mod push_id;
pub mod queries;
pub mod store;
pub mod tree;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use nagarsur_types::PlatformEvent;

use crate::push_id::PushIdGenerator;

pub use store::SqliteStore;

/// Capacity of the observer channel. Observers further behind than this lag
/// and lose events; reaction feeds never do.
const EVENT_CAPACITY: usize = 1024;

/// The directory store and account directory. Every committed write is
/// published to the reaction feeds and to the observer channel.
pub struct Database {
    conn: Mutex<Connection>,
    events: broadcast::Sender<PlatformEvent>,
    feeds: Mutex<Vec<mpsc::UnboundedSender<PlatformEvent>>>,
    push_ids: PushIdGenerator,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::with_connection(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::run(&conn)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            events,
            feeds: Mutex::new(Vec::new()),
            push_ids: PushIdGenerator::new(),
        })
    }

    /// Observe committed store changes and account creations. Best effort:
    /// a slow observer skips events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events.subscribe()
    }

    /// Lossless feed of every event published after this call, in commit
    /// order. This is what drives the reactions.
    pub fn feed(&self) -> mpsc::UnboundedReceiver<PlatformEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.feeds.lock() {
            Ok(mut feeds) => feeds.push(tx),
            Err(e) => warn!("Feed registry lock poisoned: {}", e),
        }
        rx
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }

    fn publish(&self, event: PlatformEvent) {
        if let Ok(mut feeds) = self.feeds.lock() {
            // Closed feeds drop out here.
            feeds.retain(|tx| tx.send(event.clone()).is_ok());
        }
        // No observers is fine.
        let _ = self.events.send(event);
    }
}
