use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::message::PageMessage;

pub type ClientId = u64;

#[derive(Debug)]
struct Client {
    id: ClientId,
    url: String,
    controlled: bool,
    focused: bool,
    tx: mpsc::UnboundedSender<PageMessage>,
}

/// Open page instances the worker can reach.
#[derive(Debug, Default)]
pub struct Clients {
    next_id: AtomicU64,
    clients: Mutex<Vec<Client>>,
    /// URLs opened by notification clicks.
    opened: Mutex<Vec<String>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, url: &str) -> (ClientId, mpsc::UnboundedReceiver<PageMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut clients) = self.clients.lock() {
            clients.push(Client {
                id,
                url: url.to_string(),
                controlled: false,
                focused: false,
                tx,
            });
        }
        (id, rx)
    }

    /// Take control of every open page; returns how many were claimed.
    pub fn claim(&self) -> usize {
        let Ok(mut clients) = self.clients.lock() else {
            return 0;
        };
        for c in clients.iter_mut() {
            c.controlled = true;
        }
        clients.len()
    }

    pub fn is_controlled(&self, id: ClientId) -> bool {
        self.clients
            .lock()
            .map(|c| c.iter().any(|c| c.id == id && c.controlled))
            .unwrap_or(false)
    }

    /// Sends to every open page, dropping the ones whose receiver is gone.
    /// Returns the number of pages reached.
    pub fn broadcast(&self, msg: &PageMessage) -> usize {
        let Ok(mut clients) = self.clients.lock() else {
            return 0;
        };
        clients.retain(|c| c.tx.send(msg.clone()).is_ok());
        clients.len()
    }

    /// Focuses the first page at `url`, if any.
    pub fn focus(&self, url: &str) -> Option<ClientId> {
        let mut clients = self.clients.lock().ok()?;
        let target = clients.iter_mut().find(|c| c.url == url)?;
        target.focused = true;
        Some(target.id)
    }

    pub fn is_focused(&self, id: ClientId) -> bool {
        self.clients
            .lock()
            .map(|c| c.iter().any(|c| c.id == id && c.focused))
            .unwrap_or(false)
    }

    pub fn open_window(&self, url: &str) {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
    }

    pub fn opened_windows(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
