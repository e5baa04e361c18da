//! In-memory `Transport` for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use orchestrator_core::{Error, Recipient, Result, Transport, TransportEvent};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

struct Room {
    sender: mpsc::UnboundedSender<TransportEvent>,
}

/// Rooms live only as long as the process; `send_app_message` delivers
/// synchronously to every subscriber of the same room. Useful for driving
/// the pipeline in tests without a real gateway.
#[derive(Default)]
pub struct InMemoryTransport {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
    next_id: std::sync::atomic::AtomicU64,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), next_id: std::sync::atomic::AtomicU64::new(0) }
    }

    /// Test/dev helper: inject an event as if it arrived from the edge.
    pub fn emit(&self, room_url: &str, event: TransportEvent) -> Result<()> {
        let rooms = self.rooms.read();
        let room = rooms.get(room_url).ok_or_else(|| Error::UnknownRoom(room_url.to_string()))?;
        room.sender.send(event).map_err(|_| Error::TransportLost(room_url.to_string()))
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn create_room(&self) -> Result<(String, String)> {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let room_url = format!("mem://room/{id}");
        let bot_token = format!("mem-token-{id}");

        let (tx, rx) = mpsc::unbounded_channel();
        self.rooms.write().insert(room_url.clone(), Room { sender: tx });
        drop(rx); // replaced by a fresh channel on each subscribe()

        Ok((room_url, bot_token))
    }

    async fn destroy_room(&self, room_url: &str) -> Result<()> {
        self.rooms.write().remove(room_url);
        Ok(())
    }

    async fn send_app_message(
        &self,
        room_url: &str,
        payload: Vec<u8>,
        _recipient: Recipient,
    ) -> Result<()> {
        self.emit(room_url, TransportEvent::AppMessage { from: "orchestrator".to_string(), payload })
    }

    async fn subscribe(&self, room_url: &str) -> Result<BoxStream<'static, TransportEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut rooms = self.rooms.write();
        let room = rooms.get_mut(room_url).ok_or_else(|| Error::UnknownRoom(room_url.to_string()))?;
        room.sender = tx;
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}
