pub mod ws;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug)]
pub enum PushError {
    /// The peer has disconnected. The connection should be dropped from the registry.
    Gone,
    Failed(String),
}

impl std::error::Error for PushError {}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Gone => write!(f, "PushError: Connection is gone"),
            PushError::Failed(e) => write!(f, "PushError: Failed to push: {e}"),
        }
    }
}

#[async_trait]
pub trait PushConnection: Send + Sync {
    async fn push(&self, payload: &str) -> Result<(), PushError>;
}

/// Live connections keyed by connection ID. A user may hold several connections at once.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, (i32, Arc<dyn PushConnection>)>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: i32, connection: Arc<dyn PushConnection>) -> Uuid {
        let connection_id = Uuid::now_v7();
        self.write().insert(connection_id, (user_id, connection));

        log::debug!("Registered connection {connection_id} for user {user_id}");
        connection_id
    }

    pub fn unregister(&self, connection_id: Uuid) {
        if self.write().remove(&connection_id).is_some() {
            log::debug!("Unregistered connection {connection_id}");
        }
    }

    pub fn connection_count(&self) -> usize {
        self.read().len()
    }

    /// Returns the number of connections the payload reached.
    pub async fn push_to_user(&self, user_id: i32, payload: &str) -> usize {
        let targets = self.targets(|_, &owner| owner == user_id);
        self.deliver(targets, payload).await
    }

    pub async fn push_to_users(&self, user_ids: &[i32], payload: &str) -> usize {
        let targets = self.targets(|_, owner| user_ids.contains(owner));
        self.deliver(targets, payload).await
    }

    /// Pushes to every live connection other than `connection_id`.
    pub async fn broadcast_except(&self, connection_id: Uuid, payload: &str) -> usize {
        let targets = self.targets(|id, _| *id != connection_id);
        self.deliver(targets, payload).await
    }

    fn targets<F>(&self, filter: F) -> Vec<(Uuid, Arc<dyn PushConnection>)>
    where
        F: Fn(&Uuid, &i32) -> bool,
    {
        self.read()
            .iter()
            .filter(|(id, (owner, _))| filter(id, owner))
            .map(|(id, (_, connection))| (*id, Arc::clone(connection)))
            .collect()
    }

    // The lock is never held across a push
    async fn deliver(&self, targets: Vec<(Uuid, Arc<dyn PushConnection>)>, payload: &str) -> usize {
        let mut delivered = 0;

        for (connection_id, connection) in targets {
            match connection.push(payload).await {
                Ok(()) => delivered += 1,
                Err(PushError::Gone) => self.unregister(connection_id),
                Err(e) => log::warn!("Push to connection {connection_id} failed: {e}"),
            }
        }

        delivered
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, (i32, Arc<dyn PushConnection>)>> {
        self.connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, (i32, Arc<dyn PushConnection>)>> {
        self.connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingConnection {
        pub pushed: Mutex<Vec<String>>,
    }

    impl RecordingConnection {
        pub fn payloads(&self) -> Vec<serde_json::Value> {
            self.pushed
                .lock()
                .unwrap()
                .iter()
                .map(|p| serde_json::from_str(p).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl PushConnection for RecordingConnection {
        async fn push(&self, payload: &str) -> Result<(), PushError> {
            self.pushed.lock().unwrap().push(String::from(payload));
            Ok(())
        }
    }

    pub struct FailingConnection {
        pub gone: bool,
    }

    #[async_trait]
    impl PushConnection for FailingConnection {
        async fn push(&self, _payload: &str) -> Result<(), PushError> {
            if self.gone {
                Err(PushError::Gone)
            } else {
                Err(PushError::Failed(String::from("socket buffer full")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[actix_web::test]
    async fn test_push_to_user_reaches_every_connection() {
        let registry = ConnectionRegistry::new();
        let phone = Arc::new(RecordingConnection::default());
        let laptop = Arc::new(RecordingConnection::default());
        let other = Arc::new(RecordingConnection::default());

        registry.register(1, phone.clone());
        registry.register(1, laptop.clone());
        registry.register(2, other.clone());

        assert_eq!(registry.push_to_user(1, r#"{"n":1}"#).await, 2);
        assert_eq!(registry.push_to_user(3, r#"{"n":2}"#).await, 0);

        assert_eq!(phone.pushed.lock().unwrap().as_slice(), [r#"{"n":1}"#]);
        assert_eq!(laptop.pushed.lock().unwrap().len(), 1);
        assert!(other.pushed.lock().unwrap().is_empty());

        assert_eq!(registry.push_to_users(&[1, 2], "{}").await, 3);
    }

    #[actix_web::test]
    async fn test_broadcast_skips_origin() {
        let registry = ConnectionRegistry::new();
        let origin = Arc::new(RecordingConnection::default());
        let peer = Arc::new(RecordingConnection::default());

        let origin_id = registry.register(1, origin.clone());
        registry.register(2, peer.clone());

        assert_eq!(registry.broadcast_except(origin_id, "hello").await, 1);
        assert!(origin.pushed.lock().unwrap().is_empty());
        assert_eq!(peer.pushed.lock().unwrap().as_slice(), ["hello"]);
    }

    #[actix_web::test]
    async fn test_failed_pushes() {
        let registry = ConnectionRegistry::new();
        let live = Arc::new(RecordingConnection::default());

        registry.register(1, live.clone());
        registry.register(1, Arc::new(FailingConnection { gone: true }));
        registry.register(1, Arc::new(FailingConnection { gone: false }));
        assert_eq!(registry.connection_count(), 3);

        assert_eq!(registry.push_to_user(1, "first").await, 1);
        assert_eq!(registry.connection_count(), 2);

        assert_eq!(registry.push_to_user(1, "second").await, 1);
        assert_eq!(registry.connection_count(), 2);
        assert_eq!(live.pushed.lock().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_unregister() {
        let registry = ConnectionRegistry::new();
        let connection = Arc::new(RecordingConnection::default());

        let connection_id = registry.register(7, connection.clone());
        registry.unregister(connection_id);
        registry.unregister(connection_id);

        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.push_to_user(7, "nobody home").await, 0);
        assert!(connection.pushed.lock().unwrap().is_empty());
    }
}
