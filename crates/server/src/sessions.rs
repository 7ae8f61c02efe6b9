//! Per-user browsing state kept in memory for the lifetime of the process.

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Last book each user selected from the catalog.
#[derive(Debug, Default)]
pub struct Sessions {
    last_viewed: RwLock<HashMap<String, i32>>,
}

impl Sessions {
    pub async fn last_viewed(&self, username: &str) -> Option<i32> {
        self.last_viewed.read().await.get(username).copied()
    }

    pub async fn set_last_viewed(&self, username: &str, book_id: i32) {
        self.last_viewed
            .write()
            .await
            .insert(username.to_string(), book_id);
    }

    /// Forget everything about `username`.
    pub async fn clear(&self, username: &str) {
        self.last_viewed.write().await.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_viewed_is_per_user_and_cleared_on_logout() {
        let sessions = Sessions::default();
        sessions.set_last_viewed("alice", 3).await;
        sessions.set_last_viewed("alice", 5).await;
        sessions.set_last_viewed("bob", 1).await;

        assert_eq!(sessions.last_viewed("alice").await, Some(5));
        sessions.clear("alice").await;
        assert_eq!(sessions.last_viewed("alice").await, None);
        assert_eq!(sessions.last_viewed("bob").await, Some(1));
    }
}
