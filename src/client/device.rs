use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use crate::error::Result;

/// Where the device keeps its own share.
#[async_trait]
pub trait DeviceShareStore: Send + Sync {
    async fn save(&self, account: &str, share: &[u8]) -> Result<()>;
    async fn load(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>>;
    async fn remove(&self, account: &str) -> Result<()>;
}

/// Device store held in process memory.
#[derive(Default)]
pub struct MemoryDeviceStore {
    shares: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceShareStore for MemoryDeviceStore {
    async fn save(&self, account: &str, share: &[u8]) -> Result<()> {
        self.shares
            .write()
            .await
            .insert(account.to_string(), Zeroizing::new(share.to_vec()));
        Ok(())
    }

    async fn load(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        Ok(self.shares.read().await.get(account).cloned())
    }

    async fn remove(&self, account: &str) -> Result<()> {
        self.shares.write().await.remove(account);
        Ok(())
    }
}
