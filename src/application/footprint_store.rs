// Persistence trait for saved footprint results
use crate::domain::footprint::FootprintRecord;
use async_trait::async_trait;

#[async_trait]
pub trait FootprintStore: Send + Sync {
    /// Persist a record. The store assigns `id` and `created_at`.
    async fn save(&self, record: FootprintRecord) -> anyhow::Result<FootprintRecord>;

    /// Every record saved by `user_id`, in no particular order
    async fn list_for_user(&self, user_id: &str) -> anyhow::Result<Vec<FootprintRecord>>;
}
