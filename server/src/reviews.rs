use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::logic::sanitize_comments;
use crate::state::{AppState, Review, SharedReview};
use crate::storage::StoreError;

pub fn new_video_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn normalize_video_id(value: &str) -> Option<String> {
    let parsed = Uuid::parse_str(value).ok()?;
    Some(parsed.to_string())
}

/// Returns the cached review, loading it from storage on first use. A video
/// that was never stored starts with an empty review.
pub async fn get_or_load_review(state: &AppState, video_id: &str) -> Result<SharedReview, StoreError> {
    if let Some(review) = state.reviews.read().await.get(video_id).cloned() {
        return Ok(review);
    }
    tracing::debug!(video_id, "loading review");
    let mut data = state.storage.load_review(video_id).await?.unwrap_or_default();
    data.comments = sanitize_comments(data.comments);
    let review = Arc::new(RwLock::new(Review::new(data)));
    let mut reviews = state.reviews.write().await;
    // A concurrent request may have loaded it first.
    let entry = reviews
        .entry(video_id.to_string())
        .or_insert_with(|| review.clone());
    Ok(entry.clone())
}

/// Writes every dirty review out. Failed saves stay dirty for the next pass.
pub async fn flush_dirty(state: &AppState) -> usize {
    let reviews = {
        let reviews = state.reviews.read().await;
        reviews
            .iter()
            .map(|(video_id, review)| (video_id.clone(), review.clone()))
            .collect::<Vec<_>>()
    };
    let mut saved = 0;
    for (video_id, review) in reviews {
        let snapshot = {
            let mut review = review.write().await;
            if !review.dirty {
                continue;
            }
            review.dirty = false;
            review.data.clone()
        };
        match state.storage.save_review(&video_id, &snapshot).await {
            Ok(()) => saved += 1,
            Err(error) => {
                tracing::error!(video_id = %video_id, %error, "failed to save review");
                review.write().await.dirty = true;
            }
        }
    }
    if saved > 0 {
        tracing::debug!(saved, "flushed reviews");
    }
    saved
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use framereview_shared::review_format::ReviewFileData;
    use framereview_shared::{Asset, NewComment, PresignedUpload, UploadRequest};

    use super::*;
    use crate::logic::create_comment;
    use crate::storage::{AssetStore, Storage};

    #[derive(Default)]
    struct MemoryStorage {
        saved: Mutex<Vec<(String, ReviewFileData)>>,
        fail_saves: bool,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn load_review(&self, video_id: &str) -> Result<Option<ReviewFileData>, StoreError> {
            let saved = self.saved.lock().unwrap();
            Ok(saved
                .iter()
                .rev()
                .find(|(id, _)| id == video_id)
                .map(|(_, data)| data.clone()))
        }

        async fn save_review(&self, video_id: &str, data: &ReviewFileData) -> Result<(), StoreError> {
            if self.fail_saves {
                return Err(StoreError::S3("offline".into()));
            }
            self.saved
                .lock()
                .unwrap()
                .push((video_id.to_string(), data.clone()));
            Ok(())
        }
    }

    struct NoAssets;

    #[async_trait]
    impl AssetStore for NoAssets {
        async fn list_assets(&self) -> Result<Vec<Asset>, StoreError> {
            Ok(Vec::new())
        }

        async fn presign_upload(&self, _request: &UploadRequest) -> Result<PresignedUpload, StoreError> {
            Err(StoreError::PresignUnsupported)
        }
    }

    fn state_with(storage: Arc<MemoryStorage>) -> AppState {
        AppState::new(storage, Arc::new(NoAssets))
    }

    #[test]
    fn video_ids_must_be_uuids() {
        let id = new_video_id();
        assert_eq!(normalize_video_id(&id), Some(id.clone()));
        assert_eq!(
            normalize_video_id(&id.to_uppercase()),
            Some(id),
            "ids are canonicalized"
        );
        assert_eq!(normalize_video_id("../etc"), None);
    }

    #[tokio::test]
    async fn reviews_are_cached_after_first_load() {
        let state = state_with(Arc::new(MemoryStorage::default()));
        let first = get_or_load_review(&state, "a").await.unwrap();
        let second = get_or_load_review(&state, "a").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn flush_saves_only_dirty_reviews() {
        let storage = Arc::new(MemoryStorage::default());
        let state = state_with(storage.clone());
        let review = get_or_load_review(&state, "a").await.unwrap();
        let _clean = get_or_load_review(&state, "b").await.unwrap();
        create_comment(&mut *review.write().await, NewComment::new(2.0, "note")).unwrap();

        assert_eq!(flush_dirty(&state).await, 1);
        assert_eq!(flush_dirty(&state).await, 0);

        let saved = storage.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, "a");
        assert_eq!(saved[0].1.comments[0].text, "note");
    }

    #[tokio::test]
    async fn failed_saves_stay_dirty() {
        let storage = Arc::new(MemoryStorage {
            fail_saves: true,
            ..MemoryStorage::default()
        });
        let state = state_with(storage);
        let review = get_or_load_review(&state, "a").await.unwrap();
        create_comment(&mut *review.write().await, NewComment::new(0.0, "note")).unwrap();

        assert_eq!(flush_dirty(&state).await, 0);
        assert!(review.read().await.dirty);
    }
}
