use std::collections::HashMap;
use std::sync::Arc;

use framereview_shared::review_format::ReviewFileData;
use tokio::sync::RwLock;

use crate::storage::{AssetStore, Storage};

pub type SharedReview = Arc<RwLock<Review>>;

#[derive(Clone)]
pub struct AppState {
    pub reviews: Arc<RwLock<HashMap<String, SharedReview>>>,
    pub storage: Arc<dyn Storage>,
    pub assets: Arc<dyn AssetStore>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            reviews: Arc::new(RwLock::new(HashMap::new())),
            storage,
            assets,
        }
    }
}

/// The cached comments of one video. `dirty` is set by every mutation and
/// cleared when the flush task has written the review out.
#[derive(Default)]
pub struct Review {
    pub data: ReviewFileData,
    pub dirty: bool,
}

impl Review {
    pub fn new(data: ReviewFileData) -> Self {
        Self { data, dirty: false }
    }
}
