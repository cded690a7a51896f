use std::sync::Arc;

use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }
}
