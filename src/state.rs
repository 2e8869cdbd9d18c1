use crate::services::record_normalizer::NumericPolicy;
use crate::store::StorageHandle;

#[derive(Clone)]
pub struct AppState {
    pub storage: StorageHandle,
    pub numeric_policy: NumericPolicy,
}
