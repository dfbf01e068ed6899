use crate::core::loader::{self, ColumnMapping, InputConfig, InputFormat};
use crate::domain::model::Dataset;
use crate::utils::error::Result;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

const DEFAULT_CAPACITY: usize = 8;

/// Memoizes loaded datasets by upload content, so a presentation layer can
/// re-run the filter with other keywords or dates without parsing again.
pub struct LoadCache {
    inner: Mutex<CacheState>,
    capacity: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<Dataset>>,
    order: VecDeque<String>,
}

impl LoadCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    /// SHA-256 over the input settings, the column mapping and the raw bytes.
    pub fn cache_key(bytes: &[u8], input: &InputConfig, columns: &ColumnMapping) -> String {
        let mut hasher = Sha256::new();
        let format: &[u8] = match input.format.resolve(bytes) {
            InputFormat::Xlsx => b"xlsx",
            _ => b"csv",
        };
        hasher.update(format);
        hasher.update([0u8]);
        if let Some(sheet) = &input.sheet {
            hasher.update(sheet.as_bytes());
        }
        hasher.update([0u8]);
        for (_, name) in columns.as_pairs() {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub fn get_or_load(
        &self,
        bytes: &[u8],
        input: &InputConfig,
        columns: &ColumnMapping,
    ) -> Result<Arc<Dataset>> {
        let key = Self::cache_key(bytes, input, columns);
        if let Some(hit) = self.lock().entries.get(&key) {
            tracing::debug!("Load cache hit for {}", &key[..12]);
            return Ok(Arc::clone(hit));
        }

        // 解析在鎖外進行，失敗不寫入快取
        let table = loader::read_table(bytes, input)?;
        let dataset = Arc::new(loader::load_records(&table, columns)?);

        let mut state = self.lock();
        if !state.entries.contains_key(&key) {
            if state.order.len() >= self.capacity {
                if let Some(oldest) = state.order.pop_front() {
                    state.entries.remove(&oldest);
                }
            }
            state.order.push_back(key.clone());
            state.entries.insert(key, Arc::clone(&dataset));
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LoadCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
