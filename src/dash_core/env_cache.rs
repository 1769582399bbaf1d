use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    NotStarted,
    InFlight,
    Loaded,
    Failed,
}

/// Cache of the variable names known to the dashboard backend.
///
/// All reference-aware inputs read from the one instance owned by the app
/// state; they get immutable `Arc` views, so the set is only ever replaced
/// wholesale and readers never observe a partial update.
///
/// Fetching is single-flight: `ensure_loaded` hands out a ticket only when
/// nothing is loaded or in flight, and every ticket carries a generation.
/// `resolve` drops answers whose generation was superseded, so a forced
/// reload can never be overwritten by the late answer of an earlier fetch.
#[derive(Default)]
pub struct EnvKeyCache {
    state: FetchState,
    keys: Arc<Vec<String>>,
    generation: u64,
}

impl EnvKeyCache {
    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Read-only snapshot handed to inputs.
    pub fn view(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.keys)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys.binary_search_by(|k| k.as_str().cmp(name)).is_ok()
    }

    /// Request a fetch unless one is loaded or already in flight.
    /// Returns the ticket the caller must spawn a fetch for, if any.
    /// A failed cache hands out a fresh ticket: failure is retryable.
    pub fn ensure_loaded(&mut self) -> Option<u64> {
        match self.state {
            FetchState::Loaded | FetchState::InFlight => None,
            FetchState::NotStarted | FetchState::Failed => Some(self.begin()),
        }
    }

    /// Unconditionally start a new fetch; any in-flight answer becomes stale.
    pub fn force_reload(&mut self) -> u64 {
        self.begin()
    }

    fn begin(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.state = FetchState::InFlight;
        self.generation
    }

    /// Install a fetch result. Returns false when the ticket was superseded
    /// (the answer is dropped without touching the set).
    pub fn resolve(&mut self, generation: u64, outcome: Result<Vec<String>, String>) -> bool {
        if generation != self.generation {
            return false;
        }
        match outcome {
            Ok(mut keys) => {
                keys.sort();
                keys.dedup();
                self.keys = Arc::new(keys);
                self.state = FetchState::Loaded;
            }
            Err(_) => {
                self.keys = Arc::new(Vec::new());
                self.state = FetchState::Failed;
            }
        }
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
