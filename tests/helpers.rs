#![allow(dead_code)]

use async_trait::async_trait;
use bitguess_backend::clock::Clock;
use bitguess_backend::error::RepositoryError;
use bitguess_backend::models::{ActiveGuess, Player, PlayerRecord, PlayerUpdate};
use bitguess_backend::oracle::{PriceOracle, ProviderError};
use bitguess_backend::repositories::{InMemoryPlayerStore, PlayerStore};
use bitguess_backend::services::{GuessService, PlayerService};
use bitguess_backend::AppState;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn price(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

/// Oracle returning whatever price (or failure) the test set last
pub struct ScriptedOracle {
    quote: Mutex<Result<Decimal, String>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new(initial: &str) -> Self {
        Self {
            quote: Mutex::new(Ok(price(initial))),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_price(&self, p: &str) {
        *self.quote.lock().unwrap() = Ok(price(p));
    }

    pub fn fail(&self, message: &str) {
        *self.quote.lock().unwrap() = Err(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn current_price(&self) -> Result<Decimal, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let quote = self.quote.lock().unwrap().clone();
        // Give concurrent callers a chance to interleave between read and write
        tokio::task::yield_now().await;
        quote.map_err(ProviderError::ApiError)
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Clock the test moves by hand
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        *self.now.lock().unwrap() += Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory store whose writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryPlayerStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    lose_races: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    /// Make every update look like another writer got there first
    pub fn lose_races(&self, on: bool) {
        self.lose_races.store(on, Ordering::SeqCst);
    }

    /// Successful updates so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerStore for FlakyStore {
    async fn get(&self, user_id: &str) -> Result<Option<PlayerRecord>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("injected read failure".into()));
        }
        self.inner.get(user_id).await
    }

    async fn create(&self, user_id: &str) -> Result<(PlayerRecord, bool), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("injected write failure".into()));
        }
        self.inner.create(user_id).await
    }

    async fn update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: PlayerUpdate,
    ) -> Result<PlayerRecord, RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("injected write failure".into()));
        }
        if self.lose_races.load(Ordering::SeqCst) {
            return Err(RepositoryError::VersionConflict(user_id.to_string()));
        }
        let record = self.inner.update(user_id, expected_version, update).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    fn backend_name(&self) -> &'static str {
        "flaky-memory"
    }
}

/// Everything a lifecycle test needs, wired like the real service
pub struct TestGame {
    pub store: Arc<FlakyStore>,
    pub oracle: Arc<ScriptedOracle>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

impl TestGame {
    pub fn new(initial_price: &str) -> Self {
        let store = Arc::new(FlakyStore::default());
        let oracle = Arc::new(ScriptedOracle::new(initial_price));
        let clock = Arc::new(ManualClock::new());
        let state = AppState::new(store.clone(), oracle.clone(), clock.clone());
        Self {
            store,
            oracle,
            clock,
            state,
        }
    }

    pub fn guesses(&self) -> &GuessService {
        &self.state.guess_service
    }

    pub fn players(&self) -> &PlayerService {
        &self.state.player_service
    }

    /// Seed a player with the given score and no guess
    pub async fn seed_player(&self, user_id: &str, score: i64) {
        let mut record = PlayerRecord::new(user_id);
        record.score = score;
        self.store.inner.insert(record).await;
    }

    /// Seed a player holding `guess`
    pub async fn seed_player_with_guess(&self, user_id: &str, score: i64, guess: &ActiveGuess) {
        let mut record = PlayerRecord::new(user_id);
        record.score = score;
        record.active_guess = Some(guess.encode().expect("encodable guess"));
        self.store.inner.insert(record).await;
    }

    pub async fn record(&self, user_id: &str) -> Option<PlayerRecord> {
        self.store.inner.get(user_id).await.expect("memory store read")
    }

    pub async fn player(&self, user_id: &str) -> Player {
        let record = self.record(user_id).await.expect("player exists");
        Player::try_from(record).expect("decodable player")
    }
}
