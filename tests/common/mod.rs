//! Shared test doubles: in-memory stores and scripted probes so scheduler
//! behavior is observable without a Redis or a network.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use credpool::cookie::{CookieJar, CookieValidator, CredentialStore, LoginDriver, LoginState};
use credpool::proxy::{CandidateSource, LivenessProbe, ScoredIndex, MAX_SCORE, MIN_SCORE};
use credpool::StoreError;

// ─── ScoredIndex ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryIndex {
    entries: Mutex<HashMap<String, f64>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[(&str, f64)]) -> Self {
        let index = Self::new();
        {
            let mut map = index.lock();
            for (candidate, score) in entries {
                map.insert(candidate.to_string(), *score);
            }
        }
        index
    }

    pub fn score_of(&self, candidate: &str) -> Option<f64> {
        self.lock().get(candidate).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, f64>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ScoredIndex for MemoryIndex {
    async fn add(&self, candidate: &str, score: f64) -> Result<(), StoreError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(StoreError::OutOfRange(score));
        }
        self.lock().entry(candidate.to_string()).or_insert(score);
        Ok(())
    }

    async fn set_max(&self, candidate: &str) -> Result<(), StoreError> {
        self.lock().insert(candidate.to_string(), MAX_SCORE);
        Ok(())
    }

    async fn decrement(&self, candidate: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let Some(score) = entries.get(candidate).copied() else {
            return Err(StoreError::NotFound(candidate.to_string()));
        };
        if score > MIN_SCORE + 1.0 {
            entries.insert(candidate.to_string(), score - 1.0);
        } else {
            entries.remove(candidate);
        }
        Ok(())
    }

    async fn exists(&self, candidate: &str) -> Result<bool, StoreError> {
        Ok(self.lock().contains_key(candidate))
    }

    async fn random_top(&self) -> Result<String, StoreError> {
        let entries = self.lock();
        let pinned: Vec<&String> = entries
            .iter()
            .filter(|(_, score)| **score == MAX_SCORE)
            .map(|(candidate, _)| candidate)
            .collect();
        if let Some(candidate) = pinned.first() {
            return Ok((*candidate).clone());
        }
        let mut best: Vec<(&String, f64)> = entries
            .iter()
            .map(|(candidate, score)| (candidate, *score))
            .collect();
        best.sort_by(|a, b| b.1.total_cmp(&a.1));
        best.truncate(100);
        best.first()
            .map(|(candidate, _)| (*candidate).clone())
            .ok_or_else(|| StoreError::Empty("memory".to_string()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.lock().len() as u64)
    }

    async fn get_all(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn remove(&self, candidates: &[String]) -> Result<(), StoreError> {
        let mut entries = self.lock();
        for candidate in candidates {
            entries.remove(candidate);
        }
        Ok(())
    }
}

// ─── LivenessProbe ──────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub enum ProbePlan {
    Alive,
    Dead,
    Error,
}

pub struct ScriptedProbe {
    plans: HashMap<String, ProbePlan>,
    fallback: ProbePlan,
    pub delay: Duration,
}

impl ScriptedProbe {
    pub fn new(fallback: ProbePlan) -> Self {
        Self {
            plans: HashMap::new(),
            fallback,
            delay: Duration::ZERO,
        }
    }

    pub fn plan(mut self, candidate: &str, plan: ProbePlan) -> Self {
        self.plans.insert(candidate.to_string(), plan);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn probe_proxy(&self, candidate: &str) -> anyhow::Result<bool> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.plans.get(candidate).copied().unwrap_or(self.fallback) {
            ProbePlan::Alive => Ok(true),
            ProbePlan::Dead => Ok(false),
            ProbePlan::Error => anyhow::bail!("connection refused"),
        }
    }

    async fn network_up(&self) -> bool {
        true
    }
}

// ─── CandidateSource ────────────────────────────────────────────────────────

pub struct RecordingSource {
    pub started: AtomicBool,
    pub stopped: AtomicBool,
    candidates: Vec<String>,
}

impl RecordingSource {
    pub fn new(candidates: &[&str]) -> Self {
        Self {
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSource for RecordingSource {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn start(&self) -> Option<mpsc::Receiver<String>> {
        self.started.store(true, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(5);
        let candidates = self.candidates.clone();
        tokio::spawn(async move {
            for candidate in candidates {
                if tx.send(candidate).await.is_err() {
                    return;
                }
            }
        });
        Some(rx)
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

// ─── CredentialStore ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: Mutex<HashMap<String, String>>,
    cookies: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: &[(&str, &str)]) -> Self {
        let store = Self::new();
        {
            let mut map = store.accounts.lock().unwrap();
            for (user, secret) in accounts {
                map.insert(user.to_string(), secret.to_string());
            }
        }
        store
    }

    pub fn seed_cookie(&self, user: &str, jar_json: &str) {
        self.cookies
            .lock()
            .unwrap()
            .insert(user.to_string(), jar_json.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn set_account(&self, user: &str, secret: &str) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .insert(user.to_string(), secret.to_string());
        Ok(())
    }

    async fn get_account(&self, user: &str) -> Result<String, StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user.to_string()))
    }

    async fn delete_accounts(&self, users: &[String]) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        for user in users {
            accounts.remove(user);
        }
        Ok(())
    }

    async fn count_accounts(&self) -> Result<u64, StoreError> {
        Ok(self.accounts.lock().unwrap().len() as u64)
    }

    async fn all_accounts(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn usernames(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.accounts.lock().unwrap().keys().cloned().collect())
    }

    async fn set_cookie(&self, user: &str, jar_json: &str) -> Result<(), StoreError> {
        self.cookies
            .lock()
            .unwrap()
            .insert(user.to_string(), jar_json.to_string());
        Ok(())
    }

    async fn get_cookie(&self, user: &str) -> Result<String, StoreError> {
        self.cookies
            .lock()
            .unwrap()
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user.to_string()))
    }

    async fn delete_cookies(&self, users: &[String]) -> Result<(), StoreError> {
        let mut cookies = self.cookies.lock().unwrap();
        for user in users {
            cookies.remove(user);
        }
        Ok(())
    }

    async fn count_cookies(&self) -> Result<u64, StoreError> {
        Ok(self.cookies.lock().unwrap().len() as u64)
    }

    async fn all_cookies(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.cookies.lock().unwrap().clone())
    }

    async fn random_cookie(&self) -> Result<String, StoreError> {
        self.cookies
            .lock()
            .unwrap()
            .values()
            .next()
            .cloned()
            .ok_or_else(|| StoreError::Empty("memory".to_string()))
    }
}

// ─── LoginDriver / CookieValidator ──────────────────────────────────────────

pub struct ScriptedLogin {
    pub outcome: LoginState,
}

#[async_trait]
impl LoginDriver for ScriptedLogin {
    async fn login(&self, _user: &str, _secret: &str) -> LoginState {
        self.outcome.clone()
    }
}

pub struct ScriptedValidator {
    pub alive: bool,
}

#[async_trait]
impl CookieValidator for ScriptedValidator {
    async fn validate(&self, _url: &str, _jar: &CookieJar, _expected: u16) -> anyhow::Result<bool> {
        Ok(self.alive)
    }
}
