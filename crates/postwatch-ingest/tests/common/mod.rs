#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use postwatch_core::{NormalizedPost, TrackedAccount};
use postwatch_ingest::{
    AccountRegistry, CycleJournal, CycleSummary, IngestError, PostStore, PreviewResolver,
    Timeline, TimelineSource,
};
use tokio_util::sync::CancellationToken;

pub fn account(id: i64, external_id: &str) -> TrackedAccount {
    TrackedAccount {
        id,
        external_id: external_id.to_string(),
        display_name: format!("Account {id}"),
        handle: format!("account{id}"),
    }
}

pub fn post(id: &str) -> NormalizedPost {
    NormalizedPost {
        external_post_id: id.to_string(),
        text: format!("post {id}"),
        media_url: None,
        link_url: None,
        like_count: 1,
        share_count: 0,
        reply_count: 0,
        posted_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

pub fn post_with_link(id: &str, link: &str) -> NormalizedPost {
    NormalizedPost {
        link_url: Some(link.to_string()),
        ..post(id)
    }
}

pub fn post_with_media(id: &str, media: &str, link: Option<&str>) -> NormalizedPost {
    NormalizedPost {
        media_url: Some(media.to_string()),
        link_url: link.map(str::to_string),
        ..post(id)
    }
}

fn storage_error(message: &str) -> IngestError {
    IngestError::InvalidRequest(message.to_string())
}

/// In-memory store enforcing the `(account_id, external_post_id)` unique key
/// with all-or-nothing batch writes.
#[derive(Default)]
pub struct MemoryStore {
    accounts: Mutex<Vec<TrackedAccount>>,
    posts: Mutex<HashMap<i64, Vec<NormalizedPost>>>,
    cycles: Mutex<Vec<CycleSummary>>,
    fail_registry: Mutex<bool>,
    fail_inserts: Mutex<bool>,
    pub known_lookups: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_accounts(accounts: Vec<TrackedAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            ..Self::default()
        }
    }

    pub fn seed_posts(&self, account_id: i64, posts: Vec<NormalizedPost>) {
        self.posts
            .lock()
            .unwrap()
            .entry(account_id)
            .or_default()
            .extend(posts);
    }

    pub fn posts_for(&self, account_id: i64) -> Vec<NormalizedPost> {
        self.posts
            .lock()
            .unwrap()
            .get(&account_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn post_ids_for(&self, account_id: i64) -> Vec<String> {
        self.posts_for(account_id)
            .into_iter()
            .map(|p| p.external_post_id)
            .collect()
    }

    pub fn cycles(&self) -> Vec<CycleSummary> {
        self.cycles.lock().unwrap().clone()
    }

    pub fn fail_registry(&self, fail: bool) {
        *self.fail_registry.lock().unwrap() = fail;
    }

    pub fn fail_inserts(&self, fail: bool) {
        *self.fail_inserts.lock().unwrap() = fail;
    }
}

impl AccountRegistry for MemoryStore {
    async fn list_tracked_accounts(&self) -> Result<Vec<TrackedAccount>, IngestError> {
        if *self.fail_registry.lock().unwrap() {
            return Err(storage_error("registry unavailable"));
        }
        Ok(self.accounts.lock().unwrap().clone())
    }
}

impl PostStore for MemoryStore {
    async fn known_post_ids(&self, account_id: i64) -> Result<HashSet<String>, IngestError> {
        self.known_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.post_ids_for(account_id).into_iter().collect())
    }

    async fn insert_posts(
        &self,
        account_id: i64,
        posts: &[NormalizedPost],
    ) -> Result<u64, IngestError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_inserts.lock().unwrap() {
            return Err(storage_error("write failed"));
        }
        let mut all = self.posts.lock().unwrap();
        let stored = all.entry(account_id).or_default();
        let mut ids: HashSet<String> = stored.iter().map(|p| p.external_post_id.clone()).collect();
        for post in posts {
            if !ids.insert(post.external_post_id.clone()) {
                return Err(storage_error("unique key violated"));
            }
        }
        stored.extend(posts.iter().cloned());
        Ok(posts.len() as u64)
    }
}

impl CycleJournal for MemoryStore {
    async fn record_cycle(&self, summary: &CycleSummary) -> Result<(), IngestError> {
        self.cycles.lock().unwrap().push(summary.clone());
        Ok(())
    }
}

/// Scripted timeline source keyed by external account id.
#[derive(Default)]
pub struct FakeSource {
    timelines: Mutex<HashMap<String, Vec<NormalizedPost>>>,
    failing: Mutex<HashSet<String>>,
    missing: HashSet<String>,
    panicking: HashSet<String>,
    hanging: HashSet<String>,
    cancel_on_fetch: Option<(String, CancellationToken)>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(self, external_id: &str, posts: Vec<NormalizedPost>) -> Self {
        self.set_posts(external_id, posts);
        self
    }

    pub fn failing(self, external_id: &str) -> Self {
        self.failing.lock().unwrap().insert(external_id.to_string());
        self
    }

    pub fn missing(mut self, external_id: &str) -> Self {
        self.missing.insert(external_id.to_string());
        self
    }

    pub fn panicking(mut self, external_id: &str) -> Self {
        self.panicking.insert(external_id.to_string());
        self
    }

    pub fn hanging(mut self, external_id: &str) -> Self {
        self.hanging.insert(external_id.to_string());
        self
    }

    /// Fires `token` as soon as `external_id` is fetched.
    pub fn cancel_on_fetch(mut self, external_id: &str, token: CancellationToken) -> Self {
        self.cancel_on_fetch = Some((external_id.to_string(), token));
        self
    }

    pub fn set_posts(&self, external_id: &str, posts: Vec<NormalizedPost>) {
        self.timelines
            .lock()
            .unwrap()
            .insert(external_id.to_string(), posts);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl TimelineSource for FakeSource {
    async fn fetch_recent_posts(
        &self,
        external_id: &str,
        max_results: u32,
    ) -> Result<Timeline, IngestError> {
        self.calls.lock().unwrap().push(external_id.to_string());

        if let Some((target, token)) = &self.cancel_on_fetch {
            if target == external_id {
                token.cancel();
            }
        }
        if self.hanging.contains(external_id) {
            std::future::pending::<()>().await;
        }
        assert!(
            !self.panicking.contains(external_id),
            "scripted panic for {external_id}"
        );
        if self.failing.lock().unwrap().contains(external_id) {
            return Err(IngestError::UnexpectedStatus {
                status: 503,
                url: format!("https://api.example.com/2/users/{external_id}/tweets"),
            });
        }
        if self.missing.contains(external_id) {
            return Ok(Timeline {
                posts: Vec::new(),
                account_missing: true,
            });
        }

        let mut posts = self
            .timelines
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .unwrap_or_default();
        posts.truncate(max_results as usize);
        Ok(Timeline {
            posts,
            account_missing: false,
        })
    }
}

/// Resolver returning the same answer for every link.
pub struct FixedResolver {
    image: Option<String>,
    pub calls: AtomicUsize,
}

impl FixedResolver {
    pub fn returning(image: &str) -> Self {
        Self {
            image: Some(image.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            image: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PreviewResolver for FixedResolver {
    async fn resolve_preview_image(&self, _url: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.image.clone()
    }
}
