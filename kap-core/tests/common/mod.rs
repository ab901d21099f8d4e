#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kap_core::{Announcement, AnnouncementSource, Notifier, NotifyError, Price, PriceLookup, SourceError};

/// Source whose batch and failure mode the test can change between cycles.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    items: Arc<Mutex<Vec<Announcement>>>,
    failing: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(items: Vec<Announcement>) -> Self {
        let source = Self::default();
        source.set_items(items);
        source
    }

    pub fn set_items(&self, items: Vec<Announcement>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl AnnouncementSource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<Announcement>, SourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }
        Ok(self.items.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Records every message it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected {
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                description: "Too Many Requests: retry later".into(),
            });
        }
        self.sent.lock().unwrap().push(text.to_owned());
        Ok(())
    }
}

pub struct FixedPrice(pub Price);

#[async_trait]
impl PriceLookup for FixedPrice {
    async fn lookup(&self, _company: &str) -> Price {
        self.0.clone()
    }
}

pub fn temp_dir(label: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "kap_{}_{}_{}",
        label,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    dir
}
