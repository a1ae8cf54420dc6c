//! In-process stand-in for the ClamAV daemon.

use async_trait::async_trait;
use bytes::Bytes;
use drivedeal_services::{MalwareScanner, ScanError};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy)]
enum Verdict {
    Clean,
    Infected,
    Unavailable,
}

#[derive(Debug)]
pub struct FakeScanner {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl FakeScanner {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn clean() -> Self {
        Self::new(Verdict::Clean)
    }

    pub fn infected() -> Self {
        Self::new(Verdict::Infected)
    }

    pub fn unavailable() -> Self {
        Self::new(Verdict::Unavailable)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MalwareScanner for FakeScanner {
    async fn is_infected(&self, _data: Bytes) -> Result<bool, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.verdict {
            Verdict::Clean => Ok(false),
            Verdict::Infected => Ok(true),
            Verdict::Unavailable => Err(ScanError::Unavailable("connection refused".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
