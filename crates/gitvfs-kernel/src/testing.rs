//! Scripted git runner for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gitvfs_types::Result;

use crate::process::GitRunner;

type Responder = dyn Fn(&[String]) -> Result<Vec<u8>> + Send + Sync;

/// A [`GitRunner`] that answers from a closure and records every call.
#[derive(Clone)]
pub struct ScriptedRunner {
    respond: Arc<Responder>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    delay: Duration,
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner").finish()
    }
}

impl ScriptedRunner {
    pub fn new(respond: impl Fn(&[String]) -> Result<Vec<u8>> + Send + Sync + 'static) -> Self {
        Self {
            respond: Arc::new(respond),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    /// Always answer with the same stdout.
    pub fn constant(stdout: &'static [u8]) -> Self {
        Self::new(move |_| Ok(stdout.to_vec()))
    }

    /// Suspend each call for `delay` before answering, so concurrent
    /// callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GitRunner for ScriptedRunner {
    async fn run(&self, args: &[String]) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(args.to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.respond)(args)
    }
}
