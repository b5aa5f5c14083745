//! Process-wide swap engine.
//!
//! Model sessions load once, on first use, and are shared by every
//! request afterwards. The sessions take `&mut self` to run, so access is
//! serialized behind a mutex; per-request state lives on the stack.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use once_cell::sync::OnceCell;

use roleswap_vision::{OnnxFaceAnalyzer, OnnxFaceSwapper};

use crate::config::Config;
use crate::error::SwapError;
use crate::orchestrator::{Orchestrator, SourcePayload};

type OnnxOrchestrator = Orchestrator<OnnxFaceAnalyzer, OnnxFaceSwapper>;

pub struct SwapService {
    inner: Mutex<OnnxOrchestrator>,
}

static SERVICE: OnceCell<SwapService> = OnceCell::new();

/// The shared engine handle, initialized lazily from the first caller's
/// config.
pub fn shared(cfg: &Config) -> Result<&'static SwapService, SwapError> {
    SERVICE
        .get_or_try_init(|| SwapService::new(cfg))
        .map_err(SwapError::Internal)
}

impl SwapService {
    fn new(cfg: &Config) -> anyhow::Result<Self> {
        log::info!("loading models from {}", cfg.model_dir.display());

        let analyzer = OnnxFaceAnalyzer::new(&cfg.model_dir, cfg.detection_threshold)
            .context("initializing face analyzer")?;
        let swapper =
            OnnxFaceSwapper::new(&cfg.model_dir).context("initializing face swapper")?;

        Ok(Self {
            inner: Mutex::new(Orchestrator::new(analyzer, swapper, cfg.debug_dir.clone())),
        })
    }

    pub fn swap(
        &self,
        source: SourcePayload<'_>,
        target_path: &Path,
    ) -> Result<String, SwapError> {
        self.lock()?.swap(source, target_path)
    }

    pub fn swap_jpeg(
        &self,
        source: SourcePayload<'_>,
        target_path: &Path,
    ) -> Result<Vec<u8>, SwapError> {
        self.lock()?.swap_jpeg(source, target_path)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, OnnxOrchestrator>, SwapError> {
        self.inner
            .lock()
            .map_err(|_| SwapError::Internal(anyhow!("swap engine lock poisoned")))
    }
}
