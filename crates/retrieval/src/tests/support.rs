//! Shared fixtures: synthetic corpora and instrumented providers.

use async_trait::async_trait;
use snapseek_core::EmbeddingError;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::engine::{EngineOptions, RetrievalEngine};
use crate::preprocess::ImageTensor;
use crate::resolver::BaseUrlResolver;
use crate::types::FeatureVector;

pub const DIMS: usize = 64;
pub const IMAGE_SIZE: u32 = 32;
pub const BASE: &str = "http://localhost:8000/images/";

/// Write a small PNG whose pixels depend on `seed`.
pub fn write_png(dir: &Path, name: &str, seed: u8) {
    let img = image::RgbImage::from_fn(24, 24, |x, y| {
        let (x, y) = (x as u8, y as u8);
        image::Rgb([
            seed.wrapping_mul(37).wrapping_add(x.wrapping_mul(3)),
            seed.wrapping_mul(91).wrapping_add(y.wrapping_mul(5)),
            (x ^ y).wrapping_mul(seed),
        ])
    });
    img.save(dir.join(name)).unwrap();
}

/// Files with an image extension that cannot be decoded.
pub fn write_corrupt(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"\x00\x01 this is not an image").unwrap();
}

pub fn write_corpus(dir: &Path, count: u8) {
    for i in 0..count {
        write_png(dir, &format!("img_{}.png", i), i + 1);
    }
}

/// Formatted log output collected by [`capture_warnings`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn lines_containing(&self, needle: &str) -> usize {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route WARN and above to a buffer for as long as the guard lives.
pub fn capture_warnings() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

pub fn options() -> EngineOptions {
    EngineOptions {
        image_size: IMAGE_SIZE,
        ..EngineOptions::default()
    }
}

pub fn engine_with(provider: Arc<dyn EmbeddingProvider>, options: EngineOptions) -> RetrievalEngine {
    RetrievalEngine::new(
        provider,
        Arc::new(BaseUrlResolver::new("http://localhost:8000", "images")),
        options,
    )
}

pub fn trigram_engine() -> RetrievalEngine {
    engine_with(Arc::new(TrigramProvider::new(DIMS)), options())
}

/// Trigram provider that counts calls and can be slowed down or made to fail.
#[derive(Debug)]
pub struct InstrumentedProvider {
    inner: TrigramProvider,
    pub text_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    text_delay: Option<Duration>,
    image_delay: Option<Duration>,
    fail_text_containing: Option<String>,
    fail_images: bool,
    zero_images: bool,
}

impl InstrumentedProvider {
    pub fn new() -> Self {
        Self {
            inner: TrigramProvider::new(DIMS),
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
            text_delay: None,
            image_delay: None,
            fail_text_containing: None,
            fail_images: false,
            zero_images: false,
        }
    }

    pub fn with_text_delay(mut self, delay: Duration) -> Self {
        self.text_delay = Some(delay);
        self
    }

    pub fn with_image_delay(mut self, delay: Duration) -> Self {
        self.image_delay = Some(delay);
        self
    }

    pub fn failing_text(mut self, needle: &str) -> Self {
        self.fail_text_containing = Some(needle.to_string());
        self
    }

    pub fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub fn zero_images(mut self) -> Self {
        self.zero_images = true;
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for InstrumentedProvider {
    fn provider_name(&self) -> &str {
        "instrumented"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_image(&self, tensor: &ImageTensor) -> Result<FeatureVector, EmbeddingError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.image_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_images {
            return Err(EmbeddingError::Provider("model crashed".to_string()));
        }
        if self.zero_images {
            return Ok(vec![0.0; self.dimensions()]);
        }
        self.inner.embed_image(tensor).await
    }

    async fn embed_text_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<FeatureVector>, EmbeddingError> {
        self.text_calls.fetch_add(texts.len(), Ordering::SeqCst);
        if let Some(delay) = self.text_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(needle) = &self.fail_text_containing {
            if texts.iter().any(|t| t.contains(needle.as_str())) {
                return Err(EmbeddingError::Provider("text encoder unavailable".to_string()));
            }
        }
        self.inner.embed_text_batch(texts).await
    }
}
