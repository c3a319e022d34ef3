//! Scripted providers for unit tests.

use crate::error::{Result, WallGenError};
use crate::image::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProvider,
    ProviderFactory,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a scripted attempt does.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    /// Returns a PNG whose last byte is the tag.
    Image(u8),
    /// Fails like a network error.
    Fail,
    /// Answers without an image part.
    Empty,
    /// Panics inside the attempt.
    Panic,
}

/// Bytes of the PNG returned for `Outcome::Image(tag)`.
pub(crate) fn tagged_png(tag: u8) -> Vec<u8> {
    vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, tag]
}

/// Provider that plays back outcomes in call order and records requests.
/// Calls beyond the script succeed with tag 0.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Appends outcomes for a later batch.
    pub(crate) fn push(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.outcomes.lock().unwrap().extend(outcomes);
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.requests.lock().unwrap().push(request.clone());
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Image(0));

        tokio::task::yield_now().await;

        match outcome {
            Outcome::Image(tag) => Ok(GeneratedImage::new(
                tagged_png(tag),
                ImageFormat::Png,
                GenerationMetadata::default(),
            )),
            Outcome::Fail => Err(WallGenError::Api {
                status: 500,
                message: "scripted failure".into(),
            }),
            Outcome::Empty => Err(WallGenError::UnexpectedResponse(
                "No image data in response".into(),
            )),
            Outcome::Panic => panic!("scripted panic"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct SharedProvider(Arc<ScriptedProvider>);

#[async_trait]
impl ImageProvider for SharedProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.0.generate(request).await
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// Factory handing out the same scripted provider; counts constructions.
pub(crate) struct ScriptedFactory {
    pub(crate) provider: Arc<ScriptedProvider>,
    pub(crate) created: AtomicUsize,
    pub(crate) fail: bool,
}

impl ScriptedFactory {
    pub(crate) fn new(provider: Arc<ScriptedProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            created: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            provider: ScriptedProvider::new([]),
            created: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ProviderFactory for ScriptedFactory {
    fn create(&self) -> Result<Box<dyn ImageProvider>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(WallGenError::Auth("no API key".into()));
        }
        Ok(Box::new(SharedProvider(Arc::clone(&self.provider))))
    }
}
