//! Shared fixtures for integration tests: PDF and image builders, scripted
//! recognition engines and a store that refuses writes.

#![allow(dead_code)]

use async_trait::async_trait;
use docvault::core::config::VaultConfig;
use docvault::ocr::{EngineFactory, EngineHandle, RecognitionEngine};
use docvault::pdf::EmbeddedImageRasterizer;
use docvault::store::{DocumentStore, MemoryDocumentStore};
use docvault::{DocumentId, DocumentRecord, DocumentVault, DocvaultError, OwnerId, Result};
use image::{DynamicImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Send library logs to the test harness output. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docvault=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Side length of the page images embedded by [`build_pdf`].
pub const PAGE_IMAGE_SIZE: i64 = 32;

/// One page of a generated PDF.
#[derive(Debug, Clone, Copy)]
pub struct PageSpec<'a> {
    pub text: Option<&'a str>,
    pub image: bool,
}

impl<'a> PageSpec<'a> {
    pub fn text(text: &'a str) -> Self {
        Self { text: Some(text), image: false }
    }

    pub fn scanned() -> Self {
        Self { text: None, image: true }
    }

    pub fn scanned_with_text(text: &'a str) -> Self {
        Self { text: Some(text), image: true }
    }
}

/// Build a PDF whose pages carry an optional text layer and an optional
/// uncompressed grayscale page image.
pub fn build_pdf(pages: &[PageSpec<'_>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids = Vec::new();
    for spec in pages {
        let mut operations = Vec::new();
        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };

        if spec.image {
            let size = PAGE_IMAGE_SIZE as usize;
            let samples: Vec<u8> = (0..size * size).map(|i| if (i / size) % 4 == 0 { 0 } else { 255 }).collect();
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => PAGE_IMAGE_SIZE,
                    "Height" => PAGE_IMAGE_SIZE,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                samples,
            ));
            resources.set("XObject", dictionary! { "Im1" => image_id });
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![612.into(), 0.into(), 0.into(), 792.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec!["Im1".into()]),
                Operation::new("Q", vec![]),
            ]);
        }

        if let Some(text) = spec.text {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A text PDF whose single page holds `chars` characters of prose.
pub fn text_pdf_with_chars(chars: usize) -> (Vec<u8>, String) {
    let sentence = "The quick brown fox jumps over the lazy dog. ";
    let text: String = sentence.chars().cycle().take(chars).collect();
    let text = text.trim().to_string();
    (build_pdf(&[PageSpec::text(&text)]), text)
}

pub fn scanned_pdf(pages: usize) -> Vec<u8> {
    build_pdf(&vec![PageSpec::scanned(); pages])
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::new_luma8(width, height);
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Counters shared between a [`ScriptedFactory`] and the test observing it.
#[derive(Debug, Clone, Default)]
pub struct EngineTracker {
    pub inits: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
}

impl EngineTracker {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Engine factory whose engines answer `"{text} {n}"` for the n-th call.
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    text: String,
    delay: Duration,
    fail_init: bool,
    fail_recognition: bool,
    calls_seen: EngineTracker,
}

impl ScriptedFactory {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::ZERO,
            fail_init: false,
            fail_recognition: false,
            calls_seen: EngineTracker::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_recognition(mut self) -> Self {
        self.fail_recognition = true;
        self
    }

    pub fn calls_seen(&self) -> EngineTracker {
        self.calls_seen.clone()
    }

    pub fn handle(self) -> (EngineHandle, EngineTracker) {
        let calls_seen = self.calls_seen();
        (EngineHandle::new(Arc::new(self)), calls_seen)
    }
}

impl EngineFactory for ScriptedFactory {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create(&self) -> Result<Box<dyn RecognitionEngine>> {
        self.calls_seen.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(DocvaultError::ocr("scripted engine refused to start"));
        }
        Ok(Box::new(ScriptedEngine {
            factory: self.clone(),
        }))
    }
}

struct ScriptedEngine {
    factory: ScriptedFactory,
}

impl RecognitionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn recognize(&mut self, _image: &DynamicImage) -> Result<String> {
        let calls_seen = &self.factory.calls_seen;
        let now_active = calls_seen.active.fetch_add(1, Ordering::SeqCst) + 1;
        calls_seen.max_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.factory.delay.is_zero() {
            std::thread::sleep(self.factory.delay);
        }

        let call = calls_seen.calls.fetch_add(1, Ordering::SeqCst) + 1;
        calls_seen.active.fetch_sub(1, Ordering::SeqCst);

        if self.factory.fail_recognition {
            return Err(DocvaultError::ocr("scripted recognition failure"));
        }
        Ok(format!("{} {}", self.factory.text, call))
    }
}

/// In-memory vault using `engine` and `config`. Pages are rasterized from
/// their embedded images whatever features are enabled.
pub fn vault_with(config: VaultConfig, engine: EngineHandle) -> DocumentVault {
    DocumentVault::with_rasterizer(
        config,
        Arc::new(MemoryDocumentStore::new()),
        engine,
        Arc::new(EmbeddedImageRasterizer::new()),
    )
}

pub fn vault_with_engine(engine: EngineHandle) -> DocumentVault {
    vault_with(VaultConfig::default(), engine)
}

pub fn vault_without_engine() -> DocumentVault {
    vault_with(VaultConfig::default(), EngineHandle::unavailable())
}

pub fn alice() -> OwnerId {
    OwnerId::from("alice")
}

pub fn bob() -> OwnerId {
    OwnerId::from("bob")
}

/// A store whose writes always fail.
#[derive(Debug, Default)]
pub struct ReadOnlyStore;

#[async_trait]
impl DocumentStore for ReadOnlyStore {
    fn name(&self) -> &str {
        "read-only"
    }

    async fn put(&self, _record: DocumentRecord) -> Result<()> {
        Err(DocvaultError::storage_write("store is read-only"))
    }

    async fn get(&self, id: &DocumentId, _owner: &OwnerId) -> Result<DocumentRecord> {
        Err(DocvaultError::not_found(id))
    }

    async fn list_all(&self, _owner: &OwnerId) -> Result<Vec<DocumentRecord>> {
        Ok(Vec::new())
    }

    async fn delete(&self, id: &DocumentId, _owner: &OwnerId) -> Result<()> {
        Err(DocvaultError::not_found(id))
    }
}
