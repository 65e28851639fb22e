//! Progressive image loading with a bounded decode cache.
//!
//! A request moves through `Fetching -> ThumbnailReady -> Complete`, or ends
//! in `Failed`. The caller hears about the thumbnail before the load resolves
//! so list views can fill in early.
//!
//! Identical requests issued while a load is in flight share that load: the
//! source is read and decoded once per cache key, however many callers are
//! waiting. Completed results are kept in a FIFO [`DecodeCache`].

mod cache;
mod codec;
mod sources;
mod stats;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::{LocalBoxFuture, Shared};
use futures::FutureExt;
use web_time::Instant;

pub use cache::{DecodeCache, cache_key};
pub use codec::{
    DecodedImage, ImageCodec, RasterCodec, Thumbnail, thumbnail_dimensions, thumbnail_pixel_size,
};
pub use sources::{FileSource, IMAGE_EXTENSIONS, ImageSource, MemorySource, is_image_filename, list_images};
pub use stats::{LoadRecord, LoadStats, LoadTimeTracker};

use crate::constants::{DEFAULT_MAX_CACHE_SIZE, DEFAULT_THUMBNAIL_SIZE, progress};
use crate::error::LoadError;

/// Output of a progressive load. Immutable once created; cache hits hand out
/// the same allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedImageResult {
    /// Preview, always produced first
    pub thumbnail: Thumbnail,
    /// Reference the full-resolution asset was resolved from
    pub full_image: String,
    /// Full image width in pixels
    pub width: u32,
    /// Full image height in pixels
    pub height: u32,
    /// Time the load took, for diagnostics only
    pub load_time_ms: f64,
}

/// Progress callback, receives a percentage in `0.0..=100.0`.
pub type ProgressCallback = Box<dyn FnMut(f32)>;
/// Thumbnail callback, fires once before the load resolves.
pub type ThumbnailCallback = Box<dyn FnOnce(&Thumbnail)>;

/// Per-request options for [`ImageResourceLoader::load_progressive`].
#[derive(Default)]
pub struct LoadOptions {
    /// Progress updates
    pub on_progress: Option<ProgressCallback>,
    /// Early thumbnail delivery
    pub on_thumbnail_ready: Option<ThumbnailCallback>,
    /// Longer-axis bound for the thumbnail; the loader default when `None`
    pub thumbnail_size: Option<u32>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive progress percentages.
    pub fn on_progress(mut self, callback: impl FnMut(f32) + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Receive the thumbnail as soon as it exists.
    pub fn on_thumbnail_ready(mut self, callback: impl FnOnce(&Thumbnail) + 'static) -> Self {
        self.on_thumbnail_ready = Some(Box::new(callback));
        self
    }

    /// Override the thumbnail size.
    pub fn thumbnail_size(mut self, size: u32) -> Self {
        self.thumbnail_size = Some(size);
        self
    }
}

/// Loader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Decode cache capacity
    pub max_cache_size: usize,
    /// Default thumbnail bound in pixels
    pub thumbnail_size: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

/// Snapshot returned by [`ImageResourceLoader::cache_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Completed results held
    pub size: usize,
    /// Capacity
    pub max_size: usize,
    /// Loads currently running
    pub in_flight: usize,
}

/// Input for [`ImageResourceLoader::generate_thumbnail`].
#[derive(Debug, Clone, Copy)]
pub enum ThumbnailInput<'a> {
    /// An already decoded surface
    Image(&'a DecodedImage),
    /// A reference to fetch and decode first
    Reference(&'a str),
}

/// Result of one progressive load.
pub type LoadOutcome = Result<Arc<CachedImageResult>, LoadError>;
type SharedLoad = Shared<LocalBoxFuture<'static, LoadOutcome>>;

struct LoaderState {
    cache: DecodeCache,
    in_flight: HashMap<String, SharedLoad>,
    stats: LoadTimeTracker,
    /// Number of fetch+decode runs started
    decode_count: usize,
}

/// Resolves image references into decoded results, thumbnail first.
pub struct ImageResourceLoader {
    source: Rc<dyn ImageSource>,
    codec: Rc<dyn ImageCodec>,
    state: Rc<RefCell<LoaderState>>,
    default_thumbnail_size: u32,
}

impl ImageResourceLoader {
    /// Create a loader over the given collaborators.
    pub fn new(source: Rc<dyn ImageSource>, codec: Rc<dyn ImageCodec>, config: LoaderConfig) -> Self {
        Self {
            source,
            codec,
            state: Rc::new(RefCell::new(LoaderState {
                cache: DecodeCache::new(config.max_cache_size),
                in_flight: HashMap::new(),
                stats: LoadTimeTracker::new(),
                decode_count: 0,
            })),
            default_thumbnail_size: config.thumbnail_size,
        }
    }

    /// Loader reading filesystem paths and decoding with the `image` crate.
    pub fn from_files(config: LoaderConfig) -> Self {
        Self::new(Rc::new(FileSource::new()), Rc::new(RasterCodec::new()), config)
    }

    /// Load `reference`, reporting progress and delivering the thumbnail
    /// before the returned future resolves.
    ///
    /// Cache hits and callers joining an in-flight load still get their
    /// thumbnail callback and a final 100% progress report.
    pub async fn load_progressive(&self, reference: &str, options: LoadOptions) -> LoadOutcome {
        let key = cache_key(reference);
        let LoadOptions {
            on_progress,
            on_thumbnail_ready,
            thumbnail_size,
        } = options;

        let cached = self.state.borrow().cache.get(&key);
        if let Some(result) = cached {
            log::debug!("Loader: cache hit for '{}'", key);
            deliver(&result, on_progress, on_thumbnail_ready);
            return Ok(result);
        }

        let pending = self.state.borrow().in_flight.get(&key).cloned();
        if let Some(pending) = pending {
            log::debug!("Loader: joining in-flight load for '{}'", key);
            let result = pending.await?;
            deliver(&result, on_progress, on_thumbnail_ready);
            return Ok(result);
        }

        let job = LoadJob {
            source: Rc::clone(&self.source),
            codec: Rc::clone(&self.codec),
            state: Rc::clone(&self.state),
            reference: reference.to_string(),
            key: key.clone(),
            thumbnail_size: thumbnail_size.unwrap_or(self.default_thumbnail_size),
            on_progress,
            on_thumbnail_ready,
        };
        let shared = job.run().boxed_local().shared();
        self.state
            .borrow_mut()
            .in_flight
            .insert(key, shared.clone());
        shared.await
    }

    /// Load several references concurrently with default callbacks.
    ///
    /// Every reference gets its own outcome; one failure does not cancel the
    /// others.
    pub async fn preload<I, R>(&self, references: I, thumbnail_size: Option<u32>) -> Vec<(String, LoadOutcome)>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        let references: Vec<String> = references
            .into_iter()
            .map(|r| r.as_ref().to_string())
            .collect();
        log::debug!("Loader: preloading {} references", references.len());

        let loads = references.iter().map(|reference| {
            let options = LoadOptions {
                thumbnail_size,
                ..LoadOptions::default()
            };
            self.load_progressive(reference, options)
        });
        let outcomes = futures::future::join_all(loads).await;
        references.into_iter().zip(outcomes).collect()
    }

    /// Produce a preview bounded by `max_size`, preserving aspect ratio.
    ///
    /// A reference is fetched and decoded on the spot; the result is not
    /// cached.
    pub async fn generate_thumbnail(
        &self,
        input: ThumbnailInput<'_>,
        max_size: u32,
    ) -> Result<Thumbnail, LoadError> {
        let decoded;
        let image = match input {
            ThumbnailInput::Image(image) => image,
            ThumbnailInput::Reference(reference) => {
                let mut ignore = |_: u64, _: Option<u64>| {};
                let bytes = self.source.fetch(reference, &mut ignore).await?;
                if bytes.is_empty() {
                    return Err(LoadError::EmptySource {
                        reference: reference.to_string(),
                    });
                }
                decoded = self.codec.decode(&bytes)?;
                &decoded
            }
        };
        make_thumbnail(self.codec.as_ref(), image, max_size)
    }

    /// Check if a completed result for `reference` is cached.
    pub fn is_cached(&self, reference: &str) -> bool {
        self.state.borrow().cache.contains(&cache_key(reference))
    }

    /// Cached result for `reference`, without loading.
    pub fn cached(&self, reference: &str) -> Option<Arc<CachedImageResult>> {
        self.state.borrow().cache.get(&cache_key(reference))
    }

    /// Drop every completed result. Loads in flight are unaffected.
    pub fn clear_cache(&self) {
        self.state.borrow_mut().cache.clear();
    }

    /// Change the decode cache capacity.
    pub fn set_max_cache_size(&self, max_size: usize) {
        self.state.borrow_mut().cache.set_max_size(max_size);
    }

    pub fn cache_stats(&self) -> CacheStats {
        let state = self.state.borrow();
        CacheStats {
            size: state.cache.len(),
            max_size: state.cache.max_size(),
            in_flight: state.in_flight.len(),
        }
    }

    /// Load-time aggregate over recent fresh loads.
    pub fn load_stats(&self) -> LoadStats {
        self.state.borrow().stats.stats()
    }

    /// Number of fetch+decode runs started since creation.
    pub fn decode_count(&self) -> usize {
        self.state.borrow().decode_count
    }

    /// Default thumbnail bound.
    pub fn thumbnail_size(&self) -> u32 {
        self.default_thumbnail_size
    }
}

/// Callbacks for a caller whose result came from the cache or another
/// caller's load.
fn deliver(
    result: &CachedImageResult,
    on_progress: Option<ProgressCallback>,
    on_thumbnail_ready: Option<ThumbnailCallback>,
) {
    if let Some(callback) = on_thumbnail_ready {
        callback(&result.thumbnail);
    }
    if let Some(mut callback) = on_progress {
        callback(progress::COMPLETE);
    }
}

fn make_thumbnail(
    codec: &dyn ImageCodec,
    image: &DecodedImage,
    max_size: u32,
) -> Result<Thumbnail, LoadError> {
    if image.width == 0 || image.height == 0 {
        return Err(LoadError::ZeroDimensions {
            width: image.width,
            height: image.height,
        });
    }
    let (width, height) = thumbnail_pixel_size(image.width, image.height, max_size);
    codec.thumbnail(image, width, height)
}

/// One fresh load, owned by the shared future all callers await.
struct LoadJob {
    source: Rc<dyn ImageSource>,
    codec: Rc<dyn ImageCodec>,
    state: Rc<RefCell<LoaderState>>,
    reference: String,
    key: String,
    thumbnail_size: u32,
    on_progress: Option<ProgressCallback>,
    on_thumbnail_ready: Option<ThumbnailCallback>,
}

impl LoadJob {
    async fn run(mut self) -> LoadOutcome {
        let started = Instant::now();
        self.state.borrow_mut().decode_count += 1;
        log::debug!("Loader: loading '{}'", self.key);

        let outcome = self.load(started).await;

        let mut state = self.state.borrow_mut();
        state.in_flight.remove(&self.key);
        match &outcome {
            Ok(result) => {
                state.cache.insert(self.key.clone(), Arc::clone(result));
                state.stats.record(self.key.clone(), result.load_time_ms);
                log::debug!(
                    "Loader: loaded '{}' ({}x{}) in {:.1}ms",
                    self.key,
                    result.width,
                    result.height,
                    result.load_time_ms
                );
            }
            Err(e) => log::warn!("Loader: failed to load '{}': {}", self.key, e),
        }
        drop(state);
        outcome
    }

    async fn load(&mut self, started: Instant) -> LoadOutcome {
        self.report(0.0);

        let bytes = {
            let on_progress = &mut self.on_progress;
            let mut fetch_progress = |loaded: u64, total: Option<u64>| {
                let total = total.filter(|t| *t > 0);
                if let (Some(callback), Some(total)) = (on_progress.as_mut(), total) {
                    let fraction = (loaded as f64 / total as f64).min(1.0) as f32;
                    callback(fraction * progress::FETCH_SHARE);
                }
            };
            self.source
                .fetch(&self.reference, &mut fetch_progress)
                .await?
        };
        if bytes.is_empty() {
            return Err(LoadError::EmptySource {
                reference: self.reference.clone(),
            });
        }

        let image = self.codec.decode(&bytes)?;
        drop(bytes);
        self.report(progress::THUMBNAIL);
        let thumbnail = make_thumbnail(self.codec.as_ref(), &image, self.thumbnail_size)?;

        if let Some(callback) = self.on_thumbnail_ready.take() {
            callback(&thumbnail);
        }
        self.report(progress::FINALIZING);

        let result = CachedImageResult {
            thumbnail,
            full_image: self.reference.clone(),
            width: image.width,
            height: image.height,
            load_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        };
        self.report(progress::COMPLETE);
        Ok(Arc::new(result))
    }

    fn report(&mut self, percent: f32) {
        if let Some(callback) = self.on_progress.as_mut() {
            callback(percent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::future::Future;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Returns `Pending` once so concurrent callers interleave.
    #[derive(Default)]
    struct YieldOnce {
        yielded: bool,
    }

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.yielded {
                Poll::Ready(())
            } else {
                self.yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    /// Memory source that suspends once per fetch and counts fetches.
    #[derive(Default)]
    struct SlowSource {
        inner: MemorySource,
        fetches: Cell<usize>,
    }

    impl ImageSource for SlowSource {
        fn fetch<'a>(
            &'a self,
            reference: &'a str,
            progress: &'a mut dyn FnMut(u64, Option<u64>),
        ) -> LocalBoxFuture<'a, Result<Vec<u8>, LoadError>> {
            async move {
                self.fetches.set(self.fetches.get() + 1);
                YieldOnce::default().await;
                self.inner.fetch(reference, progress).await
            }
            .boxed_local()
        }
    }

    fn loader_with(source: Rc<SlowSource>, max_cache_size: usize) -> ImageResourceLoader {
        ImageResourceLoader::new(
            source,
            Rc::new(RasterCodec::new()),
            LoaderConfig {
                max_cache_size,
                thumbnail_size: 64,
            },
        )
    }

    fn setup(images: &[(&str, u32, u32)]) -> (Rc<SlowSource>, ImageResourceLoader) {
        let source = Rc::new(SlowSource::default());
        for (name, w, h) in images {
            source.inner.insert(*name, png(*w, *h));
        }
        let loader = loader_with(Rc::clone(&source), 10);
        (source, loader)
    }

    #[test]
    fn test_thumbnail_before_completion() {
        let (_, loader) = setup(&[("pano.png", 400, 200)]);
        let log = Rc::new(RefCell::new(Vec::<String>::new()));

        let progress_log = Rc::clone(&log);
        let thumb_log = Rc::clone(&log);
        let options = LoadOptions::new()
            .on_progress(move |p| progress_log.borrow_mut().push(format!("{}", p)))
            .on_thumbnail_ready(move |thumb| {
                thumb_log
                    .borrow_mut()
                    .push(format!("thumb {}x{}", thumb.width, thumb.height))
            });

        let result = pollster::block_on(loader.load_progressive("pano.png", options)).unwrap();
        assert_eq!(result.full_image, "pano.png");
        assert_eq!((result.width, result.height), (400, 200));
        assert_eq!((result.thumbnail.width, result.thumbnail.height), (64, 32));

        let log = log.borrow();
        let thumb_at = log.iter().position(|e| e == "thumb 64x32").unwrap();
        let eighty_at = log.iter().position(|e| e == "80").unwrap();
        let ninety_at = log.iter().position(|e| e == "90").unwrap();
        assert!(eighty_at < thumb_at && thumb_at < ninety_at);
        assert_eq!(log.last().map(String::as_str), Some("100"));
        assert_eq!(log.first().map(String::as_str), Some("0"));
    }

    /// Raster codec that notes each thumbnail encode in a shared log.
    struct RecordingCodec {
        inner: RasterCodec,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ImageCodec for RecordingCodec {
        fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError> {
            self.inner.decode(bytes)
        }

        fn thumbnail(
            &self,
            image: &DecodedImage,
            width: u32,
            height: u32,
        ) -> Result<Thumbnail, LoadError> {
            self.log.borrow_mut().push("encode".to_string());
            self.inner.thumbnail(image, width, height)
        }
    }

    #[test]
    fn test_thumbnail_progress_reported_before_encoding() {
        let source = Rc::new(SlowSource::default());
        source.inner.insert("pano.png", png(200, 100));
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let loader = ImageResourceLoader::new(
            source,
            Rc::new(RecordingCodec {
                inner: RasterCodec::new(),
                log: Rc::clone(&log),
            }),
            LoaderConfig {
                max_cache_size: 10,
                thumbnail_size: 64,
            },
        );

        let progress_log = Rc::clone(&log);
        let options = LoadOptions::new()
            .on_progress(move |p| progress_log.borrow_mut().push(format!("{}", p)));
        pollster::block_on(loader.load_progressive("pano.png", options)).unwrap();

        let log = log.borrow();
        let eighty_at = log.iter().position(|e| e == "80").unwrap();
        let encode_at = log.iter().position(|e| e == "encode").unwrap();
        assert!(eighty_at < encode_at);
    }

    #[test]
    fn test_dropped_caller_does_not_cancel_shared_load() {
        let (source, loader) = setup(&[("a.png", 32, 16)]);

        let mut first = Box::pin(loader.load_progressive("a.png", LoadOptions::new()));
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        assert!(first.as_mut().poll(&mut cx).is_pending());
        assert_eq!(loader.cache_stats().in_flight, 1);

        let second = loader.load_progressive("a.png", LoadOptions::new());
        drop(first);

        let result = pollster::block_on(second).unwrap();
        assert_eq!((result.width, result.height), (32, 16));
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(loader.cache_stats().in_flight, 0);
        assert!(loader.is_cached("a.png"));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let (_, loader) = setup(&[("a.png", 16, 16)]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let options = LoadOptions::new().on_progress(move |p| s.borrow_mut().push(p));
        pollster::block_on(loader.load_progressive("a.png", options)).unwrap();

        let seen = seen.borrow();
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert!(seen.contains(&progress::FETCH_SHARE));
    }

    #[test]
    fn test_cache_hit_reuses_result() {
        let (source, loader) = setup(&[("a.png", 16, 8)]);
        let first = pollster::block_on(loader.load_progressive("a.png", LoadOptions::new())).unwrap();
        assert!(loader.is_cached("a.png"));

        let thumb_seen = Rc::new(Cell::new(false));
        let t = Rc::clone(&thumb_seen);
        let last_progress = Rc::new(Cell::new(0.0f32));
        let p = Rc::clone(&last_progress);
        let options = LoadOptions::new()
            .on_thumbnail_ready(move |_| t.set(true))
            .on_progress(move |v| p.set(v));
        let second = pollster::block_on(loader.load_progressive("a.png", options)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(thumb_seen.get());
        assert_eq!(last_progress.get(), 100.0);
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(loader.decode_count(), 1);
    }

    #[test]
    fn test_concurrent_requests_coalesce() {
        let (source, loader) = setup(&[("shared.png", 32, 16)]);
        let thumbs = Rc::new(Cell::new(0));
        let t1 = Rc::clone(&thumbs);
        let t2 = Rc::clone(&thumbs);

        let (a, b) = pollster::block_on(async {
            futures::join!(
                loader.load_progressive(
                    "shared.png",
                    LoadOptions::new().on_thumbnail_ready(move |_| t1.set(t1.get() + 1))
                ),
                loader.load_progressive(
                    "shared.png",
                    LoadOptions::new().on_thumbnail_ready(move |_| t2.set(t2.get() + 1))
                ),
            )
        });

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(loader.decode_count(), 1);
        assert_eq!(thumbs.get(), 2);
        assert_eq!(loader.cache_stats().in_flight, 0);
    }

    #[test]
    fn test_coalesced_failure_reaches_every_caller() {
        let (source, loader) = setup(&[]);
        source.inner.insert("broken.png", b"garbage".to_vec());

        let (a, b) = pollster::block_on(async {
            futures::join!(
                loader.load_progressive("broken.png", LoadOptions::new()),
                loader.load_progressive("broken.png", LoadOptions::new()),
            )
        });
        assert!(matches!(a, Err(LoadError::Decode(_))));
        assert_eq!(a, b);
        assert_eq!(source.fetches.get(), 1);
        assert!(!loader.is_cached("broken.png"));
        assert_eq!(loader.cache_stats().in_flight, 0);
    }

    #[test]
    fn test_empty_source_rejected() {
        let (source, loader) = setup(&[]);
        source.inner.insert("empty.png", Vec::new());

        let thumb_seen = Rc::new(Cell::new(false));
        let t = Rc::clone(&thumb_seen);
        let err = pollster::block_on(loader.load_progressive(
            "empty.png",
            LoadOptions::new().on_thumbnail_ready(move |_| t.set(true)),
        ))
        .unwrap_err();

        assert_eq!(
            err,
            LoadError::EmptySource {
                reference: "empty.png".to_string()
            }
        );
        assert!(!thumb_seen.get());
        assert!(!loader.is_cached("empty.png"));
        assert!(loader.load_stats().count == 0);
    }

    #[test]
    fn test_missing_reference_rejected() {
        let (_, loader) = setup(&[]);
        let err = pollster::block_on(loader.load_progressive("nope.png", LoadOptions::new()))
            .unwrap_err();
        assert!(matches!(err, LoadError::Fetch { .. }));
    }

    #[test]
    fn test_cache_is_fifo_and_bounded() {
        let source = Rc::new(SlowSource::default());
        for name in ["a.png", "b.png", "c.png"] {
            source.inner.insert(name, png(4, 4));
        }
        let loader = loader_with(Rc::clone(&source), 2);

        pollster::block_on(async {
            for name in ["a.png", "b.png"] {
                loader.load_progressive(name, LoadOptions::new()).await.unwrap();
            }
            // A hit on "a" does not protect it from FIFO eviction
            loader.load_progressive("a.png", LoadOptions::new()).await.unwrap();
            loader.load_progressive("c.png", LoadOptions::new()).await.unwrap();
        });

        assert!(!loader.is_cached("a.png"));
        assert!(loader.is_cached("b.png"));
        assert!(loader.is_cached("c.png"));
        assert_eq!(
            loader.cache_stats(),
            CacheStats {
                size: 2,
                max_size: 2,
                in_flight: 0
            }
        );

        loader.clear_cache();
        assert_eq!(loader.cache_stats().size, 0);
    }

    #[test]
    fn test_preload_reports_each_outcome() {
        let (_, loader) = setup(&[("a.png", 8, 8), ("b.png", 8, 4)]);
        let outcomes = pollster::block_on(loader.preload(["a.png", "missing.png", "b.png"], Some(4)));

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].0, "a.png");
        assert!(outcomes[0].1.is_ok());
        assert!(outcomes[1].1.is_err());
        let b = outcomes[2].1.as_ref().unwrap();
        assert_eq!((b.thumbnail.width, b.thumbnail.height), (4, 2));
        assert_eq!(loader.load_stats().count, 2);
    }

    #[test]
    fn test_generate_thumbnail_from_reference_and_image() {
        let (_, loader) = setup(&[("tall.png", 50, 100)]);
        let thumb = pollster::block_on(
            loader.generate_thumbnail(ThumbnailInput::Reference("tall.png"), 20),
        )
        .unwrap();
        assert_eq!((thumb.width, thumb.height), (10, 20));
        assert!(!loader.is_cached("tall.png"));

        let decoded = RasterCodec::new().decode(&png(30, 30)).unwrap();
        let thumb =
            pollster::block_on(loader.generate_thumbnail(ThumbnailInput::Image(&decoded), 10))
                .unwrap();
        assert_eq!((thumb.width, thumb.height), (10, 10));
    }

    #[test]
    fn test_long_reference_uses_hashed_key() {
        let (source, loader) = setup(&[]);
        let embedded = format!("data:image/png;base64,{}", "Q".repeat(300));
        source.inner.insert(embedded.clone(), png(8, 8));

        pollster::block_on(loader.load_progressive(&embedded, LoadOptions::new())).unwrap();
        assert!(loader.is_cached(&embedded));
        let stats = loader.load_stats();
        assert!(stats.recent[0].key.starts_with("img_"));
    }
}
