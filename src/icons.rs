//! Icon fetching and caching.
//!
//! Image providers are asked for an icon key once; replies may arrive inside
//! the request call or any time later. Replies land in a shared inbox that the
//! cache drains, after which the view repaints with the new icon.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

const DATA_URI_PNG_PREFIX: &str = "data:image/png;base64,";

/// Image data delivered by a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IconPayload {
    /// Base64 text, with or without a `data:` URI prefix.
    Base64(String),
    /// Already decoded RGBA pixels.
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// A cached icon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconImage {
    pub key: String,
    /// Base64 payloads are always stored as a complete `data:` URI.
    pub payload: IconPayload,
}

impl IconImage {
    /// Builds an icon, normalising bare base64 text to a PNG data URI.
    pub fn new(key: impl Into<String>, payload: IconPayload) -> Self {
        let payload = match payload {
            IconPayload::Base64(data) if !data.starts_with("data:") => {
                IconPayload::Base64(format!("{DATA_URI_PNG_PREFIX}{data}"))
            }
            other => other,
        };
        Self {
            key: key.into(),
            payload,
        }
    }
}

type Inbox = Rc<RefCell<Vec<IconImage>>>;

/// One-shot handle through which a provider delivers an icon.
pub struct ImageReply {
    key: String,
    inbox: Inbox,
}

impl ImageReply {
    /// The icon key that was requested.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Delivers the icon. RGBA payloads whose pixel buffer does not match
    /// their size are dropped.
    pub fn resolve(self, payload: IconPayload) {
        if let IconPayload::Rgba {
            width,
            height,
            ref pixels,
        } = payload
            && u64::from(width) * u64::from(height) * 4 != pixels.len() as u64
        {
            tracing::warn!(
                key = %self.key,
                width,
                height,
                bytes = pixels.len(),
                "ignoring malformed icon payload"
            );
            return;
        }
        let image = IconImage::new(self.key, payload);
        self.inbox.borrow_mut().push(image);
    }
}

/// Source of icon images.
pub trait ImageProvider {
    /// Starts fetching `key`. The provider may resolve `reply` now, later, or
    /// never (if it does not know the key).
    fn request_image(&mut self, key: &str, reply: ImageReply);
}

/// Icon cache shared by every paint pass.
#[derive(Default)]
pub struct IconCache {
    providers: Vec<Box<dyn ImageProvider>>,
    icons: FxHashMap<String, Rc<IconImage>>,
    queued: FxHashSet<String>,
    inbox: Inbox,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider(&mut self, provider: Box<dyn ImageProvider>) {
        self.providers.push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Returns the cached icon or requests it from every provider.
    ///
    /// A key that is already being fetched is not requested again.
    pub fn get_or_request(&mut self, key: &str) -> Option<Rc<IconImage>> {
        if let Some(icon) = self.icons.get(key) {
            return Some(Rc::clone(icon));
        }
        if self.queued.contains(key) || self.providers.is_empty() {
            return None;
        }
        self.queued.insert(key.to_owned());
        for provider in &mut self.providers {
            provider.request_image(
                key,
                ImageReply {
                    key: key.to_owned(),
                    inbox: Rc::clone(&self.inbox),
                },
            );
        }
        // Synchronous providers answer inside the request.
        self.drain();
        self.icons.get(key).cloned()
    }

    /// Moves delivered icons into the cache. Returns how many new icons arrived.
    pub fn drain(&mut self) -> usize {
        let delivered = std::mem::take(&mut *self.inbox.borrow_mut());
        let mut arrived = 0;
        for image in delivered {
            self.queued.remove(&image.key);
            if self.icons.contains_key(&image.key) {
                continue;
            }
            tracing::trace!(key = %image.key, "icon arrived");
            self.icons.insert(image.key.clone(), Rc::new(image));
            arrived += 1;
        }
        arrived
    }

    /// Returns `true` if replies are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        !self.inbox.borrow().is_empty()
    }

    pub fn is_queued(&self, key: &str) -> bool {
        self.queued.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Immediate;
    impl ImageProvider for Immediate {
        fn request_image(&mut self, key: &str, reply: ImageReply) {
            reply.resolve(IconPayload::Base64(format!("{key}-png")));
        }
    }

    #[derive(Clone, Default)]
    struct Deferred(Rc<RefCell<Vec<ImageReply>>>);
    impl ImageProvider for Deferred {
        fn request_image(&mut self, _key: &str, reply: ImageReply) {
            self.0.borrow_mut().push(reply);
        }
    }

    #[test]
    fn base64_is_normalised_to_data_uri() {
        let bare = IconImage::new("a", IconPayload::Base64("AAAA".into()));
        assert_eq!(
            bare.payload,
            IconPayload::Base64("data:image/png;base64,AAAA".into())
        );
        let full = IconImage::new("b", IconPayload::Base64("data:image/gif;base64,R0".into()));
        assert_eq!(
            full.payload,
            IconPayload::Base64("data:image/gif;base64,R0".into())
        );
    }

    #[test]
    fn synchronous_provider_fills_cache_immediately() {
        let mut cache = IconCache::new();
        cache.add_provider(Box::new(Immediate));
        let icon = cache.get_or_request("folder").expect("icon");
        assert_eq!(icon.key, "folder");
        assert!(!cache.is_queued("folder"));
    }

    #[test]
    fn deferred_provider_is_asked_once_until_delivery() {
        let pending = Deferred::default();
        let mut cache = IconCache::new();
        cache.add_provider(Box::new(pending.clone()));

        assert!(cache.get_or_request("file").is_none());
        assert!(cache.get_or_request("file").is_none());
        assert_eq!(pending.0.borrow().len(), 1);
        assert!(cache.is_queued("file"));

        let reply = pending.0.borrow_mut().pop().unwrap();
        reply.resolve(IconPayload::Rgba {
            width: 1,
            height: 1,
            pixels: vec![0, 0, 0, 255],
        });
        assert!(cache.has_pending());
        assert_eq!(cache.drain(), 1);
        assert!(cache.get_or_request("file").is_some());
    }

    #[test]
    fn malformed_rgba_is_dropped() {
        let pending = Deferred::default();
        let mut cache = IconCache::new();
        cache.add_provider(Box::new(pending.clone()));
        assert!(cache.get_or_request("bad").is_none());

        let reply = pending.0.borrow_mut().pop().unwrap();
        reply.resolve(IconPayload::Rgba {
            width: 2,
            height: 2,
            pixels: vec![0; 3],
        });
        assert!(!cache.has_pending());
        assert_eq!(cache.drain(), 0);
    }
}
