//! Whole-run shaping result cache.
//!
//! Shaping the same text with the same fonts and options is common enough
//! (editors redraw, terminals rewrap) that a small bounded LRU in front of
//! the pipeline pays for itself.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use glifo_core::LayoutOptions;
use glifo_layout::LaidText;

/// Identifies one shaping operation: text, font identities, and the
/// option fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeCacheKey {
    text: String,
    fonts: Vec<u64>,
    options: u64,
}

impl ShapeCacheKey {
    pub fn new(text: &str, fonts: &[u64], options: &LayoutOptions) -> Self {
        Self {
            text: text.to_owned(),
            fonts: fonts.to_vec(),
            options: fingerprint(options),
        }
    }
}

// Float fields enter the hash as bit patterns; two option sets with the
// same fingerprint shape identically.
fn fingerprint(options: &LayoutOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    options.size.to_bits().hash(&mut hasher);
    options.dpi_x.to_bits().hash(&mut hasher);
    options.dpi_y.to_bits().hash(&mut hasher);
    options.origin.0.to_bits().hash(&mut hasher);
    options.origin.1.to_bits().hash(&mut hasher);
    options.tab_width.hash(&mut hasher);
    options.apply_kerning.hash(&mut hasher);
    options.wrapping_width.to_bits().hash(&mut hasher);
    (options.horizontal_alignment as u8).hash(&mut hasher);
    (options.vertical_alignment as u8).hash(&mut hasher);
    options.letter_spacing.to_bits().hash(&mut hasher);
    options.language.0.hash(&mut hasher);
    for feature in &options.features {
        feature.tag.0.hash(&mut hasher);
        feature.value.hash(&mut hasher);
    }
    hasher.finish()
}

/// Bounded LRU over finished layouts.
pub struct ShapeCache {
    entries: Mutex<LruCache<ShapeCacheKey, LaidText>>,
}

impl ShapeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &ShapeCacheKey) -> Option<LaidText> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: ShapeCacheKey, value: LaidText) {
        self.entries.lock().put(key, value);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
