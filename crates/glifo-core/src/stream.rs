// this_file: crates/glifo-core/src/stream.rs

//! The glyph stream: an ordered, mutable sequence of shaping slots.
//!
//! This is the shared spine of the shaping pipeline. The text analyzer
//! fills it, substitution rewrites it (1:1, 1:0, 1:N, N:1), positioning
//! annotates it, and line layout consumes it read-only. All edits preserve
//! source-offset provenance: offsets stay non-decreasing across the stream
//! and the sum of `codepoint_count` over all slots never changes.
//!
//! Backing storage is pooled per thread. A stream returns its buffer to
//! the pool on drop, so steady-state shaping allocates nothing.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use crate::charclass;
use crate::error::{GlifoError, Result};
use crate::slot::{Slot, SlotFlags};

/// How many spent buffers one thread keeps around for reuse.
const POOL_LIMIT: usize = 8;

thread_local! {
    static SLOT_POOL: RefCell<Vec<Vec<Slot>>> = const { RefCell::new(Vec::new()) };
}

fn pool_acquire() -> Vec<Slot> {
    SLOT_POOL.with(|pool| pool.borrow_mut().pop().unwrap_or_default())
}

fn pool_release(mut buffer: Vec<Slot>) {
    if buffer.capacity() == 0 {
        return;
    }
    buffer.clear();
    SLOT_POOL.with(|pool| {
        let mut pool = pool.borrow_mut();
        if pool.len() < POOL_LIMIT {
            pool.push(buffer);
        }
    });
}

/// Ordered, mutable sequence of shaping slots with pooled backing storage.
pub struct GlyphStream {
    slots: Vec<Slot>,
    next_ligature_id: u32,
    // Cursor for ascending query_by_offset scans.
    cursor: Cell<usize>,
}

impl GlyphStream {
    /// An empty stream backed by a pooled buffer.
    pub fn new() -> Self {
        Self {
            slots: pool_acquire(),
            next_ligature_id: 1,
            cursor: Cell::new(0),
        }
    }

    /// An empty stream with room for at least `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut stream = Self::new();
        stream.ensure_extra(capacity)?;
        Ok(stream)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Slot {
        self.cursor.set(0);
        &mut self.slots[index]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Slot> {
        self.slots.iter()
    }

    /// Push a slot at the end. Amortized O(1).
    pub fn append(&mut self, slot: Slot) -> Result<()> {
        self.ensure_extra(1)?;
        self.slots.push(slot);
        Ok(())
    }

    /// Drop all slots, keep the buffer, restart ligature ids at 1.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.next_ligature_id = 1;
        self.cursor.set(0);
    }

    /// A fresh ligature cohort id, monotonic within this stream.
    pub fn alloc_ligature_id(&mut self) -> u32 {
        let id = self.next_ligature_id;
        self.next_ligature_id += 1;
        id
    }

    /// Relocate one slot, preserving the order of the rest. O(|from-to|).
    pub fn move_slot(&mut self, from: usize, to: usize) {
        self.cursor.set(0);
        match from.cmp(&to) {
            Ordering::Less => self.slots[from..=to].rotate_left(1),
            Ordering::Greater => self.slots[to..=from].rotate_right(1),
            Ordering::Equal => {}
        }
    }

    /// Stable insertion sort over the window `[start, end)`.
    ///
    /// Reordering constraints in shaping apply to small local windows, and
    /// stability of source-offset ties must be preserved, so an insertion
    /// sort beats a general-purpose sort here.
    pub fn stable_sort<F>(&mut self, start: usize, end: usize, mut cmp: F)
    where
        F: FnMut(&Slot, &Slot) -> Ordering,
    {
        self.cursor.set(0);
        let window = &mut self.slots[start..end];
        for i in 1..window.len() {
            let mut j = i;
            while j > 0 && cmp(&window[j - 1], &window[j]) == Ordering::Greater {
                window.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    /// 1:1 substitution. Keeps provenance, clears ligature and attachment
    /// state, marks the slot substituted.
    pub fn replace_1_1(&mut self, index: usize, new_glyph_id: u32) {
        self.cursor.set(0);
        let slot = &mut self.slots[index];
        slot.glyph_id = new_glyph_id;
        slot.ligature_id = 0;
        slot.ligature_component = -1;
        slot.mark_attachment = -1;
        slot.cursive_attachment = -1;
        slot.flags |= SlotFlags::SUBSTITUTED;
    }

    /// N:1 ligation: fold the slots at `removals` into `target`.
    ///
    /// `removals` must be ascending indices greater than `target`; they are
    /// removed right-to-left so earlier indices stay valid. The target
    /// accumulates the components' codepoint counts and adopts the first
    /// non-default-ignorable, non-ZWJ component codepoint as its
    /// representative.
    pub fn ligate(
        &mut self,
        target: usize,
        removals: &[usize],
        new_glyph_id: u32,
        ligature_id: u32,
    ) {
        debug_assert!(removals.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(removals.first().map_or(true, |&r| r > target));
        self.cursor.set(0);

        let mut count = self.slots[target].codepoint_count;
        let mut representative = None;
        for cp in std::iter::once(self.slots[target].codepoint)
            .chain(removals.iter().map(|&i| self.slots[i].codepoint))
        {
            if representative.is_none()
                && !charclass::is_default_ignorable(cp)
                && !charclass::is_zero_width_joiner(cp)
            {
                representative = Some(cp);
            }
        }
        for &i in removals {
            count = count.saturating_add(self.slots[i].codepoint_count);
        }

        let slot = &mut self.slots[target];
        slot.glyph_id = new_glyph_id;
        slot.codepoint = representative.unwrap_or(slot.codepoint);
        slot.codepoint_count = count;
        slot.ligature_id = ligature_id;
        slot.ligature_component = -1;
        slot.mark_attachment = -1;
        slot.cursive_attachment = -1;
        slot.flags |= SlotFlags::LIGATED;

        for &i in removals.iter().rev() {
            self.slots.remove(i);
        }
    }

    /// 1:N decomposition: replace slot `index` with `new_glyph_ids`.
    ///
    /// All produced slots carry the original source offset and are numbered
    /// with consecutive ligature components. The first slot keeps the
    /// codepoint count so the stream total is conserved. An empty id list
    /// deletes the slot: the OpenType spec disallows zero-glyph multiple
    /// substitution but fonts in the wild rely on it, so it is tolerated.
    pub fn decompose(&mut self, index: usize, new_glyph_ids: &[u32]) -> Result<()> {
        self.cursor.set(0);
        let Some((&first, rest)) = new_glyph_ids.split_first() else {
            self.slots.remove(index);
            return Ok(());
        };
        self.ensure_extra(rest.len())?;

        let mut template = self.slots[index].clone();
        {
            let slot = &mut self.slots[index];
            slot.glyph_id = first;
            slot.ligature_component = 0;
            slot.flags |= SlotFlags::DECOMPOSED;
        }
        template.codepoint_count = 0;
        template.flags |= SlotFlags::DECOMPOSED;
        let inserted = rest.iter().enumerate().map(|(k, &id)| {
            let mut slot = template.clone();
            slot.glyph_id = id;
            slot.ligature_component = (k + 1) as i16;
            slot
        });
        self.slots.splice(index + 1..index + 1, inserted);
        Ok(())
    }

    /// Delete `count` slots starting at `index`.
    pub fn remove(&mut self, index: usize, count: usize) {
        self.cursor.set(0);
        self.slots.drain(index..index + count);
    }

    /// All slots whose `source_offset` equals `offset`, as a contiguous
    /// slice (offsets are non-decreasing). A cached cursor makes ascending
    /// queries a short forward scan; out-of-order queries restart from the
    /// front.
    pub fn query_by_offset(&self, offset: u32) -> &[Slot] {
        let mut i = self.cursor.get();
        if i >= self.slots.len() || self.slots[i].source_offset > offset {
            i = 0;
        }
        while i < self.slots.len() && self.slots[i].source_offset < offset {
            i += 1;
        }
        self.cursor.set(i);
        let start = i;
        let mut end = i;
        while end < self.slots.len() && self.slots[end].source_offset == offset {
            end += 1;
        }
        &self.slots[start..end]
    }

    /// Sum of `codepoint_count` over all slots.
    pub fn total_codepoints(&self) -> u32 {
        self.slots.iter().map(|s| u32::from(s.codepoint_count)).sum()
    }

    // Geometric growth: at least double the capacity, pooled allocation
    // failure surfaces as a fatal error rather than an abort.
    fn ensure_extra(&mut self, extra: usize) -> Result<()> {
        let needed = self.slots.len() + extra;
        if needed > self.slots.capacity() {
            let target = needed.max(self.slots.capacity() * 2);
            self.slots
                .try_reserve_exact(target - self.slots.len())
                .map_err(|_| GlifoError::Capacity)?;
        }
        Ok(())
    }
}

impl Default for GlyphStream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlyphStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphStream")
            .field("len", &self.slots.len())
            .field("next_ligature_id", &self.next_ligature_id)
            .finish()
    }
}

impl Drop for GlyphStream {
    fn drop(&mut self) {
        pool_release(std::mem::take(&mut self.slots));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::{FeatureSetting, RunId};
    use crate::tag::Tag;
    use std::sync::Arc;

    fn slot(offset: u32, cp: char, glyph: u32) -> Slot {
        let features: Arc<[FeatureSetting]> = Arc::new([]);
        Slot::new(offset, cp, glyph, 0, Tag::new(b"latn"), RunId(0), features)
    }

    fn stream_of(text: &str) -> GlyphStream {
        let mut stream = GlyphStream::new();
        for (i, ch) in text.char_indices() {
            stream.append(slot(i as u32, ch, ch as u32)).unwrap();
        }
        stream
    }

    fn offsets(stream: &GlyphStream) -> Vec<u32> {
        stream.iter().map(|s| s.source_offset).collect()
    }

    #[test]
    fn append_and_clear() {
        let mut stream = stream_of("abc");
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.alloc_ligature_id(), 1);
        assert_eq!(stream.alloc_ligature_id(), 2);
        stream.clear();
        assert!(stream.is_empty());
        assert_eq!(stream.alloc_ligature_id(), 1);
    }

    #[test]
    fn replace_keeps_provenance() {
        let mut stream = stream_of("ab");
        stream.replace_1_1(1, 99);
        let s = stream.get(1);
        assert_eq!(s.glyph_id, 99);
        assert_eq!(s.source_offset, 1);
        assert_eq!(s.codepoint, 'b');
        assert_eq!(s.codepoint_count, 1);
        assert!(s.flags.contains(SlotFlags::SUBSTITUTED));
        assert_eq!(s.ligature_component, -1);
    }

    #[test]
    fn ligate_folds_components() {
        let mut stream = stream_of("fi");
        let id = stream.alloc_ligature_id();
        stream.ligate(0, &[1], 0xFB01, id);
        assert_eq!(stream.len(), 1);
        let s = stream.get(0);
        assert_eq!(s.glyph_id, 0xFB01);
        assert_eq!(s.source_offset, 0);
        assert_eq!(s.codepoint, 'f');
        assert_eq!(s.codepoint_count, 2);
        assert_eq!(s.ligature_id, 1);
        assert!(s.flags.contains(SlotFlags::LIGATED));
    }

    #[test]
    fn ligate_skips_ignorable_representative() {
        // ZWJ first: the representative must be the first visible component.
        let mut stream = GlyphStream::new();
        stream.append(slot(0, '\u{200D}', 5)).unwrap();
        stream.append(slot(3, 'x', 6)).unwrap();
        let id = stream.alloc_ligature_id();
        stream.ligate(0, &[1], 77, id);
        assert_eq!(stream.get(0).codepoint, 'x');
        assert_eq!(stream.get(0).source_offset, 0);
    }

    #[test]
    fn decompose_conserves_codepoints() {
        let mut stream = stream_of("ab");
        stream.decompose(0, &[10, 11, 12]).unwrap();
        assert_eq!(stream.len(), 4);
        assert_eq!(offsets(&stream), vec![0, 0, 0, 1]);
        assert_eq!(stream.total_codepoints(), 2);
        for (k, s) in stream.slots()[..3].iter().enumerate() {
            assert_eq!(s.ligature_component, k as i16);
            assert!(s.flags.contains(SlotFlags::DECOMPOSED));
        }
    }

    #[test]
    fn decompose_empty_deletes() {
        let mut stream = stream_of("ab");
        stream.decompose(0, &[]).unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.get(0).codepoint, 'b');
    }

    #[test]
    fn remove_drops_a_range() {
        let mut stream = stream_of("abcd");
        stream.remove(1, 2);
        let cps: Vec<char> = stream.iter().map(|s| s.codepoint).collect();
        assert_eq!(cps, vec!['a', 'd']);
    }

    #[test]
    fn move_slot_preserves_rest() {
        let mut stream = stream_of("abcd");
        stream.move_slot(3, 1);
        let cps: Vec<char> = stream.iter().map(|s| s.codepoint).collect();
        assert_eq!(cps, vec!['a', 'd', 'b', 'c']);
        stream.move_slot(1, 3);
        let cps: Vec<char> = stream.iter().map(|s| s.codepoint).collect();
        assert_eq!(cps, vec!['a', 'b', 'c', 'd']);
    }

    #[test]
    fn stable_sort_window_keeps_ties() {
        let mut stream = GlyphStream::new();
        stream.append(slot(0, 'a', 3)).unwrap();
        stream.append(slot(1, 'b', 1)).unwrap();
        stream.append(slot(1, 'c', 1)).unwrap();
        stream.append(slot(2, 'd', 0)).unwrap();
        stream.stable_sort(0, 3, |a, b| a.glyph_id.cmp(&b.glyph_id));
        let order: Vec<char> = stream.iter().map(|s| s.codepoint).collect();
        // b and c tie on glyph id and must keep their relative order.
        assert_eq!(order, vec!['b', 'c', 'a', 'd']);
    }

    #[test]
    fn query_by_offset_scans_forward() {
        let mut stream = stream_of("ab");
        stream.decompose(0, &[10, 11]).unwrap();
        assert_eq!(stream.query_by_offset(0).len(), 2);
        assert_eq!(stream.query_by_offset(1).len(), 1);
        // Out-of-order query restarts cleanly.
        assert_eq!(stream.query_by_offset(0).len(), 2);
        assert!(stream.query_by_offset(7).is_empty());
    }

    #[test]
    fn buffer_returns_to_pool() {
        let mut stream = GlyphStream::with_capacity(64).unwrap();
        stream.append(slot(0, 'a', 1)).unwrap();
        drop(stream);
        let reused = GlyphStream::new();
        assert!(reused.slots.capacity() >= 64);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        // Offsets stay non-decreasing and codepoints are conserved under
        // arbitrary interleavings of the stream edit operations.
        proptest! {
            #[test]
            fn edits_preserve_invariants(
                text in "[a-p]{2,24}",
                ops in proptest::collection::vec((0u8..4, 0usize..24, 0usize..24), 0..16),
            ) {
                let mut stream = stream_of(&text);
                let original = stream.total_codepoints();

                for (op, a, b) in ops {
                    if stream.is_empty() {
                        break;
                    }
                    let i = a % stream.len();
                    match op {
                        0 => stream.replace_1_1(i, b as u32),
                        1 => {
                            // Split into two glyphs.
                            stream.decompose(i, &[b as u32, b as u32 + 1]).unwrap();
                        }
                        2 => {
                            if i + 1 < stream.len() {
                                let id = stream.alloc_ligature_id();
                                stream.ligate(i, &[i + 1], b as u32, id);
                            }
                        }
                        _ => {
                            let from = i;
                            let to = b % stream.len();
                            // Only moves that keep offsets sorted are legal;
                            // emulate a mark reorder between equal offsets.
                            if stream.get(from).source_offset
                                == stream.get(to).source_offset
                            {
                                stream.move_slot(from, to);
                            }
                        }
                    }
                    prop_assert_eq!(stream.total_codepoints(), original);
                    let offs: Vec<u32> =
                        stream.iter().map(|s| s.source_offset).collect();
                    prop_assert!(offs.windows(2).all(|w| w[0] <= w[1]));
                }
            }
        }
    }
}
