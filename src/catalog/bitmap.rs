//! Member Bitmap for Catalog Snapshots
//!
//! Each series in a frozen catalog snapshot gets a dense ordinal. A bitmap
//! where bit N is set means "series N is a member". Filter matches and the
//! include/exclude/intersect set algebra are all carried out on bitmaps.
//!
//! # Performance
//!
//! - Membership test: O(1)
//! - Union/difference/intersection: O(n / 64) word operations
//! - Memory: 1 bit per series in the snapshot
//!
//! # Example
//!
//! ```rust
//! use tsgroup::catalog::MemberBitmap;
//!
//! let mut a = MemberBitmap::new();
//! a.set(1);
//! a.set(70);
//!
//! let mut b = MemberBitmap::new();
//! b.set(70);
//!
//! assert_eq!(a.and_not(&b).to_ordinals(), vec![1]);
//! assert_eq!(a.and(&b).cardinality(), 1);
//! ```

/// Dense index of a series inside one catalog snapshot
pub type Ordinal = u32;

/// A bitmap of snapshot ordinals
///
/// Uses a vector of u64 words, where each bit represents one series.
#[derive(Debug, Clone, Default)]
pub struct MemberBitmap {
    /// Bitmap words (64 bits each)
    words: Vec<u64>,

    /// Number of bits set (cached for fast cardinality)
    cardinality: usize,
}

impl MemberBitmap {
    /// Create an empty bitmap
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bitmap with every ordinal below `len` set
    pub fn full(len: usize) -> Self {
        let mut words = vec![u64::MAX; len / 64];
        let rem = len % 64;
        if rem > 0 {
            words.push((1u64 << rem) - 1);
        }
        Self {
            words,
            cardinality: len,
        }
    }

    /// Mark an ordinal as a member
    pub fn set(&mut self, ordinal: Ordinal) {
        let id = ordinal as usize;
        let word_idx = id / 64;
        let bit_idx = id % 64;

        if word_idx >= self.words.len() {
            self.words.resize(word_idx + 1, 0);
        }

        let mask = 1u64 << bit_idx;
        if self.words[word_idx] & mask == 0 {
            self.words[word_idx] |= mask;
            self.cardinality += 1;
        }
    }

    /// Check if an ordinal is a member
    pub fn contains(&self, ordinal: Ordinal) -> bool {
        let id = ordinal as usize;
        let word_idx = id / 64;
        let bit_idx = id % 64;

        match self.words.get(word_idx) {
            Some(word) => word & (1u64 << bit_idx) != 0,
            None => false,
        }
    }

    /// Number of members
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Check if bitmap is empty
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// Intersection
    pub fn and(&self, other: &MemberBitmap) -> MemberBitmap {
        let min_len = self.words.len().min(other.words.len());
        Self::from_words((0..min_len).map(|i| self.words[i] & other.words[i]).collect())
    }

    /// Union
    pub fn or(&self, other: &MemberBitmap) -> MemberBitmap {
        let mut result = self.clone();
        result.or_assign(other);
        result
    }

    /// In-place union
    pub fn or_assign(&mut self, other: &MemberBitmap) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }

        let mut cardinality = 0;
        for (i, word) in self.words.iter_mut().enumerate() {
            *word |= other.words.get(i).copied().unwrap_or(0);
            cardinality += word.count_ones() as usize;
        }
        self.cardinality = cardinality;
    }

    /// Difference: self AND NOT other
    pub fn and_not(&self, other: &MemberBitmap) -> MemberBitmap {
        Self::from_words(
            self.words
                .iter()
                .enumerate()
                .map(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0))
                .collect(),
        )
    }

    /// Check whether two bitmaps share no member
    pub fn is_disjoint(&self, other: &MemberBitmap) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Iterate over all set ordinals in ascending order
    pub fn iter(&self) -> MemberIter<'_> {
        MemberIter {
            bitmap: self,
            word_idx: 0,
            bit_idx: 0,
        }
    }

    /// Collect all set ordinals into a vector
    pub fn to_ordinals(&self) -> Vec<Ordinal> {
        self.iter().collect()
    }

    /// Get memory usage in bytes
    pub fn memory_bytes(&self) -> usize {
        self.words.len() * 8
    }

    fn from_words(words: Vec<u64>) -> Self {
        let cardinality = words.iter().map(|w| w.count_ones() as usize).sum();
        Self { words, cardinality }
    }
}

impl PartialEq for MemberBitmap {
    fn eq(&self, other: &Self) -> bool {
        // Trailing zero words carry no members
        let len = self.words.len().max(other.words.len());
        self.cardinality == other.cardinality
            && (0..len).all(|i| {
                self.words.get(i).copied().unwrap_or(0) == other.words.get(i).copied().unwrap_or(0)
            })
    }
}

impl Eq for MemberBitmap {}

impl FromIterator<Ordinal> for MemberBitmap {
    fn from_iter<I: IntoIterator<Item = Ordinal>>(iter: I) -> Self {
        let mut bitmap = MemberBitmap::new();
        for ordinal in iter {
            bitmap.set(ordinal);
        }
        bitmap
    }
}

/// Iterator over set bits in a bitmap
pub struct MemberIter<'a> {
    bitmap: &'a MemberBitmap,
    word_idx: usize,
    bit_idx: usize,
}

impl Iterator for MemberIter<'_> {
    type Item = Ordinal;

    fn next(&mut self) -> Option<Self::Item> {
        while self.word_idx < self.bitmap.words.len() {
            let word = self.bitmap.words[self.word_idx];

            // Skip the bits already visited in this word
            let remaining = if self.bit_idx >= 64 {
                0
            } else {
                word >> self.bit_idx
            };

            if remaining != 0 {
                let bit = self.bit_idx + remaining.trailing_zeros() as usize;
                self.bit_idx = bit + 1;
                return Some((self.word_idx * 64 + bit) as Ordinal);
            }

            self.word_idx += 1;
            self.bit_idx = 0;
        }

        None
    }
}
