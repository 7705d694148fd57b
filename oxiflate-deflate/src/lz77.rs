//! LZ77 match finding for DEFLATE compression.
//!
//! The encoder keeps a sliding window of twice the history size. New input
//! is appended at the end; once the cursor nears the end of the buffer the
//! upper half slides down and every stored position is rebased.
//!
//! # Hash chains
//!
//! Every position with three bytes available is hashed on those bytes. The
//! `head` table holds the most recent position for each hash, `prev` links
//! each position to the previous one with the same hash. A search walks the
//! chain from nearest to farthest and keeps the longest match, so among equal
//! lengths the smallest distance wins.

use crate::tables::{MAX_MATCH, MIN_MATCH};

/// Lookahead needed to guarantee a full-length match can be examined.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Three-byte matches farther back than this cost more than literals.
pub const TOO_FAR: usize = 4096;

/// Empty hash slot.
const NIL: u32 = u32::MAX;

/// A token produced by LZ77 parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

// ============================================================================
// Level parameters
// ============================================================================

/// How input is parsed into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseKind {
    /// Stored blocks, no parsing.
    Stored,
    /// Take the first acceptable match.
    Greedy,
    /// Defer each match by one byte in case the next one is longer.
    Lazy,
}

/// Search tuning for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelParams {
    /// Quarter the chain once a match this long is in hand.
    pub good_length: usize,
    /// Greedy: longest match whose positions are all hashed.
    /// Lazy: do not look for a better match beyond this length.
    pub max_lazy: usize,
    /// Stop searching once a match this long is found.
    pub nice_length: usize,
    /// Maximum chain links followed per search.
    pub max_chain: usize,
    /// Parsing method.
    pub kind: ParseKind,
}

impl LevelParams {
    /// Parameters for `level` (0-9, clamped).
    pub fn for_level(level: u8) -> Self {
        let (good_length, max_lazy, nice_length, max_chain, kind) = match level.min(9) {
            0 => (0, 0, 0, 0, ParseKind::Stored),
            1 => (4, 4, 8, 4, ParseKind::Greedy),
            2 => (4, 5, 16, 8, ParseKind::Greedy),
            3 => (4, 6, 32, 32, ParseKind::Greedy),
            4 => (4, 4, 16, 16, ParseKind::Lazy),
            5 => (8, 16, 32, 32, ParseKind::Lazy),
            6 => (8, 16, 128, 128, ParseKind::Lazy),
            7 => (8, 32, 128, 256, ParseKind::Lazy),
            8 => (32, 128, 258, 1024, ParseKind::Lazy),
            _ => (32, 258, 258, 4096, ParseKind::Lazy),
        };
        Self {
            good_length,
            max_lazy,
            nice_length,
            max_chain,
            kind,
        }
    }
}

// ============================================================================
// Match finder
// ============================================================================

/// Sliding window with hash chains.
#[derive(Debug, Clone)]
pub struct MatchFinder {
    /// Window of `2 * w_size` bytes.
    window: Vec<u8>,
    w_size: usize,
    w_mask: usize,
    /// Most recent position per hash.
    head: Vec<u32>,
    /// Previous position with the same hash, indexed by `pos & w_mask`.
    prev: Vec<u32>,
    hash_bits: u32,
    /// Position of the next byte to parse.
    strstart: usize,
    /// Bytes available from `strstart` on.
    lookahead: usize,
    /// Positions below this are not history.
    floor: usize,
}

impl MatchFinder {
    /// Create a finder with a `1 << window_bits` history and a hash table of
    /// `1 << (mem_level + 7)` entries.
    ///
    /// Arguments are clamped to 9..=15 and 1..=9; callers validate them
    /// through [`DeflateConfig`](crate::config::DeflateConfig).
    pub fn new(window_bits: u8, mem_level: u8) -> Self {
        let w_size = 1usize << window_bits.clamp(9, 15);
        let hash_bits = mem_level.clamp(1, 9) as u32 + 7;
        Self {
            window: vec![0; 2 * w_size],
            w_size,
            w_mask: w_size - 1,
            head: vec![NIL; 1 << hash_bits],
            prev: vec![NIL; w_size],
            hash_bits,
            strstart: 0,
            lookahead: 0,
            floor: 0,
        }
    }

    /// Forget all data.
    pub fn reset(&mut self) {
        self.head.fill(NIL);
        self.prev.fill(NIL);
        self.strstart = 0;
        self.lookahead = 0;
        self.floor = 0;
    }

    /// History size in bytes.
    pub fn w_size(&self) -> usize {
        self.w_size
    }

    /// Largest distance a match may use.
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Position of the next byte to parse.
    pub fn strstart(&self) -> usize {
        self.strstart
    }

    /// Bytes buffered but not yet parsed.
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Byte at window position `pos`.
    #[inline]
    pub fn byte_at(&self, pos: usize) -> u8 {
        self.window[pos]
    }

    /// `len` window bytes starting at `pos`.
    #[inline]
    pub fn bytes(&self, pos: usize, len: usize) -> &[u8] {
        &self.window[pos..pos + len]
    }

    /// Mark `count` bytes at the cursor as parsed.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        debug_assert!(count <= self.lookahead);
        self.strstart += count;
        self.lookahead -= count;
    }

    /// Append input to the window, sliding first if needed.
    ///
    /// Returns how many bytes of `input` were taken.
    pub fn fill(&mut self, input: &[u8]) -> usize {
        if self.strstart >= self.w_size + self.max_dist() {
            self.slide();
        }
        let end = self.strstart + self.lookahead;
        let count = (self.window.len() - end).min(input.len());
        self.window[end..end + count].copy_from_slice(&input[..count]);
        self.lookahead += count;
        count
    }

    /// Move the upper half of the window down and rebase positions.
    fn slide(&mut self) {
        let w_size = self.w_size;
        self.window.copy_within(w_size.., 0);
        self.strstart -= w_size;
        self.floor = self.floor.saturating_sub(w_size);

        let rebase = |entry: &mut u32| {
            *entry = if *entry != NIL && *entry as usize >= w_size {
                *entry - w_size as u32
            } else {
                NIL
            };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Drop all history before the cursor.
    pub fn forget_history(&mut self) {
        self.head.fill(NIL);
        self.prev.fill(NIL);
        self.floor = self.strstart;
    }

    /// Preload history with a dictionary. Only the last `max_dist` bytes
    /// are usable, so only those are kept.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.reset();
        let keep = dictionary.len().min(self.max_dist());
        let dictionary = &dictionary[dictionary.len() - keep..];
        self.window[..keep].copy_from_slice(dictionary);
        self.lookahead = keep;
        for pos in 0..keep.saturating_sub(MIN_MATCH - 1) {
            self.insert(pos);
        }
        self.strstart = keep;
        self.lookahead = 0;
    }

    #[inline]
    fn hash(&self, pos: usize) -> usize {
        let key = u32::from_le_bytes([
            self.window[pos],
            self.window[pos + 1],
            self.window[pos + 2],
            0,
        ]);
        (key.wrapping_mul(0x9E37_79B1) >> (32 - self.hash_bits)) as usize
    }

    /// Hash position `pos` into the chains.
    ///
    /// Returns the previous head of its chain. Positions without three bytes
    /// of data are skipped.
    #[inline]
    pub fn insert(&mut self, pos: usize) -> Option<usize> {
        if pos + MIN_MATCH > self.strstart + self.lookahead {
            return None;
        }
        let h = self.hash(pos);
        let previous = self.head[h];
        self.prev[pos & self.w_mask] = previous;
        self.head[h] = pos as u32;
        (previous != NIL).then_some(previous as usize)
    }

    /// Longest match at the cursor that beats `prev_length`.
    ///
    /// Walks the chain starting at `chain_head`. Returns `(length, distance)`
    /// only for a match of at least [`MIN_MATCH`] bytes that is strictly
    /// longer than `prev_length`.
    pub fn longest_match(
        &self,
        chain_head: usize,
        prev_length: usize,
        params: &LevelParams,
    ) -> Option<(usize, usize)> {
        let cur = self.strstart;
        let max_len = MAX_MATCH.min(self.lookahead);
        let mut best_len = prev_length.max(MIN_MATCH - 1);
        if best_len >= max_len {
            return None;
        }

        let mut chain = params.max_chain.max(1);
        if prev_length >= params.good_length {
            chain = (chain >> 2).max(1);
        }
        let nice = params.nice_length.min(max_len);
        let max_dist = self.max_dist();
        let window = &self.window;

        let mut best_dist = 0;
        let mut next = chain_head;
        loop {
            if next >= cur || next < self.floor || cur - next > max_dist {
                break;
            }

            if window[next + best_len] == window[cur + best_len]
                && window[next] == window[cur]
                && window[next + 1] == window[cur + 1]
            {
                let len = window[next..next + max_len]
                    .iter()
                    .zip(&window[cur..cur + max_len])
                    .take_while(|(a, b)| a == b)
                    .count();
                if len > best_len {
                    best_len = len;
                    best_dist = cur - next;
                    if len >= nice {
                        break;
                    }
                }
            }

            chain -= 1;
            if chain == 0 {
                break;
            }
            let link = self.prev[next & self.w_mask];
            if link == NIL {
                break;
            }
            next = link as usize;
        }

        (best_dist > 0).then_some((best_len, best_dist))
    }

    /// Length of the distance-1 run at the cursor, if at least [`MIN_MATCH`].
    pub fn run_length(&self) -> Option<usize> {
        let cur = self.strstart;
        if cur == 0 || cur - 1 < self.floor {
            return None;
        }
        let byte = self.window[cur - 1];
        let max_len = MAX_MATCH.min(self.lookahead);
        let len = self.window[cur..cur + max_len]
            .iter()
            .take_while(|&&b| b == byte)
            .count();
        (len >= MIN_MATCH).then_some(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder_with(data: &[u8]) -> MatchFinder {
        let mut finder = MatchFinder::new(15, 8);
        assert_eq!(finder.fill(data), data.len());
        finder
    }

    /// Parse greedily and return the tokens, for exercising the finder alone.
    fn greedy_tokens(data: &[u8], level: u8) -> Vec<Lz77Token> {
        let params = LevelParams::for_level(level);
        let mut finder = finder_with(data);
        let mut tokens = Vec::new();
        while finder.lookahead() > 0 {
            let head = finder.insert(finder.strstart());
            let found = head.and_then(|h| finder.longest_match(h, 0, &params));
            match found {
                Some((length, distance)) => {
                    tokens.push(Lz77Token::Match {
                        length: length as u16,
                        distance: distance as u16,
                    });
                    finder.advance(1);
                    for _ in 1..length {
                        finder.insert(finder.strstart());
                        finder.advance(1);
                    }
                }
                None => {
                    tokens.push(Lz77Token::Literal(finder.byte_at(finder.strstart())));
                    finder.advance(1);
                }
            }
        }
        tokens
    }

    fn replay(tokens: &[Lz77Token]) -> Vec<u8> {
        let mut output = Vec::new();
        for token in tokens {
            match *token {
                Lz77Token::Literal(b) => output.push(b),
                Lz77Token::Match { length, distance } => {
                    for _ in 0..length {
                        let pos = output.len() - distance as usize;
                        output.push(output[pos]);
                    }
                }
            }
        }
        output
    }

    #[test]
    fn test_sizes_are_clamped() {
        assert_eq!(MatchFinder::new(8, 8).w_size(), 512);
        assert_eq!(MatchFinder::new(16, 8).w_size(), 32768);
        assert_eq!(MatchFinder::new(15, 8).max_dist(), 32768 - MIN_LOOKAHEAD);
    }

    #[test]
    fn test_level_table() {
        assert_eq!(LevelParams::for_level(0).kind, ParseKind::Stored);
        assert_eq!(LevelParams::for_level(3).kind, ParseKind::Greedy);
        assert_eq!(LevelParams::for_level(4).kind, ParseKind::Lazy);
        let best = LevelParams::for_level(9);
        assert_eq!((best.good_length, best.max_lazy), (32, 258));
        assert_eq!((best.nice_length, best.max_chain), (258, 4096));
        assert_eq!(LevelParams::for_level(42), best);
    }

    #[test]
    fn test_literals_only() {
        let tokens = greedy_tokens(b"abcdefgh", 6);
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn test_overlapping_match() {
        let input = b"aaaaaaaaaa";
        let tokens = greedy_tokens(input, 6);
        assert_eq!(
            tokens,
            vec![
                Lz77Token::Literal(b'a'),
                Lz77Token::Match {
                    length: 9,
                    distance: 1
                }
            ]
        );
        assert_eq!(replay(&tokens), input);
    }

    #[test]
    fn test_prefers_nearest_of_equal_matches() {
        let input = b"abcXabcYabcZ";
        let tokens = greedy_tokens(input, 9);
        let distances: Vec<u16> = tokens
            .iter()
            .filter_map(|t| match t {
                Lz77Token::Match { distance, .. } => Some(*distance),
                Lz77Token::Literal(_) => None,
            })
            .collect();
        assert_eq!(distances, vec![4, 4]);
        assert_eq!(replay(&tokens), input);
    }

    #[test]
    fn test_run_length() {
        let mut finder = finder_with(b"xyyyyyz");
        assert_eq!(finder.run_length(), None);
        finder.advance(2);
        assert_eq!(finder.run_length(), Some(4));

        finder.forget_history();
        assert_eq!(finder.run_length(), None);
    }

    #[test]
    fn test_dictionary_matches() {
        let params = LevelParams::for_level(6);
        let mut finder = MatchFinder::new(15, 8);
        finder.set_dictionary(b"hello world");
        assert_eq!(finder.strstart(), 11);
        finder.fill(b"world");

        let head = finder.insert(finder.strstart()).expect("dictionary hashed");
        assert_eq!(finder.longest_match(head, 0, &params), Some((5, 5)));
    }

    #[test]
    fn test_slide_keeps_recent_history() {
        let mut finder = MatchFinder::new(9, 1);
        let params = LevelParams::for_level(9);
        let pattern: Vec<u8> = (0..100u8).cycle().take(2000).collect();

        let mut fed = 0;
        let mut matched = 0;
        while fed < pattern.len() || finder.lookahead() > 0 {
            fed += finder.fill(&pattern[fed..]);
            while finder.lookahead() >= MIN_LOOKAHEAD
                || (fed == pattern.len() && finder.lookahead() > 0)
            {
                let head = finder.insert(finder.strstart());
                if let Some((len, dist)) = head.and_then(|h| finder.longest_match(h, 0, &params)) {
                    assert!(dist <= finder.max_dist());
                    assert_eq!(dist % 100, 0);
                    matched += len;
                }
                finder.advance(1);
            }
        }
        assert!(matched > 0);
    }
}
