// src/mask/iter.rs

use super::MAX_WORDS;
use crate::bits::{self, Word, WORD_BITS};

/// Ascending set-lane iterator.
///
/// Takes the lowest set bit of the current word, then clears it, so the
/// loop body never branches per lane. Drives masked load/store loops.
#[derive(Debug, Clone)]
pub struct SetBits {
    words: [Word; MAX_WORDS],
    word: usize,
    word_count: usize,
}

impl SetBits {
    pub(crate) fn new(words: [Word; MAX_WORDS], word_count: usize) -> Self {
        Self {
            words,
            word: 0,
            word_count,
        }
    }
}

impl Iterator for SetBits {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.word < self.word_count {
            let w = self.words[self.word];
            if w != 0 {
                let bit = bits::trailing_zeros(w) as usize;
                self.words[self.word] = w & (w - 1);
                return Some(self.word * WORD_BITS + bit);
            }
            self.word += 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining: usize = self.words[self.word.min(self.word_count)..self.word_count]
            .iter()
            .map(|w| bits::popcount(*w) as usize)
            .sum();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SetBits {}

impl core::iter::FusedIterator for SetBits {}
