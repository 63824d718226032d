// This file is derived from ttf-parser, licenced under Apache-2.0.
// https://github.com/RazrFalcon/ttf-parser/blob/439aaaebd50eb8aed66302e3c1b51fae047f85b2/src/tables/cff/argstack.rs

use std::fmt::Debug;

/// Storage for the operand stack while validating CharStrings.
///
/// The stack grows as needed. Its depth can be adjusted without pushing values, since the
/// validator only tracks the effect of most operators on the depth. Slots exposed that way keep
/// whatever they held before, or zero if they were never written.
#[derive(Default)]
pub struct ArgumentsStack {
    data: Vec<f64>,
    len: usize,
}

impl ArgumentsStack {
    pub fn new() -> Self {
        ArgumentsStack::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, n: f64) {
        if self.len < self.data.len() {
            self.data[self.len] = n;
        } else {
            self.data.push(n);
        }
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        self.len -= 1;
        Some(self.data[self.len])
    }

    pub fn at(&self, index: usize) -> f64 {
        self.data.get(index).copied().unwrap_or(0.0)
    }

    /// Replace the value `depth` places below the top, 1 being the top itself.
    pub fn set_from_top(&mut self, depth: usize, value: f64) {
        if let Some(index) = self.len.checked_sub(depth) {
            self.data[index] = value;
        }
    }

    pub fn set_len(&mut self, len: usize) {
        if len > self.data.len() {
            self.data.resize(len, 0.0);
        }
        self.len = len;
    }

    /// Last `n` values, or `None` if fewer are on the stack.
    pub fn top(&self, n: usize) -> Option<&[f64]> {
        let start = self.len.checked_sub(n)?;
        Some(&self.data[start..self.len])
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Debug for ArgumentsStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(&self.data[..self.len]).finish()
    }
}
