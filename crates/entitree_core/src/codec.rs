//! Inner-code encoding.
//!
//! An inner code is the concatenation of one fixed-width, zero-padded
//! decimal segment per level. With a segment width of 4, `"00030012"` is
//! the 12th child of the 3rd root. The empty code stands for the virtual
//! root above all top-level nodes.
//!
//! Everything here is pure string arithmetic; no I/O.

use crate::error::{TreeError, TreeResult};

/// Largest supported segment width. Nine digits always fit a `u32`.
pub const MAX_SIGN_LENGTH: usize = 9;

/// Encoder/decoder for inner codes of one segment width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathCodec {
    sign_length: usize,
}

impl PathCodec {
    /// Creates a codec for the given segment width.
    ///
    /// # Errors
    ///
    /// Returns an error unless `1 <= sign_length <= 9`.
    pub fn new(sign_length: usize) -> TreeResult<Self> {
        if sign_length == 0 || sign_length > MAX_SIGN_LENGTH {
            return Err(TreeError::invalid_operation(format!(
                "segment width must be between 1 and {MAX_SIGN_LENGTH}, got {sign_length}"
            )));
        }
        Ok(Self { sign_length })
    }

    /// Segment width in characters.
    #[must_use]
    pub const fn sign_length(&self) -> usize {
        self.sign_length
    }

    /// Largest order representable in one segment.
    #[must_use]
    pub fn max_order(&self) -> u32 {
        // sign_length <= 9 so this never overflows
        10u32.pow(self.sign_length as u32) - 1
    }

    /// Appends a segment for `order` to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::CodeOverflow`] when `order` needs more digits
    /// than the segment width.
    pub fn encode(&self, parent: &str, order: u32) -> TreeResult<String> {
        if order > self.max_order() {
            return Err(TreeError::CodeOverflow {
                order: u64::from(order),
                sign_length: self.sign_length,
            });
        }
        Ok(format!(
            "{parent}{order:0width$}",
            width = self.sign_length
        ))
    }

    /// Returns `(level, order)` of a code. The empty code decodes to
    /// `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidCode`] for malformed codes.
    pub fn decode(&self, code: &str) -> TreeResult<(u32, u32)> {
        self.validate(code)?;
        if code.is_empty() {
            return Ok((0, 0));
        }
        let order = self.parse_segment(code, &code[code.len() - self.sign_length..])?;
        Ok((self.level(code), order))
    }

    /// Checks that `code` is a whole number of digit segments.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidCode`] otherwise.
    pub fn validate(&self, code: &str) -> TreeResult<()> {
        if code.len() % self.sign_length != 0 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.invalid(code));
        }
        Ok(())
    }

    /// Depth of a code: number of segments.
    #[must_use]
    pub fn level(&self, code: &str) -> u32 {
        (code.len() / self.sign_length) as u32
    }

    /// Order of a code's last segment.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidCode`] for malformed or empty codes.
    pub fn order(&self, code: &str) -> TreeResult<u32> {
        if code.is_empty() {
            return Err(self.invalid(code));
        }
        self.decode(code).map(|(_, order)| order)
    }

    /// Drops the last `n` segments. Going above the root yields `""`.
    #[must_use]
    pub fn parent_of<'a>(&self, code: &'a str, n: usize) -> &'a str {
        let cut = n.saturating_mul(self.sign_length);
        if cut >= code.len() {
            ""
        } else {
            &code[..code.len() - cut]
        }
    }

    /// Prefix of `code` at depth `level` (the ancestor-or-self at that
    /// level). Levels deeper than the code return the code itself.
    #[must_use]
    pub fn prefix_at<'a>(&self, code: &'a str, level: u32) -> &'a str {
        let end = (level as usize).saturating_mul(self.sign_length);
        &code[..end.min(code.len())]
    }

    /// Order of the segment at `level` (1-based), if the code is that deep.
    #[must_use]
    pub fn segment(&self, code: &str, level: u32) -> Option<u32> {
        if level == 0 || level > self.level(code) {
            return None;
        }
        let start = (level as usize - 1) * self.sign_length;
        code.get(start..start + self.sign_length)?.parse().ok()
    }

    /// Rewrites the segment at `level` (1-based) to `order`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidCode`] if the code is not that deep and
    /// [`TreeError::CodeOverflow`] if `order` does not fit.
    pub fn replace_segment(&self, code: &str, level: u32, order: u32) -> TreeResult<String> {
        if level == 0 || level > self.level(code) {
            return Err(self.invalid(code));
        }
        let start = (level as usize - 1) * self.sign_length;
        let head = self.encode(&code[..start], order)?;
        Ok(format!("{head}{}", &code[start + self.sign_length..]))
    }

    /// Replaces the leading `old_prefix` of `code` with `new_prefix`.
    /// Codes outside `old_prefix` are returned unchanged.
    #[must_use]
    pub fn rebase(&self, code: &str, old_prefix: &str, new_prefix: &str) -> String {
        match code.strip_prefix(old_prefix) {
            Some(rest) => format!("{new_prefix}{rest}"),
            None => code.to_string(),
        }
    }

    /// True if `ancestor` is a proper ancestor of `descendant`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        ancestor.len() < descendant.len() && descendant.starts_with(ancestor)
    }

    /// True if both codes sit under the same parent at the same depth.
    /// Malformed codes are never siblings.
    #[must_use]
    pub fn is_sibling(&self, a: &str, b: &str) -> bool {
        !a.is_empty()
            && a.len() == b.len()
            && self.validate(a).is_ok()
            && self.validate(b).is_ok()
            && self.parent_of(a, 1) == self.parent_of(b, 1)
    }

    /// Proper ancestor codes, root first, immediate parent last.
    #[must_use]
    pub fn ancestors<'a>(&self, code: &'a str) -> Vec<&'a str> {
        (1..self.level(code))
            .map(|level| self.prefix_at(code, level))
            .collect()
    }

    /// `LIKE` pattern matching the direct children of `code`.
    #[must_use]
    pub fn children_pattern(&self, code: &str) -> String {
        format!("{code}{}", "_".repeat(self.sign_length))
    }

    fn parse_segment(&self, code: &str, segment: &str) -> TreeResult<u32> {
        segment.parse().map_err(|_| self.invalid(code))
    }

    fn invalid(&self, code: &str) -> TreeError {
        TreeError::InvalidCode {
            code: code.to_string(),
            sign_length: self.sign_length,
        }
    }
}
