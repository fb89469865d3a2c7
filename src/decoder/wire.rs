// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

//! A cursor over raw `tag=value<SOH>` wire bytes with a one-shot rewind:
//! `advance` steps to the next chunk, `rewind` steps exactly one chunk
//! back by reconstructing its byte length from the tag/value just read.
//! There is no stack of positions to unwind through — a second `rewind`
//! without an intervening `advance` is a programming error, not a deeper
//! undo.

use super::errors::FixSpecError;

pub const SOH: u8 = 0x01;

pub struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    pub tag: String,
    pub value: String,
    /// Captured the moment tag `35` (MsgType) is read.
    pub msgtype: Option<String>,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            tag: String::new(),
            value: String::new(),
            msgtype: None,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read the next `tag=value` chunk. Returns its byte length
    /// (including both delimiters), or `0` at end of input. `tag`/`value`
    /// are cleared first, so a `0` return always means "nothing here".
    pub fn advance(&mut self) -> Result<usize, FixSpecError> {
        self.tag.clear();
        self.value.clear();

        if self.pos >= self.bytes.len() {
            return Ok(0);
        }

        let rest = &self.bytes[self.pos..];
        let eq = rest
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| FixSpecError::WireParse("missing '=' in field chunk".into()))?;
        let after_eq = &rest[eq + 1..];
        let soh = after_eq
            .iter()
            .position(|&b| b == SOH)
            .ok_or_else(|| FixSpecError::WireParse("missing SOH terminator in field chunk".into()))?;

        let tag_str = std::str::from_utf8(&rest[..eq])
            .map_err(|e| FixSpecError::WireParse(format!("tag is not valid UTF-8: {e}")))?;
        let val_str = std::str::from_utf8(&after_eq[..soh])
            .map_err(|e| FixSpecError::WireParse(format!("value is not valid UTF-8: {e}")))?;

        self.tag.push_str(tag_str);
        self.value.push_str(val_str);
        if self.tag == "35" {
            self.msgtype = Some(self.value.clone());
        }

        let chunk_len = eq + 1 + soh + 1;
        self.pos += chunk_len;
        Ok(chunk_len)
    }

    /// Undo the most recent `advance`. Error if there is no chunk to undo
    /// (either nothing has been read yet, or the last `advance` returned
    /// `0`).
    pub fn rewind(&mut self) -> Result<(), FixSpecError> {
        if self.tag.is_empty() || self.value.is_empty() {
            return Err(FixSpecError::WireParse("rewind with no chunk to undo".into()));
        }
        let chunk_len = self.tag.len() + 1 + self.value.len() + 1;
        self.pos -= chunk_len;
        self.tag.clear();
        self.value.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_through_chunks_in_order() {
        let raw = b"8=FIX.4.4\x019=5\x0135=0\x01";
        let mut wire = WireReader::new(raw);
        assert!(wire.advance().unwrap() > 0);
        assert_eq!(wire.tag, "8");
        assert_eq!(wire.value, "FIX.4.4");

        assert!(wire.advance().unwrap() > 0);
        assert_eq!(wire.tag, "9");

        assert!(wire.advance().unwrap() > 0);
        assert_eq!(wire.tag, "35");
        assert_eq!(wire.msgtype.as_deref(), Some("0"));

        assert_eq!(wire.advance().unwrap(), 0);
    }

    #[test]
    fn rewind_is_exact_and_one_shot() {
        let raw = b"8=FIX.4.4\x0135=D\x01";
        let mut wire = WireReader::new(raw);
        wire.advance().unwrap();
        let pos_after_first = wire.position();
        wire.advance().unwrap();
        wire.rewind().unwrap();
        assert_eq!(wire.position(), pos_after_first);

        let next = wire.advance().unwrap();
        assert!(next > 0);
        assert_eq!(wire.tag, "35");
    }

    #[test]
    fn rewind_without_a_prior_advance_errors() {
        let raw = b"8=FIX.4.4\x01";
        let mut wire = WireReader::new(raw);
        assert!(wire.rewind().is_err());
    }
}
