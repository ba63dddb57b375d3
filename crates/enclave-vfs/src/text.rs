//! Text encodings for read, write and append.
//!
//! Content defaults to UTF-8. A request may name another encoding by its
//! WHATWG label (`"windows-1252"`, `"latin1"`, `"shift_jis"`, ...). Decoding
//! and encoding are strict: malformed input or characters the encoding
//! cannot represent are [`FsError::Encoding`], never replaced.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;
use enclave_core::{FsError, FsResult};

/// A character encoding accepted by file requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    /// UTF-8, the default.
    #[must_use]
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Look up an encoding by label, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::PathValidation`] for an unknown label.
    pub fn for_label(label: &str) -> FsResult<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| FsError::validation(label, format!("unknown encoding '{label}'")))
    }

    /// Canonical name, e.g. `UTF-8` or `windows-1252`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Whether text can be written in this encoding. UTF-16 variants are
    /// read-only.
    #[must_use]
    pub fn can_encode(self) -> bool {
        self.0.output_encoding() == self.0
    }

    /// Decode `bytes` read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Encoding`] if `bytes` are malformed for this
    /// encoding.
    pub fn decode(self, path: &str, bytes: Vec<u8>) -> FsResult<String> {
        if self == Self::utf8() {
            return String::from_utf8(bytes).map_err(|e| FsError::Encoding {
                path: path.to_owned(),
                encoding: self.name().to_owned(),
                message: e.utf8_error().to_string(),
            });
        }
        match self.0.decode_without_bom_handling_and_without_replacement(&bytes) {
            Some(text) => Ok(text.into_owned()),
            None => Err(FsError::Encoding {
                path: path.to_owned(),
                encoding: self.name().to_owned(),
                message: "malformed byte sequence".to_owned(),
            }),
        }
    }

    /// Encode caller text for storage at `path`.
    ///
    /// `content` arrives as bytes and must be UTF-8 text first.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Encoding`] if `content` is not UTF-8, contains a
    /// character this encoding cannot represent, or the encoding is
    /// read-only.
    pub fn encode(self, path: &str, content: Vec<u8>) -> FsResult<Vec<u8>> {
        let text = String::from_utf8(content).map_err(|e| FsError::Encoding {
            path: path.to_owned(),
            encoding: self.name().to_owned(),
            message: format!("content is not text: {}", e.utf8_error()),
        })?;
        if self == Self::utf8() {
            return Ok(text.into_bytes());
        }
        if !self.can_encode() {
            return Err(FsError::Encoding {
                path: path.to_owned(),
                encoding: self.name().to_owned(),
                message: "text cannot be written in this encoding".to_owned(),
            });
        }
        let (bytes, _, unmappable) = self.0.encode(&text);
        if unmappable {
            return Err(FsError::Encoding {
                path: path.to_owned(),
                encoding: self.name().to_owned(),
                message: "content has characters this encoding cannot represent".to_owned(),
            });
        }
        Ok(match bytes {
            Cow::Borrowed(b) => b.to_vec(),
            Cow::Owned(b) => b,
        })
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_core::ErrorKind;

    #[test]
    fn test_labels() {
        assert_eq!(TextEncoding::for_label("utf-8").unwrap(), TextEncoding::utf8());
        assert_eq!(TextEncoding::for_label("Latin1").unwrap().name(), "windows-1252");
        let err = TextEncoding::for_label("klingon").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathValidation);
    }

    #[test]
    fn test_single_byte_round_trip() {
        let latin = TextEncoding::for_label("windows-1252").unwrap();
        let bytes = latin.encode("a.txt", "café".into()).unwrap();
        assert_eq!(bytes, b"caf\xe9");
        assert_eq!(latin.decode("a.txt", bytes).unwrap(), "café");
    }

    #[test]
    fn test_unmappable_character_fails_to_encode() {
        let latin = TextEncoding::for_label("windows-1252").unwrap();
        let err = latin.encode("a.txt", "snow \u{2603}".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn test_malformed_input_fails_to_decode() {
        let err = TextEncoding::utf8().decode("a.txt", vec![0xff, 0xfe]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let utf16 = TextEncoding::for_label("utf-16le").unwrap();
        assert_eq!(utf16.decode("a.txt", vec![0x41, 0x00]).unwrap(), "A");
        let err = utf16.decode("a.txt", vec![0x41, 0x00, 0x42]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }

    #[test]
    fn test_utf16_is_read_only() {
        let utf16 = TextEncoding::for_label("utf-16le").unwrap();
        assert!(!utf16.can_encode());
        let err = utf16.encode("a.txt", "A".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}
