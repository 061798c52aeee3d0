//! Form body decoding
//!
//! Execute requests carry their fields as an `application/x-www-form-urlencoded`
//! body. Percent-escapes decode to raw bytes, and those bytes are turned into
//! text with the charset the request declared in `Content-Type`, so a client
//! posting Latin-1 gets Latin-1 decoding rather than mojibake.

use percent_encoding::percent_decode;

/// Character encodings understood by the form decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Charset {
    /// Looks up a charset by its IANA label, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "unicode-1-1-utf-8" => Some(Charset::Utf8),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "l1" => Some(Charset::Latin1),
            "us-ascii" | "ascii" => Some(Charset::Ascii),
            _ => None,
        }
    }

    /// Picks the charset declared by a `Content-Type` header value.
    ///
    /// A missing header or missing `charset` parameter means UTF-8. An
    /// unrecognised label is logged and also falls back to UTF-8.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Charset::default();
        };

        let label = content_type
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'));

        match label {
            None => Charset::default(),
            Some(label) => Self::from_label(label).unwrap_or_else(|| {
                tracing::warn!("Unsupported request charset '{}', decoding as UTF-8", label);
                Charset::default()
            }),
        }
    }

    /// Decodes raw bytes into text. Invalid sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Charset::Ascii => bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        }
    }
}

/// Decoded key/value pairs of a form body, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    /// Parses a form-encoded body.
    ///
    /// Never fails: malformed escapes are kept literally and segments without
    /// `=` become keys with an empty value.
    pub fn parse(body: &[u8], charset: Charset) -> Self {
        let pairs = body
            .split(|&b| b == b'&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (key, value) = match segment.iter().position(|&b| b == b'=') {
                    Some(pos) => (&segment[..pos], &segment[pos + 1..]),
                    None => (segment, &[][..]),
                };
                (decode_component(key, charset), decode_component(value, charset))
            })
            .collect();

        Self { pairs }
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn decode_component(raw: &[u8], charset: Charset) -> String {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    let bytes: Vec<u8> = percent_decode(&spaced).collect();
    charset.decode(&bytes)
}
