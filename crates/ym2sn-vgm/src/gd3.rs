//! GD3 metadata tag
//!
//! The GD3 1.00 tag is eleven UTF-16LE strings, each NUL-terminated, in a
//! fixed order: track (en/jp), game (en/jp), system (en/jp), author (en/jp),
//! release date, converter credit, notes.

/// Converter credit written into every tag
const CONVERTER_CREDIT: &str = "ym2sn";

/// System name for the source machine's sound chip
const SYSTEM_NAME: &str = "YM2149F";

/// GD3 1.00 tag content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gd3Tag {
    /// Track name
    pub track: String,
    /// Game or source file name
    pub game: String,
    /// System name
    pub system: String,
    /// Composer
    pub author: String,
    /// Release date
    pub date: String,
    /// Who converted the file
    pub converter: String,
    /// Free-form notes
    pub notes: String,
}

impl Gd3Tag {
    /// Build a tag from YM song metadata
    pub fn from_song(title: &str, source_name: &str, author: &str, comment: &str) -> Self {
        Gd3Tag {
            track: title.to_string(),
            game: source_name.to_string(),
            system: SYSTEM_NAME.to_string(),
            author: author.to_string(),
            date: String::new(),
            converter: CONVERTER_CREDIT.to_string(),
            notes: comment.to_string(),
        }
    }

    /// Serialize to the GD3 wire layout (`Gd3 `, version, length, strings)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::new();
        // Japanese variants are left empty; the source format carries no
        // translations
        for text in [
            self.track.as_str(),
            "",
            self.game.as_str(),
            "",
            self.system.as_str(),
            "",
            self.author.as_str(),
            "",
            self.date.as_str(),
            self.converter.as_str(),
            self.notes.as_str(),
        ] {
            for unit in text.encode_utf16() {
                body.extend_from_slice(&unit.to_le_bytes());
            }
            body.extend_from_slice(&0u16.to_le_bytes());
        }

        let mut out = Vec::with_capacity(12 + body.len());
        out.extend_from_slice(b"Gd3 ");
        out.extend_from_slice(&0x0100u32.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }
}
