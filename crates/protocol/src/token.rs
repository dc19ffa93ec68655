//! Path tokens: the opaque navigation state handed to the file picker.
//!
//! # Token Format
//!
//! A token is a length-prefixed binary record, encoded as URL-safe base64
//! without padding:
//! - 4 bytes: magic bytes "PFTK"
//! - 1 byte: codec version
//! - 8 bytes: context id (big-endian)
//! - 8 bytes: item id (big-endian)
//! - component, filearea, filepath: 2-byte big-endian length + UTF-8
//! - 1 byte: filename presence flag (0 or 1), then 2-byte length + UTF-8
//!
//! Decoding is strict: any byte outside that shape, including trailing data,
//! rejects the whole token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::validate::{
    validate_alphaext, validate_context_id, validate_filename, validate_filepath,
};

/// Magic bytes identifying a path token record.
pub const TOKEN_MAGIC: [u8; 4] = *b"PFTK";

/// Current token codec version.
pub const TOKEN_VERSION: u8 = 1;

/// Fixed header size: 4 (magic) + 1 (version) + 8 (context id) + 8 (item id).
const TOKEN_HEADER_SIZE: usize = 21;

/// Largest record the encoder can produce: header, four maximal
/// length-prefixed strings and the filename flag.
const MAX_RECORD_SIZE: usize = TOKEN_HEADER_SIZE + 4 * (2 + u16::MAX as usize) + 1;

/// Maximum length of a token in characters, the unpadded base64 length of
/// the largest record.
pub const MAX_TOKEN_LENGTH: usize = (MAX_RECORD_SIZE * 4).div_ceil(3);

/// Identity of a location in a host file area.
///
/// This is the tuple every path token carries. Directories have no
/// `filename`; files carry both their directory path and their name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileParams {
    /// Host context owning the file area.
    #[serde(rename = "contextid")]
    pub context_id: u64,
    /// Component owning the file area (e.g. `user`).
    pub component: String,
    /// File area within the component (e.g. `private`).
    pub filearea: String,
    /// Item id within the file area.
    #[serde(rename = "itemid")]
    pub item_id: u64,
    /// Slash-terminated directory path.
    pub filepath: String,
    /// File name, absent for directories.
    pub filename: Option<String>,
}

impl FileParams {
    /// Create params for a directory.
    pub fn directory(
        context_id: u64,
        component: impl Into<String>,
        filearea: impl Into<String>,
        item_id: u64,
        filepath: impl Into<String>,
    ) -> Self {
        Self {
            context_id,
            component: component.into(),
            filearea: filearea.into(),
            item_id,
            filepath: filepath.into(),
            filename: None,
        }
    }

    /// Create params for a file.
    pub fn file(
        context_id: u64,
        component: impl Into<String>,
        filearea: impl Into<String>,
        item_id: u64,
        filepath: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::directory(context_id, component, filearea, item_id, filepath)
        }
    }

    /// Encode these params into a token.
    ///
    /// Fails only when a string field is longer than `u16::MAX` bytes.
    pub fn encode(&self) -> Result<String> {
        let mut output = Vec::with_capacity(TOKEN_HEADER_SIZE + 64);

        output.extend_from_slice(&TOKEN_MAGIC);
        output.push(TOKEN_VERSION);
        output.extend_from_slice(&self.context_id.to_be_bytes());
        output.extend_from_slice(&self.item_id.to_be_bytes());

        write_str(&mut output, "component", &self.component)?;
        write_str(&mut output, "filearea", &self.filearea)?;
        write_str(&mut output, "filepath", &self.filepath)?;

        match &self.filename {
            Some(name) => {
                output.push(1);
                write_str(&mut output, "filename", name)?;
            }
            None => output.push(0),
        }

        Ok(URL_SAFE_NO_PAD.encode(&output))
    }

    /// Decode a token into params.
    ///
    /// Only the record shape is checked here; use [`FileParams::validated`]
    /// or [`decode_validated`] before handing fields to a host.
    pub fn decode(token: &str) -> Result<Self> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(ProtocolError::TokenTooLong {
                len: token.len(),
                max: MAX_TOKEN_LENGTH,
            });
        }

        let data = URL_SAFE_NO_PAD.decode(token)?;
        let mut reader = TokenReader::new(&data);

        let magic = reader.take(4)?;
        if magic != TOKEN_MAGIC {
            return Err(ProtocolError::InvalidTokenMagic {
                expected: TOKEN_MAGIC,
                got: magic.to_vec(),
            });
        }

        let version = reader.read_u8()?;
        if version != TOKEN_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let context_id = reader.read_u64()?;
        let item_id = reader.read_u64()?;
        let component = reader.read_str("component")?;
        let filearea = reader.read_str("filearea")?;
        let filepath = reader.read_str("filepath")?;

        let filename = match reader.read_u8()? {
            0 => None,
            1 => Some(reader.read_str("filename")?),
            flag => {
                return Err(ProtocolError::MalformedToken(format!(
                    "invalid filename flag {flag}"
                )))
            }
        };

        reader.finish()?;

        Ok(Self {
            context_id,
            component,
            filearea,
            item_id,
            filepath,
            filename,
        })
    }

    /// Check every field against its expected syntax.
    pub fn validated(self) -> Result<Self> {
        validate_context_id(self.context_id)?;
        validate_alphaext("component", &self.component)?;
        validate_alphaext("filearea", &self.filearea)?;
        validate_filepath(&self.filepath)?;
        if let Some(name) = &self.filename {
            validate_filename(name)?;
        }
        Ok(self)
    }

    /// Whether these params name a directory.
    pub fn is_directory(&self) -> bool {
        self.filename.is_none()
    }
}

/// Encode params into a token.
pub fn encode_token(params: &FileParams) -> Result<String> {
    params.encode()
}

/// Decode a token without validating its fields.
pub fn decode_token(token: &str) -> Result<FileParams> {
    FileParams::decode(token)
}

/// Decode a token and validate every field.
pub fn decode_validated(token: &str) -> Result<FileParams> {
    FileParams::decode(token)?.validated()
}

fn write_str(output: &mut Vec<u8>, field: &'static str, value: &str) -> Result<()> {
    let len = u16::try_from(value.len())
        .map_err(|_| ProtocolError::invalid_field(field, "too long to encode"))?;
    output.extend_from_slice(&len.to_be_bytes());
    output.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Cursor over a decoded token record.
struct TokenReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                ProtocolError::MalformedToken(format!(
                    "insufficient data: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.data.len()
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(bytes))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(bytes))
    }

    fn read_str(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ProtocolError::MalformedToken(format!("{field} is not valid UTF-8")))
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.data.len() {
            return Err(ProtocolError::MalformedToken(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }
}
