//! XML parsing for DTE documents.

use thiserror::Error;

use super::Dte;

/// Errors raised while turning raw bytes into a [`Dte`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Input is not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Input is not a well-formed DTE document.
    #[error("malformed document: {0}")]
    Malformed(#[from] quick_xml::DeError),

    /// Issuer RUT has no parseable numeric stem.
    #[error("invalid issuer RUT: {0}")]
    InvalidRut(String),
}

/// Parses raw document bytes into a typed [`Dte`].
///
/// Accepts the full `<DTE><Documento>…</Documento></DTE>` envelope.
/// Unknown elements are ignored; missing mandatory fields are a
/// [`DocumentError::Malformed`].
pub fn parse_dte(raw: &[u8]) -> Result<Dte, DocumentError> {
    let text = std::str::from_utf8(raw)?;
    let dte = quick_xml::de::from_str(text)?;
    Ok(dte)
}
