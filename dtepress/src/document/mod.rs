//! Typed model of a DTE (Documento Tributario Electrónico).
//!
//! Only the sections the rendering pipeline consumes are modelled:
//! document identification, issuer, receiver, totals and detail lines.
//! Anything else in the source XML is ignored on parse.

mod parser;

pub use parser::{parse_dte, DocumentError};

use serde::Deserialize;

/// Document type code for a debit note (nota de débito).
pub const DEBIT_NOTE: u16 = 56;

/// Document type code for a credit note (nota de crédito).
pub const CREDIT_NOTE: u16 = 61;

/// Returns a human-readable name for a document type code.
pub fn doc_type_name(code: u16) -> &'static str {
    match code {
        33 => "Factura Electrónica",
        34 => "Factura No Afecta o Exenta Electrónica",
        39 => "Boleta Electrónica",
        52 => "Guía de Despacho Electrónica",
        DEBIT_NOTE => "Nota de Débito Electrónica",
        CREDIT_NOTE => "Nota de Crédito Electrónica",
        _ => "Documento Tributario Electrónico",
    }
}

/// A parsed DTE document.
#[derive(Debug, Clone, Deserialize)]
pub struct Dte {
    #[serde(rename = "Documento")]
    pub documento: Documento,
}

/// The document body.
#[derive(Debug, Clone, Deserialize)]
pub struct Documento {
    #[serde(rename = "Encabezado")]
    pub encabezado: Encabezado,
    #[serde(rename = "Detalle", default)]
    pub detalle: Vec<Detalle>,
}

/// Document header: identification, parties and totals.
#[derive(Debug, Clone, Deserialize)]
pub struct Encabezado {
    #[serde(rename = "IdDoc")]
    pub id_doc: IdDoc,
    #[serde(rename = "Emisor")]
    pub emisor: Emisor,
    #[serde(rename = "Receptor")]
    pub receptor: Receptor,
    #[serde(rename = "Totales")]
    pub totales: Totales,
}

/// Document identification.
#[derive(Debug, Clone, Deserialize)]
pub struct IdDoc {
    #[serde(rename = "TipoDTE")]
    pub tipo_dte: u16,
    #[serde(rename = "Folio")]
    pub folio: u64,
    #[serde(rename = "FchEmis", default)]
    pub fecha_emision: Option<String>,
}

/// Issuing party.
#[derive(Debug, Clone, Deserialize)]
pub struct Emisor {
    #[serde(rename = "RUTEmisor")]
    pub rut: String,
    #[serde(rename = "RznSoc", default)]
    pub razon_social: Option<String>,
    #[serde(rename = "GiroEmis", default)]
    pub giro: Option<String>,
    #[serde(rename = "DirOrigen", default)]
    pub direccion: Option<String>,
    #[serde(rename = "CmnaOrigen", default)]
    pub comuna: Option<String>,
}

/// Receiving party.
#[derive(Debug, Clone, Deserialize)]
pub struct Receptor {
    #[serde(rename = "RUTRecep")]
    pub rut: String,
    #[serde(rename = "RznSocRecep", default)]
    pub razon_social: Option<String>,
    #[serde(rename = "GiroRecep", default)]
    pub giro: Option<String>,
    #[serde(rename = "DirRecep", default)]
    pub direccion: Option<String>,
    #[serde(rename = "CmnaRecep", default)]
    pub comuna: Option<String>,
}

/// Monetary totals.
#[derive(Debug, Clone, Deserialize)]
pub struct Totales {
    #[serde(rename = "MntNeto", default)]
    pub neto: Option<i64>,
    #[serde(rename = "IVA", default)]
    pub iva: Option<i64>,
    #[serde(rename = "MntTotal")]
    pub total: i64,
}

/// One detail line.
#[derive(Debug, Clone, Deserialize)]
pub struct Detalle {
    #[serde(rename = "NroLinDet")]
    pub linea: u32,
    #[serde(rename = "NmbItem")]
    pub item: String,
    #[serde(rename = "QtyItem", default)]
    pub cantidad: Option<f64>,
    #[serde(rename = "PrcItem", default)]
    pub precio: Option<f64>,
    #[serde(rename = "MontoItem")]
    pub monto: i64,
}

/// Fields that identify a document for routing and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentIdentity {
    /// Numeric document type code (TipoDTE).
    pub doc_type: u16,
    /// Document serial number (Folio).
    pub serial: u64,
    /// Numeric stem of the issuer RUT, used in generated file names.
    pub issuer: u64,
}

impl DocumentIdentity {
    /// True for the note types that reject a cedible declaration.
    pub fn is_note(&self) -> bool {
        matches!(self.doc_type, DEBIT_NOTE | CREDIT_NOTE)
    }
}

impl Dte {
    /// Extracts the identifying fields used for validation and routing.
    ///
    /// The issuer RUT's check digit is dropped; `76543210-K` identifies
    /// issuer `76543210`.
    pub fn identity(&self) -> Result<DocumentIdentity, DocumentError> {
        let id = &self.documento.encabezado.id_doc;
        let rut = &self.documento.encabezado.emisor.rut;
        let stem = rut.split('-').next().unwrap_or_default();
        let issuer = stem
            .parse::<u64>()
            .map_err(|_| DocumentError::InvalidRut(rut.clone()))?;

        Ok(DocumentIdentity {
            doc_type: id.tipo_dte,
            serial: id.folio,
            issuer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_names() {
        assert_eq!(doc_type_name(33), "Factura Electrónica");
        assert_eq!(doc_type_name(61), "Nota de Crédito Electrónica");
        assert_eq!(doc_type_name(999), "Documento Tributario Electrónico");
    }

    #[test]
    fn test_notes_are_flagged() {
        let note = DocumentIdentity {
            doc_type: CREDIT_NOTE,
            serial: 1,
            issuer: 1,
        };
        let invoice = DocumentIdentity {
            doc_type: 33,
            serial: 1,
            issuer: 1,
        };
        assert!(note.is_note());
        assert!(!invoice.is_note());
    }
}
