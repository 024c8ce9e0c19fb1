//! LaTeX render backend.
//!
//! Emits a TeX template from the parsed document and converts templates
//! by invoking an external `pdflatex`-compatible program in a scratch
//! directory. The converter binary is configurable so installations with
//! `xelatex`, `lualatex` or `tectonic` work unchanged.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt::Write as _;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::company::CompanyPool;
use crate::document::{doc_type_name, Dte};
use crate::options::Medium;

use super::{RenderBackend, RenderError, RenderFuture, RenderedTemplate};

/// Default converter program.
pub const DEFAULT_CONVERTER: &str = "pdflatex";

/// Template file name inside the scratch directory.
const TEMPLATE_FILE: &str = "document.tex";

/// Artifact file name the converter is expected to produce.
const ARTIFACT_FILE: &str = "document.pdf";

/// Render backend producing TeX templates and PDF artifacts.
#[derive(Debug, Clone)]
pub struct LatexBackend {
    converter: String,
}

impl Default for LatexBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl LatexBackend {
    /// Creates a backend converting with the given program.
    pub fn new(converter: impl Into<String>) -> Self {
        Self {
            converter: converter.into(),
        }
    }

    /// The converter program this backend invokes.
    pub fn converter(&self) -> &str {
        &self.converter
    }

    async fn run_converter(&self, template: &RenderedTemplate) -> Result<String, RenderError> {
        let scratch = tempfile::tempdir().map_err(|source| RenderError::Spawn {
            program: self.converter.clone(),
            source,
        })?;

        let tex_path = scratch.path().join(TEMPLATE_FILE);
        tokio::fs::write(&tex_path, &template.tex)
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.converter.clone(),
                source,
            })?;
        for resource in &template.resources {
            let path = scratch.path().join(&resource.filename);
            tokio::fs::write(&path, &resource.data)
                .await
                .map_err(|source| RenderError::Spawn {
                    program: self.converter.clone(),
                    source,
                })?;
        }

        debug!(
            converter = %self.converter,
            dir = %scratch.path().display(),
            "converting template"
        );

        let output = Command::new(&self.converter)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(TEMPLATE_FILE)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                program: self.converter.clone(),
                source,
            })?;

        if !output.status.success() {
            let tail: String = String::from_utf8_lossy(&output.stdout)
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join(" | ");
            return Err(RenderError::Converter {
                program: self.converter.clone(),
                detail: format!("exit {}: {tail}", output.status),
            });
        }

        let pdf = tokio::fs::read(scratch.path().join(ARTIFACT_FILE))
            .await
            .map_err(|_| RenderError::Converter {
                program: self.converter.clone(),
                detail: format!("converter produced no {ARTIFACT_FILE}"),
            })?;

        Ok(STANDARD.encode(pdf))
    }
}

impl RenderBackend for LatexBackend {
    fn render<'a>(
        &'a self,
        dte: &'a Dte,
        medium: Medium,
        companies: Option<&'a CompanyPool>,
        cedible: bool,
        draft: bool,
    ) -> RenderFuture<'a, RenderedTemplate> {
        Box::pin(async move {
            let tex = build_template(dte, medium, companies, cedible, draft)?;
            Ok(RenderedTemplate {
                tex,
                resources: Vec::new(),
            })
        })
    }

    fn convert<'a>(&'a self, template: &'a RenderedTemplate) -> RenderFuture<'a, String> {
        Box::pin(self.run_converter(template))
    }
}

/// TeX geometry options per medium.
fn geometry(medium: Medium) -> &'static str {
    match medium {
        Medium::Carta => "letterpaper, margin=2cm",
        Medium::Oficio => "paperwidth=216mm, paperheight=330mm, margin=2cm",
        Medium::Thermal80mm => "paperwidth=80mm, paperheight=297mm, margin=4mm",
    }
}

fn escape_tex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            _ => out.push(ch),
        }
    }
    out
}

fn build_template(
    dte: &Dte,
    medium: Medium,
    companies: Option<&CompanyPool>,
    cedible: bool,
    draft: bool,
) -> Result<String, RenderError> {
    let header = &dte.documento.encabezado;
    let identity = dte
        .identity()
        .map_err(|e| RenderError::Template(e.to_string()))?;

    // Issuer details come from the directory when we own the document,
    // otherwise from whatever the document itself declares.
    let (issuer_name, issuer_activity, issuer_address) = match companies {
        Some(pool) => {
            let company = pool.get(identity.issuer).ok_or_else(|| {
                RenderError::Template(format!(
                    "issuer {} not found in company directory",
                    identity.issuer
                ))
            })?;
            (
                company.name.clone(),
                company.activity.clone().unwrap_or_default(),
                company.address.clone().unwrap_or_default(),
            )
        }
        None => (
            header.emisor.razon_social.clone().unwrap_or_default(),
            header.emisor.giro.clone().unwrap_or_default(),
            header.emisor.direccion.clone().unwrap_or_default(),
        ),
    };

    let mut tex = String::new();
    let _ = writeln!(tex, r"\documentclass[11pt]{{article}}");
    let _ = writeln!(tex, r"\usepackage[{}]{{geometry}}", geometry(medium));
    let _ = writeln!(tex, r"\usepackage[utf8]{{inputenc}}");
    if draft {
        let _ = writeln!(tex, r"\usepackage{{draftwatermark}}");
        let _ = writeln!(tex, r"\SetWatermarkText{{BORRADOR}}");
    }
    let _ = writeln!(tex, r"\begin{{document}}");
    let _ = writeln!(
        tex,
        r"\begin{{center}}\textbf{{{}}}\end{{center}}",
        escape_tex(doc_type_name(identity.doc_type))
    );
    let _ = writeln!(
        tex,
        r"\noindent RUT: {} \hfill Folio: {}\\",
        escape_tex(&header.emisor.rut),
        identity.serial
    );
    let _ = writeln!(tex, r"{}\\", escape_tex(&issuer_name));
    if !issuer_activity.is_empty() {
        let _ = writeln!(tex, r"{}\\", escape_tex(&issuer_activity));
    }
    if !issuer_address.is_empty() {
        let _ = writeln!(tex, r"{}\\", escape_tex(&issuer_address));
    }
    if let Some(date) = &header.id_doc.fecha_emision {
        let _ = writeln!(tex, r"Fecha emisi\'on: {}\\", escape_tex(date));
    }
    let _ = writeln!(
        tex,
        r"\medskip\noindent Se\~nor(es): {} ({})\\",
        escape_tex(header.receptor.razon_social.as_deref().unwrap_or("")),
        escape_tex(&header.receptor.rut)
    );

    let _ = writeln!(tex, r"\begin{{tabular}}{{rlr}}");
    for line in &dte.documento.detalle {
        let _ = writeln!(
            tex,
            r"{} & {} & {} \\",
            line.linea,
            escape_tex(&line.item),
            line.monto
        );
    }
    let _ = writeln!(tex, r"\end{{tabular}}");

    let totals = &header.totales;
    let _ = writeln!(tex, r"\medskip");
    if let Some(neto) = totals.neto {
        let _ = writeln!(tex, r"\noindent Neto: \${neto}\\");
    }
    if let Some(iva) = totals.iva {
        let _ = writeln!(tex, r"IVA: \${iva}\\");
    }
    let _ = writeln!(tex, r"\textbf{{Total: \${}}}\\", totals.total);

    if cedible {
        let _ = writeln!(tex, r"\newpage");
        let _ = writeln!(
            tex,
            r"\begin{{center}}\textbf{{CEDIBLE}}\end{{center}}"
        );
        let _ = writeln!(
            tex,
            r"\noindent Nombre: \rule{{6cm}}{{0.3pt}} RUT: \rule{{3cm}}{{0.3pt}}\\"
        );
        let _ = writeln!(
            tex,
            r"Fecha: \rule{{3cm}}{{0.3pt}} Recinto: \rule{{5cm}}{{0.3pt}}\\"
        );
        let _ = writeln!(tex, r"Firma: \rule{{4cm}}{{0.3pt}}\\");
    }

    let _ = writeln!(tex, r"\end{{document}}");
    Ok(tex)
}
