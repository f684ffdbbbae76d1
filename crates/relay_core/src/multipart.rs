//! Codificação `multipart/form-data` dos campos publicados.
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="value"\r\n
//! \r\n
//! 42\r\n
//! --<boundary>--\r\n
//! ```

use crate::types::FileAttachment;
use rand::distr::{Alphanumeric, SampleString};
use std::collections::BTreeMap;

const BOUNDARY_LEN: usize = 32;
const CRLF: &[u8] = b"\r\n";

/// Corpo multipart pronto para envio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    /// Codifica campos e arquivos com um boundary aleatório que não
    /// aparece em nenhum conteúdo.
    pub fn encode(
        fields: &BTreeMap<String, String>,
        files: &BTreeMap<String, FileAttachment>,
    ) -> Self {
        let boundary = loop {
            let candidate = Alphanumeric.sample_string(&mut rand::rng(), BOUNDARY_LEN);
            if !collides(&candidate, fields, files) {
                break candidate;
            }
        };
        let body = encode_with_boundary(&boundary, fields, files);
        Self { boundary, body }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Codifica com um boundary fixo.
pub fn encode_with_boundary(
    boundary: &str,
    fields: &BTreeMap<String, String>,
    files: &BTreeMap<String, FileAttachment>,
) -> Vec<u8> {
    let mut out = Vec::new();

    for (name, value) in fields {
        push_delimiter(&mut out, boundary);
        out.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n").as_bytes(),
        );
        out.extend_from_slice(CRLF);
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(CRLF);
    }

    for (name, file) in files {
        push_delimiter(&mut out, boundary);
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                file.filename
            )
            .as_bytes(),
        );
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&file.content);
        out.extend_from_slice(CRLF);
    }

    out.extend_from_slice(format!("--{boundary}--").as_bytes());
    out.extend_from_slice(CRLF);
    out
}

/// Extrai os campos simples (sem `filename`) de um corpo multipart.
///
/// Retorna `None` se o corpo não termina com o delimitador final.
pub fn decode_form_fields(boundary: &str, body: &[u8]) -> Option<BTreeMap<String, String>> {
    let text = std::str::from_utf8(body).ok()?;
    let delimiter = format!("--{boundary}");
    let closing = format!("{delimiter}--\r\n");
    let text = text.strip_suffix(&closing)?;

    let mut fields = BTreeMap::new();
    for part in text.split(&delimiter).skip(1) {
        let part = part.strip_prefix("\r\n")?.strip_suffix("\r\n")?;
        let (headers, value) = part.split_once("\r\n\r\n")?;
        if headers.contains("filename=") {
            continue;
        }
        let name = headers
            .strip_prefix("Content-Disposition: form-data; name=\"")?
            .strip_suffix('"')?;
        fields.insert(name.to_string(), value.to_string());
    }
    Some(fields)
}

fn push_delimiter(out: &mut Vec<u8>, boundary: &str) {
    out.extend_from_slice(b"--");
    out.extend_from_slice(boundary.as_bytes());
    out.extend_from_slice(CRLF);
}

fn collides(
    boundary: &str,
    fields: &BTreeMap<String, String>,
    files: &BTreeMap<String, FileAttachment>,
) -> bool {
    let needle = boundary.as_bytes();
    let contains = |hay: &[u8]| hay.windows(needle.len()).any(|w| w == needle);

    fields
        .iter()
        .any(|(k, v)| contains(k.as_bytes()) || contains(v.as_bytes()))
        || files.iter().any(|(k, f)| {
            contains(k.as_bytes()) || contains(f.filename.as_bytes()) || contains(&f.content)
        })
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
