// src/models/document.rs

use serde::Serialize;

// Documentos que o cliente envia pelo formulário público
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    AadhaarFront,
    AadhaarBack,
    Passport,
    Signature,
}

impl DocumentKind {
    pub const REQUIRED: [DocumentKind; 3] = [
        DocumentKind::AadhaarFront,
        DocumentKind::AadhaarBack,
        DocumentKind::Passport,
    ];

    /// Nome do campo no multipart
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentKind::AadhaarFront => "aadhaar_front",
            DocumentKind::AadhaarBack => "aadhaar_back",
            DocumentKind::Passport => "passport",
            DocumentKind::Signature => "signature",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "aadhaar_front" => Some(DocumentKind::AadhaarFront),
            "aadhaar_back" => Some(DocumentKind::AadhaarBack),
            "passport" => Some(DocumentKind::Passport),
            "signature" => Some(DocumentKind::Signature),
            _ => None,
        }
    }
}

/// Arquivo recebido, ainda não enviado ao storage.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub kind: DocumentKind,
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub const ALLOWED_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];
