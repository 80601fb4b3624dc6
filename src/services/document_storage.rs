// src/services/document_storage.rs

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::common::error::AppError;

/// Colaborador de armazenamento de documentos.
/// O núcleo só guarda a URL devolvida; nunca inspeciona o conteúdo.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn store_document(
        &self,
        bytes: Vec<u8>,
        bucket: &str,
        filename: &str,
    ) -> Result<String, AppError>;
}

/// Grava em disco (`{root}/{bucket}/{uuid}_{arquivo}`) e devolve a URL pública equivalente.
#[derive(Debug, Clone)]
pub struct LocalDocumentStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDocumentStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Mantém só o nome do arquivo, sem diretórios nem caracteres estranhos.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl DocumentStorage for LocalDocumentStorage {
    async fn store_document(
        &self,
        bytes: Vec<u8>,
        bucket: &str,
        filename: &str,
    ) -> Result<String, AppError> {
        let bucket = sanitize_filename(bucket);
        let unique_name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(filename));

        let dir = self.root.join(&bucket);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            tracing::warn!("Falha ao criar diretório {:?}: {}", dir, e);
            AppError::StorageError(e.to_string())
        })?;

        let path = dir.join(&unique_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::warn!("Falha ao gravar documento {:?}: {}", path, e);
            AppError::StorageError(e.to_string())
        })?;

        Ok(format!("{}/{}/{}", self.public_base_url, bucket, unique_name))
    }
}
