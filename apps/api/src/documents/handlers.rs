use std::collections::HashMap;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::documents::store::{upload_location, DocumentEntry};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FolderQuery {
    #[serde(default)]
    pub folder: String,
}

#[derive(Debug, Serialize)]
pub struct ResumeListResponse {
    pub folder: String,
    pub resumes: Vec<DocumentEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct FolderListResponse {
    pub folders: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub storage_path: String,
    pub filename: String,
}

/// A parsed multipart form: the PDF under `file` plus every text field.
pub struct UploadForm {
    pub filename: String,
    pub bytes: Bytes,
    pub fields: HashMap<String, String>,
}

/// GET /api/v1/resumes?folder=
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<FolderQuery>,
) -> Result<Json<ResumeListResponse>, AppError> {
    let resumes = state.documents.list(&params.folder).await?;
    Ok(Json(ResumeListResponse {
        folder: params.folder,
        count: resumes.len(),
        resumes,
    }))
}

/// GET /api/v1/folders
pub async fn handle_list_folders(
    State(state): State<AppState>,
) -> Result<Json<FolderListResponse>, AppError> {
    let folders = state.documents.list_folders().await?;
    Ok(Json(FolderListResponse { folders }))
}

/// POST /api/v1/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let form = read_upload(multipart).await?;
    let (folder, filename) = upload_location(&form.filename, Utc::now());

    let storage_path = state.documents.store(form.bytes, &filename, &folder).await?;
    Ok(Json(UploadResponse {
        storage_path,
        filename,
    }))
}

/// Reads a multipart body, requiring a non-empty PDF under `file`.
pub async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
            file = Some((filename, bytes));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
            fields.insert(name, value);
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::Validation("No file provided".into()))?;
    check_upload(&filename, &bytes)?;

    Ok(UploadForm {
        filename,
        bytes,
        fields,
    })
}

fn check_upload(filename: &str, bytes: &[u8]) -> Result<(), AppError> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("No file selected".into()));
    }
    if !filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::Validation("Only PDF files are allowed".into()));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_requires_named_non_empty_pdf() {
        assert!(check_upload("cv.PDF", b"%PDF-1.4").is_ok());
        assert!(matches!(
            check_upload("", b"%PDF"),
            Err(AppError::Validation(m)) if m == "No file selected"
        ));
        assert!(matches!(
            check_upload("cv.docx", b"PK"),
            Err(AppError::Validation(m)) if m == "Only PDF files are allowed"
        ));
        assert!(check_upload("cv.pdf", b"").is_err());
    }
}
