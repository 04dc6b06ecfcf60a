//! HTTP client for the university portal.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::token_store::{StoredToken, TokenStore};
use super::types::*;
use crate::backend::check_status;
use crate::config::ClientConfig;
use crate::error::{ApiError, PortalError, ValidationError};
use crate::study_plan::{detect_mime, PDF_MIME};

pub struct PortalClient {
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenStore>,
}

impl PortalClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, PortalError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::from)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            tokens,
        })
    }

    pub fn from_config(
        config: &ClientConfig,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, PortalError> {
        Self::new(&config.portal_base, config.timeout(), tokens)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn current_login(&self) -> Option<StoredToken> {
        self.tokens.load()
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.load().is_some()
    }

    // ========================================================================
    // Public endpoints
    // ========================================================================

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, PortalError> {
        request.validate()?;
        info!("Registering {}", request.university_name);
        let response = self
            .client
            .post(self.url("/register"))
            .json(request)
            .send()
            .await
            .map_err(ApiError::from)?;
        decode(response).await
    }

    /// Log in and persist the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, PortalError> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "password",
                reason: "is required".to_string(),
            }
            .into());
        }

        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest {
                institutional_email: email.trim(),
                password,
            })
            .send()
            .await
            .map_err(ApiError::from)?;
        let login: LoginResponse = decode(response).await?;

        self.tokens.save(&StoredToken::from(&login))?;
        info!("Logged in as {} ({})", login.university_name, login.email);
        Ok(login)
    }

    pub async fn active_calls(&self) -> Result<ActiveCallsResponse, PortalError> {
        let response = self
            .client
            .get(self.url("/active-calls"))
            .send()
            .await
            .map_err(ApiError::from)?;
        decode(response).await
    }

    pub fn logout(&self) -> Result<(), PortalError> {
        self.tokens.clear()?;
        info!("Logged out");
        Ok(())
    }

    // ========================================================================
    // Authenticated endpoints
    // ========================================================================

    /// Send with the stored bearer token. A 401 drops the token.
    async fn send_authed(&self, request: RequestBuilder) -> Result<Response, PortalError> {
        let token = self.tokens.load().ok_or(PortalError::NotLoggedIn)?;
        let response = request
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Portal rejected the token, clearing it");
            if let Err(e) = self.tokens.clear() {
                warn!("Failed to clear token: {}", e);
            }
            return Err(PortalError::Unauthorized);
        }
        Ok(check_status(response).await?)
    }

    pub async fn profile(&self) -> Result<Profile, PortalError> {
        let response = self.send_authed(self.client.get(self.url("/profile"))).await?;
        decode_ok(response).await
    }

    pub async fn documents(&self) -> Result<DocumentsResponse, PortalError> {
        let response = self
            .send_authed(self.client.get(self.url("/documents")))
            .await?;
        decode_ok(response).await
    }

    /// Upload a PDF from disk.
    pub async fn upload(
        &self,
        kind: DocumentKind,
        path: &Path,
        academic_year: Option<&str>,
    ) -> Result<UploadResponse, PortalError> {
        let bytes = std::fs::read(path).map_err(ApiError::from)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.pdf", kind.upload_path()));
        self.upload_bytes(kind, &file_name, bytes, academic_year)
            .await
    }

    pub async fn upload_bytes(
        &self,
        kind: DocumentKind,
        file_name: &str,
        bytes: Vec<u8>,
        academic_year: Option<&str>,
    ) -> Result<UploadResponse, PortalError> {
        let mime = detect_mime(file_name, &bytes);
        if mime != PDF_MIME {
            return Err(ValidationError::NotPdf(mime.to_string()).into());
        }

        debug!(
            "Uploading {} as {} ({} bytes)",
            file_name,
            kind,
            bytes.len()
        );
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)
            .map_err(ApiError::from)?;
        let mut form = Form::new().part("file", part);
        if let Some(year) = academic_year.map(str::trim).filter(|y| !y.is_empty()) {
            form = form.text("academic_year", year.to_string());
        }

        let url = self.url(&format!("/upload/{}", kind.upload_path()));
        let response = self
            .send_authed(self.client.post(url).multipart(form))
            .await?;
        let uploaded: UploadResponse = decode_ok(response).await?;
        info!("Uploaded {} as document {}", file_name, uploaded.document_id);
        Ok(uploaded)
    }

    /// Soft delete: the portal deactivates the document.
    pub async fn delete_document(&self, document_id: i64) -> Result<DeleteResponse, PortalError> {
        let url = self.url(&format!("/documents/{}", document_id));
        let response = self.send_authed(self.client.delete(url)).await?;
        decode_ok(response).await
    }

    /// Download a document into `dest_dir`, returning the written path.
    pub async fn download_document(
        &self,
        document_id: i64,
        dest_dir: &Path,
    ) -> Result<PathBuf, PortalError> {
        let url = self.url(&format!("/download/{}", document_id));
        let response = self.send_authed(self.client.get(url)).await?;

        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name)
            .unwrap_or_else(|| format!("document-{}.pdf", document_id));
        let bytes = response.bytes().await.map_err(ApiError::from)?;

        std::fs::create_dir_all(dest_dir).map_err(ApiError::from)?;
        let path = dest_dir.join(file_name);
        std::fs::write(&path, &bytes).map_err(ApiError::from)?;
        Ok(path)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PortalError> {
    Ok(crate::backend::decode_json(response).await?)
}

/// Decode a response already known to be 2xx.
async fn decode_ok<T: DeserializeOwned>(response: Response) -> Result<T, PortalError> {
    let body = response.bytes().await.map_err(ApiError::from)?;
    Ok(serde_json::from_slice(&body).map_err(ApiError::from)?)
}

/// `attachment; filename="x.pdf"`, reduced to its last path segment.
fn disposition_file_name(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("filename="))?
        .trim_matches('"');
    let name = Path::new(raw).file_name()?.to_string_lossy().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::MemoryTokenStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> (PortalClient, Arc<MemoryTokenStore>) {
        let tokens = Arc::new(MemoryTokenStore::new());
        let client = PortalClient::new(
            &server.url("/api/universities"),
            Duration::from_secs(5),
            tokens.clone(),
        )
        .unwrap();
        (client, tokens)
    }

    fn logged_in(tokens: &MemoryTokenStore) {
        tokens
            .save(&StoredToken {
                access_token: "jwt-123".to_string(),
                university_id: 7,
                university_name: "Università di Pisa".to_string(),
                email: "erasmus@unipi.it".to_string(),
                saved_at: None,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/universities/login")
                .json_body(json!({
                    "institutional_email": "erasmus@unipi.it",
                    "password": "SecurePassword123"
                }));
            then.status(200).json_body(json!({
                "access_token": "jwt-123",
                "token_type": "bearer",
                "university_id": 7,
                "university_name": "Università di Pisa",
                "email": "erasmus@unipi.it"
            }));
        });

        let (client, tokens) = client(&server);
        let login = client
            .login("erasmus@unipi.it", "SecurePassword123")
            .await
            .unwrap();
        mock.assert();
        assert_eq!(login.university_id, 7);
        assert_eq!(tokens.load().unwrap().access_token, "jwt-123");
    }

    #[tokio::test]
    async fn test_login_failure_keeps_detail() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/universities/login");
            then.status(401)
                .json_body(json!({"detail": "Email o password non corretti"}));
        });

        let (client, tokens) = client(&server);
        let err = client
            .login("erasmus@unipi.it", "WrongPassword1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email o password non corretti");
        assert!(tokens.load().is_none());
    }

    #[tokio::test]
    async fn test_register_validates_locally() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/universities/register");
            then.status(201);
        });

        let (client, _) = client(&server);
        let request = RegisterRequest {
            university_name: "Università di Pisa".to_string(),
            institutional_email: "erasmus@unipi.it".to_string(),
            password: "weak".to_string(),
            contact_person: None,
            phone: None,
        };
        let err = client.register(&request).await.unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_register() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/universities/register");
            then.status(201).json_body(json!({
                "message": "Università registrata con successo",
                "university_id": 3,
                "university_name": "Università di Pisa",
                "note": "ignored"
            }));
        });

        let (client, _) = client(&server);
        let request = RegisterRequest {
            university_name: "Università di Pisa".to_string(),
            institutional_email: "erasmus@unipi.it".to_string(),
            password: "SecurePassword123".to_string(),
            contact_person: Some("Mario Rossi".to_string()),
            phone: None,
        };
        let registered = client.register(&request).await.unwrap();
        assert_eq!(registered.university_id, 3);
    }

    #[tokio::test]
    async fn test_authenticated_call_without_login() {
        let server = MockServer::start();
        let (client, _) = client(&server);
        let err = client.profile().await.unwrap_err();
        assert!(matches!(err, PortalError::NotLoggedIn));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/universities/documents")
                .header("authorization", "Bearer jwt-123");
            then.status(401).json_body(json!({"detail": "Token scaduto"}));
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let err = client.documents().await.unwrap_err();
        assert!(matches!(err, PortalError::Unauthorized));
        assert!(tokens.load().is_none());
    }

    #[tokio::test]
    async fn test_documents() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/universities/documents")
                .header("authorization", "Bearer jwt-123");
            then.status(200).json_body(json!({
                "documents": [{
                    "id": 12,
                    "document_type": "erasmus_call",
                    "original_filename": "bando.pdf",
                    "stored_filename": "7_bando.pdf",
                    "upload_date": "2025-01-10T10:00:00",
                    "academic_year": "2025-2026",
                    "is_active": true
                }],
                "total": 1
            }));
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let docs = client.documents().await.unwrap();
        assert_eq!(docs.total, 1);
        assert_eq!(docs.documents[0].academic_year.as_deref(), Some("2025-2026"));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf_locally() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/universities/upload/erasmus-call");
            then.status(200);
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let err = client
            .upload_bytes(DocumentKind::ErasmusCall, "bando.docx", vec![0, 1, 2], None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortalError::Validation(ValidationError::NotPdf(_))
        ));
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_upload_destinations() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/universities/upload/destinazioni")
                .header("authorization", "Bearer jwt-123")
                .body_contains("name=\"file\"; filename=\"destinazioni.pdf\"")
                .body_contains("name=\"academic_year\"")
                .body_contains("2025-2026");
            then.status(200).json_body(json!({
                "document_id": 44,
                "message": "Documento caricato",
                "filename": "7_destinazioni.pdf",
                "upload_date": "2025-01-10T10:00:00"
            }));
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let uploaded = client
            .upload_bytes(
                DocumentKind::Destinations,
                "destinazioni.pdf",
                b"%PDF-1.4 list".to_vec(),
                Some("2025-2026"),
            )
            .await
            .unwrap();
        mock.assert();
        assert_eq!(uploaded.document_id, 44);
    }

    #[tokio::test]
    async fn test_delete_document() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/universities/documents/12");
            then.status(200).json_body(json!({
                "message": "Documento disattivato con successo",
                "document_id": 12
            }));
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let deleted = client.delete_document(12).await.unwrap();
        mock.assert();
        assert_eq!(deleted.document_id, 12);
    }

    #[tokio::test]
    async fn test_delete_missing_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/universities/documents/99");
            then.status(404)
                .json_body(json!({"detail": "Documento non trovato o non autorizzato"}));
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let err = client.delete_document(99).await.unwrap_err();
        assert_eq!(err.to_string(), "Documento non trovato o non autorizzato");
        // Only a 401 drops the token
        assert!(tokens.load().is_some());
    }

    #[tokio::test]
    async fn test_active_calls_is_public() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/universities/active-calls");
            then.status(200).json_body(json!({
                "calls": [{
                    "id": 1,
                    "university_name": "Politecnico di Torino",
                    "original_filename": "bando.pdf",
                    "stored_filename": "1_bando.pdf",
                    "upload_date": "2025-01-10T10:00:00"
                }],
                "total": 1
            }));
        });

        let (client, _) = client(&server);
        let calls = client.active_calls().await.unwrap();
        assert_eq!(calls.calls[0].university_name, "Politecnico di Torino");
        assert!(calls.calls[0].academic_year.is_none());
    }

    #[tokio::test]
    async fn test_download_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/universities/download/12");
            then.status(200)
                .header("content-disposition", "attachment; filename=\"bando.pdf\"")
                .body("%PDF-1.4 bando");
        });

        let (client, tokens) = client(&server);
        logged_in(&tokens);
        let dir = tempfile::tempdir().unwrap();
        let path = client.download_document(12, dir.path()).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "bando.pdf");
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4 bando");
    }

    #[test]
    fn test_disposition_file_name() {
        assert_eq!(
            disposition_file_name("attachment; filename=\"a.pdf\"").as_deref(),
            Some("a.pdf")
        );
        assert_eq!(
            disposition_file_name("attachment; filename=../../x.pdf").as_deref(),
            Some("x.pdf")
        );
        assert!(disposition_file_name("inline").is_none());
    }

    #[test]
    fn test_logout_clears_token() {
        let server = MockServer::start();
        let (client, tokens) = client(&server);
        logged_in(&tokens);
        assert!(client.is_logged_in());
        client.logout().unwrap();
        assert!(!client.is_logged_in());
    }
}
