//! University portal
//!
//! Lets a university account publish the documents the advising engine
//! reads: the Erasmus call, the destination list and the destination course
//! catalogues. Independent from the student wizard.

mod client;
mod token_store;
mod types;

pub use client::PortalClient;
pub use token_store::{FileTokenStore, MemoryTokenStore, StoredToken, TokenStore};
pub use types::{
    validate_email, validate_password, ActiveCall, ActiveCallsResponse, DeleteResponse,
    DocumentInfo, DocumentKind, DocumentsResponse, LoginResponse, Profile, RegisterRequest,
    RegisterResponse, UploadResponse,
};
