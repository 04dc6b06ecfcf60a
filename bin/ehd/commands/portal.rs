//! Portal commands - university account and document management

use anyhow::{Context, Result};
use clap::Subcommand;
use dialoguer::{theme::ColorfulTheme, Password};
use erasmus_helpdesk::portal::{validate_password, RegisterRequest};
use erasmus_helpdesk::{ClientConfig, DocumentKind, FileTokenStore, PortalClient, PortalError};
use std::path::PathBuf;
use std::sync::Arc;

use crate::style::*;

#[derive(Subcommand)]
pub enum PortalCommand {
    /// Register a university account
    Register {
        /// Official university name
        #[arg(long)]
        name: String,
        /// Institutional email
        #[arg(long)]
        email: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Log in and store the access token
    Login {
        #[arg(long)]
        email: String,
        /// Read the password from EHD_PASSWORD instead of prompting
        #[arg(long, env = "EHD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show the logged-in university
    Profile,
    /// List uploaded documents
    Documents,
    /// Upload a PDF document
    Upload {
        /// erasmus-call, destinazioni or erasmus-courses
        #[arg(long, value_parser = parse_kind)]
        kind: DocumentKind,
        /// Academic year, e.g. 2025-2026
        #[arg(long)]
        year: Option<String>,
        file: PathBuf,
    },
    /// Deactivate a document
    Delete { id: i64 },
    /// Download a document
    Download {
        id: i64,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// List active Erasmus calls (public)
    Calls,
}

fn parse_kind(s: &str) -> Result<DocumentKind, String> {
    s.parse()
}

pub async fn run(config: &ClientConfig, cmd: PortalCommand) -> Result<()> {
    let tokens = Arc::new(FileTokenStore::new(&config.data_dir));
    let client =
        PortalClient::from_config(config, tokens).context("Failed to build portal client")?;

    match cmd {
        PortalCommand::Register {
            name,
            email,
            contact,
            phone,
        } => register(&client, name, email, contact, phone).await,
        PortalCommand::Login { email, password } => login(&client, &email, password).await,
        PortalCommand::Logout => {
            client.logout()?;
            print_success("Logged out");
            Ok(())
        }
        PortalCommand::Profile => profile(&client).await,
        PortalCommand::Documents => documents(&client).await,
        PortalCommand::Upload { kind, year, file } => {
            let pb = spinner(&format!("Uploading {}...", file.display()));
            let result = client.upload(kind, &file, year.as_deref()).await;
            pb.finish_and_clear();
            let uploaded = result.map_err(explain)?;
            print_success(&format!(
                "{}: {} (document {})",
                kind.label(),
                uploaded.message,
                uploaded.document_id
            ));
            Ok(())
        }
        PortalCommand::Delete { id } => {
            let deleted = client.delete_document(id).await.map_err(explain)?;
            print_success(&deleted.message);
            Ok(())
        }
        PortalCommand::Download { id, out } => {
            let path = client
                .download_document(id, &out)
                .await
                .map_err(explain)?;
            print_success(&format!("Saved {}", path.display()));
            Ok(())
        }
        PortalCommand::Calls => calls(&client).await,
    }
}

/// Point the user at `login` when the token is missing or expired.
fn explain(err: PortalError) -> anyhow::Error {
    match err {
        PortalError::NotLoggedIn | PortalError::Unauthorized => {
            anyhow::anyhow!("{}. Run: ehd portal login --email <email>", err)
        }
        other => other.into(),
    }
}

async fn register(
    client: &PortalClient,
    name: String,
    email: String,
    contact: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let password = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("  Password")
        .with_confirmation("  Confirm password", "Passwords do not match")
        .validate_with(|input: &String| -> Result<(), String> {
            validate_password(input).map_err(|e| e.to_string())
        })
        .interact()?;

    let request = RegisterRequest {
        university_name: name,
        institutional_email: email,
        password,
        contact_person: contact,
        phone,
    };
    let registered = client.register(&request).await?;
    print_success(&format!(
        "{} ({}): {}",
        registered.university_name, registered.university_id, registered.message
    ));
    print_info(&format!(
        "Log in with: ehd portal login --email {}",
        request.institutional_email
    ));
    Ok(())
}

async fn login(client: &PortalClient, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("  Password")
            .interact()?,
    };
    let login = client.login(email, &password).await?;
    print_success(&format!("Logged in as {}", login.university_name));
    Ok(())
}

async fn profile(client: &PortalClient) -> Result<()> {
    let profile = client.profile().await.map_err(explain)?;
    print_header("University Profile");
    print_key_value("Name", &profile.university_name);
    print_key_value("Email", &profile.institutional_email);
    if let Some(contact) = &profile.contact_person {
        print_key_value("Contact", contact);
    }
    if let Some(phone) = &profile.phone {
        print_key_value("Phone", phone);
    }
    if profile.is_verified {
        print_key_value_colored("Verified", "yes", colors::GREEN);
    } else {
        print_key_value_colored("Verified", "no", colors::YELLOW);
    }
    print_key_value("Created", &profile.created_at);
    if let Some(last) = &profile.last_login {
        print_key_value("Last login", last);
    }
    println!();
    Ok(())
}

async fn documents(client: &PortalClient) -> Result<()> {
    let docs = client.documents().await.map_err(explain)?;
    print_header("Documents");
    if docs.documents.is_empty() {
        print_info("No documents uploaded yet");
        return Ok(());
    }

    let mut table = table(&["ID", "Type", "File", "Year", "Uploaded", "Active"]);
    for doc in &docs.documents {
        table.add_row(vec![
            doc.id.to_string(),
            doc.document_type.clone(),
            doc.original_filename.clone(),
            doc.academic_year.clone().unwrap_or_else(|| "-".to_string()),
            doc.upload_date.clone(),
            if doc.is_active { "yes" } else { "no" }.to_string(),
        ]);
    }
    print_table(&table);
    println!();
    print_key_value("Total", &docs.total.to_string());
    println!();
    Ok(())
}

async fn calls(client: &PortalClient) -> Result<()> {
    let calls = client.active_calls().await?;
    print_header("Active Erasmus Calls");
    if calls.calls.is_empty() {
        print_info("No active calls");
        return Ok(());
    }

    let mut table = table(&["University", "File", "Year", "Uploaded"]);
    for call in &calls.calls {
        table.add_row(vec![
            call.university_name.clone(),
            call.original_filename.clone(),
            call.academic_year.clone().unwrap_or_else(|| "-".to_string()),
            call.upload_date.clone(),
        ]);
    }
    print_table(&table);
    println!();
    Ok(())
}
