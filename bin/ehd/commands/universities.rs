//! Universities command - list home universities with a published call

use anyhow::{Context, Result};
use erasmus_helpdesk::{AdvisingBackend, ClientConfig, HttpBackend, MockBackend};

use crate::style::*;

pub async fn run(config: &ClientConfig, mock: bool) -> Result<()> {
    let backend: Box<dyn AdvisingBackend> = if mock {
        Box::new(MockBackend::new())
    } else {
        Box::new(HttpBackend::from_config(config).context("Failed to build HTTP client")?)
    };

    let pb = spinner("Fetching universities...");
    let result = backend.list_universities().await;
    pb.finish_and_clear();
    let universities = result.context("Failed to list universities")?;

    print_header("Home Universities");
    if universities.is_empty() {
        print_warning("No university has published an Erasmus call yet");
    }
    for name in &universities {
        println!("  {} {}", icon_arrow(), name);
    }
    println!();
    Ok(())
}
