//! Upload, retrieve and link IPFS content

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

use mentora_client::storage::{ProgressFn, UploadKind};
use mentora_client::{ContentHint, ContentId, FileUpload, MentoraContext, RetrievedContent};

use crate::style::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    File,
    Image,
    Video,
}

impl From<KindArg> for UploadKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::File => UploadKind::File,
            KindArg::Image => UploadKind::Image,
            KindArg::Video => UploadKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Text,
    Binary,
}

impl From<FormatArg> for ContentHint {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Json => ContentHint::Json,
            FormatArg::Text => ContentHint::Text,
            FormatArg::Binary => ContentHint::Binary,
        }
    }
}

pub async fn upload(ctx: &MentoraContext, path: &Path, kind: KindArg) -> Result<()> {
    let file = FileUpload::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    print_info(&format!(
        "Uploading {} ({}, {} bytes)",
        file.file_name,
        file.content_type,
        file.size()
    ));

    let bar = ProgressBar::new(file.size());
    bar.set_style(
        ProgressStyle::with_template(
            "  {bar:40.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )?
        .progress_chars("█▓░"),
    );
    let progress: ProgressFn = {
        let bar = bar.clone();
        Arc::new(move |sent: u64| bar.set_position(sent))
    };

    let storage = ctx.storage();
    let result = match UploadKind::from(kind) {
        UploadKind::Image => storage.upload_image(&file, Some(progress)).await,
        UploadKind::Video => storage.upload_video(&file, Some(progress)).await,
        UploadKind::File => storage.upload_file(&file, Some(progress)).await,
    };
    bar.finish_and_clear();

    let id = result.with_context(|| format!("Failed to upload {}", file.file_name))?;
    print_success(&format!("Uploaded {}", file.file_name));
    print_field("Hash", &id);
    print_field("URL", storage.ipfs_url(id.as_str()));
    Ok(())
}

pub async fn upload_json(ctx: &MentoraContext, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let storage = ctx.storage();
    let id = storage
        .upload_json(&value)
        .await
        .context("Failed to upload JSON")?;
    print_success("Uploaded JSON document");
    print_field("Hash", &id);
    print_field("URL", storage.ipfs_url(id.as_str()));
    Ok(())
}

pub async fn retrieve(
    ctx: &MentoraContext,
    id: &str,
    format: FormatArg,
    output: Option<PathBuf>,
) -> Result<()> {
    let id: ContentId = id.parse()?;
    let content = ctx
        .storage()
        .retrieve_content(&id, format.into())
        .await
        .with_context(|| format!("Failed to retrieve {id}"))?;

    if let Some(path) = output {
        let bytes = match content {
            RetrievedContent::Json(v) => serde_json::to_vec_pretty(&v)?,
            other => other.into_bytes(),
        };
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        print_success(&format!("Wrote {} bytes to {}", bytes.len(), path.display()));
        return Ok(());
    }

    match content {
        RetrievedContent::Json(v) => println!("{}", serde_json::to_string_pretty(&v)?),
        RetrievedContent::Text(s) => println!("{s}"),
        RetrievedContent::Binary(b) => {
            let mut out = std::io::stdout().lock();
            out.write_all(&b)?;
            out.flush()?;
        }
    }
    Ok(())
}

pub fn url(ctx: &MentoraContext, id: &str) -> Result<()> {
    let storage = ctx.storage();
    print_field("Gateway", storage.ipfs_url(id));
    print_field("Alternate", storage.gateway_url(id));
    Ok(())
}
