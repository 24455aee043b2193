//! Stage 1: pull statement spreadsheets out of the configured Drive folders.

pub mod auth;
pub mod drive;

pub use auth::CredentialStore;
pub use drive::{DriveClient, DriveFile};

use crate::config::{self, StatementFolder};
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Download every file of every folder into `dest_dir`. A folder or file
/// that errors is logged and skipped; the run keeps going. Returns how many
/// files landed on disk.
pub fn fetch_folders(
    client: &DriveClient,
    folders: &[StatementFolder],
    dest_dir: &Path,
) -> Result<usize> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("creating input directory {}", dest_dir.display()))?;

    let mut downloaded = 0;
    for folder in folders {
        info!(folder = folder.label, "listing");
        let files = match client.list_children(folder.id) {
            Ok(files) => files,
            Err(err) => {
                error!(folder = folder.label, error = %err, "listing failed; skipping folder");
                continue;
            }
        };
        if files.is_empty() {
            info!(folder = folder.label, "no files found");
            continue;
        }

        for file in &files {
            match client.download(&file.id) {
                Ok(bytes) => {
                    let dest = dest_dir.join(&file.name);
                    fs::write(&dest, &bytes)
                        .with_context(|| format!("writing {}", dest.display()))?;
                    info!(file = file.name.as_str(), bytes = bytes.len(), "downloaded");
                    downloaded += 1;
                }
                Err(err) => {
                    error!(file = file.name.as_str(), error = %err, "download failed; skipping");
                }
            }
        }
    }
    Ok(downloaded)
}

/// Run the whole fetch stage: load and refresh the cached credential, then
/// mirror the configured folders into the input directory.
pub fn run() -> Result<()> {
    let http = Client::new();
    let mut store = CredentialStore::load(config::TOKEN_CACHE)?;
    store.ensure_valid(&http).context("refreshing credential")?;

    let client = DriveClient::new(store.access_token())?;
    let downloaded = fetch_folders(
        &client,
        config::STATEMENT_FOLDERS,
        Path::new(config::INPUT_DIR),
    )?;
    info!(files = downloaded, "fetch done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::tempdir;

    #[test]
    fn failed_folder_is_skipped_but_run_continues() -> Result<()> {
        let mut server = mockito::Server::new();

        // First folder: listing rejected.
        server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "'bad' in parents and trashed=false".into(),
            ))
            .with_status(403)
            .create();
        // Second folder: one file, downloaded fine.
        server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "'good' in parents and trashed=false".into(),
            ))
            .with_body(r#"{"files":[{"id":"f1","name":"a.xlsx","mimeType":"m"}]}"#)
            .create();
        server
            .mock("GET", "/files/f1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_body(b"bytes")
            .create();

        let folders = [
            StatementFolder { label: "bad", id: "bad" },
            StatementFolder { label: "good", id: "good" },
        ];
        let client = DriveClient::with_base("tok", &format!("{}/", server.url()))?;
        let dest = tempdir()?;

        let downloaded = fetch_folders(&client, &folders, dest.path())?;
        assert_eq!(downloaded, 1);
        assert_eq!(std::fs::read(dest.path().join("a.xlsx"))?, b"bytes");
        Ok(())
    }
}
