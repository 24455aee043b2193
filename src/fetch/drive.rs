//! Thin blocking client for the two Drive v3 calls the pipeline needs:
//! listing a folder's children and downloading a file's bytes.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/";

/// Metadata of one file inside a Drive folder.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(default)]
    files: Vec<DriveFile>,
}

pub struct DriveClient {
    http: Client,
    base: Url,
    access_token: String,
}

impl DriveClient {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base(access_token, DRIVE_API_BASE)
    }

    /// Point the client at a different API base (used by tests).
    pub fn with_base(access_token: impl Into<String>, base: &str) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            base: Url::parse(base).context("parsing Drive API base url")?,
            access_token: access_token.into(),
        })
    }

    /// List every non-trashed file directly inside `folder_id`, following
    /// pagination to the end.
    pub fn list_children(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let url = self.base.join("files").context("building files url")?;
        let query = format!("'{}' in parents and trashed=false", folder_id);

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .query(&[
                    ("q", query.as_str()),
                    ("pageSize", "100"),
                    ("fields", "nextPageToken, files(id, name, mimeType)"),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = request
                .send()
                .with_context(|| format!("listing folder {}", folder_id))?
                .error_for_status()
                .with_context(|| format!("listing folder {}", folder_id))?
                .json()
                .with_context(|| format!("decoding listing of folder {}", folder_id))?;

            files.extend(page.files);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(files)
    }

    /// Download the raw bytes of `file_id`.
    pub fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = self
            .base
            .join(&format!("files/{}", file_id))
            .context("building download url")?;
        let bytes = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .with_context(|| format!("downloading file {}", file_id))?
            .error_for_status()
            .with_context(|| format!("downloading file {}", file_id))?
            .bytes()
            .with_context(|| format!("reading body of file {}", file_id))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn list_children_follows_pagination() -> Result<()> {
        let mut server = mockito::Server::new();
        let first = server
            .mock("GET", "/files")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "q".into(),
                    "'folder-1' in parents and trashed=false".into(),
                ),
                // mockito has no per-param "missing" matcher; assert the
                // query only contains the params sent on the first page.
                Matcher::Regex(r"^(q|pageSize|fields)=[^&]*(&(q|pageSize|fields)=[^&]*)*$".into()),
            ]))
            .with_body(
                r#"{"nextPageToken":"page-2","files":[
                    {"id":"f1","name":"Extrato 01012024 à 07012024.xlsx","mimeType":"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"}
                ]}"#,
            )
            .create();
        let second = server
            .mock("GET", "/files")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "page-2".into()))
            .with_body(r#"{"files":[{"id":"f2","name":"notas.txt","mimeType":"text/plain"}]}"#)
            .create();

        let client = DriveClient::with_base("tok", &format!("{}/", server.url()))?;
        let files = client.list_children("folder-1")?;
        first.assert();
        second.assert();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "f1");
        assert_eq!(files[1].name, "notas.txt");
        Ok(())
    }

    #[test]
    fn download_returns_raw_bytes() -> Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/files/f1")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_body(b"PK\x03\x04fake-xlsx")
            .create();

        let client = DriveClient::with_base("tok", &format!("{}/", server.url()))?;
        let bytes = client.download("f1")?;
        mock.assert();
        assert_eq!(bytes, b"PK\x03\x04fake-xlsx");
        Ok(())
    }
}
