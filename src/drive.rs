use crate::config::AppConfig;
use crate::store::{Content, NodeKind, NodeQuery, RemoteNode, RemoteStore};
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::io::{Cursor, Read};
use std::time::{SystemTime, UNIX_EPOCH};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const NODE_FIELDS: &str = "id,name,mimeType,parents";
const USER_AGENT: &str = concat!("drivebackup/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub drive_base_url: String,
    pub upload_base_url: String,
    pub proxy: Option<String>,
}

impl DriveConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            drive_base_url: cfg.drive_base_url().to_string(),
            upload_base_url: cfg.upload_base_url().to_string(),
            proxy: cfg.proxy.clone().filter(|p| !p.is_empty()),
        }
    }
}

/// Google Drive v3 over blocking HTTP. Every call is issued and awaited in
/// turn; there is no retry and no timeout beyond the client's defaults.
pub struct DriveClient {
    http: reqwest::blocking::Client,
    cfg: DriveConfig,
    access_token: String,
}

impl DriveClient {
    pub fn new(cfg: DriveConfig, access_token: String) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(USER_AGENT);
        if let Some(proxy) = &cfg.proxy {
            builder = builder
                .proxy(reqwest::Proxy::all(proxy).with_context(|| format!("invalid proxy {proxy}"))?);
        }
        Ok(Self {
            http: builder.build().context("failed to build http client")?,
            cfg,
            access_token,
        })
    }

    fn files_url(&self) -> String {
        format!(
            "{}/drive/v3/files",
            self.cfg.drive_base_url.trim_end_matches('/')
        )
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/drive/v3/files",
            self.cfg.upload_base_url.trim_end_matches('/')
        )
    }
}

impl RemoteStore for DriveClient {
    fn name(&self) -> &'static str {
        "google-drive"
    }

    fn list_nodes(&self, query: &NodeQuery) -> Result<Vec<RemoteNode>> {
        let q = build_query(query);
        let fields = format!("files({NODE_FIELDS})");
        tracing::debug!(%q, "drive list");

        let response = self
            .http
            .get(self.files_url())
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", q.as_str()),
                ("spaces", "drive"),
                ("fields", fields.as_str()),
                ("pageSize", "100"),
            ])
            .send()
            .context("list request failed")?;
        let response = ensure_success(response, "list")?;

        let payload: DriveListResponse = response.json().context("invalid list json")?;
        Ok(payload.files.into_iter().map(DriveFile::into_node).collect())
    }

    fn create_folder<'a>(&self, name: &str, parent_id: Option<&'a str>) -> Result<RemoteNode> {
        let mut payload = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME,
        });
        if let Some(pid) = parent_id {
            payload["parents"] = serde_json::json!([pid]);
        }

        let response = self
            .http
            .post(self.files_url())
            .bearer_auth(&self.access_token)
            .query(&[("fields", NODE_FIELDS)])
            .json(&payload)
            .send()
            .context("create folder request failed")?;
        let response = ensure_success(response, "create folder")?;

        let file: DriveFile = response.json().context("invalid create folder json")?;
        let mut node = file.into_node();
        node.kind = NodeKind::Folder;
        if node.name.is_empty() {
            node.name = name.to_string();
        }
        if node.parent_id.is_none() {
            node.parent_id = parent_id.map(str::to_string);
        }
        Ok(node)
    }

    fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        content: Content,
        size: u64,
    ) -> Result<RemoteNode> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [parent_id],
        });
        let boundary = make_boundary();
        let body = multipart_related(&boundary, &metadata, content, size);

        let response = self
            .http
            .post(self.upload_url())
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "multipart"), ("fields", NODE_FIELDS)])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .context("upload request failed")?;
        let response = ensure_success(response, "upload")?;

        let file: DriveFile = response.json().context("invalid upload json")?;
        let mut node = file.into_node();
        node.kind = NodeKind::File;
        if node.name.is_empty() {
            node.name = name.to_string();
        }
        if node.parent_id.is_none() {
            node.parent_id = Some(parent_id.to_string());
        }
        Ok(node)
    }
}

/// Builds the `q` expression for a files.list call. Names and ids are always
/// emitted as escaped string literals.
pub fn build_query(query: &NodeQuery) -> String {
    let mut clauses = vec![format!("name = {}", quote(&query.name))];
    if let Some(pid) = &query.parent_id {
        clauses.push(format!("{} in parents", quote(pid)));
    }
    match query.kind {
        Some(NodeKind::Folder) => clauses.push(format!("mimeType = {}", quote(FOLDER_MIME))),
        Some(NodeKind::File) => clauses.push(format!("mimeType != {}", quote(FOLDER_MIME))),
        None => {}
    }
    clauses.push("trashed = false".to_string());
    clauses.join(" and ")
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn make_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("drivebackup-{:x}-{:x}", nanos, std::process::id())
}

/// Streams metadata, then `size` bytes of `content`, as one
/// `multipart/related` body. The file is read while the request is sent.
fn multipart_related(
    boundary: &str,
    metadata: &serde_json::Value,
    content: Content,
    size: u64,
) -> reqwest::blocking::Body {
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    let tail = format!("\r\n--{boundary}--\r\n").into_bytes();

    let total = head.len() as u64 + size + tail.len() as u64;
    let reader = Cursor::new(head)
        .chain(content.take(size))
        .chain(Cursor::new(tail));
    reqwest::blocking::Body::sized(reader, total)
}

// --- Response types ---

#[derive(Deserialize)]
struct DriveListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
}

impl DriveFile {
    fn into_node(self) -> RemoteNode {
        RemoteNode {
            kind: if self.mime_type == FOLDER_MIME {
                NodeKind::Folder
            } else {
                NodeKind::File
            },
            id: self.id,
            name: self.name,
            parent_id: self.parents.into_iter().next(),
        }
    }
}

// --- Helpers ---

fn ensure_success(
    response: reqwest::blocking::Response,
    op: &str,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(anyhow!("{} failed ({}): {}", op, status, sanitize(&body)))
}

fn sanitize(s: &str) -> String {
    match s.char_indices().nth(240) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
