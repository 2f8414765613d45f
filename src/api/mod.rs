//! JSON API called by the gallery page.
//!
//! # Purpose
//!
//! A fixed set of named operations invoked as `call(name, args)` where `args`
//! are the request's query parameters. Every call produces an [`ApiResult`]
//! (JSON payload + status); nothing here panics or leaks an IO error.
//!
//! # Dispatch
//!
//! ```text
//! call("list_directory", {path, only_files}) ─▶ bind ListDirectoryArgs ─▶ list_directory()
//! call("count_frames", {image_path})         ─▶ bind CountFramesArgs   ─▶ count_frames()
//! call("help", {method_name})                ─▶ bind HelpArgs          ─▶ help()
//! call("call" | "nope" | "", ..)             ─▶ help()
//! bind error                                 ─▶ (method help text, BadRequest)
//! ```
//!
//! Binding goes through serde: the query map becomes a JSON object and is
//! deserialized into the operation's argument struct with unknown fields
//! denied, so missing, extra or malformed arguments are all bind errors.
//!
//! # Used by
//!
//! - `server/router.rs` - `/api/<method>?...` requests

pub mod help;
pub mod path;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::BindError;
use crate::media::{self, MediaKind};
use crate::preview::decoder::FrameDecoder;
use help::MethodDoc;
pub use path::SanitizedPath;

/// Keyword arguments, one string value per name
pub type ApiArgs = BTreeMap<String, String>;

/// Outcome class of an API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApiStatus {
    Ok,
    NotFound,
    BadRequest,
}

impl ApiStatus {
    /// HTTP status code
    pub fn code(self) -> u16 {
        match self {
            ApiStatus::Ok => 200,
            ApiStatus::NotFound => 404,
            ApiStatus::BadRequest => 400,
        }
    }
}

/// Payload and status of one API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub payload: Value,
    pub status: ApiStatus,
}

impl ApiResult {
    pub fn ok(payload: impl Into<Value>) -> Self {
        Self { payload: payload.into(), status: ApiStatus::Ok }
    }

    pub fn not_found() -> Self {
        Self { payload: Value::Null, status: ApiStatus::NotFound }
    }

    pub fn bad_request(payload: impl Into<Value>) -> Self {
        Self { payload: payload.into(), status: ApiStatus::BadRequest }
    }
}

/// The closed set of public operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    CountFrames,
    Help,
    ListDirectory,
}

impl ApiMethod {
    /// All operations, in name order
    pub const ALL: &'static [ApiMethod] = &[ApiMethod::CountFrames, ApiMethod::Help, ApiMethod::ListDirectory];

    pub fn doc(self) -> &'static MethodDoc {
        match self {
            ApiMethod::CountFrames => &help::COUNT_FRAMES_DOC,
            ApiMethod::Help => &help::HELP_DOC,
            ApiMethod::ListDirectory => &help::LIST_DIRECTORY_DOC,
        }
    }

    /// Wire name, e.g. `list_directory`
    pub fn name(self) -> &'static str {
        self.doc().name
    }

    /// Resolve a wire name. The dispatcher itself (`call`) is not an operation.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HelpArgs {
    #[serde(default)]
    method_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListDirectoryArgs {
    #[serde(default)]
    path: Option<String>,
    #[serde(default, deserialize_with = "yes_flag")]
    only_files: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CountFramesArgs {
    image_path: String,
}

/// `"yes"` is true, anything else false
fn yes_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = String::deserialize(deserializer)?;
    Ok(value == "yes")
}

fn bind<T: DeserializeOwned>(args: &ApiArgs) -> Result<T, BindError> {
    let object: serde_json::Map<String, Value> = args
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// API bound to one gallery root
#[derive(Clone)]
pub struct Api {
    root: PathBuf,
    decoder: Arc<dyn FrameDecoder>,
}

impl Api {
    pub fn new(root: impl Into<PathBuf>, decoder: Arc<dyn FrameDecoder>) -> Self {
        Self { root: root.into(), decoder }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Confine a caller path to the root
    pub fn sanitize(&self, raw: &str) -> SanitizedPath {
        SanitizedPath::new(&self.root, raw)
    }

    /// Invoke `method` with keyword `args`.
    ///
    /// Unknown or absent names, and `call` itself, fall back to `help()`.
    pub fn call(&self, method: &str, args: &ApiArgs) -> ApiResult {
        let Some(method) = ApiMethod::from_name(method) else {
            debug!("API: unknown method {:?}, answering with help", method);
            return self.help(None);
        };

        let result = match method {
            ApiMethod::Help => bind::<HelpArgs>(args).map(|a| self.help(a.method_name.as_deref())),
            ApiMethod::ListDirectory => {
                bind::<ListDirectoryArgs>(args).map(|a| self.list_directory(a.path.as_deref(), a.only_files))
            }
            ApiMethod::CountFrames => bind::<CountFramesArgs>(args).map(|a| self.count_frames(&a.image_path)),
        };

        match result {
            Ok(result) => {
                debug!("API: {} -> {:?}", method.name(), result.status);
                result
            }
            Err(e) => {
                debug!("API: {} {}", method.name(), e);
                ApiResult::bad_request(method.doc().text())
            }
        }
    }

    /// Method listing, or the documentation of one method
    pub fn help(&self, method_name: Option<&str>) -> ApiResult {
        match method_name.and_then(ApiMethod::from_name) {
            Some(method) => ApiResult::ok(method.doc().text()),
            None => ApiResult::ok(ApiMethod::ALL.iter().map(|m| m.name()).collect::<Vec<_>>()),
        }
    }

    /// Sorted entry names of a directory under the root
    pub fn list_directory(&self, path: Option<&str>, only_files: bool) -> ApiResult {
        let dir = self.sanitize(path.unwrap_or(""));
        if !dir.as_path().is_dir() {
            return ApiResult::not_found();
        }

        match read_names(dir.as_path(), only_files) {
            Ok(names) => ApiResult::ok(names),
            Err(e) => {
                debug!("API: list_directory {}: {}", dir.as_path().display(), e);
                ApiResult::not_found()
            }
        }
    }

    /// Frame count of an image under the root
    pub fn count_frames(&self, image_path: &str) -> ApiResult {
        let path = self.sanitize(image_path);
        if !media::is_media_file(path.as_path(), Some(MediaKind::Image)) {
            return ApiResult::bad_request(format!("'{}' is not an image file", image_path));
        }
        ApiResult::ok(self.decoder.count_frames(path.as_path()))
    }
}

fn read_names(dir: &Path, only_files: bool) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if only_files && !entry.path().is_file() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
