//! Per-request dispatch.
//!
//! # Dispatch order
//!
//! | Condition                         | Handler                                   |
//! |-----------------------------------|-------------------------------------------|
//! | `?act=thumbnail`                  | preview pipeline → image bytes or 404     |
//! | path == `/favicon.ico`            | embedded icon                             |
//! | path starts with `/api/`          | `Api::call(<segment 2>, query)` → JSON    |
//! | directory                         | redirect to `dir/`, `index.html`, listing |
//! | anything else                     | static file or 404                        |
//!
//! First match wins. The router holds only read-only state (root, API,
//! decoder) so one instance is shared by every worker thread.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use rouille::{Request, Response, ResponseBody};

use super::listing;
use crate::api::{Api, ApiArgs, SanitizedPath};
use crate::preview::decoder::FrameDecoder;
use crate::preview::{self, DEFAULT_FRAME_INDEX, DEFAULT_MIN_HEIGHT, Preview, ThumbnailRequest};

pub const ICON_PATH: &str = "/favicon.ico";
pub const ICON: &[u8] = include_bytes!("../../assets/favicon.ico");
pub const API_PREFIX: &str = "/api/";

const INDEX_FILES: &[&str] = &["index.html", "index.htm"];

/// Decoded query string, in order of appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    pub fn parse(raw: &str) -> Self {
        Query(url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
    }

    /// First value given for `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Integer parameter with default. `Err` carries the offending value.
    pub fn int_or(&self, name: &str, default: i64) -> Result<i64, String> {
        match self.first(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| raw.to_string()),
        }
    }

    /// Every parameter name mapped to its first value
    pub fn to_args(&self) -> ApiArgs {
        let mut args = BTreeMap::new();
        for (k, v) in &self.0 {
            args.entry(k.clone()).or_insert_with(|| v.clone());
        }
        args
    }
}

/// Gallery request router
pub struct Router {
    root: PathBuf,
    api: Api,
    decoder: Arc<dyn FrameDecoder>,
}

impl Router {
    pub fn new(root: impl Into<PathBuf>, decoder: Arc<dyn FrameDecoder>) -> Self {
        let root = root.into();
        let api = Api::new(root.clone(), decoder.clone());
        Self { root, api, decoder }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn handle(&self, request: &Request) -> Response {
        let response = self.dispatch(request);
        debug!("{} {} -> {}", request.method(), request.raw_url(), response.status_code);
        response
    }

    fn dispatch(&self, request: &Request) -> Response {
        let query = Query::parse(request.raw_query_string());
        let url = request.url();

        if query.first("act") == Some("thumbnail") {
            return self.thumbnail(&url, &query);
        }
        if url == ICON_PATH {
            return Response::from_data("image/x-icon", ICON);
        }
        if let Some(rest) = url.strip_prefix(API_PREFIX) {
            let method = rest.split('/').next().unwrap_or_default();
            return self.api(method, &query);
        }
        self.fallback(request, &url)
    }

    fn thumbnail(&self, url: &str, query: &Query) -> Response {
        let min_height = query.int_or("min_height", DEFAULT_MIN_HEIGHT as i64);
        let frame_index = query.int_or("frame_ind", DEFAULT_FRAME_INDEX);
        let (min_height, frame_index) = match (min_height, frame_index) {
            (Ok(h), Ok(i)) => (h.clamp(1, u32::MAX as i64) as u32, i),
            (Err(bad), _) | (_, Err(bad)) => {
                debug!("Thumbnail: bad integer parameter {:?}", bad);
                return Response::empty_400();
            }
        };

        let path = SanitizedPath::new(&self.root, url).into_path_buf();
        let request = ThumbnailRequest::new(path, min_height, frame_index);
        match preview::get_preview(self.decoder.as_ref(), &request) {
            Some(preview) => preview_response(preview),
            None => Response::empty_404(),
        }
    }

    fn api(&self, method: &str, query: &Query) -> Response {
        let result = self.api.call(method, &query.to_args());
        Response::json(&result.payload).with_status_code(result.status.code())
    }

    /// Directory listing or static transfer
    fn fallback(&self, request: &Request, url: &str) -> Response {
        let target = SanitizedPath::new(&self.root, url);
        let dir = target.as_path();

        if dir.is_dir() {
            if !url.ends_with('/') {
                return Response::redirect_301(with_trailing_slash(&request.raw_url()));
            }
            for index in INDEX_FILES {
                let index_path = dir.join(index);
                if index_path.is_file() {
                    return match std::fs::File::open(&index_path) {
                        Ok(file) => Response::from_file("text/html; charset=utf-8", file),
                        Err(_) => Response::empty_404(),
                    };
                }
            }
            return match listing::subdirectories(dir) {
                Ok(dirs) => Response::html(listing::render_page(url, &dirs)),
                Err(e) => {
                    debug!("Listing {}: {}", dir.display(), e);
                    Response::text("No permission to list directory").with_status_code(404)
                }
            };
        }

        let response = rouille::match_assets(request, &self.root);
        if response.is_success() {
            response
        } else {
            Response::empty_404()
        }
    }
}

/// Stream a preview. The reader owns any temp file, so it goes away with the body.
fn preview_response(preview: Preview) -> Response {
    let content_type = preview.content_type();
    let len = preview.byte_len();
    let reader = preview.into_reader();
    let data = match len {
        Some(len) => ResponseBody::from_reader_and_size(reader, len),
        None => ResponseBody::from_reader(reader),
    };
    Response {
        status_code: 200,
        headers: vec![("Content-Type".into(), content_type.into())],
        data,
        upgrade: None,
    }
}

/// Insert `/` at the end of the path part, keeping any query
fn with_trailing_slash(raw_url: &str) -> String {
    match raw_url.split_once('?') {
        Some((path, query)) => format!("{}/?{}", path, query),
        None => format!("{}/", raw_url),
    }
}
