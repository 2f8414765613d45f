//! HTTP server for the gallery.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │  rouille::Server            │  accept loop + worker pool
//! │   pool_size = workers       │
//! └──────────┬─────────────────┘
//!            │ &Request (one worker per request)
//!            ▼
//! ┌────────────────────────────┐      ┌──────────────────────┐
//! │  Router (Arc, read-only)    │ ───▶ │ preview / api /      │
//! │  root + Api + FrameDecoder  │      │ listing / assets     │
//! └────────────────────────────┘      └──────────────────────┘
//! ```
//!
//! - **rouille** - sync HTTP server, blocking decode work stays on its worker
//! - **Router** - built once from `ServerConfig`, shared by all workers
//!
//! # Endpoints
//!
//! | Method | Path                                   | Description                    |
//! |--------|----------------------------------------|--------------------------------|
//! | GET    | `/<file>?act=thumbnail&min_height&frame_ind` | Preview image            |
//! | GET    | `/favicon.ico`                         | Embedded icon                  |
//! | GET    | `/api/list_directory?path&only_files`  | Sorted entry names (JSON)      |
//! | GET    | `/api/count_frames?image_path`         | Frame count (JSON)             |
//! | GET    | `/api/help?method_name`                | API self-description (JSON)    |
//! | GET    | `/<dir>/`                              | Gallery page                   |
//! | GET    | `/<file>`                              | Static file                    |

pub mod listing;
pub mod router;

use anyhow::{Result, anyhow};
use log::info;

use crate::config::ServerConfig;
pub use router::Router;

/// Run the gallery server. Blocks for the lifetime of the process.
pub fn run_server(config: &ServerConfig) -> Result<()> {
    let decoder = config.decoder.build();
    info!("Frame decoder: {}", decoder.name());

    let router = Router::new(config.root.clone(), decoder);
    let addr = config.addr();

    let server = rouille::Server::new(&addr, move |request| router.handle(request))
        .map_err(|e| anyhow!("Failed to start server on {}: {}", addr, e))?
        .pool_size(config.workers);

    info!(
        "Serving {} on http://{} ({} workers)",
        config.root.display(),
        server.server_addr(),
        config.workers
    );
    println!("Your images are at {}", config.local_url());
    println!("In case you want access server from remote client check firewall rules.");

    server.run();
    Ok(())
}
