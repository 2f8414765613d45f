use clap::Parser;
use std::path::PathBuf;

// Preview backend info (compile-time)
#[cfg(feature = "preview")]
const PREVIEW_BACKEND: &str = "tiff 0.9 (multi-page) + image 0.25";
#[cfg(not(feature = "preview"))]
const PREVIEW_BACKEND: &str = "disabled (originals served as-is)";

// Build version with backend info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Preview: ", PREVIEW_BACKEND, "\n",
    "Target:  ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Serve a directory of images, video and audio as a browsable gallery
#[derive(Parser, Debug, Default)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Port to serve on [default: 8000, or SERVGALLERY_PORT]
    #[arg(value_name = "PORT")]
    pub port: Option<u16>,

    /// Gallery root directory [default: current directory, or SERVGALLERY_DIR]
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Address to bind
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Request worker threads [default: 4 per CPU core]
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Serve TIFF files unprocessed instead of decoding previews
    #[arg(long = "no-preview")]
    pub no_preview: bool,

    /// Log to file instead of stderr (default: servgallery.log in the data dir)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args = Args::try_parse_from(["servgallery"]).unwrap();
        assert_eq!(args.port, None);
        assert!(args.directory.is_none());
        assert!(!args.no_preview);
        assert_eq!(args.verbosity, 0);
    }

    #[test]
    fn test_parse_full() {
        let args = Args::try_parse_from([
            "servgallery", "-d", "/photos", "-vv", "--no-preview", "-w", "3", "9000", "--log",
        ])
        .unwrap();
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.directory, Some(PathBuf::from("/photos")));
        assert_eq!(args.verbosity, 2);
        assert!(args.no_preview);
        assert_eq!(args.log_file, Some(None));
        assert_eq!(args.workers, Some(3));
    }
}
