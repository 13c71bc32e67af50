use clap::Parser;
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for
/// non-release builds.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "minotes", version = get_version())]
#[command(about = "Convert Xiaomi/MIUI Notes backup files to Markdown", long_about = None)]
pub struct Cli {
    /// Path to the .bak backup file (auto-detected in the current
    /// directory if omitted)
    pub backup_file: Option<PathBuf>,

    /// Output directory
    #[arg(default_value = "exported_notes")]
    pub output_dir: PathBuf,

    /// Include deleted notes from backup history
    #[arg(long)]
    pub include_deleted: bool,

    /// Extract images and audio files from the backup
    #[arg(long)]
    pub extract_media: bool,
}
