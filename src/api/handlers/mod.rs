mod admin;
mod download;
mod files;
mod share_links;

pub use admin::{health, sweeper_status};
pub use download::download;
pub use files::{delete_file, get_file, list_files, upload_file};
pub use share_links::{create_share_link, ensure_share_link, share_link_meta};
