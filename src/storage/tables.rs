use redb::TableDefinition;

/// File records: uuid -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Owner index: owner_id -> msgpack Vec of file UUIDs
pub const OWNER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_files");

/// Share link records: uuid -> ShareLinkRecord (msgpack)
pub const SHARE_LINKS: TableDefinition<&str, &[u8]> = TableDefinition::new("share_links");

/// Token index: token -> link UUID. Inserts check for an existing row first,
/// so a colliding token can never remap an existing link.
pub const LINK_TOKENS: TableDefinition<&str, &str> = TableDefinition::new("link_tokens");

/// Per-file link index: file_id -> msgpack Vec of link UUIDs (reuse lookups
/// and cascade deletes)
pub const FILE_LINKS: TableDefinition<&str, &[u8]> = TableDefinition::new("file_links");
