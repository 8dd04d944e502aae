mod engine;
mod token;

pub use engine::{Principal, ShareError, ShareLinkEngine, ShareMeta};
