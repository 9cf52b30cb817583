//! Boundary between the in-memory diagram and the remote AutoArch services,
//! plus the editor session that sequences calls against it.

pub mod client;
pub mod error;
pub mod parse;
pub mod service;
pub mod session;

pub use client::HttpArchService;
pub use error::{BridgeError, Result};
pub use parse::parse_diagram;
pub use service::{AiPrompt, ArchService, CodegenRequest, CodegenResponse};
pub use session::{
    BulkLoad, Editor, Notice, NoticeLevel, ProjectConfig, Session, SessionHandle, StartMode,
};
