//! `arsip` - A record manager for titled, dated archive entries
//!
//! This library provides the archive controller, attachment handle
//! management, print preview generation and theme preference storage used
//! by the `arsip` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod archive;
pub mod attachment;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod html;
pub mod logging;
pub mod print;
pub mod record;
pub mod resolver;
pub mod shell;
pub mod spool;
pub mod storage;
pub mod store;
pub mod table;
pub mod theme;

pub use archive::{Archive, Submitted};
pub use attachment::{Attachment, AttachmentKind, Blob, DisplayHandle, SelectedFile};
pub use config::Config;
pub use error::{Error, Result};
pub use form::{FormMode, FormState, FormValues};
pub use logging::init_logging;
pub use print::{
    DocxConverter, DocxHtmlConverter, FilePrintHost, MemoryPrintHost, PrintDispatcher, PrintJob,
    PrintReport, PrintState,
};
pub use record::{Record, RecordId, RecordSummary};
pub use resolver::{AttachmentResolver, HandleProvider, MemoryHandleProvider};
pub use shell::Session;
pub use spool::SpoolHandleProvider;
pub use store::RecordStore;
pub use table::TableView;
pub use theme::{Theme, ThemeToggle};
