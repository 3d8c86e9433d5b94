//! IronCode Edit: the text-edit core of an AI coding assistant's edit tool.
//!
//! Given a file's content and a model-proposed `(oldString → newString)`
//! pair, locate `oldString` despite formatting drift and either apply the
//! substitution or fail loudly. Parallel tool calls are serialized per file
//! and the expensive part of each call is capped by a semaphore.
//!
//! # Architecture
//!
//! - [`matcher`]: a fixed cascade of eight strategies, strictest first. The
//!   first strategy that finds anything wins and reports every occurrence.
//! - [`edit`]: turns located spans into new content, enforcing the
//!   single-vs-all-occurrence policy. Pure; never mutates its input.
//! - [`sync`]: per-key read/write locks (FIFO, writer-priority,
//!   cancel-safe) and a bounded FIFO semaphore.
//! - [`tool`]: the tool-execution entry point tying the above to the
//!   filesystem behind a permission gate.
//! - [`ffi`]: a C-compatible boundary returning JSON.
//!
//! # Safety
//!
//! - Identical `oldString`/`newString` is rejected before matching
//! - Ambiguous matches fail unless `replaceAll` is set
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement
//! - Concurrent modification is detected before writing
//!
//! # Example
//!
//! ```
//! use ironcode_edit::{replace, EditError, Strategy};
//!
//! let result = replace("Hello world", "world", "Rust", false).unwrap();
//! assert_eq!(result.content, "Hello Rust");
//! assert_eq!(result.strategy, Strategy::Exact);
//!
//! let err = replace("foo bar foo", "foo", "baz", false).unwrap_err();
//! assert_eq!(err, EditError::AmbiguousMatch { count: 2 });
//! ```

pub mod config;
pub mod edit;
pub mod ffi;
pub mod matcher;
pub mod safety;
pub mod sync;
pub mod tool;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, ToolConfig};
pub use edit::{apply, replace, EditError, EditRequest, Replacement};
pub use matcher::{locate, MatchOutcome, MatchSpan, Strategy};
pub use safety::{SafetyError, WorkspaceGuard};
pub use sync::{LockHandle, LockManager, LockMode, Permit, Semaphore, SyncError};
pub use tool::{EditParams, EditTool, ToolContext, ToolError, ToolOutput};
