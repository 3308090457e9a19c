//! # plist-core
//!
//! In-memory tree model and incremental text parser for property lists in
//! the classic NeXT/OpenStep ASCII format, extended with the scalar types
//! the original grammar cannot express: booleans, integers, reals, and
//! dates.
//!
//! The parser accepts its input as an arbitrary sequence of byte chunks;
//! token boundaries may fall anywhere, and each `feed` resumes exactly where
//! the previous one stopped. This makes it usable directly against sockets
//! or any other source that hands out partial buffers.
//!
//! ## Quick start
//!
//! ```rust
//! use plist_core::Parser;
//!
//! let mut parser = Parser::new();
//! parser.feed(br#"{ "name" : "Alice" ; "#).unwrap();
//! parser.feed(br#""age" : 37 ; }"#).unwrap();
//!
//! let (tree, root) = parser.result().unwrap();
//! let age = tree.dict_get(root, "age").unwrap();
//! assert_eq!(tree.integer_value(age), Some(37));
//! ```
//!
//! ## Modules
//!
//! - [`tree`] — the node arena: construction, mutation, copy, release
//! - [`parser`] — the resumable chunk-fed parser
//! - [`dump`] — human-readable tree rendering
//! - [`scan`] — partial-token byte accumulator used by the parser
//! - [`types`] — node kind discriminator and its names
//! - [`error`] — the closed error set

pub mod dump;
pub mod error;
pub mod parser;
pub mod scan;
pub mod tree;
pub mod types;

pub use dump::dump;
pub use error::{PlistError, Result};
pub use parser::Parser;
pub use scan::ScanBuf;
pub use tree::{NodeId, Payload, Tree};
pub use types::Kind;
