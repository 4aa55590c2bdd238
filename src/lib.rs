// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! Weft - a collaborative annotated-text editing engine using CRDTs.
//!
//! Every site edits its own snapshot and broadcasts commands; every
//! site that integrates the same commands, in any order consistent with
//! causal delivery, renders the same bytes and the same styling.
//!
//! # Quick Start
//!
//! ```
//! use weft::command::CommandSet;
//! use weft::doc::Document;
//! use weft::id::Id;
//! use weft::id::Site;
//!
//! // Each replica owns a site number and a clock.
//! let mut site = Site::new(1);
//!
//! // Edits are captured as commands...
//! let mut commands = CommandSet::new();
//! commands.push_insert(&mut site, b"Hello, World!", Id::BEGIN, Id::END);
//!
//! // ...and every replica integrates the same commands.
//! let doc = Document::new().integrate(&commands).unwrap();
//! assert_eq!(doc.to_string(), "Hello, World!");
//! ```

pub mod avl;
pub mod command;
pub mod doc;
pub mod editor;
pub mod error;
pub mod id;
