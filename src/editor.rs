// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! Diffing helper that turns declared styling intent into commands.
//!
//! Callers do not manage attribute and annotation lifetimes by hand.
//! Each edit pass they declare the full set of marks the current view
//! should carry; the editor compares that against the previous pass and
//! emits only the difference:
//!
//! - A payload seen last pass keeps its ID and emits nothing.
//! - A new payload emits a `Decl` or `Mark` under a fresh ID.
//! - A payload from last pass that was not re-declared gets a `DelMark`
//!   or `DelDecl` when the pass ends.
//!
//! Deduplication keys on the payload's canonical byte serialization, so
//! equal payloads collapse to one wire declaration per pass.
//!
//! [`AnnotationEditor::end_edit`] consumes the editor and returns the
//! memory for the next pass. Dropping an editor without calling it
//! leaks stale marks on the wire; they stay visible at every replica
//! until some later pass retracts them.

use std::collections::BTreeMap;

use crate::command::Annotation;
use crate::command::Attribute;
use crate::command::CommandSet;
use crate::error::EditError;
use crate::id::Id;
use crate::id::Site;

/// Dedup state carried from one edit pass to the next.
///
/// Maps canonical payload bytes to the ID the payload was declared
/// under. Ordered so retraction commands are emitted deterministically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditorMemory {
    attrs: BTreeMap<Vec<u8>, Id>,
    marks: BTreeMap<Vec<u8>, Id>,
}

impl EditorMemory {
    /// Memory for a first edit pass: nothing declared yet.
    pub fn new() -> EditorMemory {
        return EditorMemory::default();
    }
}

/// A scoped helper for one edit pass.
///
/// Borrows the command buffer and site for the duration of the pass;
/// every emitted command lands in the buffer in declaration order.
pub struct AnnotationEditor<'a> {
    commands: &'a mut CommandSet,
    site: &'a mut Site,
    last_attrs: BTreeMap<Vec<u8>, Id>,
    new_attrs: BTreeMap<Vec<u8>, Id>,
    last_marks: BTreeMap<Vec<u8>, Id>,
    new_marks: BTreeMap<Vec<u8>, Id>,
}

impl<'a> AnnotationEditor<'a> {
    /// Begin an edit pass, seeded with the previous pass's memory.
    pub fn new(
        commands: &'a mut CommandSet,
        site: &'a mut Site,
        memory: EditorMemory,
    ) -> AnnotationEditor<'a> {
        return AnnotationEditor {
            commands,
            site,
            last_attrs: memory.attrs,
            new_attrs: BTreeMap::new(),
            last_marks: memory.marks,
            new_marks: BTreeMap::new(),
        };
    }

    /// The ID of an attribute, declaring it if this pass has not seen it.
    pub fn attr_id(&mut self, attribute: &Attribute) -> Result<Id, EditError> {
        let key = attribute.canonical_bytes()?;
        if let Some(id) = self.new_attrs.get(&key) {
            return Ok(*id);
        }
        if let Some(id) = self.last_attrs.remove(&key) {
            self.new_attrs.insert(key, id);
            return Ok(id);
        }
        let id = self.commands.push_decl(self.site, attribute.clone());
        self.new_attrs.insert(key, id);
        return Ok(id);
    }

    /// Mark `[begin, end)` with an attribute, reusing the mark from the
    /// previous pass when the range and attribute are unchanged.
    pub fn mark(&mut self, begin: Id, end: Id, attribute: Id) -> Result<Id, EditError> {
        let annotation = Annotation::new(begin, end, attribute);
        let key = annotation.canonical_bytes()?;
        if let Some(id) = self.new_marks.get(&key) {
            return Ok(*id);
        }
        if let Some(id) = self.last_marks.remove(&key) {
            self.new_marks.insert(key, id);
            return Ok(id);
        }
        let id = self.commands.push_mark(self.site, annotation);
        self.new_marks.insert(key, id);
        return Ok(id);
    }

    /// Finish the pass: retract everything from the previous pass that
    /// was not re-declared, and return the memory for the next pass.
    pub fn end_edit(self) -> EditorMemory {
        let AnnotationEditor {
            commands,
            site: _,
            last_attrs,
            new_attrs,
            last_marks,
            new_marks,
        } = self;
        for (_, id) in last_marks {
            commands.push_del_mark(id);
        }
        for (_, id) in last_attrs {
            commands.push_del_decl(id);
        }
        return EditorMemory {
            attrs: new_attrs,
            marks: new_marks,
        };
    }
}
