// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! The replicated document: snapshot state and command integration.
//!
//! A [`Document`] is an immutable snapshot of one replica's view. It is
//! built from four persistent maps:
//!
//! 1. **Character graph**: `Id -> CharInfo`, a doubly-linked list of
//!    every character ever inserted, tombstones included, threaded
//!    through the `next`/`prev` fields. Deleted characters stay in the
//!    graph forever so concurrent inserts can still anchor on them.
//!
//! 2. **Line-break index**: `Id -> LineBreak`, a second doubly-linked
//!    list over just the visible newlines, so line navigation does not
//!    scan the whole document.
//!
//! 3. **Attribute store**: `Id -> Attribute`, style declarations.
//!
//! 4. **Annotation store**: `Id -> Annotation`, marked ranges. Each
//!    visible character additionally carries the set of annotation IDs
//!    covering it.
//!
//! Integration is a pure function: `integrate` takes a snapshot and a
//! command batch and returns a new snapshot, sharing structure with the
//! old one. Two replicas that integrate the same set of commands, in any
//! orders consistent with causal delivery, converge to equal snapshots.

use rustc_hash::FxHashSet;
use tracing::debug;
use tracing::trace;

use crate::avl::Avl;
use crate::command::Annotation;
use crate::command::Attribute;
use crate::command::CommandSet;
use crate::command::Op;
use crate::error::IntegrateError;
use crate::id::Id;
use crate::id::Site;

/// Everything the engine knows about one character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharInfo {
    /// False once the character has been deleted (tombstone).
    pub visible: bool,
    /// The character payload.
    pub chr: u8,
    /// Rendered successor. Updated as concurrent inserts land.
    pub next: Id,
    /// Rendered predecessor. Updated as concurrent inserts land.
    pub prev: Id,
    /// The rendered predecessor the author saw at insert time.
    /// Never changes after creation.
    pub after: Id,
    /// The rendered successor the author saw at insert time.
    /// Never changes after creation.
    pub before: Id,
    /// IDs of the annotations currently covering this character.
    pub annotations: Avl<Id, ()>,
}

/// An entry in the line-break index: neighbors in the circular list of
/// visible newlines, anchored at the sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineBreak {
    pub prev: Id,
    pub next: Id,
}

/// An immutable snapshot of the replicated document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    chars: Avl<Id, CharInfo>,
    line_breaks: Avl<Id, LineBreak>,
    attributes: Avl<Id, Attribute>,
    annotations: Avl<Id, Annotation>,
}

impl Document {
    /// Create an empty document holding only the sentinels.
    pub fn new() -> Document {
        let chars = Avl::new()
            .insert(
                Id::BEGIN,
                CharInfo {
                    visible: false,
                    chr: 0,
                    next: Id::END,
                    prev: Id::BEGIN,
                    after: Id::BEGIN,
                    before: Id::END,
                    annotations: Avl::new(),
                },
            )
            .insert(
                Id::END,
                CharInfo {
                    visible: false,
                    chr: 0,
                    next: Id::END,
                    prev: Id::BEGIN,
                    after: Id::BEGIN,
                    before: Id::END,
                    annotations: Avl::new(),
                },
            );
        let line_breaks = Avl::new()
            .insert(Id::BEGIN, LineBreak { prev: Id::END, next: Id::END })
            .insert(Id::END, LineBreak { prev: Id::BEGIN, next: Id::BEGIN });
        return Document {
            chars,
            line_breaks,
            attributes: Avl::new(),
            annotations: Avl::new(),
        };
    }

    // =========================================================================
    // Integration
    // =========================================================================

    /// Apply a batch of commands, returning the resulting snapshot.
    ///
    /// Commands are processed in batch order. Every integrator is
    /// idempotent, so re-delivered commands are harmless. On error the
    /// partially-built snapshot is discarded; `self` is untouched either
    /// way.
    pub fn integrate(&self, commands: &CommandSet) -> Result<Document, IntegrateError> {
        debug!(commands = commands.len(), "integrating command batch");
        let mut doc = self.clone();
        for command in commands.commands() {
            let op = match &command.op {
                Some(op) => op,
                None => return Err(IntegrateError::InvalidCommandKind(command.id)),
            };
            trace!(id = %command.id, "integrating command");
            match op {
                Op::Insert { after, before, characters } => {
                    doc.integrate_insert(command.id, *after, *before, characters)?;
                }
                Op::Delete => doc.integrate_delete(command.id),
                Op::Decl { attribute } => doc.integrate_decl(command.id, attribute),
                Op::DelDecl => doc.integrate_del_decl(command.id),
                Op::Mark { annotation } => doc.integrate_mark(command.id, annotation)?,
                Op::DelMark => doc.integrate_del_mark(command.id)?,
            }
        }
        return Ok(doc);
    }

    /// Integrate an insert command: one character per byte, each anchored
    /// on its predecessor in the run.
    fn integrate_insert(
        &mut self,
        first: Id,
        after: Id,
        before: Id,
        characters: &[u8],
    ) -> Result<(), IntegrateError> {
        if self.chars.contains_key(&first) {
            // Re-delivered insert.
            return Ok(());
        }
        let mut id = first;
        let mut after = after;
        for &chr in characters {
            self.integrate_insert_char(id, chr, after, before)?;
            after = id;
            id.clock += 1;
        }
        return Ok(());
    }

    /// Place one character into the graph.
    ///
    /// The fast path splices directly between the origin hints. When
    /// concurrent inserts have landed between them, the conflict window
    /// is narrowed until the hints are adjacent again: characters
    /// anchored strictly inside the window ride along with their
    /// anchors and are skipped; characters anchored at or beyond the
    /// window bounds constrain the position, and the first of them with
    /// a greater ID bounds the retry window. Both steps depend only on
    /// immutable origin hints and IDs, so every replica places the
    /// character in the same spot.
    fn integrate_insert_char(
        &mut self,
        id: Id,
        chr: u8,
        after: Id,
        before: Id,
    ) -> Result<(), IntegrateError> {
        let mut left = after;
        let mut right = before;
        loop {
            let cleft = match self.chars.get(&left) {
                Some(info) => info.clone(),
                None => return Err(IntegrateError::MissingOriginHint(left)),
            };
            let cright = match self.chars.get(&right) {
                Some(info) => info.clone(),
                None => return Err(IntegrateError::MissingOriginHint(right)),
            };

            if cleft.next == right {
                if chr == b'\n' {
                    self.link_line_break(id, left);
                }
                // A character spliced into a marked span inherits the
                // covering set of its rendered predecessor. The stored
                // origin hints are the author's, not the splice point:
                // the splice point depends on delivery order, and the
                // hints must read the same at every replica.
                let annotations = cleft.annotations.clone();
                self.chars = self
                    .chars
                    .insert(left, CharInfo { next: id, ..cleft })
                    .insert(
                        id,
                        CharInfo {
                            visible: true,
                            chr,
                            next: right,
                            prev: left,
                            after,
                            before,
                            annotations,
                        },
                    )
                    .insert(right, CharInfo { prev: id, ..cright });
                return Ok(());
            }

            // Concurrent inserts landed between the hints. Walk the
            // window from `left` to `right`.
            let mut window = vec![left];
            let mut loc = cleft.next;
            while loc != right {
                if loc == Id::END {
                    // A well-formed command places its `before` later in
                    // the chain; reaching the end sentinel first means
                    // the hint never resolved.
                    return Err(IntegrateError::MissingOriginHint(right));
                }
                window.push(loc);
                loc = self.char_ref(&loc).next;
            }
            window.push(right);

            // Keep only the characters whose origins lie at or beyond
            // the window bounds. A character anchored strictly inside
            // the window is ordered by its anchor, not by its ID, so it
            // cannot constrain `id`'s position. At least one character
            // always survives: the causally earliest one cannot be
            // anchored on its concurrent siblings.
            let interior: FxHashSet<Id> = window[1..window.len() - 1].iter().copied().collect();
            let mut filtered = Vec::with_capacity(window.len());
            filtered.push(window[0]);
            for &loc in &window[1..window.len() - 1] {
                let info = self.char_ref(&loc);
                if !interior.contains(&info.after) && !interior.contains(&info.before) {
                    filtered.push(loc);
                }
            }
            filtered.push(window[window.len() - 1]);
            trace!(
                window = window.len(),
                kept = filtered.len(),
                "narrowing concurrent insert window"
            );

            // Narrow to the gap before the first greater ID and retry.
            let mut i = 1;
            while i < filtered.len() - 1 && filtered[i] < id {
                i += 1;
            }
            left = filtered[i - 1];
            right = filtered[i];
        }
    }

    /// Integrate a delete: flip the character to a tombstone. The graph
    /// entry and its links stay, so later concurrent inserts can still
    /// anchor on it.
    fn integrate_delete(&mut self, id: Id) {
        let info = match self.chars.get(&id) {
            Some(info) if info.visible => info.clone(),
            // Unknown or already deleted.
            _ => return,
        };
        if info.chr == b'\n' {
            self.unlink_line_break(id);
        }
        self.chars = self.chars.insert(
            id,
            CharInfo {
                visible: false,
                annotations: Avl::new(),
                ..info
            },
        );
    }

    fn integrate_decl(&mut self, id: Id, attribute: &Attribute) {
        self.attributes = self.attributes.insert(id, attribute.clone());
    }

    /// Retract an attribute declaration. Annotations still referencing
    /// it simply render as unattributed.
    fn integrate_del_decl(&mut self, id: Id) {
        self.attributes = self.attributes.remove(&id);
    }

    /// Integrate a mark: record the annotation and stamp its ID onto
    /// every visible character in `[begin, end)`. The walk follows the
    /// `next` chain, so it passes tombstones but leaves them untouched.
    fn integrate_mark(&mut self, id: Id, annotation: &Annotation) -> Result<(), IntegrateError> {
        if self.annotations.contains_key(&id) {
            // Re-delivered mark. Walking the range again could catch
            // characters that arrived since the first delivery.
            return Ok(());
        }
        self.annotations = self.annotations.insert(id, annotation.clone());
        let mut loc = annotation.begin;
        while loc != annotation.end {
            let info = match self.chars.get(&loc) {
                Some(info) => info.clone(),
                None => return Err(IntegrateError::MissingOriginHint(loc)),
            };
            if loc == Id::END {
                return Err(IntegrateError::MissingOriginHint(annotation.end));
            }
            let next = info.next;
            if info.visible {
                let annotations = info.annotations.insert(id, ());
                self.chars = self.chars.insert(loc, CharInfo { annotations, ..info });
            }
            loc = next;
        }
        return Ok(());
    }

    /// Integrate an unmark: strip the annotation's ID from its range and
    /// drop the annotation. Unknown annotations are ignored.
    fn integrate_del_mark(&mut self, id: Id) -> Result<(), IntegrateError> {
        let annotation = match self.annotations.get(&id) {
            Some(annotation) => *annotation,
            None => return Ok(()),
        };
        let mut loc = annotation.begin;
        while loc != annotation.end {
            let info = match self.chars.get(&loc) {
                Some(info) => info.clone(),
                None => return Err(IntegrateError::MissingOriginHint(loc)),
            };
            if loc == Id::END {
                return Err(IntegrateError::MissingOriginHint(annotation.end));
            }
            let next = info.next;
            if info.visible {
                let annotations = info.annotations.remove(&id);
                self.chars = self.chars.insert(loc, CharInfo { annotations, ..info });
            }
            loc = next;
        }
        self.annotations = self.annotations.remove(&id);
        return Ok(());
    }

    // =========================================================================
    // Line-break index maintenance
    // =========================================================================

    /// Splice a newly visible newline into the line-break list. Runs
    /// before the character itself lands in the graph; the scan walks
    /// the pre-insert chain backward from the splice point.
    fn link_line_break(&mut self, id: Id, after: Id) {
        let mut p = after;
        while p != Id::BEGIN {
            let info = self.char_ref(&p);
            if info.visible && info.chr == b'\n' {
                break;
            }
            p = info.prev;
        }
        let p_entry = *self.line_break_ref(&p);
        let p_next = p_entry.next;
        let n_entry = *self.line_break_ref(&p_next);
        self.line_breaks = self
            .line_breaks
            .insert(p, LineBreak { prev: p_entry.prev, next: id })
            .insert(id, LineBreak { prev: p, next: p_next })
            .insert(p_next, LineBreak { prev: id, next: n_entry.next });
    }

    /// Remove a deleted newline from the line-break list.
    fn unlink_line_break(&mut self, id: Id) {
        let entry = *self.line_break_ref(&id);
        let prev = *self.line_break_ref(&entry.prev);
        let next = *self.line_break_ref(&entry.next);
        self.line_breaks = self
            .line_breaks
            .remove(&id)
            .insert(entry.prev, LineBreak { prev: prev.prev, next: entry.next })
            .insert(entry.next, LineBreak { prev: entry.prev, next: next.next });
    }

    fn char_ref(&self, id: &Id) -> &CharInfo {
        return self.chars.get(id).expect("character graph links resolve");
    }

    fn line_break_ref(&self, id: &Id) -> &LineBreak {
        return self.line_breaks.get(id).expect("line break index links resolve");
    }

    // =========================================================================
    // Readback
    // =========================================================================

    /// The visible character sequence, in rendered order.
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut loc = Id::BEGIN;
        while loc != Id::END {
            let info = self.char_ref(&loc);
            if info.visible {
                out.push(info.chr);
            }
            loc = info.next;
        }
        return out;
    }

    /// The rendered document as a string (assumes UTF-8).
    pub fn to_string(&self) -> String {
        return String::from_utf8(self.render()).unwrap_or_default();
    }

    /// The number of visible characters.
    pub fn len(&self) -> usize {
        return self.chars().filter(|(_, info)| info.visible).count();
    }

    /// Check whether no characters are visible.
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// Iterate over every character in rendered order, sentinels and
    /// tombstones included.
    pub fn chars(&self) -> Chars<'_> {
        return Chars { doc: self, loc: Some(Id::BEGIN) };
    }

    /// The ID of the `pos`-th visible character, if any.
    ///
    /// Callers use this to translate cursor positions into the stable
    /// IDs that delete and mark commands require.
    pub fn id_at(&self, pos: usize) -> Option<Id> {
        let mut remaining = pos;
        for (id, info) in self.chars() {
            if !info.visible {
                continue;
            }
            if remaining == 0 {
                return Some(id);
            }
            remaining -= 1;
        }
        return None;
    }

    /// Look up a character by ID.
    pub fn char_info(&self, id: &Id) -> Option<&CharInfo> {
        return self.chars.get(id);
    }

    /// Look up an attribute declaration by ID.
    pub fn attribute(&self, id: &Id) -> Option<&Attribute> {
        return self.attributes.get(id);
    }

    /// Look up an annotation by ID.
    pub fn annotation(&self, id: &Id) -> Option<&Annotation> {
        return self.annotations.get(id);
    }

    /// The annotation IDs covering a character, in ID order.
    pub fn annotations_at(&self, id: &Id) -> Option<Vec<Id>> {
        let info = self.chars.get(id)?;
        return Some(info.annotations.iter().map(|(id, _)| *id).collect());
    }

    /// The number of lines in the document. An empty document has one.
    pub fn line_count(&self) -> usize {
        return self.line_breaks.len() - 1;
    }

    /// Render the `index`-th line, without its trailing newline.
    ///
    /// Navigates the line-break index rather than scanning the whole
    /// document, so the cost is the line's own length plus one index
    /// step per preceding line.
    pub fn render_line(&self, index: usize) -> Option<Vec<u8>> {
        let mut anchor = Id::BEGIN;
        for _ in 0..index {
            anchor = self.line_break_ref(&anchor).next;
            if anchor == Id::END {
                return None;
            }
        }
        let mut line = Vec::new();
        let mut loc = self.char_ref(&anchor).next;
        while loc != Id::END {
            let info = self.char_ref(&loc);
            if info.visible {
                if info.chr == b'\n' {
                    break;
                }
                line.push(info.chr);
            }
            loc = info.next;
        }
        return Some(line);
    }

    // =========================================================================
    // Local edits
    // =========================================================================

    /// Capture an insert as a command and apply it locally in one step.
    ///
    /// Appends the command to `commands` for broadcast and returns the
    /// post-edit snapshot along with the first and last ID of the run.
    pub fn local_insert(
        &self,
        commands: &mut CommandSet,
        site: &mut Site,
        characters: &[u8],
        after: Id,
        before: Id,
    ) -> Result<(Document, (Id, Id)), IntegrateError> {
        let (first, last) = commands.push_insert(site, characters, after, before);
        let mut doc = self.clone();
        doc.integrate_insert(first, after, before, characters)?;
        return Ok((doc, (first, last)));
    }

    /// Capture a delete as a command and apply it locally in one step.
    pub fn local_delete(&self, commands: &mut CommandSet, id: Id) -> Document {
        commands.push_delete(id);
        let mut doc = self.clone();
        doc.integrate_delete(id);
        return doc;
    }
}

impl Default for Document {
    fn default() -> Document {
        return Document::new();
    }
}

/// Iterator over `(Id, &CharInfo)` in rendered order, from `BEGIN` to
/// `END` inclusive.
pub struct Chars<'a> {
    doc: &'a Document,
    loc: Option<Id>,
}

impl<'a> Iterator for Chars<'a> {
    type Item = (Id, &'a CharInfo);

    fn next(&mut self) -> Option<Self::Item> {
        let loc = self.loc?;
        let info = self.doc.char_ref(&loc);
        self.loc = if loc == Id::END { None } else { Some(info.next) };
        return Some((loc, info));
    }
}
