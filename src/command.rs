// model = "claude-opus-4-5"
// created = "2026-02-02"
// modified = "2026-02-03"
// driver = "Isaac Clayton"

//! The command wire model.
//!
//! Sites never exchange document state; they exchange commands. A
//! [`CommandSet`] is an ordered batch of [`Command`]s, each carrying its
//! own [`Id`] and one operation. The builder methods allocate IDs from a
//! caller-supplied [`Site`], so a command set doubles as the unit of
//! local edit capture: make edits against a snapshot, send the set to
//! every peer, and every peer integrates it.
//!
//! The operation payload is optional on the wire. A peer running a newer
//! protocol revision may emit a variant this build cannot decode; the
//! decoded form of such a command is `op: None`, which integration
//! rejects without corrupting the snapshot.

use serde::Deserialize;
use serde::Serialize;

use crate::id::Id;
use crate::id::Site;

/// An opaque style declaration: a named property and its value, e.g.
/// `("color", "#aa3322")` or `("font", "monospace")`.
///
/// The engine never interprets the payload; it only stores, forwards,
/// and deduplicates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    /// Create an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Attribute {
        return Attribute {
            name: name.into(),
            value: value.into(),
        };
    }

    /// A stable canonical byte serialization of this attribute.
    ///
    /// Equal attributes always canonicalize to equal bytes, which is
    /// what the annotation editor's deduplication keys on.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        return serde_json::to_vec(self);
    }
}

/// A half-open range `[begin, end)` over the character sequence, tagged
/// with the ID of a declared [`Attribute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// First character covered by the range.
    pub begin: Id,
    /// First character past the range.
    pub end: Id,
    /// The attribute declaration this range styles its characters with.
    pub attribute: Id,
}

impl Annotation {
    /// Create an annotation.
    pub fn new(begin: Id, end: Id, attribute: Id) -> Annotation {
        return Annotation { begin, end, attribute };
    }

    /// A stable canonical byte serialization of this annotation.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        return serde_json::to_vec(self);
    }
}

/// One of the six operation kinds a command can carry.
///
/// `Delete`, `DelDecl`, and `DelMark` carry no payload: they target the
/// command's own `id` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Insert a contiguous run of characters between two origin hints.
    /// The command's ID names the first character; character `i` takes
    /// clock `id.clock + i`.
    Insert {
        after: Id,
        before: Id,
        characters: Vec<u8>,
    },
    /// Tombstone the character whose ID is the command's ID.
    Delete,
    /// Declare an attribute under the command's ID.
    Decl { attribute: Attribute },
    /// Retract the attribute declared under the command's ID.
    DelDecl,
    /// Mark a range with an annotation under the command's ID.
    Mark { annotation: Annotation },
    /// Remove the annotation marked under the command's ID.
    DelMark,
}

/// A single replicated command: an ID plus an operation.
///
/// `op` is `None` when the wire payload carried no variant this build
/// recognizes; integrating such a command fails the batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: Id,
    pub op: Option<Op>,
}

/// An ordered batch of commands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl CommandSet {
    /// Create an empty command set.
    pub fn new() -> CommandSet {
        return CommandSet { commands: Vec::new() };
    }

    /// The number of commands in the set.
    pub fn len(&self) -> usize {
        return self.commands.len();
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        return self.commands.is_empty();
    }

    /// The commands, in batch order.
    pub fn commands(&self) -> &[Command] {
        return &self.commands;
    }

    /// Append an already-built command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Append every command of `other`, preserving order.
    pub fn extend(&mut self, other: &CommandSet) {
        self.commands.extend_from_slice(&other.commands);
    }

    /// Append an insert command for a contiguous run of characters.
    ///
    /// Reserves one ID per character from `site` and returns the first
    /// and last ID of the run. `after` and `before` are the rendered
    /// neighbors visible to the author at edit time.
    ///
    /// # Panics
    ///
    /// Panics if `characters` is empty.
    pub fn push_insert(
        &mut self,
        site: &mut Site,
        characters: &[u8],
        after: Id,
        before: Id,
    ) -> (Id, Id) {
        assert!(!characters.is_empty(), "cannot insert empty characters");
        let (first, last) = site.generate_id_block(characters.len());
        self.commands.push(Command {
            id: first,
            op: Some(Op::Insert {
                after,
                before,
                characters: characters.to_vec(),
            }),
        });
        return (first, last);
    }

    /// Append a delete command targeting the character `id`.
    pub fn push_delete(&mut self, id: Id) {
        self.commands.push(Command {
            id,
            op: Some(Op::Delete),
        });
    }

    /// Append an attribute declaration, returning its fresh ID.
    pub fn push_decl(&mut self, site: &mut Site, attribute: Attribute) -> Id {
        let id = site.generate_id();
        self.commands.push(Command {
            id,
            op: Some(Op::Decl { attribute }),
        });
        return id;
    }

    /// Append a retraction of the attribute declared under `id`.
    pub fn push_del_decl(&mut self, id: Id) {
        self.commands.push(Command {
            id,
            op: Some(Op::DelDecl),
        });
    }

    /// Append a mark command, returning the annotation's fresh ID.
    pub fn push_mark(&mut self, site: &mut Site, annotation: Annotation) -> Id {
        let id = site.generate_id();
        self.commands.push(Command {
            id,
            op: Some(Op::Mark { annotation }),
        });
        return id;
    }

    /// Append a removal of the annotation marked under `id`.
    pub fn push_del_mark(&mut self, id: Id) {
        self.commands.push(Command {
            id,
            op: Some(Op::DelMark),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reserves_one_id_per_character() {
        let mut site = Site::new(1);
        let mut commands = CommandSet::new();

        let (first, last) = commands.push_insert(&mut site, b"abc", Id::BEGIN, Id::END);
        assert_eq!(first, Id::new(1, 2));
        assert_eq!(last, Id::new(1, 4));
        assert_eq!(commands.len(), 1);

        // The next command's ID follows the reserved block.
        let id = commands.push_decl(&mut site, Attribute::new("color", "red"));
        assert_eq!(id, Id::new(1, 5));
    }

    #[test]
    fn targeted_commands_carry_no_payload() {
        let mut commands = CommandSet::new();
        commands.push_delete(Id::new(1, 2));
        commands.push_del_decl(Id::new(1, 3));
        commands.push_del_mark(Id::new(1, 4));

        let kinds: Vec<&Op> = commands
            .commands()
            .iter()
            .map(|c| c.op.as_ref().unwrap())
            .collect();
        assert_eq!(kinds, vec![&Op::Delete, &Op::DelDecl, &Op::DelMark]);
    }

    #[test]
    fn canonical_bytes_are_stable() {
        let a = Attribute::new("color", "red");
        let b = Attribute::new("color", "red");
        assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());

        let c = Attribute::new("color", "blue");
        assert_ne!(a.canonical_bytes().unwrap(), c.canonical_bytes().unwrap());
    }

    #[test]
    fn annotation_canonical_bytes_distinguish_ranges() {
        let attr = Id::new(1, 9);
        let a = Annotation::new(Id::new(1, 2), Id::END, attr);
        let b = Annotation::new(Id::new(1, 3), Id::END, attr);
        assert_ne!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
    }

    #[test]
    fn command_set_round_trips_through_serde() {
        let mut site = Site::new(2);
        let mut commands = CommandSet::new();
        commands.push_insert(&mut site, b"hi", Id::BEGIN, Id::END);
        commands.push_delete(Id::new(2, 2));

        let encoded = serde_json::to_vec(&commands).unwrap();
        let decoded: CommandSet = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, commands);
    }

    #[test]
    fn extend_preserves_order() {
        let mut a = CommandSet::new();
        a.push_delete(Id::new(1, 2));
        let mut b = CommandSet::new();
        b.push_delete(Id::new(2, 2));

        a.extend(&b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.commands()[1].id, Id::new(2, 2));
    }
}
