//! Input/output id namespaces and the remote-control binding table.

use std::collections::BTreeMap;

use tracing::warn;

use crate::types::IoId;

/// Static, bidirectional name ↔ id table of one part.
#[derive(Debug, Clone, Copy)]
pub struct IdTable {
    entries: &'static [(&'static str, u16)],
}

impl IdTable {
    pub const EMPTY: IdTable = IdTable { entries: &[] };

    pub const fn new(entries: &'static [(&'static str, u16)]) -> Self {
        IdTable { entries }
    }

    pub fn get(&self, name: &str) -> Option<IoId> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| IoId::new(*id))
    }

    /// Id of `name`, or the sentinel with a warning naming the owner.
    pub fn lookup(&self, owner: &str, direction: Direction, name: &str) -> IoId {
        self.get(name).unwrap_or_else(|| {
            warn!("{} {} '{}' has no valid id", owner, direction.as_str(), name);
            IoId::INVALID
        })
    }

    pub fn name(&self, id: IoId) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == id.value())
            .map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, IoId)> + '_ {
        self.entries.iter().map(|(n, id)| (*n, IoId::new(*id)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Where a remote name points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteBinding {
    pub part: usize,
    pub direction: Direction,
    pub id: IoId,
}

/// Remote-control names (`"<part>.<io name>"`) resolved to part slots.
///
/// Inputs and outputs are separate name spaces. Bindings hold indices only;
/// state always travels by value through `Part::input_status` and friends.
#[derive(Debug, Clone, Default)]
pub struct RemoteControlTable {
    bindings: BTreeMap<(Direction, String), RemoteBinding>,
}

impl RemoteControlTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, part: usize, part_name: &str, direction: Direction, table: &IdTable) {
        for (name, id) in table.iter() {
            self.bindings.insert(
                (direction, format!("{}.{}", part_name, name)),
                RemoteBinding {
                    part,
                    direction,
                    id,
                },
            );
        }
    }

    pub fn resolve(&self, direction: Direction, name: &str) -> Option<RemoteBinding> {
        self.bindings.get(&(direction, name.to_string())).copied()
    }

    pub fn names(&self, direction: Direction) -> impl Iterator<Item = &str> {
        self.bindings
            .keys()
            .filter(move |(d, _)| *d == direction)
            .map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
