//! Event-sourced aggregates: items and sale transactions.
//!
//! An aggregate is rebuilt by folding its stream through `apply`, then asked
//! to `handle` a command, which yields the events to append. Both are pure;
//! loading and appending happen in the infra layer.

/// Identity and stream revision of a rebuilt aggregate.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Events applied so far. Zero means the stream does not exist.
    fn version(&self) -> u64;
}

/// Stream revision an append expects to find.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No check.
    Any,
    /// Creating the stream: it must be empty. Used for new items and for
    /// sales, where the stream id is derived from the invoice number.
    NoStream,
    /// The stream must be exactly at this revision.
    Exact(u64),
}

impl ExpectedVersion {
    /// Revision a stream must be at for an append from `version` to apply.
    pub fn for_version(version: u64) -> Self {
        if version == 0 {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual == 0,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// Decision (`handle`) and evolution (`apply`) for one aggregate type.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Fold one event into state; bumps `version` by one.
    fn apply(&mut self, event: &Self::Event);

    /// Events the command produces against the current state. Must not mutate.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
