use crate::item::{ObjectDataItem, ObjectIdItem};
use crate::object::Verb;

/// A batch handed to an operation, tagged by verb.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Get(Vec<ObjectIdItem>),
    Upsert(Vec<ObjectDataItem>),
    Delete(Vec<ObjectIdItem>),
}

impl Request {
    pub fn verb(&self) -> Verb {
        match self {
            Self::Get(_) => Verb::Get,
            Self::Upsert(_) => Verb::Upsert,
            Self::Delete(_) => Verb::Delete,
        }
    }

    /// Number of input items in the batch.
    pub fn len(&self) -> usize {
        match self {
            Self::Get(items) | Self::Delete(items) => items.len(),
            Self::Upsert(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
