//! Key-value storage for registry records.
//!
//! The registry only talks to the [`Store`] trait. Keys are paths (lists of
//! string segments) and values are opaque bytes; records are CBOR-encoded
//! on the way in and decoded on the way out.
//!
//! ```text
//! meta/schema                      u32
//! meta/next_poll_id                u64
//! meta/event_seq                   u64
//! meta/event_head                  Hash
//! polls/<id>                       Poll
//! voted/<id>/<account>             bool
//! voters/<account>/polls_voted     u64
//! creators/<account>/polls         Vec<PollId>
//! ```

use crate::{Error, Hash};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

/// A path is a list of string segments.
pub type Path = Vec<String>;

/// A value is raw bytes.
pub type Value = Vec<u8>;

/// A single write against a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    Set(Path, Value),
    Delete(Path),
}

impl Mutation {
    /// CBOR-encode `value` into a `Set` at `path`.
    pub fn put<T: Serialize>(path: Path, value: &T) -> Result<Self, Error> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)?;
        Ok(Mutation::Set(path, buf))
    }
}

/// Abstract key-value store.
///
/// Callers build a batch only once every check has passed, then hand it
/// over in one `apply`.
pub trait Store: Send {
    /// The value at `path`, if any.
    fn get(&self, path: &[String]) -> Result<Option<Value>, Error>;

    /// Install the whole batch or nothing. On `Err` the store must read
    /// exactly as it did before the call.
    fn apply(&mut self, batch: Vec<Mutation>) -> Result<(), Error>;

    /// All paths holding a value under `prefix`, in key order.
    fn enumerate(&self, prefix: &[String]) -> Vec<Path>;

    /// Content hash over everything in the store.
    fn root(&self) -> Result<Hash, Error>;
}

/// Read and decode a record, `None` if the path is empty.
pub fn read<T: DeserializeOwned>(store: &dyn Store, path: &[String]) -> Result<Option<T>, Error> {
    match store.get(path)? {
        Some(bytes) => Ok(Some(ciborium::from_reader(bytes.as_slice())?)),
        None => Ok(None),
    }
}

/// Build a path from segments.
pub fn path<I, S>(segments: I) -> Path
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    segments.into_iter().map(Into::into).collect()
}

/// Paths of the registry layout.
pub(crate) mod keys {
    use super::{path, Path};
    use crate::{AccountId, PollId};

    pub fn schema() -> Path {
        path(["meta", "schema"])
    }

    pub fn next_poll_id() -> Path {
        path(["meta", "next_poll_id"])
    }

    pub fn event_seq() -> Path {
        path(["meta", "event_seq"])
    }

    pub fn event_head() -> Path {
        path(["meta", "event_head"])
    }

    pub fn poll(id: PollId) -> Path {
        path(["polls".to_string(), id.to_string()])
    }

    pub fn voted(id: PollId, voter: &AccountId) -> Path {
        path(["voted".to_string(), id.to_string(), voter.to_string()])
    }

    pub fn polls_voted(voter: &AccountId) -> Path {
        path(["voters".to_string(), voter.to_string(), "polls_voted".to_string()])
    }

    pub fn creator_polls(creator: &AccountId) -> Path {
        path(["creators".to_string(), creator.to_string(), "polls".to_string()])
    }
}

/// A node in the store tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Value(Value),
    Tree(BTreeMap<String, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Tree(BTreeMap::new())
    }
}

/// In-memory tree store. Serializable, so a snapshot is just its CBOR form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    root: BTreeMap<String, Node>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Number of values held.
    pub fn len(&self) -> usize {
        self.enumerate(&[]).len()
    }

    pub fn to_snapshot(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self, Error> {
        Ok(ciborium::from_reader(bytes)?)
    }

    fn set(&mut self, path: &[String], value: Value) {
        insert_at(&mut self.root, path, value);
    }

    fn delete(&mut self, path: &[String]) -> bool {
        remove_at(&mut self.root, path)
    }

    fn lookup(&self, path: &[String]) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &self.root;
        for segment in parents {
            match current.get(segment) {
                Some(Node::Tree(subtree)) => current = subtree,
                _ => return None,
            }
        }
        match current.get(last) {
            Some(Node::Value(v)) => Some(v),
            _ => None,
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, path: &[String]) -> Result<Option<Value>, Error> {
        Ok(self.lookup(path).cloned())
    }

    fn apply(&mut self, batch: Vec<Mutation>) -> Result<(), Error> {
        for mutation in batch {
            match mutation {
                Mutation::Set(path, value) => self.set(&path, value),
                Mutation::Delete(path) => {
                    self.delete(&path);
                }
            }
        }
        Ok(())
    }

    fn enumerate(&self, prefix: &[String]) -> Vec<Path> {
        let mut results = Vec::new();
        let mut current = &self.root;
        for (i, segment) in prefix.iter().enumerate() {
            match current.get(segment) {
                Some(Node::Tree(subtree)) => current = subtree,
                Some(Node::Value(_)) if i == prefix.len() - 1 => {
                    results.push(prefix.to_vec());
                    return results;
                }
                _ => return results,
            }
        }
        walk(current, prefix.to_vec(), &mut results);
        results
    }

    fn root(&self) -> Result<Hash, Error> {
        Hash::of_value(&self.root)
    }
}

fn insert_at(node: &mut BTreeMap<String, Node>, path: &[String], value: Value) {
    match path {
        [] => {}
        [last] => {
            node.insert(last.clone(), Node::Value(value));
        }
        [head, rest @ ..] => {
            let child = node.entry(head.clone()).or_default();
            // A value in the way is replaced by a subtree.
            if matches!(child, Node::Value(_)) {
                *child = Node::default();
            }
            if let Node::Tree(subtree) = child {
                insert_at(subtree, rest, value);
            }
        }
    }
}

/// Remove a value, pruning subtrees left empty.
fn remove_at(node: &mut BTreeMap<String, Node>, path: &[String]) -> bool {
    match path {
        [] => false,
        [last] => {
            if matches!(node.get(last), Some(Node::Value(_))) {
                node.remove(last);
                true
            } else {
                false
            }
        }
        [head, rest @ ..] => {
            let Some(Node::Tree(subtree)) = node.get_mut(head) else {
                return false;
            };
            let removed = remove_at(subtree, rest);
            let now_empty = subtree.is_empty();
            if removed && now_empty {
                node.remove(head);
            }
            removed
        }
    }
}

fn walk(node: &BTreeMap<String, Node>, current: Path, results: &mut Vec<Path>) {
    for (key, child) in node {
        let mut p = current.clone();
        p.push(key.clone());
        match child {
            Node::Value(_) => results.push(p),
            Node::Tree(subtree) => walk(subtree, p, results),
        }
    }
}
