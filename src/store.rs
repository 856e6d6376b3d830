use anyhow::Result;
use std::io::Read;

/// Owned upload body, read once by the store while the request is sent.
pub type Content = Box<dyn Read + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    File,
}

/// A file or folder in the remote store. Identity is name + parent, not path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: NodeKind,
}

/// Filter for `RemoteStore::list_nodes`. Values are plain data; each store is
/// responsible for encoding them safely into its own query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    pub name: String,
    pub parent_id: Option<String>,
    pub kind: Option<NodeKind>,
}

impl NodeQuery {
    pub fn folder(name: &str, parent_id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            kind: Some(NodeKind::Folder),
        }
    }

    pub fn file(name: &str, parent_id: &str) -> Self {
        Self {
            name: name.to_string(),
            parent_id: Some(parent_id.to_string()),
            kind: Some(NodeKind::File),
        }
    }

    pub fn matches(&self, node: &RemoteNode) -> bool {
        node.name == self.name
            && (self.parent_id.is_none() || node.parent_id == self.parent_id)
            && self.kind.is_none_or(|k| k == node.kind)
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait RemoteStore {
    fn name(&self) -> &'static str;

    fn list_nodes(&self, query: &NodeQuery) -> Result<Vec<RemoteNode>>;
    fn create_folder<'a>(&self, name: &str, parent_id: Option<&'a str>) -> Result<RemoteNode>;
    /// `size` is the byte length `content` will yield.
    fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        content: Content,
        size: u64,
    ) -> Result<RemoteNode>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_nodes(&self, query: &NodeQuery) -> Result<Vec<RemoteNode>> {
        (**self).list_nodes(query)
    }

    fn create_folder<'a>(&self, name: &str, parent_id: Option<&'a str>) -> Result<RemoteNode> {
        (**self).create_folder(name, parent_id)
    }

    fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        content: Content,
        size: u64,
    ) -> Result<RemoteNode> {
        (**self).create_file(name, parent_id, content, size)
    }
}

/// In-memory store used by the engine and CLI tests.
#[cfg(test)]
pub mod fake {
    use super::*;
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    pub struct FakeStore {
        nodes: RefCell<Vec<RemoteNode>>,
        contents: RefCell<Vec<(String, Vec<u8>)>>,
        next_id: Cell<u64>,
        fail_create_file: RefCell<Vec<String>>,
        fail_create_folder: RefCell<Vec<String>>,
        pub list_calls: Cell<usize>,
    }

    impl FakeStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_file(&self, name: &str) {
            self.fail_create_file.borrow_mut().push(name.to_string());
        }

        pub fn fail_folder(&self, name: &str) {
            self.fail_create_folder.borrow_mut().push(name.to_string());
        }

        /// Inserts a node directly, bypassing failure injection.
        pub fn seed(&self, name: &str, parent_id: Option<&str>, kind: NodeKind) -> RemoteNode {
            let node = RemoteNode {
                id: self.alloc_id(),
                name: name.to_string(),
                parent_id: parent_id.map(str::to_string),
                kind,
            };
            self.nodes.borrow_mut().push(node.clone());
            node
        }

        pub fn nodes(&self) -> Vec<RemoteNode> {
            self.nodes.borrow().clone()
        }

        pub fn named(&self, name: &str) -> Vec<RemoteNode> {
            self.nodes
                .borrow()
                .iter()
                .filter(|n| n.name == name)
                .cloned()
                .collect()
        }

        pub fn content_of(&self, id: &str) -> Option<Vec<u8>> {
            self.contents
                .borrow()
                .iter()
                .find(|(i, _)| i == id)
                .map(|(_, c)| c.clone())
        }

        fn alloc_id(&self) -> String {
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            format!("node-{id}")
        }
    }

    impl RemoteStore for FakeStore {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn list_nodes(&self, query: &NodeQuery) -> Result<Vec<RemoteNode>> {
            self.list_calls.set(self.list_calls.get() + 1);
            Ok(self
                .nodes
                .borrow()
                .iter()
                .filter(|n| query.matches(n))
                .cloned()
                .collect())
        }

        fn create_folder<'a>(
            &self,
            name: &str,
            parent_id: Option<&'a str>,
        ) -> Result<RemoteNode> {
            if self.fail_create_folder.borrow().iter().any(|n| n == name) {
                return Err(anyhow!("create folder failed (500): injected"));
            }
            Ok(self.seed(name, parent_id, NodeKind::Folder))
        }

        fn create_file(
            &self,
            name: &str,
            parent_id: &str,
            mut content: Content,
            _size: u64,
        ) -> Result<RemoteNode> {
            if self.fail_create_file.borrow().iter().any(|n| n == name) {
                return Err(anyhow!("create file failed (500): injected"));
            }
            let mut bytes = Vec::new();
            content.read_to_end(&mut bytes)?;
            let node = self.seed(name, Some(parent_id), NodeKind::File);
            self.contents.borrow_mut().push((node.id.clone(), bytes));
            Ok(node)
        }
    }
}
