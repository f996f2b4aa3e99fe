//! Object hierarchy used to attach decals to moving objects.

use glam::Affine3A;

/// Handle of an object in the host's scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Scene queries needed by attached decals.
pub trait HierarchyResolver {
    /// Root object of a replicated object, by its network id.
    fn replicated_object(&self, object: u32) -> Option<NodeId>;

    /// Descendant of `root` at a slash-separated path of child names. The
    /// empty path is `root` itself.
    fn find_path(&self, root: NodeId, path: &str) -> Option<NodeId>;

    /// World transform of `node`.
    fn world_transform(&self, node: NodeId) -> Option<Affine3A>;

    /// Slash-separated path from `root` down to `child`, or `None` if
    /// `child` is not below `root`.
    fn path_from(&self, child: NodeId, root: NodeId) -> Option<String>;
}

#[derive(Debug, Clone)]
struct SceneNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Affine3A,
}

/// Simple owned scene tree.
#[derive(Debug, Default, Clone)]
pub struct SceneTree {
    nodes: Vec<SceneNode>,
    replicated: std::collections::HashMap<u32, NodeId>,
}

impl SceneTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root object.
    pub fn add_root(&mut self, name: impl Into<String>, local: Affine3A) -> NodeId {
        self.push(name.into(), None, local)
    }

    /// Add a child under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not created by this tree.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>, local: Affine3A) -> NodeId {
        let id = self.push(name.into(), Some(parent), local);
        self.nodes[index(parent)].children.push(id);
        id
    }

    /// Make `node` reachable by its network id.
    pub fn register_replicated(&mut self, object: u32, node: NodeId) {
        self.replicated.insert(object, node);
    }

    /// Move a node relative to its parent.
    pub fn set_local_transform(&mut self, node: NodeId, local: Affine3A) {
        if let Some(node) = self.nodes.get_mut(index(node)) {
            node.local = local;
        }
    }

    fn push(&mut self, name: String, parent: Option<NodeId>, local: Affine3A) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(SceneNode {
            name,
            parent,
            children: Vec::new(),
            local,
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(index(id))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn index(id: NodeId) -> usize {
    id.0 as usize
}

impl HierarchyResolver for SceneTree {
    fn replicated_object(&self, object: u32) -> Option<NodeId> {
        self.replicated.get(&object).copied()
    }

    fn find_path(&self, root: NodeId, path: &str) -> Option<NodeId> {
        self.node(root)?;
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(root, |current, segment| {
                self.node(current)?
                    .children
                    .iter()
                    .copied()
                    .find(|&child| self.node(child).is_some_and(|c| c.name == segment))
            })
    }

    fn world_transform(&self, node: NodeId) -> Option<Affine3A> {
        let mut current = self.node(node)?;
        let mut transform = current.local;
        while let Some(parent) = current.parent {
            current = self.node(parent)?;
            transform = current.local * transform;
        }
        Some(transform)
    }

    fn path_from(&self, child: NodeId, root: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = child;
        while current != root {
            let node = self.node(current)?;
            names.push(node.name.as_str());
            current = node.parent?;
        }
        names.reverse();
        Some(names.join("/"))
    }
}
