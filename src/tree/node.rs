//! Rose tree node
//!
//! A value plus an ordered list of child nodes.

/// A single node of a rose tree.
///
/// Nodes are treated as immutable once built: `insert_left` and
/// `insert_right` consume the node and hand back the extended one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node<T> {
    value: T,
    children: Vec<Node<T>>,
}

impl<T> Node<T> {
    /// Create a childless node
    pub fn new(value: T) -> Self {
        Self {
            value,
            children: Vec::new(),
        }
    }

    pub fn with_children(value: T, children: Vec<Node<T>>) -> Self {
        Self { value, children }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn children(&self) -> &[Node<T>] {
        &self.children
    }

    /// Append a child in place and return it
    pub(crate) fn push_child(&mut self, node: Node<T>) -> &mut Node<T> {
        self.children.push(node);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Prepend a child
    pub fn insert_left(mut self, node: Node<T>) -> Self {
        self.children.insert(0, node);
        self
    }

    /// Append a child
    pub fn insert_right(mut self, node: Node<T>) -> Self {
        self.children.push(node);
        self
    }

    /// Every root-to-leaf path, left to right.
    ///
    /// Each path includes both this node and the leaf. The iterator is lazy;
    /// call `paths()` again (or clone the iterator) to restart.
    pub fn paths(&self) -> Paths<'_, T> {
        Paths {
            stack: vec![(self, 0)],
            path: Vec::new(),
        }
    }

    /// Leaves in left-to-right order
    pub fn leaves(&self) -> impl Iterator<Item = &Node<T>> + '_ {
        self.paths().filter_map(|path| path.last().copied())
    }

    /// Total number of nodes in this subtree
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }
}

/// Depth-first iterator over root-to-leaf paths. See [`Node::paths`].
pub struct Paths<'a, T> {
    stack: Vec<(&'a Node<T>, usize)>,
    path: Vec<&'a Node<T>>,
}

impl<T> Clone for Paths<'_, T> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            path: self.path.clone(),
        }
    }
}

impl<'a, T> Iterator for Paths<'a, T> {
    type Item = Vec<&'a Node<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, depth)) = self.stack.pop() {
            self.path.truncate(depth);
            self.path.push(node);

            if node.is_leaf() {
                return Some(self.path.clone());
            }

            // Reversed so the leftmost child is visited first
            self.stack
                .extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(path: &[&Node<&'static str>]) -> Vec<&'static str> {
        path.iter().map(|node| *node.value()).collect()
    }

    fn sample() -> Node<&'static str> {
        Node::new("Foo")
            .insert_right(Node::new("bar"))
            .insert_right(
                Node::new("Baz")
                    .insert_right(Node::new("qux"))
                    .insert_right(Node::new("quux")),
            )
    }

    #[test]
    fn test_insert_left_and_right() {
        let node = Node::new(2).insert_right(Node::new(3)).insert_left(Node::new(1));
        let children: Vec<_> = node.children().iter().map(|c| *c.value()).collect();
        assert_eq!(children, vec![1, 3]);
        assert_eq!(*node.value(), 2);
    }

    #[test]
    fn test_paths_end_at_leaves() {
        let tree = sample();
        let paths: Vec<_> = tree.paths().map(|p| values(&p)).collect();
        assert_eq!(
            paths,
            vec![
                vec!["Foo", "bar"],
                vec!["Foo", "Baz", "qux"],
                vec!["Foo", "Baz", "quux"],
            ]
        );
        for path in tree.paths() {
            assert!(path.last().unwrap().is_leaf());
        }
    }

    #[test]
    fn test_paths_are_restartable() {
        let tree = sample();
        let mut first = tree.paths();
        first.next();
        let resumed = first.clone().count();
        assert_eq!(resumed, 2);
        assert_eq!(tree.paths().count(), 3);
    }

    #[test]
    fn test_single_node_is_its_own_path() {
        let tree = Node::new("alone");
        let paths: Vec<_> = tree.paths().map(|p| values(&p)).collect();
        assert_eq!(paths, vec![vec!["alone"]]);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(sample(), sample());
        let other = sample().insert_left(Node::new("extra"));
        assert_ne!(sample(), other);
    }

    #[test]
    fn test_leaves_and_size() {
        let tree = sample();
        let leaves: Vec<_> = tree.leaves().map(|n| *n.value()).collect();
        assert_eq!(leaves, vec!["bar", "qux", "quux"]);
        assert_eq!(tree.size(), 5);
    }
}
