use bytemuck::{Pod, Zeroable};
use num_traits::FromPrimitive;

use crate::node_allocator::{NodeAllocator, TreeField as Field, SENTINEL};

// The number of registers per tree node (left, right, parent).
const REGISTERS: usize = 3;

/// An unbalanced binary search tree. Nodes live in an index-addressed
/// allocator and carry a parent register for upward traversal, so the worst
/// case shape is a degenerate chain. Equal keys are dropped on insert.
pub struct BinarySearchTree<K: PartialOrd + Copy + Clone + Default + Pod + Zeroable> {
    pub root: u32,
    allocator: NodeAllocator<K, REGISTERS>,
}

impl<K: PartialOrd + Copy + Clone + Default + Pod + Zeroable> Default for BinarySearchTree<K> {
    fn default() -> Self {
        BinarySearchTree {
            root: SENTINEL,
            allocator: NodeAllocator::<K, REGISTERS>::default(),
        }
    }
}

impl<K: PartialOrd + Copy + Clone + Default + Pod + Zeroable> BinarySearchTree<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.allocator.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn get_key(&self, node: u32) -> &K {
        self.allocator.get(node).get_value()
    }

    #[inline(always)]
    pub fn get_left(&self, node: u32) -> u32 {
        self.allocator.get_register(node, Field::Left as u32)
    }

    #[inline(always)]
    pub fn get_right(&self, node: u32) -> u32 {
        self.allocator.get_register(node, Field::Right as u32)
    }

    #[inline(always)]
    pub fn get_parent(&self, node: u32) -> u32 {
        self.allocator.get_register(node, Field::Parent as u32)
    }

    #[inline(always)]
    pub fn is_leaf(&self, node: u32) -> bool {
        self.get_left(node) == SENTINEL && self.get_right(node) == SENTINEL
    }

    #[inline(always)]
    fn connect(&mut self, parent: u32, child: u32, dir: u32) {
        self.allocator
            .connect(parent, child, dir, Field::Parent as u32);
    }

    #[inline(always)]
    fn child_dir(&self, parent: u32, child: u32) -> u32 {
        let left = self.get_left(parent);
        let right = self.get_right(parent);
        if child == left {
            assert!(self.get_parent(child) == parent);
            Field::Left as u32
        } else if child == right {
            assert!(self.get_parent(child) == parent);
            Field::Right as u32
        } else {
            panic!("Nodes are not connected");
        }
    }

    /// Inserts `key` and returns the index of the node holding it. An equal
    /// key is already present: no node is created and the existing index is
    /// returned. The descent is iterative, so a chain-shaped tree cannot
    /// overflow the stack.
    pub fn insert(&mut self, key: K) -> u32 {
        let mut reference_node = self.root;
        if reference_node == SENTINEL {
            let node_index = self.allocator.add_node(key);
            self.root = node_index;
            return node_index;
        }
        loop {
            let ref_key = *self.get_key(reference_node);
            let (target, dir) = if key < ref_key {
                (self.get_left(reference_node), Field::Left as u32)
            } else if key > ref_key {
                (self.get_right(reference_node), Field::Right as u32)
            } else {
                return reference_node;
            };
            if target == SENTINEL {
                let node_index = self.allocator.add_node(key);
                self.connect(reference_node, node_index, dir);
                return node_index;
            }
            reference_node = target;
        }
    }

    /// Returns the index of the node holding `key`, or `None`.
    pub fn search(&self, key: &K) -> Option<u32> {
        let mut reference_node = self.root;
        if reference_node == SENTINEL {
            return None;
        }
        loop {
            let ref_key = self.get_key(reference_node);
            let target = if *key < *ref_key {
                self.get_left(reference_node)
            } else if *key > *ref_key {
                self.get_right(reference_node)
            } else {
                return Some(reference_node);
            };
            if target == SENTINEL {
                return None;
            }
            reference_node = target;
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    pub fn find_min(&self, index: u32) -> u32 {
        let mut node = index;
        while self.get_left(node) != SENTINEL {
            node = self.get_left(node);
        }
        node
    }

    pub fn find_max(&self, index: u32) -> u32 {
        let mut node = index;
        while self.get_right(node) != SENTINEL {
            node = self.get_right(node);
        }
        node
    }

    /// Returns the node holding the smallest key strictly greater than the
    /// key at `index`. A nonempty right subtree yields its leftmost node;
    /// otherwise the walk climbs parent registers until it leaves a left
    /// child. The maximum has no successor.
    pub fn successor(&self, index: u32) -> Option<u32> {
        if index == SENTINEL {
            return None;
        }
        let right = self.get_right(index);
        if right != SENTINEL {
            return Some(self.find_min(right));
        }
        let mut node = index;
        let mut parent = self.get_parent(node);
        while parent != SENTINEL && node == self.get_right(parent) {
            node = parent;
            parent = self.get_parent(node);
        }
        match parent {
            SENTINEL => None,
            _ => Some(parent),
        }
    }

    /// Removes `key` and returns it, or `None` when the key is absent. A node
    /// with two children is replaced by the minimum of its right subtree; no
    /// rebalancing is performed.
    pub fn remove(&mut self, key: &K) -> Option<K> {
        let mut ref_node_index = self.root;
        if ref_node_index == SENTINEL {
            return None;
        }
        loop {
            let ref_key = *self.get_key(ref_node_index);
            let left = self.get_left(ref_node_index);
            let right = self.get_right(ref_node_index);
            let target = if *key < ref_key {
                left
            } else if *key > ref_key {
                right
            } else {
                if left == SENTINEL {
                    self.transplant(ref_node_index, right);
                    self.allocator
                        .clear_register(ref_node_index, Field::Right as u32);
                } else if right == SENTINEL {
                    self.transplant(ref_node_index, left);
                    self.allocator
                        .clear_register(ref_node_index, Field::Left as u32);
                } else {
                    let min_right = self.find_min(right);
                    if min_right != right {
                        let min_right_child = self.get_right(min_right);
                        self.transplant(min_right, min_right_child);
                        self.connect(min_right, right, Field::Right as u32);
                    }
                    self.transplant(ref_node_index, min_right);
                    self.connect(min_right, left, Field::Left as u32);
                    self.allocator
                        .clear_register(ref_node_index, Field::Left as u32);
                    self.allocator
                        .clear_register(ref_node_index, Field::Right as u32);
                }
                self.allocator
                    .clear_register(ref_node_index, Field::Parent as u32);
                assert!(self.is_leaf(ref_node_index));
                self.allocator.remove_node(ref_node_index);
                return Some(ref_key);
            };
            if target == SENTINEL {
                return None;
            }
            ref_node_index = target;
        }
    }

    /// Replaces the subtree rooted at `target` with the one rooted at
    /// `source` in the eyes of `target`'s parent.
    fn transplant(&mut self, target: u32, source: u32) {
        let parent = self.get_parent(target);
        if parent == SENTINEL {
            self.root = source;
            self.allocator
                .set_register(source, SENTINEL, Field::Parent as u32);
            return;
        }
        let dir = self.child_dir(parent, target);
        match FromPrimitive::from_u32(dir) {
            Some(Field::Left) | Some(Field::Right) => self.connect(parent, source, dir),
            _ => panic!("Nodes are not connected"),
        }
    }

    pub fn iter(&self) -> BinarySearchTreeIterator<'_, K> {
        BinarySearchTreeIterator::<K> {
            tree: self,
            stack: vec![],
            node: self.root,
        }
    }
}

impl<'a, K: PartialOrd + Copy + Clone + Default + Pod + Zeroable> IntoIterator
    for &'a BinarySearchTree<K>
{
    type Item = &'a K;
    type IntoIter = BinarySearchTreeIterator<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct BinarySearchTreeIterator<'a, K: PartialOrd + Copy + Clone + Default + Pod + Zeroable> {
    tree: &'a BinarySearchTree<K>,
    stack: Vec<u32>,
    node: u32,
}

impl<'a, K: PartialOrd + Copy + Clone + Default + Pod + Zeroable> Iterator
    for BinarySearchTreeIterator<'a, K>
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() || self.node != SENTINEL {
            if self.node != SENTINEL {
                self.stack.push(self.node);
                self.node = self.tree.get_left(self.node);
            } else {
                self.node = self.stack.pop().unwrap();
                let key = self.tree.get_key(self.node);
                self.node = self.tree.get_right(self.node);
                return Some(key);
            }
        }
        None
    }
}
