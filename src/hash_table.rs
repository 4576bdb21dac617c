use crate::error::{Result, TansuError};
use crate::node_allocator::{NodeAllocator, NodeField as Field, SENTINEL};
use bytemuck::{Pod, Zeroable};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::{hash::Hash, ops::Index};

/// Number of buckets in a freshly created table.
pub const INITIAL_NUM_BUCKETS: usize = 16;
/// Load factor above which an insert doubles the bucket array.
pub const MAX_LOAD_FACTOR: f64 = 0.75;

#[repr(C)]
#[derive(Default, Copy, Clone)]
pub struct HashNode<
    K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
> {
    pub key: K,
    pub value: V,
}

unsafe impl<
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Zeroable for HashNode<K, V>
{
}
unsafe impl<
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Pod for HashNode<K, V>
{
}

impl<
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > HashNode<K, V>
{
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// A chaining hash table. Buckets hold the head index of a singly-linked
/// chain of nodes in the allocator; `SENTINEL` marks an empty bucket. An
/// insert that pushes the load factor over [`MAX_LOAD_FACTOR`] doubles the
/// bucket array and re-inserts every chain.
///
/// `set` appends to the end of the chain without searching for an existing
/// equal key, so repeated sets of one key accumulate entries and `get`
/// returns the earliest-inserted one.
pub struct HashTable<
    K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
> {
    buckets: Vec<u32>,
    load: u64,
    allocator: NodeAllocator<HashNode<K, V>, 1>,
}

impl<
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Default for HashTable<K, V>
{
    fn default() -> Self {
        HashTable {
            buckets: vec![SENTINEL; INITIAL_NUM_BUCKETS],
            load: 0,
            allocator: NodeAllocator::<HashNode<K, V>, 1>::default(),
        }
    }
}

impl<
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > HashTable<K, V>
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored (key, value) pairs, duplicates included.
    pub fn len(&self) -> usize {
        self.load as usize
    }

    pub fn is_empty(&self) -> bool {
        self.load == 0
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.load as f64 / self.buckets.len() as f64
    }

    fn bucket_index(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as usize % self.buckets.len()
    }

    #[inline(always)]
    pub fn get_next(&self, index: u32) -> u32 {
        self.allocator.get_register(index, Field::Next as u32)
    }

    #[inline(always)]
    pub fn get_node(&self, index: u32) -> &HashNode<K, V> {
        self.allocator.get(index).get_value()
    }

    /// Returns the value stored under `key`. With duplicate entries the
    /// first match in chain order wins.
    pub fn get(&self, key: &K) -> Result<&V> {
        let mut curr_node = self.buckets[self.bucket_index(key)];
        while curr_node != SENTINEL {
            let node = self.get_node(curr_node);
            if node.key == *key {
                return Ok(&node.value);
            }
            curr_node = self.get_next(curr_node);
        }
        Err(TansuError::KeyNotFound)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_ok()
    }

    /// Stores `value` under `key`. The key type's default value is the
    /// designated empty key and is rejected.
    pub fn set(&mut self, key: K, value: V) -> Result<()> {
        if key == K::default() {
            return Err(TansuError::InvalidKey);
        }
        self.insert(key, value);
        Ok(())
    }

    fn insert(&mut self, key: K, value: V) {
        let bucket_index = self.bucket_index(&key);
        let node_index = self.allocator.add_node(HashNode::new(key, value));
        let head = self.buckets[bucket_index];
        if head == SENTINEL {
            self.buckets[bucket_index] = node_index;
        } else {
            let mut tail = head;
            while self.get_next(tail) != SENTINEL {
                tail = self.get_next(tail);
            }
            self.allocator
                .set_register(tail, node_index, Field::Next as u32);
        }
        self.load += 1;
        if self.load_factor() > MAX_LOAD_FACTOR {
            self.rehash();
        }
    }

    /// Removes the first chain entry matching `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        let bucket_index = self.bucket_index(key);
        let mut prev = SENTINEL;
        let mut curr_node = self.buckets[bucket_index];
        while curr_node != SENTINEL {
            let node = self.get_node(curr_node);
            if node.key == *key {
                let value = node.value;
                let next = self.get_next(curr_node);
                if prev == SENTINEL {
                    self.buckets[bucket_index] = next;
                } else {
                    self.allocator.set_register(prev, next, Field::Next as u32);
                }
                self.allocator.clear_register(curr_node, Field::Next as u32);
                self.allocator.remove_node(curr_node);
                self.load -= 1;
                return Ok(value);
            }
            prev = curr_node;
            curr_node = self.get_next(curr_node);
        }
        Err(TansuError::KeyNotFound)
    }

    /// Doubles the bucket array and re-inserts every (key, value) pair in
    /// old-chain order, so duplicate entries survive a rehash in order. Only
    /// an insert ever gets here; the table never shrinks.
    fn rehash(&mut self) {
        let num_buckets = self.buckets.len() * 2;
        let old_buckets = std::mem::replace(&mut self.buckets, vec![SENTINEL; num_buckets]);
        let old_allocator = std::mem::take(&mut self.allocator);
        self.load = 0;
        for head in old_buckets {
            let mut cursor = head;
            while cursor != SENTINEL {
                let node = old_allocator.get(cursor).get_value();
                self.insert(node.key, node.value);
                cursor = old_allocator.get_register(cursor, Field::Next as u32);
            }
        }
    }

    pub fn iter(&self) -> HashTableIterator<'_, K, V> {
        HashTableIterator::<K, V> {
            ht: self,
            bucket: 0,
            node: self.buckets[0],
        }
    }
}

impl<
        'a,
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > IntoIterator for &'a HashTable<K, V>
{
    type Item = (&'a K, &'a V);
    type IntoIter = HashTableIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct HashTableIterator<
    'a,
    K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
    V: Default + Copy + Clone + Pod + Zeroable,
> {
    ht: &'a HashTable<K, V>,
    bucket: usize,
    node: u32,
}

impl<
        'a,
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Iterator for HashTableIterator<'a, K, V>
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.bucket < self.ht.buckets.len() {
            while self.node == SENTINEL {
                self.bucket += 1;
                if self.bucket == self.ht.buckets.len() {
                    return None;
                }
                self.node = self.ht.buckets[self.bucket];
            }
            let node = self.ht.get_node(self.node);
            self.node = self.ht.get_next(self.node);
            Some((&node.key, &node.value))
        } else {
            None
        }
    }
}

impl<
        K: Hash + PartialEq + Copy + Clone + Default + Pod + Zeroable,
        V: Default + Copy + Clone + Pod + Zeroable,
    > Index<&K> for HashTable<K, V>
{
    type Output = V;

    fn index(&self, index: &K) -> &Self::Output {
        self.get(index).unwrap()
    }
}

#[cfg(test)]
mod hash_table_test {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut ht = HashTable::<u64, u64>::new();
        ht.set(7, 700).unwrap();
        ht.set(8, 800).unwrap();
        assert_eq!(ht.get(&7), Ok(&700));
        assert_eq!(ht.get(&8), Ok(&800));
        assert_eq!(ht.get(&9), Err(TansuError::KeyNotFound));
        assert_eq!(ht.remove(&7), Ok(700));
        assert_eq!(ht.get(&7), Err(TansuError::KeyNotFound));
        assert_eq!(ht.remove(&7), Err(TansuError::KeyNotFound));
        assert_eq!(ht.len(), 1);
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut ht = HashTable::<u64, u64>::new();
        assert_eq!(ht.set(0, 1), Err(TansuError::InvalidKey));
        assert!(ht.is_empty());
    }

    #[test]
    fn test_duplicate_set_first_match_wins() {
        let mut ht = HashTable::<u64, u64>::new();
        ht.set(5, 1).unwrap();
        ht.set(5, 2).unwrap();
        ht.set(5, 3).unwrap();
        // Entries accumulate; lookups keep returning the earliest one.
        assert_eq!(ht.len(), 3);
        assert_eq!(ht.get(&5), Ok(&1));
        // Removal unlinks the first entry and exposes the second.
        assert_eq!(ht.remove(&5), Ok(1));
        assert_eq!(ht.get(&5), Ok(&2));
    }

    #[test]
    fn test_load_factor_doubling() {
        let mut ht = HashTable::<u64, u64>::new();
        assert_eq!(ht.num_buckets(), INITIAL_NUM_BUCKETS);
        // 12 / 16 = 0.75 does not trigger a rehash; the 13th insert does.
        for k in 1..=12u64 {
            ht.set(k, k).unwrap();
            assert_eq!(ht.num_buckets(), INITIAL_NUM_BUCKETS);
            assert!(ht.load_factor() <= MAX_LOAD_FACTOR);
        }
        ht.set(13, 13).unwrap();
        assert_eq!(ht.num_buckets(), INITIAL_NUM_BUCKETS * 2);
        for k in 1..=13u64 {
            assert_eq!(ht.get(&k), Ok(&k));
        }
    }

    #[test]
    fn test_rehash_preserves_duplicates() {
        let mut ht = HashTable::<u64, u64>::new();
        ht.set(3, 30).unwrap();
        ht.set(3, 31).unwrap();
        for k in 100..111u64 {
            ht.set(k, k).unwrap();
        }
        assert_eq!(ht.num_buckets(), INITIAL_NUM_BUCKETS * 2);
        assert_eq!(ht.len(), 13);
        assert_eq!(ht.get(&3), Ok(&30));
        assert_eq!(ht.remove(&3), Ok(30));
        assert_eq!(ht.get(&3), Ok(&31));
    }
}
