use crate::errors::AutomataError;
use std::{
  collections::{BTreeSet, HashMap, VecDeque},
  hash::Hash,
  time::{Duration, Instant},
};

/* reached-maps assign ids in insertion order so construction output is
 * stable across runs
 */
pub(crate) fn state_id_of<K: Eq + Hash + Clone>(
  key: K,
  reached: &mut HashMap<K, usize>,
  to_visit: &mut VecDeque<K>,
) -> usize {
  match reached.get(&key) {
    Some(&id) => id,
    None => {
      let id = reached.len();
      reached.insert(key.clone(), id);
      to_visit.push_back(key);
      id
    }
  }
}

/** wall-clock budget for the long-running constructions.
 * checked at coarse safe points: worklist pops, minterms, sat queries.
 */
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
  deadline: Option<Instant>,
}
impl TimeBudget {
  pub fn unlimited() -> Self {
    TimeBudget { deadline: None }
  }

  pub fn from_millis(millis: u64) -> Self {
    TimeBudget {
      deadline: Some(Instant::now() + Duration::from_millis(millis)),
    }
  }

  pub fn check(&self) -> Result<(), AutomataError> {
    match self.deadline {
      Some(deadline) if Instant::now() > deadline => Err(AutomataError::Timeout),
      _ => Ok(()),
    }
  }
}

/** union-find over state ids with, per element, its finality and a witness
 * word leading to it. merging two elements of different finality fails,
 * which is exactly the Hopcroft-Karp counterexample condition.
 */
#[derive(Debug)]
pub struct UnionFindHopKarp<S> {
  parent: HashMap<usize, usize>,
  is_final: HashMap<usize, bool>,
  witness: HashMap<usize, Vec<S>>,
}
impl<S: Clone> UnionFindHopKarp<S> {
  pub fn new() -> Self {
    UnionFindHopKarp {
      parent: HashMap::new(),
      is_final: HashMap::new(),
      witness: HashMap::new(),
    }
  }

  pub fn contains(&self, x: usize) -> bool {
    self.parent.contains_key(&x)
  }

  pub fn add(&mut self, x: usize, is_final: bool, witness: Vec<S>) {
    self.parent.insert(x, x);
    self.is_final.insert(x, is_final);
    self.witness.insert(x, witness);
  }

  fn find(&self, x: usize) -> usize {
    let mut root = x;
    while self.parent[&root] != root {
      root = self.parent[&root];
    }
    root
  }

  pub fn in_same_set(&self, x: usize, y: usize) -> bool {
    self.find(x) == self.find(y)
  }

  /** merge the classes of x and y.
   * returns false when their finality disagrees, in which case the caller
   * reports a counterexample.
   */
  pub fn merge(&mut self, x: usize, y: usize) -> bool {
    if self.is_final[&x] != self.is_final[&y] {
      return false;
    }
    let root_x = self.find(x);
    let root_y = self.find(y);
    if root_x != root_y {
      self.parent.insert(root_y, root_x);
    }
    true
  }

  pub fn witness(&self, x: usize) -> &[S] {
    &self.witness[&x]
  }
}

/** a partition of state ids into disjoint blocks, supporting the splits of
 * the refinement loop. blocks are addressed by index and never deallocated;
 * a split moves states out of an existing block into a fresh one.
 */
#[derive(Debug)]
pub struct BlockPartition {
  blocks: Vec<BTreeSet<usize>>,
  block_of: HashMap<usize, usize>,
}
impl BlockPartition {
  pub fn from_blocks(initial: Vec<BTreeSet<usize>>) -> Self {
    let mut block_of = HashMap::new();
    for (index, block) in initial.iter().enumerate() {
      for &q in block {
        block_of.insert(q, index);
      }
    }
    BlockPartition {
      blocks: initial,
      block_of,
    }
  }

  pub fn block_count(&self) -> usize {
    self.blocks.len()
  }

  pub fn block_of(&self, q: usize) -> usize {
    self.block_of[&q]
  }

  pub fn states(&self, block: usize) -> &BTreeSet<usize> {
    &self.blocks[block]
  }

  pub fn block_size(&self, block: usize) -> usize {
    self.blocks[block].len()
  }

  /** move `part` out of `block` into a fresh block and return its index */
  pub fn split(&mut self, block: usize, part: BTreeSet<usize>) -> usize {
    let fresh = self.blocks.len();
    for &q in &part {
      self.blocks[block].remove(&q);
      self.block_of.insert(q, fresh);
    }
    self.blocks.push(part);
    fresh
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn budget_expires() {
    let budget = TimeBudget::from_millis(0);
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(budget.check(), Err(AutomataError::Timeout));
    assert!(TimeBudget::unlimited().check().is_ok());
  }

  #[test]
  fn union_find_tracks_finality() {
    let mut ds = UnionFindHopKarp::<char>::new();
    ds.add(0, false, vec![]);
    ds.add(1, false, vec!['a']);
    ds.add(2, true, vec!['a', 'b']);

    assert!(ds.merge(0, 1));
    assert!(ds.in_same_set(0, 1));
    assert!(!ds.in_same_set(0, 2));
    assert!(!ds.merge(1, 2));
    assert_eq!(ds.witness(2), &['a', 'b']);
  }

  #[test]
  fn partition_splits() {
    let mut partition = BlockPartition::from_blocks(vec![
      BTreeSet::from([0, 1, 2, 3]),
      BTreeSet::from([4]),
    ]);
    assert_eq!(partition.block_of(2), 0);

    let fresh = partition.split(0, BTreeSet::from([1, 3]));
    assert_eq!(partition.block_of(1), fresh);
    assert_eq!(partition.block_of(0), 0);
    assert_eq!(partition.states(0), &BTreeSet::from([0, 2]));
    assert_eq!(partition.block_count(), 3);
  }
}
