use super::{BoolAlg, BoolAlgSubst};

/* successor/predecessor on scalar values, skipping the surrogate gap */
fn next_char(c: char) -> Option<char> {
  let mut u = c as u32 + 1;
  if u == 0xD800 {
    u = 0xE000;
  }
  char::from_u32(u)
}

fn prev_char(c: char) -> Option<char> {
  if c == '\0' {
    return None;
  }
  let mut u = c as u32 - 1;
  if u == 0xDFFF {
    u = 0xD7FF;
  }
  char::from_u32(u)
}

/** a predicate over characters: a canonical list of disjoint inclusive
 * ranges, sorted and with adjacent ranges merged. the canonical form makes
 * structural equality coincide with semantic equivalence.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharPred {
  ranges: Vec<(char, char)>,
}
impl CharPred {
  pub fn empty() -> Self {
    CharPred { ranges: vec![] }
  }

  pub fn full() -> Self {
    CharPred {
      ranges: vec![('\0', char::MAX)],
    }
  }

  pub fn single(c: char) -> Self {
    CharPred {
      ranges: vec![(c, c)],
    }
  }

  /** inclusive range; empty when hi < lo */
  pub fn range(lo: char, hi: char) -> Self {
    if hi < lo {
      CharPred::empty()
    } else {
      CharPred {
        ranges: vec![(lo, hi)],
      }
    }
  }

  pub fn from_ranges(ranges: impl IntoIterator<Item = (char, char)>) -> Self {
    CharPred {
      ranges: normalize(ranges.into_iter().filter(|(lo, hi)| lo <= hi).collect()),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  pub fn contains(&self, c: char) -> bool {
    self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
  }

  pub fn min_element(&self) -> Option<char> {
    self.ranges.first().map(|&(lo, _)| lo)
  }

  pub fn union(&self, other: &Self) -> Self {
    let mut ranges = self.ranges.clone();
    ranges.extend(other.ranges.iter().copied());
    CharPred {
      ranges: normalize(ranges),
    }
  }

  pub fn intersection(&self, other: &Self) -> Self {
    let mut result = vec![];
    let (mut i, mut j) = (0, 0);
    while i < self.ranges.len() && j < other.ranges.len() {
      let (lo1, hi1) = self.ranges[i];
      let (lo2, hi2) = other.ranges[j];
      let lo = lo1.max(lo2);
      let hi = hi1.min(hi2);
      if lo <= hi {
        result.push((lo, hi));
      }
      if hi1 <= hi2 {
        i += 1;
      } else {
        j += 1;
      }
    }
    CharPred { ranges: result }
  }

  pub fn complement(&self) -> Self {
    let mut result = vec![];
    let mut next = Some('\0');
    for &(lo, hi) in &self.ranges {
      if let Some(start) = next {
        if start < lo {
          /* prev_char(lo) exists since start < lo */
          if let Some(end) = prev_char(lo) {
            result.push((start, end));
          }
        }
      }
      next = next_char(hi);
    }
    if let Some(start) = next {
      result.push((start, char::MAX));
    }
    CharPred { ranges: result }
  }
}

/* sort by lower bound, then merge overlapping and adjacent ranges */
fn normalize(mut ranges: Vec<(char, char)>) -> Vec<(char, char)> {
  ranges.sort();
  let mut merged: Vec<(char, char)> = vec![];
  for (lo, hi) in ranges {
    match merged.last_mut() {
      Some((_, last_hi)) if next_char(*last_hi).map_or(true, |succ| succ >= lo) => {
        if hi > *last_hi {
          *last_hi = hi;
        }
      }
      _ => merged.push((lo, hi)),
    }
  }
  merged
}

/** a deferred unary function over characters, evaluated against the input
 * symbol consumed by a transition
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharFunc {
  Identity,
  Constant(char),
  /** shift by a scalar-value delta; arguments the shift would push out of
   * range evaluate to themselves
   */
  Offset(i32),
}

/** the character algebra used throughout the test suite: predicates are
 * interval sets, functions are identity/constant/offset
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharIntervalAlgebra;

impl BoolAlg for CharIntervalAlgebra {
  type Dom = char;
  type Pred = CharPred;

  fn top(&self) -> CharPred {
    CharPred::full()
  }

  fn bot(&self) -> CharPred {
    CharPred::empty()
  }

  fn and(&self, p: &CharPred, q: &CharPred) -> CharPred {
    p.intersection(q)
  }

  fn or(&self, p: &CharPred, q: &CharPred) -> CharPred {
    p.union(q)
  }

  fn not(&self, p: &CharPred) -> CharPred {
    p.complement()
  }

  fn satisfiable(&self, p: &CharPred) -> bool {
    !p.is_empty()
  }

  fn denote(&self, p: &CharPred, arg: &char) -> bool {
    p.contains(*arg)
  }

  fn witness(&self, p: &CharPred) -> Option<char> {
    p.min_element()
  }

  /* canonical form: structural equality is semantic equivalence */
  fn equivalent(&self, p: &CharPred, q: &CharPred) -> bool {
    p == q
  }
}

impl BoolAlgSubst for CharIntervalAlgebra {
  type Func = CharFunc;

  fn apply(&self, f: &CharFunc, arg: &char) -> char {
    match f {
      CharFunc::Identity => *arg,
      CharFunc::Constant(c) => *c,
      CharFunc::Offset(delta) => {
        let shifted = *arg as i64 + i64::from(*delta);
        u32::try_from(shifted)
          .ok()
          .and_then(char::from_u32)
          .unwrap_or(*arg)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn range() {
    let a_to_d = CharPred::range('a', 'd');
    assert!(a_to_d.contains('a'));
    assert!(a_to_d.contains('d'));
    assert!(!a_to_d.contains('e'));

    let err = CharPred::range('k', 'f');
    assert!(err.is_empty());

    let eq = CharPred::range('f', 'f');
    assert_eq!(eq, CharPred::single('f'));
  }

  #[test]
  fn union_merges_adjacent() {
    let left = CharPred::range('a', 'f');
    let right = CharPred::range('g', 'k');
    assert_eq!(left.union(&right), CharPred::range('a', 'k'));

    let gapped = CharPred::range('a', 'c').union(&CharPred::range('x', 'z'));
    assert!(gapped.contains('b'));
    assert!(!gapped.contains('m'));
    assert!(gapped.contains('y'));
  }

  #[test]
  fn intersection() {
    let ba = CharIntervalAlgebra;
    let left = CharPred::range('a', 'm');
    let right = CharPred::range('k', 'z');
    assert_eq!(ba.and(&left, &right), CharPred::range('k', 'm'));

    let disjoint = ba.and(&CharPred::range('a', 'c'), &CharPred::range('x', 'z'));
    assert!(!ba.satisfiable(&disjoint));
  }

  #[test]
  fn complement_round_trips() {
    let ba = CharIntervalAlgebra;
    let pred = CharPred::range('a', 'c').union(&CharPred::single('x'));
    let complement = ba.not(&pred);
    assert!(!complement.contains('b'));
    assert!(!complement.contains('x'));
    assert!(complement.contains('d'));
    assert_eq!(ba.not(&complement), pred);

    assert_eq!(ba.not(&ba.top()), ba.bot());
    assert_eq!(ba.not(&ba.bot()), ba.top());
  }

  #[test]
  fn witness_is_admitted() {
    let ba = CharIntervalAlgebra;
    let pred = CharPred::range('q', 't');
    let w = ba.witness(&pred).unwrap();
    assert!(ba.denote(&pred, &w));
    assert_eq!(ba.witness(&ba.bot()), None);
  }

  #[test]
  fn funcs_evaluate() {
    let ba = CharIntervalAlgebra;
    assert_eq!(ba.apply(&CharFunc::Identity, &'q'), 'q');
    assert_eq!(ba.apply(&CharFunc::Constant('!'), &'q'), '!');
    assert_eq!(ba.apply(&CharFunc::Offset(1), &'a'), 'b');
    assert_eq!(ba.apply(&CharFunc::Offset(-32), &'a'), 'A');
  }
}
