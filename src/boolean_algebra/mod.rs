use crate::{errors::AutomataError, util::TimeBudget};
use bit_set::BitSet;
use std::fmt::Debug;

pub mod char_interval;

/** express effective Boolean Algebra A, tuple of (D, Phi, [], top, bot, and, or, not) \
 * D: a set of domain elements
 * Phi: a set of predicates closed under boolean connectives, with a
 *      decidable satisfiability check and witness generation
 * []: denotational function, Phi -> 2^D (implemented as Phi -> D -> bool)
 *
 * the algebra is a handle borrowed by every engine operation; predicates
 * are opaque values never inspected structurally by the engines.
 */
pub trait BoolAlg {
  type Dom: Debug + Clone + PartialEq;
  type Pred: Debug + Clone + PartialEq;

  fn top(&self) -> Self::Pred;
  fn bot(&self) -> Self::Pred;
  fn and(&self, p: &Self::Pred, q: &Self::Pred) -> Self::Pred;
  fn or(&self, p: &Self::Pred, q: &Self::Pred) -> Self::Pred;
  fn not(&self, p: &Self::Pred) -> Self::Pred;

  fn and_all<'a>(&self, preds: impl IntoIterator<Item = &'a Self::Pred>) -> Self::Pred
  where
    Self::Pred: 'a,
  {
    preds
      .into_iter()
      .fold(self.top(), |conj, p| self.and(&conj, p))
  }

  fn or_all<'a>(&self, preds: impl IntoIterator<Item = &'a Self::Pred>) -> Self::Pred
  where
    Self::Pred: 'a,
  {
    preds
      .into_iter()
      .fold(self.bot(), |disj, p| self.or(&disj, p))
  }

  fn satisfiable(&self, p: &Self::Pred) -> bool;

  /** apply argument to p and return whether it is admitted */
  fn denote(&self, p: &Self::Pred, arg: &Self::Dom) -> bool;

  /** some element admitted by p, None when p is unsatisfiable */
  fn witness(&self, p: &Self::Pred) -> Option<Self::Dom>;

  fn equivalent(&self, p: &Self::Pred, q: &Self::Pred) -> bool {
    !self.satisfiable(&self.and(p, &self.not(q))) && !self.satisfiable(&self.and(q, &self.not(p)))
  }

  /** enumerate the minterms of `preds`: a satisfiable partition of top in
   * which every cube either entails or refutes each input predicate. the
   * entailment set indexes into `preds`.
   *
   * the provided refinement splits every cube by each predicate in turn
   * and keeps the satisfiable halves; 2^n cubes in the worst case, hence
   * the budget check per predicate.
   */
  fn minterms(
    &self,
    preds: &[Self::Pred],
    budget: &TimeBudget,
  ) -> Result<Vec<Minterm<Self::Pred>>, AutomataError> {
    let mut cubes = vec![Minterm {
      guard: self.top(),
      entails: BitSet::new(),
    }];
    for (index, pred) in preds.iter().enumerate() {
      budget.check()?;
      let mut refined = Vec::with_capacity(cubes.len() * 2);
      for cube in cubes {
        let with = self.and(&cube.guard, pred);
        if self.satisfiable(&with) {
          let mut entails = cube.entails.clone();
          entails.insert(index);
          refined.push(Minterm {
            guard: with,
            entails,
          });
        }
        let without = self.and(&cube.guard, &self.not(pred));
        if self.satisfiable(&without) {
          refined.push(Minterm {
            guard: without,
            entails: cube.entails,
          });
        }
      }
      cubes = refined;
    }
    Ok(cubes)
  }
}

/** one cube of a minterm enumeration: its guard and the set of input
 * predicates it entails
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Minterm<P> {
  pub guard: P,
  pub entails: BitSet,
}
impl<P> Minterm<P> {
  pub fn entails(&self, index: usize) -> bool {
    self.entails.contains(index)
  }
}

/** a Boolean algebra that can additionally evaluate deferred unary
 * functions over the domain; the transducer engine needs it to resolve
 * function tokens against the current input symbol.
 */
pub trait BoolAlgSubst: BoolAlg {
  type Func: Debug + Clone + PartialEq;

  fn apply(&self, f: &Self::Func, arg: &Self::Dom) -> Self::Dom;
}

#[cfg(test)]
mod tests {
  use super::char_interval::{CharIntervalAlgebra, CharPred};
  use super::*;

  #[test]
  fn minterms_partition_top() {
    let ba = CharIntervalAlgebra;
    let preds = vec![CharPred::range('a', 'm'), CharPred::range('k', 'z')];

    let minterms = ba.minterms(&preds, &TimeBudget::unlimited()).unwrap();
    /* a-j entails only the first, k-m both, n-z only the second */
    assert_eq!(minterms.iter().filter(|m| !m.entails.is_empty()).count(), 3);
    for minterm in &minterms {
      assert!(ba.satisfiable(&minterm.guard));
      for (index, pred) in preds.iter().enumerate() {
        let conj = ba.and(&minterm.guard, pred);
        if minterm.entails(index) {
          assert!(ba.equivalent(&conj, &minterm.guard));
        } else {
          assert!(!ba.satisfiable(&conj));
        }
      }
    }
    for (i, m1) in minterms.iter().enumerate() {
      for m2 in minterms.iter().skip(i + 1) {
        assert!(!ba.satisfiable(&ba.and(&m1.guard, &m2.guard)));
      }
    }
    let all = ba.or_all(minterms.iter().map(|m| &m.guard));
    assert!(ba.equivalent(&all, &ba.top()));
  }

  #[test]
  fn minterms_of_nothing() {
    let ba = CharIntervalAlgebra;
    let minterms = ba.minterms(&[], &TimeBudget::unlimited()).unwrap();
    assert_eq!(minterms.len(), 1);
    assert!(ba.equivalent(&minterms[0].guard, &ba.top()));
  }
}
