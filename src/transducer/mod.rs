pub mod sst;
pub mod term;

use crate::regular::StateId;
use term::{FunctionalVariableUpdate, SimpleVariableUpdate};

/** a transition of a symbolic streaming string transducer over predicates
 * P, alphabet symbols S and deferred functions F. input moves carry a
 * functional register update (may read the consumed symbol); epsilon moves
 * carry a simple one.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum SstMove<P, S, F> {
  Input {
    from: StateId,
    to: StateId,
    guard: P,
    update: FunctionalVariableUpdate<S, F>,
  },
  Epsilon {
    from: StateId,
    to: StateId,
    update: SimpleVariableUpdate<S>,
  },
}
impl<P, S, F> SstMove<P, S, F> {
  pub fn input(
    from: StateId,
    to: StateId,
    guard: P,
    update: FunctionalVariableUpdate<S, F>,
  ) -> Self {
    SstMove::Input {
      from,
      to,
      guard,
      update,
    }
  }

  pub fn epsilon(from: StateId, to: StateId, update: SimpleVariableUpdate<S>) -> Self {
    SstMove::Epsilon { from, to, update }
  }

  pub fn from(&self) -> StateId {
    match self {
      SstMove::Input { from, .. } | SstMove::Epsilon { from, .. } => *from,
    }
  }

  pub fn to(&self) -> StateId {
    match self {
      SstMove::Input { to, .. } | SstMove::Epsilon { to, .. } => *to,
    }
  }

  pub fn is_epsilon(&self) -> bool {
    matches!(self, SstMove::Epsilon { .. })
  }
}

/** stored form of a guarded transducer move */
#[derive(Debug, Clone, PartialEq)]
pub struct SstInputMove<P, S, F> {
  pub from: StateId,
  pub to: StateId,
  pub guard: P,
  pub update: FunctionalVariableUpdate<S, F>,
}

/** stored form of an epsilon transducer move */
#[derive(Debug, Clone, PartialEq)]
pub struct SstEpsilonMove<S> {
  pub from: StateId,
  pub to: StateId,
  pub update: SimpleVariableUpdate<S>,
}
