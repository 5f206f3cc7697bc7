pub mod symbolic_automata;

/** state identifier, unique within one automaton; constructions renumber
 * freely
 */
pub type StateId = usize;

/** a transition of a symbolic finite automaton */
#[derive(Debug, Clone, PartialEq)]
pub enum SfaMove<P> {
  Input {
    from: StateId,
    to: StateId,
    guard: P,
  },
  Epsilon {
    from: StateId,
    to: StateId,
  },
}
impl<P> SfaMove<P> {
  pub fn input(from: StateId, to: StateId, guard: P) -> Self {
    SfaMove::Input { from, to, guard }
  }

  pub fn epsilon(from: StateId, to: StateId) -> Self {
    SfaMove::Epsilon { from, to }
  }

  pub fn from(&self) -> StateId {
    match self {
      SfaMove::Input { from, .. } | SfaMove::Epsilon { from, .. } => *from,
    }
  }

  pub fn to(&self) -> StateId {
    match self {
      SfaMove::Input { to, .. } | SfaMove::Epsilon { to, .. } => *to,
    }
  }

  pub fn is_epsilon(&self) -> bool {
    matches!(self, SfaMove::Epsilon { .. })
  }
}

/** stored form of a guarded move, kept in the per-state multimaps */
#[derive(Debug, Clone, PartialEq)]
pub struct InputMove<P> {
  pub from: StateId,
  pub to: StateId,
  pub guard: P,
}

/** stored form of an epsilon move */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpsilonMove {
  pub from: StateId,
  pub to: StateId,
}
