use thiserror::Error;

/** every way an engine operation can fail; empty results are values, not errors */
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AutomataError {
  #[error("operation exceeded its timeout budget")]
  Timeout,
  #[error("update has {found} rows but the transducer declares {expected} variables")]
  UpdateArity { expected: usize, found: usize },
  #[error("update references undeclared variable `{0}`")]
  UndeclaredVariable(String),
  #[error("variable `{0}` is declared twice")]
  DuplicateVariable(String),
  #[error("epsilon moves do not form a tree: state {0} is reached along two paths")]
  EpsilonNotATree(usize),
  #[error("two distinct final states ({first} and {second}) are reachable via epsilon moves")]
  EpsilonFinalConflict { first: usize, second: usize },
}
