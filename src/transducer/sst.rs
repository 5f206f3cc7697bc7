use super::term::{
  ConstantToken, FunctionalVariableUpdate, SimpleVariableUpdate, Token, VariableAssignment,
};
use super::{SstEpsilonMove, SstInputMove, SstMove};
use crate::{
  boolean_algebra::{BoolAlg, BoolAlgSubst},
  errors::AutomataError,
  regular::{symbolic_automata::Sfa, SfaMove, StateId},
  util::state_id_of,
};
use itertools::Itertools;
use std::{
  collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
  fmt::Debug,
};
use tracing::trace;

type Dom<A> = <A as BoolAlg>::Dom;
type Pred<A> = <A as BoolAlg>::Pred;
type Func<A> = <A as BoolAlgSubst>::Func;
type SimpleUpdate<A> = SimpleVariableUpdate<Dom<A>>;
type FunctionalUpdate<A> = FunctionalVariableUpdate<Dom<A>, Func<A>>;
type InputMoveOf<A> = SstInputMove<Pred<A>, Dom<A>, Func<A>>;
type EpsilonMoveOf<A> = SstEpsilonMove<Dom<A>>;
type MoveOf<A> = SstMove<Pred<A>, Dom<A>, Func<A>>;

/* fresh register names x{start}.. for the given variables, in declared
 * order, plus the rename map onto them
 */
fn fresh_names(variables: &[String], start: usize) -> (Vec<String>, HashMap<String, String>) {
  let names: Vec<String> = (start..start + variables.len())
    .map(|i| format!("x{i}"))
    .collect();
  let rename = variables
    .iter()
    .cloned()
    .zip(names.iter().cloned())
    .collect();
  (names, rename)
}

/* depth-first pairing of one input move per component; collects the guard
 * conjunction, the folded update, and the target tuple of every combined
 * move whose guard stays satisfiable
 */
#[allow(clippy::too_many_arguments)]
fn accumulate_moves<A: BoolAlgSubst>(
  tuple: &[StateId],
  components: &[Sst<A>],
  renames: &[HashMap<String, String>],
  index: usize,
  ba: &A,
  guard: A::Pred,
  update: FunctionalUpdate<A>,
  target: Vec<StateId>,
  out: &mut Vec<(A::Pred, FunctionalUpdate<A>, Vec<StateId>)>,
) {
  if !ba.satisfiable(&guard) {
    return;
  }
  if index == tuple.len() {
    out.push((guard, update, target));
    return;
  }
  for m in components[index].input_moves_from(tuple[index]) {
    let guard = ba.and(&guard, &m.guard);
    let update = FunctionalVariableUpdate::add_update(&renames[index], &update, &m.update);
    let mut target = target.clone();
    target.push(m.to);
    accumulate_moves(
      tuple,
      components,
      renames,
      index + 1,
      ba,
      guard,
      update,
      target,
      out,
    );
  }
}

/** symbolic streaming string transducer over the Boolean algebra A.
 *
 * registers are string-valued and updated simultaneously on every move;
 * register 0 is the output register. the output function doubles as the
 * final-state set. immutable after construction.
 */
pub struct Sst<A: BoolAlgSubst> {
  states: BTreeSet<StateId>,
  initial_state: StateId,
  variables: Vec<String>,
  variables_to_indices: HashMap<String, usize>,
  output_function: BTreeMap<StateId, SimpleUpdate<A>>,
  input_from: HashMap<StateId, Vec<InputMoveOf<A>>>,
  input_to: HashMap<StateId, Vec<InputMoveOf<A>>>,
  eps_from: HashMap<StateId, Vec<EpsilonMoveOf<A>>>,
  eps_to: HashMap<StateId, Vec<EpsilonMoveOf<A>>>,
  max_state_id: StateId,
  transition_count: usize,
  is_deterministic: bool,
  is_epsilon_free: bool,
  is_empty: bool,
}

impl<A: BoolAlgSubst> Clone for Sst<A> {
  fn clone(&self) -> Self {
    Sst {
      states: self.states.clone(),
      initial_state: self.initial_state,
      variables: self.variables.clone(),
      variables_to_indices: self.variables_to_indices.clone(),
      output_function: self.output_function.clone(),
      input_from: self.input_from.clone(),
      input_to: self.input_to.clone(),
      eps_from: self.eps_from.clone(),
      eps_to: self.eps_to.clone(),
      max_state_id: self.max_state_id,
      transition_count: self.transition_count,
      is_deterministic: self.is_deterministic,
      is_epsilon_free: self.is_epsilon_free,
      is_empty: self.is_empty,
    }
  }
}

impl<A: BoolAlgSubst> Debug for Sst<A> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Sst")
      .field("states", &self.states)
      .field("initial_state", &self.initial_state)
      .field("variables", &self.variables)
      .field("output_function", &self.output_function)
      .field("input_from", &self.input_from)
      .field("eps_from", &self.eps_from)
      .field("is_epsilon_free", &self.is_epsilon_free)
      .field("is_empty", &self.is_empty)
      .finish()
  }
}

impl<A: BoolAlgSubst> PartialEq for Sst<A> {
  fn eq(&self, other: &Self) -> bool {
    self.states == other.states
      && self.initial_state == other.initial_state
      && self.variables == other.variables
      && self.output_function == other.output_function
      && self.input_from == other.input_from
      && self.eps_from == other.eps_from
  }
}

impl<A: BoolAlgSubst> Sst<A> {
  fn bare(initial_state: StateId, variables: Vec<String>) -> Self {
    let variables_to_indices = variables
      .iter()
      .enumerate()
      .map(|(index, name)| (name.clone(), index))
      .collect();
    Sst {
      states: BTreeSet::from([initial_state]),
      initial_state,
      variables,
      variables_to_indices,
      output_function: BTreeMap::new(),
      input_from: HashMap::new(),
      input_to: HashMap::new(),
      eps_from: HashMap::new(),
      eps_to: HashMap::new(),
      max_state_id: initial_state,
      transition_count: 0,
      is_deterministic: false,
      is_epsilon_free: true,
      is_empty: true,
    }
  }

  /** the canonical empty transducer: defined on no input */
  pub fn empty() -> Self {
    let mut sst = Sst::bare(0, vec![]);
    sst.is_deterministic = true;
    sst
  }

  /** defined only on the empty word, producing `output` */
  pub fn epsilon_sst(output: Vec<ConstantToken<Dom<A>>>, ba: &A) -> Self {
    Sst::from_parts(
      vec![],
      0,
      vec!["x0".to_string()],
      vec![(0, SimpleVariableUpdate::new(vec![output]))],
      ba,
    )
  }

  /** defined on the single-symbol words admitted by `guard`, producing the
   * evaluation of `output` against the consumed symbol
   */
  pub fn base_sst(guard: A::Pred, output: Vec<Token<Dom<A>, Func<A>>>, ba: &A) -> Self {
    Sst::from_parts(
      vec![SstMove::input(
        0,
        1,
        guard,
        FunctionalVariableUpdate::new(vec![output]),
      )],
      0,
      vec!["x0".to_string()],
      vec![(
        1,
        SimpleVariableUpdate::new(vec![vec![ConstantToken::var("x0")]]),
      )],
      ba,
    )
  }

  /** create a transducer from moves, an initial state, a declared register
   * list and an output function. malformed input (duplicate registers,
   * wrong update arity, references to undeclared registers) is rejected.
   * unreachable states are retained; see remove_unreachable_states.
   */
  pub fn new(
    moves: impl IntoIterator<Item = MoveOf<A>>,
    initial_state: StateId,
    variables: Vec<String>,
    output_function: impl IntoIterator<Item = (StateId, SimpleUpdate<A>)>,
    ba: &A,
  ) -> Result<Self, AutomataError> {
    let moves: Vec<MoveOf<A>> = moves.into_iter().collect();
    let outputs: Vec<(StateId, SimpleUpdate<A>)> =
      output_function.into_iter().collect();

    let mut seen = HashSet::new();
    for name in &variables {
      if !seen.insert(name) {
        return Err(AutomataError::DuplicateVariable(name.clone()));
      }
    }

    let arity = variables.len();
    let check_len = |found: usize| {
      if found != arity {
        Err(AutomataError::UpdateArity {
          expected: arity,
          found,
        })
      } else {
        Ok(())
      }
    };
    let check_ref = |name: &String| {
      if seen.contains(name) {
        Ok(())
      } else {
        Err(AutomataError::UndeclaredVariable(name.clone()))
      }
    };

    for m in &moves {
      match m {
        SstMove::Input { update, .. } => {
          check_len(update.len())?;
          update.referenced_vars().try_for_each(check_ref)?;
        }
        SstMove::Epsilon { update, .. } => {
          check_len(update.len())?;
          update.referenced_vars().try_for_each(check_ref)?;
        }
      }
    }
    for (_, update) in &outputs {
      check_len(update.len())?;
      update.referenced_vars().try_for_each(check_ref)?;
    }

    Ok(Sst::from_parts(moves, initial_state, variables, outputs, ba))
  }

  /* trusted constructor used by the closure operations; still filters
   * unsatisfiable guards and self-epsilons and recomputes all flags
   */
  fn from_parts(
    moves: Vec<MoveOf<A>>,
    initial_state: StateId,
    variables: Vec<String>,
    outputs: Vec<(StateId, SimpleUpdate<A>)>,
    ba: &A,
  ) -> Self {
    let mut sst = Sst::bare(initial_state, variables);
    for (state, update) in outputs {
      sst.states.insert(state);
      sst.max_state_id = sst.max_state_id.max(state);
      sst.output_function.insert(state, update);
    }
    for m in moves {
      sst.add_move(m, ba);
    }
    sst.compute_flags(ba);
    sst
  }

  fn add_move(&mut self, m: MoveOf<A>, ba: &A) {
    match m {
      SstMove::Epsilon { from, to, update } => {
        if from == to {
          return;
        }
        self.touch(from, to);
        let m = SstEpsilonMove { from, to, update };
        self.eps_from.entry(from).or_default().push(m.clone());
        self.eps_to.entry(to).or_default().push(m);
        self.transition_count += 1;
      }
      SstMove::Input {
        from,
        to,
        guard,
        update,
      } => {
        if !ba.satisfiable(&guard) {
          return;
        }
        self.touch(from, to);
        let m = SstInputMove {
          from,
          to,
          guard,
          update,
        };
        self.input_from.entry(from).or_default().push(m.clone());
        self.input_to.entry(to).or_default().push(m);
        self.transition_count += 1;
      }
    }
  }

  fn touch(&mut self, from: StateId, to: StateId) {
    self.states.insert(from);
    self.states.insert(to);
    self.max_state_id = self.max_state_id.max(from).max(to);
  }

  fn compute_flags(&mut self, ba: &A) {
    self.is_epsilon_free = self.eps_from.values().all(|moves| moves.is_empty());

    let reachable = self.reachable_from(self.initial_state);
    self.is_empty = !self.output_function.keys().any(|q| reachable.contains(q));

    self.is_deterministic = self.is_epsilon_free
      && self.states.iter().all(|&q| {
        let moves = self.input_moves_from(q);
        moves.iter().enumerate().all(|(i, m1)| {
          moves[i + 1..]
            .iter()
            .all(|m2| !ba.satisfiable(&ba.and(&m1.guard, &m2.guard)))
        })
      });
  }

  // ------------------------------------------------------
  // accessors
  // ------------------------------------------------------

  pub fn states(&self) -> &BTreeSet<StateId> {
    &self.states
  }

  pub fn initial_state(&self) -> StateId {
    self.initial_state
  }

  pub fn variables(&self) -> &[String] {
    &self.variables
  }

  pub fn final_states(&self) -> BTreeSet<StateId> {
    self.output_function.keys().copied().collect()
  }

  pub fn output_function(&self) -> &BTreeMap<StateId, SimpleUpdate<A>> {
    &self.output_function
  }

  pub fn state_count(&self) -> usize {
    self.states.len()
  }

  pub fn transition_count(&self) -> usize {
    self.transition_count
  }

  pub fn max_state_id(&self) -> StateId {
    self.max_state_id
  }

  pub fn is_deterministic(&self) -> bool {
    self.is_deterministic
  }

  pub fn is_epsilon_free(&self) -> bool {
    self.is_epsilon_free
  }

  pub fn is_empty(&self) -> bool {
    self.is_empty
  }

  /** x_i := x_i over the declared registers */
  pub fn identity_var_up(&self) -> SimpleUpdate<A> {
    SimpleVariableUpdate::identity(&self.variables)
  }

  pub fn input_moves_from(&self, q: StateId) -> &[InputMoveOf<A>] {
    self.input_from.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn input_moves_to(&self, q: StateId) -> &[InputMoveOf<A>] {
    self.input_to.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn epsilon_moves_from(&self, q: StateId) -> &[EpsilonMoveOf<A>] {
    self.eps_from.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn epsilon_moves_to(&self, q: StateId) -> &[EpsilonMoveOf<A>] {
    self.eps_to.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn transitions_from(&self, q: StateId) -> Vec<MoveOf<A>> {
    let mut moves: Vec<MoveOf<A>> = self
      .input_moves_from(q)
      .iter()
      .map(|m| SstMove::input(m.from, m.to, m.guard.clone(), m.update.clone()))
      .collect();
    moves.extend(
      self
        .epsilon_moves_from(q)
        .iter()
        .map(|e| SstMove::epsilon(e.from, e.to, e.update.clone())),
    );
    moves
  }

  pub fn transitions_to(&self, q: StateId) -> Vec<MoveOf<A>> {
    let mut moves: Vec<MoveOf<A>> = self
      .input_moves_to(q)
      .iter()
      .map(|m| SstMove::input(m.from, m.to, m.guard.clone(), m.update.clone()))
      .collect();
    moves.extend(
      self
        .epsilon_moves_to(q)
        .iter()
        .map(|e| SstMove::epsilon(e.from, e.to, e.update.clone())),
    );
    moves
  }

  pub fn transitions(&self) -> Vec<MoveOf<A>> {
    self
      .states
      .iter()
      .flat_map(|&q| self.transitions_from(q))
      .collect()
  }

  fn reachable_from(&self, q: StateId) -> HashSet<StateId> {
    let mut reached = HashSet::from([q]);
    let mut to_visit = VecDeque::from([q]);
    while let Some(p) = to_visit.pop_front() {
      for next in self
        .input_moves_from(p)
        .iter()
        .map(|m| m.to)
        .chain(self.epsilon_moves_from(p).iter().map(|e| e.to))
      {
        if reached.insert(next) {
          to_visit.push_back(next);
        }
      }
    }
    reached
  }

  fn reaching_states(&self, targets: &BTreeSet<StateId>) -> HashSet<StateId> {
    let mut reached: HashSet<StateId> = targets.iter().copied().collect();
    let mut to_visit: VecDeque<StateId> = targets.iter().copied().collect();
    while let Some(p) = to_visit.pop_front() {
      for prev in self
        .input_moves_to(p)
        .iter()
        .map(|m| m.from)
        .chain(self.epsilon_moves_to(p).iter().map(|e| e.from))
      {
        if reached.insert(prev) {
          to_visit.push_back(prev);
        }
      }
    }
    reached
  }

  /** drop states that are not both reachable from the initial state and
   * able to reach a final state; ids are kept, matching the automaton-side
   * alive-state filter
   */
  pub fn remove_unreachable_states(&self, ba: &A) -> Self {
    let reachable = self.reachable_from(self.initial_state);
    let reaching = self.reaching_states(&self.final_states());
    let alive: BTreeSet<StateId> = reachable.intersection(&reaching).copied().collect();

    if alive.is_empty() {
      return Sst::empty();
    }

    let moves: Vec<MoveOf<A>> = alive
      .iter()
      .flat_map(|&q| self.transitions_from(q))
      .filter(|m| alive.contains(&m.to()))
      .collect();
    let outputs: Vec<(StateId, SimpleUpdate<A>)> = self
      .output_function
      .iter()
      .filter(|(q, _)| alive.contains(q))
      .map(|(&q, update)| (q, update.clone()))
      .collect();

    Sst::from_parts(moves, self.initial_state, self.variables.clone(), outputs, ba)
  }

  // ------------------------------------------------------
  // epsilon elimination
  // ------------------------------------------------------

  /* the epsilon closure of a state, each member decorated with the simple
   * update composed along the (unique) epsilon path reaching it. a second
   * path to any member violates the tree invariant.
   */
  fn eps_closure(
    &self,
    source: StateId,
  ) -> Result<BTreeMap<StateId, SimpleUpdate<A>>, AutomataError> {
    let mut closure = BTreeMap::from([(source, self.identity_var_up())]);
    let mut to_visit = VecDeque::from([source]);
    while let Some(from) = to_visit.pop_front() {
      let from_update = closure[&from].clone();
      for e in self.epsilon_moves_from(from) {
        if closure.contains_key(&e.to) {
          return Err(AutomataError::EpsilonNotATree(e.to));
        }
        closure.insert(
          e.to,
          from_update.compose_simple(&e.update, &self.variables_to_indices),
        );
        to_visit.push_back(e.to);
      }
    }
    Ok(closure)
  }

  /** subset construction over decorated epsilon closures; each produced
   * input move carries the closure update composed with the original one,
   * and the output function transfers through the closure update of the
   * (necessarily unique) final member
   */
  pub fn remove_epsilon_moves(&self, ba: &A) -> Result<Self, AutomataError> {
    if self.is_epsilon_free {
      return Ok(self.clone());
    }

    let mut moves = vec![];
    let mut outputs = vec![];
    let mut reached = HashMap::new();
    let mut to_visit = VecDeque::new();
    let mut closures: HashMap<StateId, BTreeMap<StateId, SimpleUpdate<A>>> =
      HashMap::new();

    let initial_closure = self.eps_closure(self.initial_state)?;
    let initial_key: BTreeSet<StateId> = initial_closure.keys().copied().collect();
    state_id_of(initial_key, &mut reached, &mut to_visit);
    closures.insert(0, initial_closure);

    while let Some(set) = to_visit.pop_front() {
      let current = reached[&set];
      let closure = closures[&current].clone();

      let mut finals = set.iter().copied().filter(|q| self.output_function.contains_key(q));
      if let Some(first) = finals.next() {
        if let Some(second) = finals.next() {
          return Err(AutomataError::EpsilonFinalConflict { first, second });
        }
        outputs.push((
          current,
          closure[&first].compose_simple(
            &self.output_function[&first],
            &self.variables_to_indices,
          ),
        ));
      }

      for &q in &set {
        for t in self.input_moves_from(q) {
          let target_closure = self.eps_closure(t.to)?;
          let target_key: BTreeSet<StateId> = target_closure.keys().copied().collect();
          let next = state_id_of(target_key, &mut reached, &mut to_visit);
          closures.entry(next).or_insert(target_closure);

          let update =
            closure[&q].compose_functional(&t.update, &self.variables_to_indices);
          moves.push(SstMove::input(current, next, t.guard.clone(), update));
        }
      }
      trace!(subsets = reached.len(), "epsilon elimination frontier");
    }

    Ok(Sst::from_parts(
      moves,
      0,
      self.variables.clone(),
      outputs,
      ba,
    ))
  }

  // ------------------------------------------------------
  // products and iterations
  // ------------------------------------------------------

  /** synchronized product computing f(w) = self(w) followed by other(w).
   * meaningful when both operands are single-valued transducers; the
   * caller is responsible for functionality.
   */
  pub fn combine(&self, other: &Self, ba: &A) -> Result<Self, AutomataError> {
    let sst1 = self.remove_epsilon_moves(ba)?;
    let sst2 = other.remove_epsilon_moves(ba)?;

    let (names1, rename1) = fresh_names(&sst1.variables, 0);
    let (names2, rename2) = fresh_names(&sst2.variables, names1.len());
    let mut variables = names1;
    variables.extend(names2);
    let register_count = variables.len();

    let mut moves = vec![];
    let mut outputs = vec![];
    let mut reached = HashMap::new();
    let mut to_visit = VecDeque::new();

    state_id_of(
      (sst1.initial_state, sst2.initial_state),
      &mut reached,
      &mut to_visit,
    );

    while let Some(pair) = to_visit.pop_front() {
      let current = reached[&pair];

      if let (Some(out1), Some(out2)) = (
        sst1.output_function.get(&pair.0),
        sst2.output_function.get(&pair.1),
      ) {
        outputs.push((
          current,
          SimpleVariableUpdate::combine_output_updates(
            &rename1,
            &rename2,
            out1,
            out2,
            register_count,
          ),
        ));
      }

      for (t1, t2) in sst1
        .input_moves_from(pair.0)
        .iter()
        .cartesian_product(sst2.input_moves_from(pair.1))
      {
        let conj = ba.and(&t1.guard, &t2.guard);
        if ba.satisfiable(&conj) {
          let next = state_id_of((t1.to, t2.to), &mut reached, &mut to_visit);
          let update = FunctionalVariableUpdate::combine_updates(
            &rename1,
            &rename2,
            &t1.update,
            &t2.update,
          );
          moves.push(SstMove::input(current, next, conj, update));
        }
      }
    }

    Ok(Sst::from_parts(moves, 0, variables, outputs, ba))
  }

  /** fresh initial state with all-clearing epsilon moves into the two
   * renumbered operands, whose registers share the names x0..
   */
  pub fn union(&self, other: &Self, ba: &A) -> Self {
    if self.is_empty && other.is_empty {
      return Sst::empty();
    }
    if self.is_empty {
      return other.clone();
    }
    if other.is_empty {
      return self.clone();
    }

    let offset = self.max_state_id + 2;
    let initial_state = other.max_state_id + offset + 1;

    let (names1, rename1) = fresh_names(&self.variables, 0);
    let (names2, rename2) = fresh_names(&other.variables, 0);
    let register_count = names1.len().max(names2.len());
    let variables = if names1.len() >= names2.len() {
      names1
    } else {
      names2
    };

    let mut moves = vec![];
    for &q in &self.states {
      for t in self.input_moves_from(q) {
        moves.push(SstMove::input(
          t.from,
          t.to,
          t.guard.clone(),
          t.update.rename_vars(&rename1).lift_to_n_vars(register_count),
        ));
      }
      for e in self.epsilon_moves_from(q) {
        moves.push(SstMove::epsilon(
          e.from,
          e.to,
          e.update.rename_vars(&rename1).lift_to_n_vars(register_count),
        ));
      }
    }
    for &q in &other.states {
      for t in other.input_moves_from(q) {
        moves.push(SstMove::input(
          t.from + offset,
          t.to + offset,
          t.guard.clone(),
          t.update.rename_vars(&rename2).lift_to_n_vars(register_count),
        ));
      }
      for e in other.epsilon_moves_from(q) {
        moves.push(SstMove::epsilon(
          e.from + offset,
          e.to + offset,
          e.update.rename_vars(&rename2).lift_to_n_vars(register_count),
        ));
      }
    }

    moves.push(SstMove::epsilon(
      initial_state,
      self.initial_state,
      SimpleVariableUpdate::clear(register_count),
    ));
    moves.push(SstMove::epsilon(
      initial_state,
      other.initial_state + offset,
      SimpleVariableUpdate::clear(register_count),
    ));

    let mut outputs = vec![];
    for (&q, update) in &self.output_function {
      outputs.push((
        q,
        update.rename_vars(&rename1).lift_to_n_vars(register_count),
      ));
    }
    for (&q, update) in &other.output_function {
      outputs.push((
        q + offset,
        update.rename_vars(&rename2).lift_to_n_vars(register_count),
      ));
    }

    Sst::from_parts(moves, initial_state, variables, outputs, ba)
  }

  /** sequential composition of domains: run self, bank its output in an
   * accumulator register on the bridge epsilon, then run other and emit
   * accumulator followed by other's output
   */
  pub fn concatenate(&self, other: &Self, ba: &A) -> Self {
    if self.is_empty || other.is_empty {
      return Sst::empty();
    }

    let offset = self.max_state_id + 1;

    let (names1, rename1) = fresh_names(&self.variables, 0);
    let (names2, rename2) = fresh_names(&other.variables, 0);
    let shared = names1.len().max(names2.len());
    let acc = format!("x{shared}");
    let mut variables: Vec<String> = (0..shared).map(|i| format!("x{i}")).collect();
    variables.push(acc.clone());
    let register_count = shared + 1;

    let mut moves = vec![];
    for &q in &self.states {
      for t in self.input_moves_from(q) {
        moves.push(SstMove::input(
          t.from,
          t.to,
          t.guard.clone(),
          t.update.rename_vars(&rename1).lift_to_n_vars(register_count),
        ));
      }
      for e in self.epsilon_moves_from(q) {
        moves.push(SstMove::epsilon(
          e.from,
          e.to,
          e.update.rename_vars(&rename1).lift_to_n_vars(register_count),
        ));
      }
    }
    /* other's moves must additionally preserve the accumulator */
    for &q in &other.states {
      for t in other.input_moves_from(q) {
        let mut update = t.update.rename_vars(&rename2).lift_to_n_vars(register_count);
        update.append_to_row(shared, Token::var(acc.clone()));
        moves.push(SstMove::input(
          t.from + offset,
          t.to + offset,
          t.guard.clone(),
          update,
        ));
      }
      for e in other.epsilon_moves_from(q) {
        let mut update = e.update.rename_vars(&rename2).lift_to_n_vars(register_count);
        update.append_to_row(shared, ConstantToken::var(acc.clone()));
        moves.push(SstMove::epsilon(e.from + offset, e.to + offset, update));
      }
    }

    /* bridge: bank self's output in the accumulator, clear the rest */
    for (&q, out) in &self.output_function {
      let mut update = SimpleVariableUpdate::clear(register_count);
      update.set_row(shared, out.rename_vars(&rename1).output_row().to_vec());
      moves.push(SstMove::epsilon(q, other.initial_state + offset, update));
    }

    let mut outputs = vec![];
    for (&q, out) in &other.output_function {
      let mut output = SimpleVariableUpdate::clear(register_count);
      let mut row = vec![ConstantToken::var(acc.clone())];
      row.extend(out.rename_vars(&rename2).output_row().iter().cloned());
      output.set_row(0, row);
      outputs.push((q + offset, output));
    }

    Sst::from_parts(moves, self.initial_state, variables, outputs, ba)
  }

  fn compute_star(&self, ba: &A, is_left_iteration: bool) -> Self {
    if self.is_empty {
      return Sst::empty();
    }

    let initial_state = self.max_state_id + 1;

    let (names, rename) = fresh_names(&self.variables, 0);
    let acc_index = names.len();
    let acc = format!("x{acc_index}");
    let mut variables = names;
    variables.push(acc.clone());
    let register_count = acc_index + 1;

    let mut moves = vec![];
    for &q in &self.states {
      for t in self.input_moves_from(q) {
        let mut update = t.update.rename_vars(&rename).lift_to_n_vars(register_count);
        update.append_to_row(acc_index, Token::var(acc.clone()));
        moves.push(SstMove::input(t.from, t.to, t.guard.clone(), update));
      }
      for e in self.epsilon_moves_from(q) {
        let mut update = e.update.rename_vars(&rename).lift_to_n_vars(register_count);
        update.append_to_row(acc_index, ConstantToken::var(acc.clone()));
        moves.push(SstMove::epsilon(e.from, e.to, update));
      }
    }

    /* every old final loops back, appending its output to the accumulator
     * (prepending for the left iteration) and clearing the rest
     */
    for (&q, out) in &self.output_function {
      let renamed = out.rename_vars(&rename);
      let mut row = vec![];
      if is_left_iteration {
        row.extend(renamed.output_row().iter().cloned());
        row.push(ConstantToken::var(acc.clone()));
      } else {
        row.push(ConstantToken::var(acc.clone()));
        row.extend(renamed.output_row().iter().cloned());
      }
      let mut update = SimpleVariableUpdate::clear(register_count);
      update.set_row(acc_index, row);
      moves.push(SstMove::epsilon(q, initial_state, update));
    }

    let mut into_old = SimpleVariableUpdate::clear(register_count);
    into_old.set_row(acc_index, vec![ConstantToken::var(acc.clone())]);
    moves.push(SstMove::epsilon(initial_state, self.initial_state, into_old));

    let mut output = SimpleVariableUpdate::clear(register_count);
    output.set_row(0, vec![ConstantToken::var(acc)]);

    Sst::from_parts(
      moves,
      initial_state,
      variables,
      vec![(initial_state, output)],
      ba,
    )
  }

  /** iterate the transducer, concatenating iteration outputs left-to-right */
  pub fn star(&self, ba: &A) -> Self {
    self.compute_star(ba, false)
  }

  /** iterate the transducer, concatenating iteration outputs right-to-left */
  pub fn left_star(&self, ba: &A) -> Self {
    self.compute_star(ba, true)
  }

  /** three synchronized copies of the product of all component
   * transducers, with one buffer register per pair and one shared
   * accumulator; copy 1 buffers left outputs, copies 2 and 3 cycle while
   * folding buffer-then-right-output runs into the accumulator (on the
   * other side of the accumulator for the left shuffle). all components
   * are assumed to share the same input domain.
   */
  pub fn compute_shuffle(
    pairs: &[(Sst<A>, Sst<A>)],
    ba: &A,
    is_left_shuffle: bool,
  ) -> Result<Self, AutomataError> {
    if pairs.is_empty() {
      return Ok(Sst::empty());
    }

    let mut components = vec![];
    for (left, right) in pairs {
      components.push(left.remove_epsilon_moves(ba)?);
      components.push(right.remove_epsilon_moves(ba)?);
    }

    /* registers: every component's, renamed apart, then one buffer per
     * pair, then the accumulator
     */
    let mut variables = vec![];
    let mut renames = vec![];
    let mut index = 0;
    for sst in &components {
      let (names, rename) = fresh_names(&sst.variables, index);
      index += names.len();
      variables.extend(names);
      renames.push(rename);
    }
    let buffer_base = index;
    for i in 0..pairs.len() {
      variables.push(format!("x{}", buffer_base + i));
    }
    let acc_index = buffer_base + pairs.len();
    let acc = format!("x{acc_index}");
    variables.push(acc.clone());
    let register_count = variables.len();

    /* one synchronized stretch of the product */
    let mut reached = HashMap::new();
    let mut to_visit = VecDeque::new();
    let mut product_finals = vec![];
    let mut final_tuples: HashMap<StateId, Vec<StateId>> = HashMap::new();
    let mut stretch = vec![];

    let first: Vec<StateId> = components.iter().map(|sst| sst.initial_state).collect();
    state_id_of(first, &mut reached, &mut to_visit);

    while let Some(tuple) = to_visit.pop_front() {
      let current = reached[&tuple];

      /* all components share a domain, so the first one decides finality */
      if components[0].output_function.contains_key(&tuple[0]) {
        product_finals.push(current);
        final_tuples.insert(current, tuple.clone());
      }

      let mut triples = vec![];
      accumulate_moves(
        &tuple,
        &components,
        &renames,
        0,
        ba,
        ba.top(),
        FunctionalVariableUpdate::new(vec![]),
        vec![],
        &mut triples,
      );
      for (guard, update, target) in triples {
        let next = state_id_of(target, &mut reached, &mut to_visit);
        let mut update = update.lift_to_n_vars(register_count);
        for i in 0..pairs.len() {
          update.append_to_row(buffer_base + i, Token::var(format!("x{}", buffer_base + i)));
        }
        update.append_to_row(acc_index, Token::var(acc.clone()));
        stretch.push((current, next, guard, update));
      }
    }

    let offset = reached.len();
    trace!(stretch_states = offset, "shuffle product built");

    let mut moves = vec![];
    for copy in 0..3 {
      for (from, to, guard, update) in &stretch {
        moves.push(SstMove::input(
          from + copy * offset,
          to + copy * offset,
          guard.clone(),
          update.clone(),
        ));
      }
    }

    let mut outputs = vec![];
    for &f in &product_finals {
      let tuple = &final_tuples[&f];

      let buffer_rows = |update: &mut SimpleUpdate<A>| {
        for i in 0..pairs.len() {
          let left = 2 * i;
          update.set_row(
            buffer_base + i,
            components[left].output_function[&tuple[left]]
              .rename_vars(&renames[left])
              .output_row()
              .to_vec(),
          );
        }
      };

      /* copy 1 to copy 2: buffer the left outputs */
      let mut bank = SimpleVariableUpdate::clear(register_count);
      buffer_rows(&mut bank);
      moves.push(SstMove::epsilon(f, offset, bank));

      /* accumulator row: buffer_i followed by the right output, per pair,
       * with the previous accumulator on the outside
       */
      let mut acc_row = vec![];
      if !is_left_shuffle {
        acc_row.push(ConstantToken::var(acc.clone()));
      }
      for i in 0..pairs.len() {
        let right = 2 * i + 1;
        acc_row.push(ConstantToken::var(format!("x{}", buffer_base + i)));
        acc_row.extend(
          components[right].output_function[&tuple[right]]
            .rename_vars(&renames[right])
            .output_row()
            .iter()
            .cloned(),
        );
      }
      if is_left_shuffle {
        acc_row.push(ConstantToken::var(acc.clone()));
      }

      /* copy 2 to copy 3 and copy 3 back onto itself */
      let mut fold = SimpleVariableUpdate::clear(register_count);
      buffer_rows(&mut fold);
      fold.set_row(acc_index, acc_row.clone());
      moves.push(SstMove::epsilon(f + offset, 2 * offset, fold.clone()));
      moves.push(SstMove::epsilon(f + 2 * offset, 2 * offset, fold));

      let mut output = SimpleVariableUpdate::clear(register_count);
      output.set_row(0, acc_row);
      outputs.push((f + offset, output.clone()));
      outputs.push((f + 2 * offset, output));
    }

    Ok(Sst::from_parts(moves, 0, variables, outputs, ba))
  }

  // ------------------------------------------------------
  // simulation and projection
  // ------------------------------------------------------

  /** one output produced on `input`, None when the transducer is undefined
   * on it
   */
  pub fn output_on(
    &self,
    input: &[A::Dom],
    ba: &A,
  ) -> Result<Option<Vec<A::Dom>>, AutomataError> {
    let sst = self.remove_epsilon_moves(ba)?;

    let mut config: BTreeMap<StateId, Vec<VariableAssignment<A::Dom>>> = BTreeMap::from([(
      sst.initial_state,
      vec![VariableAssignment::initial(sst.variables.len())],
    )]);

    for symbol in input {
      let mut next: BTreeMap<StateId, Vec<VariableAssignment<A::Dom>>> = BTreeMap::new();
      for (&state, assignments) in &config {
        for m in sst.input_moves_from(state) {
          if ba.denote(&m.guard, symbol) {
            let target = next.entry(m.to).or_default();
            for assignment in assignments {
              target.push(m.update.apply_to(
                assignment,
                &sst.variables_to_indices,
                symbol,
                ba,
              ));
            }
          }
        }
      }
      config = next;
    }

    for (state, assignments) in &config {
      if let Some(output) = sst.output_function.get(state) {
        if let Some(assignment) = assignments.first() {
          let result = output
            .apply_to(assignment, &sst.variables_to_indices)
            .into_output();
          return Ok(Some(result));
        }
      }
    }
    Ok(None)
  }

  /** forget the register updates: the automaton accepting exactly the
   * inputs the transducer is defined on
   */
  pub fn get_domain(&self, ba: &A) -> Sfa<A> {
    let moves = self.states.iter().flat_map(|&q| {
      let inputs = self
        .input_moves_from(q)
        .iter()
        .map(|m| SfaMove::input(m.from, m.to, m.guard.clone()));
      let epsilons = self
        .epsilon_moves_from(q)
        .iter()
        .map(|e| SfaMove::epsilon(e.from, e.to));
      inputs.chain(epsilons).collect::<Vec<_>>()
    });
    Sfa::new(moves, self.initial_state, self.final_states(), ba)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::boolean_algebra::char_interval::{CharFunc, CharIntervalAlgebra, CharPred};
  use crate::util::TimeBudget;

  type TSst = Sst<CharIntervalAlgebra>;
  type Simple = SimpleVariableUpdate<char>;
  type Functional = FunctionalVariableUpdate<char, CharFunc>;

  fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
  }

  fn vars(names: &[&str]) -> Vec<String> {
    names.iter().map(|x| x.to_string()).collect()
  }

  /* copies every character of [a-z]* to the output */
  fn identity_sst(ba: &CharIntervalAlgebra) -> TSst {
    TSst::new(
      vec![SstMove::input(
        0,
        0,
        CharPred::range('a', 'z'),
        Functional::new(vec![vec![
          Token::var("x0"),
          Token::Func(CharFunc::Identity),
        ]]),
      )],
      0,
      vars(&["x0"]),
      vec![(0, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      ba,
    )
    .unwrap()
  }

  /* doubles every 'a' of an a-string */
  fn doubling_sst(ba: &CharIntervalAlgebra) -> TSst {
    TSst::new(
      vec![SstMove::input(
        0,
        0,
        CharPred::single('a'),
        Functional::new(vec![vec![
          Token::var("x0"),
          Token::Func(CharFunc::Identity),
          Token::Func(CharFunc::Identity),
        ]]),
      )],
      0,
      vars(&["x0"]),
      vec![(0, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      ba,
    )
    .unwrap()
  }

  /* accepts one [a-z] symbol c and outputs "x" c "y" */
  fn bracket_sst(ba: &CharIntervalAlgebra) -> TSst {
    TSst::new(
      vec![SstMove::input(
        0,
        1,
        CharPred::range('a', 'z'),
        Functional::new(vec![vec![Token::Func(CharFunc::Identity)]]),
      )],
      0,
      vars(&["x0"]),
      vec![(
        1,
        Simple::new(vec![vec![
          ConstantToken::Symbol('x'),
          ConstantToken::var("x0"),
          ConstantToken::Symbol('y'),
        ]]),
      )],
      ba,
    )
    .unwrap()
  }

  /* accepts one [a-z] symbol and copies it into its single register */
  fn single_char_identity(ba: &CharIntervalAlgebra) -> TSst {
    TSst::new(
      vec![SstMove::input(
        0,
        1,
        CharPred::range('a', 'z'),
        Functional::new(vec![vec![Token::Func(CharFunc::Identity)]]),
      )],
      0,
      vars(&["x0"]),
      vec![(1, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      ba,
    )
    .unwrap()
  }

  #[test]
  fn construction_validates() {
    let ba = CharIntervalAlgebra;

    let duplicate = TSst::new(
      vec![],
      0,
      vars(&["x0", "x0"]),
      vec![(0, Simple::new(vec![vec![], vec![]]))],
      &ba,
    );
    assert_eq!(
      duplicate.unwrap_err(),
      AutomataError::DuplicateVariable("x0".to_string())
    );

    let wrong_arity = TSst::new(
      vec![],
      0,
      vars(&["x0"]),
      vec![(0, Simple::new(vec![vec![], vec![]]))],
      &ba,
    );
    assert_eq!(
      wrong_arity.unwrap_err(),
      AutomataError::UpdateArity {
        expected: 1,
        found: 2
      }
    );

    let undeclared = TSst::new(
      vec![],
      0,
      vars(&["x0"]),
      vec![(0, Simple::new(vec![vec![ConstantToken::var("y")]]))],
      &ba,
    );
    assert_eq!(
      undeclared.unwrap_err(),
      AutomataError::UndeclaredVariable("y".to_string())
    );
  }

  #[test]
  fn factories() {
    let ba = CharIntervalAlgebra;

    let empty = TSst::empty();
    assert!(empty.is_empty());
    assert_eq!(empty.output_on(&chars(""), &ba).unwrap(), None);

    let bang = TSst::epsilon_sst(vec![ConstantToken::Symbol('!')], &ba);
    assert_eq!(bang.output_on(&chars(""), &ba).unwrap(), Some(chars("!")));
    assert_eq!(bang.output_on(&chars("a"), &ba).unwrap(), None);

    let upper = TSst::base_sst(
      CharPred::range('a', 'z'),
      vec![Token::Func(CharFunc::Offset(-32))],
      &ba,
    );
    assert_eq!(upper.output_on(&chars("q"), &ba).unwrap(), Some(chars("Q")));
    assert_eq!(upper.output_on(&chars("qq"), &ba).unwrap(), None);
    assert_eq!(upper.output_on(&chars(""), &ba).unwrap(), None);
  }

  #[test]
  fn simulation_copies_input() {
    let ba = CharIntervalAlgebra;
    let id = identity_sst(&ba);
    assert_eq!(id.output_on(&chars(""), &ba).unwrap(), Some(chars("")));
    assert_eq!(
      id.output_on(&chars("abc"), &ba).unwrap(),
      Some(chars("abc"))
    );
    assert_eq!(id.output_on(&chars("a1"), &ba).unwrap(), None);
  }

  #[test]
  fn epsilon_final_conflict_is_detected() {
    let ba = CharIntervalAlgebra;
    /* both 1 and 2 are epsilon-reachable finals with distinct outputs */
    let sst = TSst::new(
      vec![
        SstMove::epsilon(
          0,
          1,
          Simple::new(vec![vec![ConstantToken::var("x0"), ConstantToken::Symbol('a')]]),
        ),
        SstMove::epsilon(
          0,
          2,
          Simple::new(vec![vec![ConstantToken::var("x0"), ConstantToken::Symbol('b')]]),
        ),
      ],
      0,
      vars(&["x0"]),
      vec![
        (1, Simple::new(vec![vec![ConstantToken::var("x0")]])),
        (2, Simple::new(vec![vec![ConstantToken::var("x0")]])),
      ],
      &ba,
    )
    .unwrap();

    assert_eq!(
      sst.remove_epsilon_moves(&ba).unwrap_err(),
      AutomataError::EpsilonFinalConflict { first: 1, second: 2 }
    );
    assert!(sst.output_on(&chars(""), &ba).is_err());
  }

  #[test]
  fn epsilon_tree_violation_is_detected() {
    let ba = CharIntervalAlgebra;
    /* diamond: state 3 is reached along two epsilon paths */
    let sst = TSst::new(
      vec![
        SstMove::epsilon(0, 1, Simple::identity(&vars(&["x0"]))),
        SstMove::epsilon(0, 2, Simple::identity(&vars(&["x0"]))),
        SstMove::epsilon(1, 3, Simple::identity(&vars(&["x0"]))),
        SstMove::epsilon(2, 3, Simple::identity(&vars(&["x0"]))),
      ],
      0,
      vars(&["x0"]),
      vec![(3, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      &ba,
    )
    .unwrap();

    assert_eq!(
      sst.remove_epsilon_moves(&ba).unwrap_err(),
      AutomataError::EpsilonNotATree(3)
    );
  }

  #[test]
  fn concatenation_banks_the_left_output() {
    let ba = CharIntervalAlgebra;
    let doubler = doubling_sst(&ba);
    let bang = TSst::epsilon_sst(vec![ConstantToken::Symbol('!')], &ba);

    let concat = doubler.concatenate(&bang, &ba);
    assert_eq!(
      concat.output_on(&chars("aa"), &ba).unwrap(),
      Some(chars("aaaa!"))
    );
    assert_eq!(concat.output_on(&chars(""), &ba).unwrap(), Some(chars("!")));
    assert_eq!(concat.output_on(&chars("b"), &ba).unwrap(), None);

    assert!(doubler.concatenate(&TSst::empty(), &ba).is_empty());
  }

  #[test]
  fn star_iterates_left_to_right() {
    let ba = CharIntervalAlgebra;
    let bracket = bracket_sst(&ba);

    let star = bracket.star(&ba);
    assert_eq!(star.output_on(&chars(""), &ba).unwrap(), Some(chars("")));
    assert_eq!(
      star.output_on(&chars("ab"), &ba).unwrap(),
      Some(chars("xayxby"))
    );

    let left_star = bracket.left_star(&ba);
    assert_eq!(
      left_star.output_on(&chars("ab"), &ba).unwrap(),
      Some(chars("xbyxay"))
    );
  }

  #[test]
  fn combine_concatenates_outputs() {
    let ba = CharIntervalAlgebra;
    let id = identity_sst(&ba);
    let doubler = doubling_sst(&ba);

    let combined = id.combine(&doubler, &ba).unwrap();
    let input = chars("aa");
    let left = id.output_on(&input, &ba).unwrap().unwrap();
    let right = doubler.output_on(&input, &ba).unwrap().unwrap();
    let both = combined.output_on(&input, &ba).unwrap().unwrap();
    assert_eq!(both, [left, right].concat());

    /* undefined whenever either side is */
    assert_eq!(combined.output_on(&chars("b"), &ba).unwrap(), None);
  }

  #[test]
  fn union_behaves_as_either_operand() {
    let ba = CharIntervalAlgebra;
    /* left copies nonempty [a-m] words, right rewrites [n-z] words to 'z'
     * runs. neither accepts the empty word, so the union's fresh initial
     * state reaches at most one final state through epsilon moves.
     */
    let low = TSst::new(
      vec![
        SstMove::input(
          0,
          1,
          CharPred::range('a', 'm'),
          Functional::new(vec![vec![Token::var("x0"), Token::Func(CharFunc::Identity)]]),
        ),
        SstMove::input(
          1,
          1,
          CharPred::range('a', 'm'),
          Functional::new(vec![vec![Token::var("x0"), Token::Func(CharFunc::Identity)]]),
        ),
      ],
      0,
      vars(&["x0"]),
      vec![(1, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      &ba,
    )
    .unwrap();
    let high = TSst::new(
      vec![
        SstMove::input(
          0,
          1,
          CharPred::range('n', 'z'),
          Functional::new(vec![vec![Token::var("x0"), Token::Symbol('z')]]),
        ),
        SstMove::input(
          1,
          1,
          CharPred::range('n', 'z'),
          Functional::new(vec![vec![Token::var("x0"), Token::Symbol('z')]]),
        ),
      ],
      0,
      vars(&["x0"]),
      vec![(1, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      &ba,
    )
    .unwrap();

    let either = low.union(&high, &ba);
    assert_eq!(
      either.output_on(&chars("ab"), &ba).unwrap(),
      Some(chars("ab"))
    );
    assert_eq!(
      either.output_on(&chars("no"), &ba).unwrap(),
      Some(chars("zz"))
    );

    assert_eq!(low.union(&TSst::empty(), &ba), low);
  }

  #[test_log::test]
  fn epsilon_elimination_preserves_outputs() {
    let ba = CharIntervalAlgebra;
    let star = bracket_sst(&ba).star(&ba);
    assert!(!star.is_epsilon_free());

    let eliminated = star.remove_epsilon_moves(&ba).unwrap();
    assert!(eliminated.is_epsilon_free());
    for input in ["", "a", "ab", "abc"] {
      assert_eq!(
        eliminated.output_on(&chars(input), &ba).unwrap(),
        star.output_on(&chars(input), &ba).unwrap()
      );
    }
  }

  #[test]
  fn domain_projection_matches_definedness() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let concat = doubling_sst(&ba).concatenate(&bracket_sst(&ba), &ba);

    let domain = concat.get_domain(&ba);
    for input in ["", "b", "aab", "aaa", "ba", "az"] {
      let word = chars(input);
      assert_eq!(
        domain.accepts(&word, &ba),
        concat.output_on(&word, &ba).unwrap().is_some(),
        "domain and definedness disagree on {input:?}"
      );
    }

    /* the domain of a(a)*b-shaped transducer is a regular language */
    let expected = Sfa::base(CharPred::single('a'), &ba)
      .star(&ba)
      .concatenate(&Sfa::base(CharPred::range('a', 'z'), &ba), &ba);
    assert!(domain.is_equivalent_to(&expected, &ba, &budget).unwrap());
  }

  #[test]
  fn unreachable_states_pass() {
    let ba = CharIntervalAlgebra;
    let sst = TSst::new(
      vec![
        SstMove::input(
          0,
          1,
          CharPred::single('a'),
          Functional::new(vec![vec![Token::Func(CharFunc::Identity)]]),
        ),
        /* 5 is unreachable, 6 is dead */
        SstMove::input(
          5,
          1,
          CharPred::single('b'),
          Functional::new(vec![vec![Token::Func(CharFunc::Identity)]]),
        ),
        SstMove::input(
          0,
          6,
          CharPred::single('c'),
          Functional::new(vec![vec![Token::Func(CharFunc::Identity)]]),
        ),
      ],
      0,
      vars(&["x0"]),
      vec![(1, Simple::new(vec![vec![ConstantToken::var("x0")]]))],
      &ba,
    )
    .unwrap();
    assert_eq!(sst.state_count(), 4);

    let trimmed = sst.remove_unreachable_states(&ba);
    assert_eq!(trimmed.states(), &BTreeSet::from([0, 1]));
    assert_eq!(trimmed.transition_count(), 1);
    assert_eq!(
      trimmed.output_on(&chars("a"), &ba).unwrap(),
      Some(chars("a"))
    );
  }

  #[test_log::test]
  fn shuffle_folds_adjacent_stretches() {
    let ba = CharIntervalAlgebra;
    let pairs = vec![(single_char_identity(&ba), single_char_identity(&ba))];

    let shuffled = TSst::compute_shuffle(&pairs, &ba, false).unwrap();
    /* one register per component, one buffer per pair, one accumulator */
    assert_eq!(shuffled.variables().len(), 4);
    assert_eq!(
      shuffled.output_on(&chars("ab"), &ba).unwrap(),
      Some(chars("ab"))
    );
    assert_eq!(
      shuffled.output_on(&chars("abc"), &ba).unwrap(),
      Some(chars("abbc"))
    );
    assert_eq!(shuffled.output_on(&chars("a"), &ba).unwrap(), None);

    let left = TSst::compute_shuffle(&pairs, &ba, true).unwrap();
    assert_eq!(
      left.output_on(&chars("abc"), &ba).unwrap(),
      Some(chars("bcab"))
    );
  }

  #[test]
  fn identity_update_round_trips() {
    let ba = CharIntervalAlgebra;
    let id = identity_sst(&ba);
    let up = id.identity_var_up();
    let assignment = VariableAssignment::from_values(vec![chars("abc")]);
    assert_eq!(
      up.apply_to(&assignment, &id.variables_to_indices),
      assignment
    );
  }
}
