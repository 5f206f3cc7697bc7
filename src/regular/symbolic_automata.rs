use super::{EpsilonMove, InputMove, SfaMove, StateId};
use crate::{
  boolean_algebra::BoolAlg,
  errors::AutomataError,
  util::{state_id_of, BlockPartition, TimeBudget, UnionFindHopKarp},
};
use std::{
  collections::{BTreeSet, HashMap, HashSet, VecDeque},
  fmt::Debug,
};
use tracing::trace;

/** symbolic finite automaton over the Boolean algebra A.
 *
 * immutable after construction; every operation builds a fresh value and
 * borrows the algebra for its duration. flags are computed at build time
 * and never mutated.
 */
pub struct Sfa<A: BoolAlg> {
  states: BTreeSet<StateId>,
  initial_state: StateId,
  final_states: BTreeSet<StateId>,
  input_from: HashMap<StateId, Vec<InputMove<A::Pred>>>,
  input_to: HashMap<StateId, Vec<InputMove<A::Pred>>>,
  eps_from: HashMap<StateId, Vec<EpsilonMove>>,
  eps_to: HashMap<StateId, Vec<EpsilonMove>>,
  max_state_id: StateId,
  transition_count: usize,
  is_deterministic: bool,
  is_epsilon_free: bool,
  is_total: bool,
  is_empty: bool,
}

impl<A: BoolAlg> Clone for Sfa<A> {
  fn clone(&self) -> Self {
    Sfa {
      states: self.states.clone(),
      initial_state: self.initial_state,
      final_states: self.final_states.clone(),
      input_from: self.input_from.clone(),
      input_to: self.input_to.clone(),
      eps_from: self.eps_from.clone(),
      eps_to: self.eps_to.clone(),
      max_state_id: self.max_state_id,
      transition_count: self.transition_count,
      is_deterministic: self.is_deterministic,
      is_epsilon_free: self.is_epsilon_free,
      is_total: self.is_total,
      is_empty: self.is_empty,
    }
  }
}

impl<A: BoolAlg> Debug for Sfa<A> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Sfa")
      .field("states", &self.states)
      .field("initial_state", &self.initial_state)
      .field("final_states", &self.final_states)
      .field("input_from", &self.input_from)
      .field("eps_from", &self.eps_from)
      .field("is_deterministic", &self.is_deterministic)
      .field("is_epsilon_free", &self.is_epsilon_free)
      .field("is_total", &self.is_total)
      .field("is_empty", &self.is_empty)
      .finish()
  }
}

impl<A: BoolAlg> PartialEq for Sfa<A> {
  fn eq(&self, other: &Self) -> bool {
    self.states == other.states
      && self.initial_state == other.initial_state
      && self.final_states == other.final_states
      && self.input_from == other.input_from
      && self.eps_from == other.eps_from
  }
}

impl<A: BoolAlg> Sfa<A> {
  fn bare(initial_state: StateId, final_states: BTreeSet<StateId>) -> Self {
    let mut states = BTreeSet::from([initial_state]);
    states.extend(final_states.iter().copied());
    let max_state_id = states.iter().max().copied().unwrap_or(0);
    Sfa {
      states,
      initial_state,
      final_states,
      input_from: HashMap::new(),
      input_to: HashMap::new(),
      eps_from: HashMap::new(),
      eps_to: HashMap::new(),
      max_state_id,
      transition_count: 0,
      is_deterministic: false,
      is_epsilon_free: true,
      is_total: false,
      is_empty: false,
    }
  }

  /** the canonical empty automaton */
  pub fn empty() -> Self {
    let mut aut = Sfa::bare(0, BTreeSet::new());
    aut.is_deterministic = true;
    aut.is_empty = true;
    aut
  }

  /** accepts every word */
  pub fn full(ba: &A) -> Self {
    let mut aut = Sfa::bare(0, BTreeSet::from([0]));
    aut.add_move(SfaMove::input(0, 0, ba.top()), ba, true);
    aut.is_deterministic = true;
    aut.is_total = true;
    aut
  }

  /** accepts only the empty word */
  pub fn epsilon() -> Self {
    let mut aut = Sfa::bare(0, BTreeSet::from([0]));
    aut.is_deterministic = true;
    aut
  }

  /** accepts exactly the single-symbol words admitted by `guard` */
  pub fn base(guard: A::Pred, ba: &A) -> Self {
    Sfa::new(
      vec![SfaMove::input(0, 1, guard)],
      0,
      BTreeSet::from([1]),
      ba,
    )
  }

  pub fn new(
    moves: impl IntoIterator<Item = SfaMove<A::Pred>>,
    initial_state: StateId,
    final_states: BTreeSet<StateId>,
    ba: &A,
  ) -> Self {
    Sfa::mk_sfa(moves, initial_state, final_states, ba, true, true)
  }

  /** create an automaton from a collection of moves.
   * unsatisfiable input guards and self-epsilons are dropped on insertion;
   * `normalize` collapses parallel moves, `remove_unreachable` drops states
   * that are not both reachable and alive (keeping ids). when no final
   * state survives, the canonical empty automaton is returned.
   */
  pub fn mk_sfa(
    moves: impl IntoIterator<Item = SfaMove<A::Pred>>,
    initial_state: StateId,
    final_states: BTreeSet<StateId>,
    ba: &A,
    remove_unreachable: bool,
    normalize: bool,
  ) -> Self {
    if final_states.is_empty() {
      return Sfa::empty();
    }

    let mut aut = Sfa::bare(initial_state, final_states);
    for m in moves {
      aut.add_move(m, ba, false);
    }

    if normalize {
      aut = aut.normalize(ba);
    }
    if remove_unreachable {
      aut = aut.remove_dead_states(ba);
    }
    if aut.final_states.is_empty() {
      return Sfa::empty();
    }

    aut.compute_flags(ba);
    aut
  }

  fn add_move(&mut self, m: SfaMove<A::Pred>, ba: &A, skip_sat_check: bool) {
    match m {
      SfaMove::Epsilon { from, to } => {
        if from == to {
          return;
        }
        self.touch(from, to);
        self.eps_from.entry(from).or_default().push(EpsilonMove { from, to });
        self.eps_to.entry(to).or_default().push(EpsilonMove { from, to });
        self.transition_count += 1;
      }
      SfaMove::Input { from, to, guard } => {
        if !skip_sat_check && !ba.satisfiable(&guard) {
          return;
        }
        self.touch(from, to);
        let m = InputMove { from, to, guard };
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
    self.is_empty = !self.final_states.iter().any(|q| reachable.contains(q));

    self.is_deterministic = self.is_epsilon_free
      && self.states.iter().all(|&q| {
        let moves = self.input_moves_from(q);
        moves.iter().enumerate().all(|(i, m1)| {
          moves[i + 1..]
            .iter()
            .all(|m2| !ba.satisfiable(&ba.and(&m1.guard, &m2.guard)))
        })
      });

    self.is_total = self.is_deterministic
      && self.states.iter().all(|&q| {
        let covered = ba.or_all(self.input_moves_from(q).iter().map(|m| &m.guard));
        !ba.satisfiable(&ba.not(&covered))
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

  pub fn final_states(&self) -> &BTreeSet<StateId> {
    &self.final_states
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

  pub fn is_total(&self) -> bool {
    self.is_total
  }

  pub fn is_empty(&self) -> bool {
    self.is_empty
  }

  pub fn input_moves_from(&self, q: StateId) -> &[InputMove<A::Pred>] {
    self.input_from.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn input_moves_to(&self, q: StateId) -> &[InputMove<A::Pred>] {
    self.input_to.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn epsilon_moves_from(&self, q: StateId) -> &[EpsilonMove] {
    self.eps_from.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn epsilon_moves_to(&self, q: StateId) -> &[EpsilonMove] {
    self.eps_to.get(&q).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn transitions_from(&self, q: StateId) -> Vec<SfaMove<A::Pred>> {
    let mut moves: Vec<SfaMove<A::Pred>> = self
      .input_moves_from(q)
      .iter()
      .map(|m| SfaMove::input(m.from, m.to, m.guard.clone()))
      .collect();
    moves.extend(
      self
        .epsilon_moves_from(q)
        .iter()
        .map(|e| SfaMove::epsilon(e.from, e.to)),
    );
    moves
  }

  pub fn transitions_to(&self, q: StateId) -> Vec<SfaMove<A::Pred>> {
    let mut moves: Vec<SfaMove<A::Pred>> = self
      .input_moves_to(q)
      .iter()
      .map(|m| SfaMove::input(m.from, m.to, m.guard.clone()))
      .collect();
    moves.extend(
      self
        .epsilon_moves_to(q)
        .iter()
        .map(|e| SfaMove::epsilon(e.from, e.to)),
    );
    moves
  }

  pub fn transitions(&self) -> Vec<SfaMove<A::Pred>> {
    self
      .states
      .iter()
      .flat_map(|&q| self.transitions_from(q))
      .collect()
  }

  // ------------------------------------------------------
  // reachability
  // ------------------------------------------------------

  fn eps_closure(&self, q: StateId) -> BTreeSet<StateId> {
    let mut closure = BTreeSet::from([q]);
    let mut to_visit = VecDeque::from([q]);
    while let Some(p) = to_visit.pop_front() {
      for e in self.epsilon_moves_from(p) {
        if closure.insert(e.to) {
          to_visit.push_back(e.to);
        }
      }
    }
    closure
  }

  fn input_moves_from_set<'a>(
    &'a self,
    set: &'a BTreeSet<StateId>,
  ) -> impl Iterator<Item = &'a InputMove<A::Pred>> {
    set.iter().flat_map(|&q| self.input_moves_from(q).iter())
  }

  fn is_final_configuration(&self, set: &BTreeSet<StateId>) -> bool {
    set.iter().any(|q| self.final_states.contains(q))
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

  /* drop states that are not both reachable from the initial state and
   * able to reach a final state; ids are kept.
   */
  fn remove_dead_states(&self, ba: &A) -> Self {
    let reachable = self.reachable_from(self.initial_state);
    let reaching = self.reaching_states(&self.final_states);
    let alive: BTreeSet<StateId> = reachable.intersection(&reaching).copied().collect();

    if alive.is_empty() {
      return Sfa::empty();
    }

    let moves = alive.iter().flat_map(|&q| {
      self
        .transitions_from(q)
        .into_iter()
        .filter(|m| alive.contains(&m.to()))
    });
    let final_states: BTreeSet<StateId> = self
      .final_states
      .iter()
      .copied()
      .filter(|q| alive.contains(q))
      .collect();

    let mut aut = Sfa::bare(self.initial_state, final_states);
    for m in moves {
      aut.add_move(m, ba, true);
    }
    aut.compute_flags(ba);
    aut
  }

  // ------------------------------------------------------
  // language membership helpers
  // ------------------------------------------------------

  /** whether the automaton accepts `input` */
  pub fn accepts(&self, input: &[A::Dom], ba: &A) -> bool {
    let mut config = self.eps_closure(self.initial_state);
    for symbol in input {
      let mut next = BTreeSet::new();
      for m in self.input_moves_from_set(&config) {
        if ba.denote(&m.guard, symbol) {
          next.extend(self.eps_closure(m.to));
        }
      }
      if next.is_empty() {
        return false;
      }
      config = next;
    }
    self.is_final_configuration(&config)
  }

  /** some accepted word, None when the language is empty */
  pub fn witness_word(&self, ba: &A) -> Option<Vec<A::Dom>> {
    let mut words: HashMap<StateId, Vec<A::Dom>> =
      HashMap::from([(self.initial_state, vec![])]);
    let mut to_visit = VecDeque::from([self.initial_state]);
    while let Some(q) = to_visit.pop_front() {
      if self.final_states.contains(&q) {
        return words.remove(&q);
      }
      let word = words[&q].clone();
      for e in self.epsilon_moves_from(q) {
        if !words.contains_key(&e.to) {
          words.insert(e.to, word.clone());
          to_visit.push_back(e.to);
        }
      }
      for m in self.input_moves_from(q) {
        if !words.contains_key(&m.to) {
          if let Some(symbol) = ba.witness(&m.guard) {
            let mut next = word.clone();
            next.push(symbol);
            words.insert(m.to, next);
            to_visit.push_back(m.to);
          }
        }
      }
    }
    None
  }

  // ------------------------------------------------------
  // Boolean operations
  // ------------------------------------------------------

  /** product construction over satisfiable guard conjunctions */
  pub fn intersection(
    &self,
    other: &Self,
    ba: &A,
    budget: &TimeBudget,
  ) -> Result<Self, AutomataError> {
    if self.is_empty || other.is_empty {
      return Ok(Sfa::empty());
    }

    let mut moves = vec![];
    let mut final_states = BTreeSet::new();
    let mut reached = HashMap::new();
    let mut to_visit = VecDeque::new();

    state_id_of(
      (self.initial_state, other.initial_state),
      &mut reached,
      &mut to_visit,
    );

    while let Some(pair) = to_visit.pop_front() {
      budget.check()?;
      let current = reached[&pair];

      let closure1 = self.eps_closure(pair.0);
      let closure2 = other.eps_closure(pair.1);

      if self.is_final_configuration(&closure1) && other.is_final_configuration(&closure2) {
        final_states.insert(current);
      }

      for m1 in self.input_moves_from_set(&closure1) {
        for m2 in other.input_moves_from_set(&closure2) {
          budget.check()?;
          let conj = ba.and(&m1.guard, &m2.guard);
          if ba.satisfiable(&conj) {
            let next = state_id_of((m1.to, m2.to), &mut reached, &mut to_visit);
            moves.push(SfaMove::input(current, next, conj));
          }
        }
      }
    }

    Ok(Sfa::mk_sfa(moves, 0, final_states, ba, true, true))
  }

  /** fresh initial state with epsilon moves into both operands */
  pub fn union(&self, other: &Self, ba: &A) -> Self {
    if self.is_empty && other.is_empty {
      return Sfa::empty();
    }

    let offset = self.max_state_id + 2;
    let initial_state = other.max_state_id + offset + 1;

    let mut moves = self.transitions();
    for m in other.transitions() {
      moves.push(match m {
        SfaMove::Input { from, to, guard } => SfaMove::input(from + offset, to + offset, guard),
        SfaMove::Epsilon { from, to } => SfaMove::epsilon(from + offset, to + offset),
      });
    }
    moves.push(SfaMove::epsilon(initial_state, self.initial_state));
    moves.push(SfaMove::epsilon(initial_state, other.initial_state + offset));

    let mut final_states = self.final_states.clone();
    final_states.extend(other.final_states.iter().map(|q| q + offset));

    Sfa::mk_sfa(moves, initial_state, final_states, ba, false, true)
  }

  /** totalize, then flip the final states */
  pub fn complement(&self, ba: &A, budget: &TimeBudget) -> Result<Self, AutomataError> {
    let total = self.mk_total(ba, budget)?;
    let final_states: BTreeSet<StateId> = total
      .states
      .iter()
      .copied()
      .filter(|q| !total.final_states.contains(q))
      .collect();
    Ok(Sfa::mk_sfa(
      total.transitions(),
      total.initial_state,
      final_states,
      ba,
      false,
      true,
    ))
  }

  pub fn difference(
    &self,
    other: &Self,
    ba: &A,
    budget: &TimeBudget,
  ) -> Result<Self, AutomataError> {
    self.intersection(&other.complement(ba, budget)?, ba, budget)
  }

  /** epsilon moves from every final state of self into (renumbered) other */
  pub fn concatenate(&self, other: &Self, ba: &A) -> Self {
    if self.is_empty || other.is_empty {
      return Sfa::empty();
    }

    let offset = self.max_state_id + 1;

    let mut moves = self.transitions();
    for m in other.transitions() {
      moves.push(match m {
        SfaMove::Input { from, to, guard } => SfaMove::input(from + offset, to + offset, guard),
        SfaMove::Epsilon { from, to } => SfaMove::epsilon(from + offset, to + offset),
      });
    }
    for &q in &self.final_states {
      moves.push(SfaMove::epsilon(q, other.initial_state + offset));
    }

    let final_states: BTreeSet<StateId> =
      other.final_states.iter().map(|q| q + offset).collect();

    Sfa::mk_sfa(moves, self.initial_state, final_states, ba, false, true)
  }

  /** fresh initial state which is also the sole final state */
  pub fn star(&self, ba: &A) -> Self {
    let initial_state = self.max_state_id + 1;

    let mut moves = self.transitions();
    for &q in &self.final_states {
      moves.push(SfaMove::epsilon(q, initial_state));
    }
    moves.push(SfaMove::epsilon(initial_state, self.initial_state));

    Sfa::mk_sfa(
      moves,
      initial_state,
      BTreeSet::from([initial_state]),
      ba,
      false,
      true,
    )
  }

  // ------------------------------------------------------
  // normal forms
  // ------------------------------------------------------

  /** subset construction over epsilon closures */
  pub fn remove_epsilon_moves(&self, ba: &A) -> Self {
    if self.is_epsilon_free {
      return self.clone();
    }

    let mut moves = vec![];
    let mut final_states = BTreeSet::new();
    let mut reached = HashMap::new();
    let mut to_visit = VecDeque::new();

    state_id_of(
      self.eps_closure(self.initial_state),
      &mut reached,
      &mut to_visit,
    );

    while let Some(set) = to_visit.pop_front() {
      let current = reached[&set];
      if self.is_final_configuration(&set) {
        final_states.insert(current);
      }
      for m in self.input_moves_from_set(&set).cloned().collect::<Vec<_>>() {
        let next = state_id_of(self.eps_closure(m.to), &mut reached, &mut to_visit);
        moves.push(SfaMove::input(current, next, m.guard));
      }
    }

    Sfa::mk_sfa(moves, 0, final_states, ba, false, true)
  }

  /** symbolic subset construction: the moves out of every subset state are
   * the minterms of the outgoing guards, hence pairwise disjoint
   */
  pub fn determinize(&self, ba: &A, budget: &TimeBudget) -> Result<Self, AutomataError> {
    if self.is_deterministic {
      return Ok(self.clone());
    }

    let eps_free;
    let aut = if self.is_epsilon_free {
      self
    } else {
      eps_free = self.remove_epsilon_moves(ba);
      &eps_free
    };

    let mut moves = vec![];
    let mut final_states = BTreeSet::new();
    let mut reached = HashMap::new();
    let mut to_visit = VecDeque::new();

    state_id_of(
      BTreeSet::from([aut.initial_state]),
      &mut reached,
      &mut to_visit,
    );

    while let Some(subset) = to_visit.pop_front() {
      budget.check()?;
      let current = reached[&subset];

      if aut.is_final_configuration(&subset) {
        final_states.insert(current);
      }

      let subset_moves: Vec<InputMove<A::Pred>> =
        aut.input_moves_from_set(&subset).cloned().collect();
      let guards: Vec<A::Pred> = subset_moves.iter().map(|m| m.guard.clone()).collect();

      for minterm in ba.minterms(&guards, budget)? {
        budget.check()?;
        let successor: BTreeSet<StateId> = subset_moves
          .iter()
          .enumerate()
          .filter(|(index, _)| minterm.entails(*index))
          .map(|(_, m)| m.to)
          .collect();
        if !successor.is_empty() {
          let next = state_id_of(successor, &mut reached, &mut to_visit);
          moves.push(SfaMove::input(current, next, minterm.guard));
        }
      }
      trace!(subsets = reached.len(), "determinize frontier");
    }

    Ok(Sfa::mk_sfa(moves, 0, final_states, ba, false, true))
  }

  /** route the uncovered residual of every state into a fresh non-final
   * sink carrying a top self-loop
   */
  pub fn mk_total(&self, ba: &A, budget: &TimeBudget) -> Result<Self, AutomataError> {
    if self.is_total {
      return Ok(self.clone());
    }

    /* the empty language totalizes to a single non-final sink; going
     * through mk_sfa would collapse it back to the canonical empty value
     * and lose the sink
     */
    if self.is_empty {
      let mut aut = Sfa::bare(0, BTreeSet::new());
      aut.add_move(SfaMove::input(0, 0, ba.top()), ba, true);
      aut.is_deterministic = true;
      aut.is_total = true;
      aut.is_empty = true;
      return Ok(aut);
    }

    let det;
    let aut = if self.is_deterministic {
      self
    } else {
      det = self.determinize(ba, budget)?;
      &det
    };

    let sink = aut.max_state_id + 1;
    let mut add_sink = false;
    let mut moves = aut.transitions();
    for &q in &aut.states {
      budget.check()?;
      let covered = ba.or_all(aut.input_moves_from(q).iter().map(|m| &m.guard));
      let residual = ba.not(&covered);
      if ba.satisfiable(&residual) {
        add_sink = true;
        moves.push(SfaMove::input(q, sink, residual));
      }
    }
    if add_sink {
      moves.push(SfaMove::input(sink, sink, ba.top()));
    }

    /* unreachable-state removal would strip the sink again */
    Ok(Sfa::mk_sfa(
      moves,
      aut.initial_state,
      aut.final_states.clone(),
      ba,
      false,
      true,
    ))
  }

  /** collapse parallel input moves into their disjunction and keep at most
   * one epsilon move per ordered state pair
   */
  pub fn normalize(&self, ba: &A) -> Self {
    if self.is_empty {
      return Sfa::empty();
    }

    let mut collapsed: Vec<((StateId, StateId), A::Pred)> = vec![];
    let mut eps: Vec<(StateId, StateId)> = vec![];
    for &q in &self.states {
      for m in self.input_moves_from(q) {
        match collapsed.iter_mut().find(|(pair, _)| *pair == (m.from, m.to)) {
          Some((_, guard)) => *guard = ba.or(guard, &m.guard),
          None => collapsed.push(((m.from, m.to), m.guard.clone())),
        }
      }
      for e in self.epsilon_moves_from(q) {
        if !eps.contains(&(e.from, e.to)) {
          eps.push((e.from, e.to));
        }
      }
    }

    let moves = collapsed
      .into_iter()
      .map(|((from, to), guard)| SfaMove::input(from, to, guard))
      .chain(eps.into_iter().map(|(from, to)| SfaMove::epsilon(from, to)));

    Sfa::mk_sfa(
      moves,
      self.initial_state,
      self.final_states.clone(),
      ba,
      false,
      false,
    )
  }

  /** symbolic block refinement over the determinized, totalized automaton
   * (minimization of symbolic automata, D'Antoni and Veanes, POPL'14)
   */
  pub fn minimize(&self, ba: &A, budget: &TimeBudget) -> Result<Self, AutomataError> {
    if self.is_empty {
      return Ok(Sfa::empty());
    }

    let total = self.determinize(ba, budget)?.mk_total(ba, budget)?;

    let finals = total.final_states.clone();
    let non_finals: BTreeSet<StateId> = total
      .states
      .iter()
      .copied()
      .filter(|q| !finals.contains(q))
      .collect();

    let finals_smaller = finals.len() <= non_finals.len();
    let mut partition = BlockPartition::from_blocks(vec![finals, non_finals]);
    let mut worklist: Vec<usize> = vec![if finals_smaller { 0 } else { 1 }];
    let mut queued: HashSet<usize> = worklist.iter().copied().collect();

    /* push per the smaller-half rule */
    fn enqueue(
      worklist: &mut Vec<usize>,
      queued: &mut HashSet<usize>,
      partition: &BlockPartition,
      old: usize,
      fresh: usize,
    ) {
      let chosen = if queued.contains(&old) {
        fresh
      } else if partition.block_size(old) <= partition.block_size(fresh) {
        old
      } else {
        fresh
      };
      worklist.push(chosen);
      queued.insert(chosen);
    }

    while let Some(splitter) = worklist.pop() {
      budget.check()?;
      queued.remove(&splitter);

      /* pred_into(s): disjunction of guards of moves from s into the splitter */
      let mut pred_into: HashMap<StateId, A::Pred> = HashMap::new();
      for &q in partition.states(splitter) {
        for m in total.input_moves_to(q) {
          match pred_into.get_mut(&m.from) {
            Some(guard) => *guard = ba.or(guard, &m.guard),
            None => {
              pred_into.insert(m.from, m.guard.clone());
            }
          }
        }
      }
      let pre_of: BTreeSet<StateId> = pred_into.keys().copied().collect();

      /* coarse split: predecessors versus the rest of each block */
      let touched: BTreeSet<usize> = pre_of.iter().map(|&q| partition.block_of(q)).collect();
      for block in touched {
        let part: BTreeSet<StateId> = partition
          .states(block)
          .intersection(&pre_of)
          .copied()
          .collect();
        if !part.is_empty() && part.len() < partition.block_size(block) {
          let fresh = partition.split(block, part);
          enqueue(&mut worklist, &mut queued, &partition, block, fresh);
        }
      }

      /* local-minterm refinement of the predecessor blocks */
      let mut iterate = true;
      while iterate {
        iterate = false;
        budget.check()?;

        let touched: BTreeSet<usize> = pre_of.iter().map(|&q| partition.block_of(q)).collect();
        for block in touched {
          let members: Vec<StateId> = partition.states(block).iter().copied().collect();
          if members.len() < 2 {
            continue;
          }

          let mut split = vec![members[0]];
          let mut psi = pred_into[&members[0]].clone();
          let mut splitter_found = false;

          for &q in &members[1..] {
            let phi = &pred_into[&q];
            if splitter_found {
              let conj = ba.and(&psi, phi);
              if ba.satisfiable(&conj) {
                split.push(q);
                psi = conj;
              }
            } else {
              let conj = ba.and(&psi, &ba.not(phi));
              if ba.satisfiable(&conj) {
                /* refine the local minterm */
                psi = conj;
                splitter_found = true;
              } else {
                let conj = ba.and(phi, &ba.not(&psi));
                if ba.satisfiable(&conj) {
                  split = vec![q];
                  psi = conj;
                  splitter_found = true;
                } else {
                  /* psi and phi agree */
                  split.push(q);
                }
              }
            }
          }

          if split.len() < members.len() {
            iterate = iterate || members.len() > 2;
            trace!(block, moved = split.len(), "refined block");
            let fresh = partition.split(block, split.into_iter().collect());
            enqueue(&mut worklist, &mut queued, &partition, block, fresh);
          }
        }
      }
    }

    /* quotient by the final partition, class ids in first-seen order */
    let mut class_of: HashMap<StateId, usize> = HashMap::new();
    let mut block_class: HashMap<usize, usize> = HashMap::new();
    let mut final_states = BTreeSet::new();
    for &q in &total.states {
      let block = partition.block_of(q);
      let next_class = block_class.len();
      let class = *block_class.entry(block).or_insert(next_class);
      class_of.insert(q, class);
      if total.final_states.contains(&q) {
        final_states.insert(class);
      }
    }

    let moves = total.states.iter().flat_map(|&q| {
      total
        .input_moves_from(q)
        .iter()
        .map(|m| SfaMove::input(class_of[&m.from], class_of[&m.to], m.guard.clone()))
        .collect::<Vec<_>>()
    });

    Ok(Sfa::mk_sfa(
      moves,
      class_of[&total.initial_state],
      final_states,
      ba,
      false,
      true,
    ))
  }

  // ------------------------------------------------------
  // equivalence and ambiguity
  // ------------------------------------------------------

  /** language equivalence via the two difference checks */
  pub fn is_equivalent_to(
    &self,
    other: &Self,
    ba: &A,
    budget: &TimeBudget,
  ) -> Result<bool, AutomataError> {
    if !self.difference(other, ba, budget)?.is_empty {
      return Ok(false);
    }
    Ok(other.difference(self, ba, budget)?.is_empty)
  }

  /** Hopcroft-Karp equivalence on the determinized, totalized, normalized
   * automata; on failure the witness word is accepted by exactly one side
   */
  pub fn hopcroft_karp_equivalent(
    &self,
    other: &Self,
    ba: &A,
    budget: &TimeBudget,
  ) -> Result<(bool, Option<Vec<A::Dom>>), AutomataError> {
    /* normalizing an empty-language automaton would collapse it back to
     * the canonical empty value and lose the sink totality relies on; the
     * totalized empty automaton is already normal
     */
    let normal = |aut: Sfa<A>| if aut.is_empty { aut } else { aut.normalize(ba) };
    let left = normal(self.determinize(ba, budget)?.mk_total(ba, budget)?);
    let right = normal(other.determinize(ba, budget)?.mk_total(ba, budget)?);

    let offset = left.max_state_id + 1;
    let mut ds = UnionFindHopKarp::new();

    ds.add(
      left.initial_state,
      left.final_states.contains(&left.initial_state),
      vec![],
    );
    ds.add(
      right.initial_state + offset,
      right.final_states.contains(&right.initial_state),
      vec![],
    );
    if !ds.merge(left.initial_state, right.initial_state + offset) {
      return Ok((false, Some(vec![])));
    }

    let mut to_visit = VecDeque::from([(left.initial_state, right.initial_state)]);
    while let Some((p, q)) = to_visit.pop_front() {
      budget.check()?;
      for m1 in left.input_moves_from(p) {
        for m2 in right.input_moves_from(q) {
          let conj = ba.and(&m1.guard, &m2.guard);
          if !ba.satisfiable(&conj) {
            continue;
          }
          let Some(symbol) = ba.witness(&conj) else {
            continue;
          };
          let r1 = m1.to;
          let r2 = m2.to + offset;

          let mut prefix = ds.witness(p).to_vec();
          prefix.push(symbol);

          if !ds.contains(r1) {
            ds.add(r1, left.final_states.contains(&m1.to), prefix.clone());
          }
          if !ds.contains(r2) {
            ds.add(r2, right.final_states.contains(&m2.to), prefix.clone());
          }

          if !ds.in_same_set(r1, r2) {
            if !ds.merge(r1, r2) {
              return Ok((false, Some(prefix)));
            }
            to_visit.push_back((m1.to, m2.to));
          }
        }
      }
    }

    Ok((true, None))
  }

  /** build the self-product; an alive off-diagonal state certifies two
   * distinct accepting runs over one input, which is reconstructed by
   * stitching a witness into that state with a witness out of it
   */
  pub fn ambiguous_input(
    &self,
    ba: &A,
    budget: &TimeBudget,
  ) -> Result<Option<Vec<A::Dom>>, AutomataError> {
    let mut moves = vec![];
    let mut final_states = BTreeSet::new();
    let mut reached = HashMap::new();
    let mut reached_rev: HashMap<StateId, (StateId, StateId)> = HashMap::new();
    let mut to_visit = VecDeque::new();

    let init = (self.initial_state, self.initial_state);
    state_id_of(init, &mut reached, &mut to_visit);
    reached_rev.insert(0, init);

    while let Some(pair) = to_visit.pop_front() {
      budget.check()?;
      let current = reached[&pair];

      let closure1 = self.eps_closure(pair.0);
      let closure2 = self.eps_closure(pair.1);

      if self.is_final_configuration(&closure1) && self.is_final_configuration(&closure2) {
        final_states.insert(current);
      }

      for m1 in self.input_moves_from_set(&closure1) {
        for m2 in self.input_moves_from_set(&closure2) {
          budget.check()?;
          let conj = ba.and(&m1.guard, &m2.guard);
          if ba.satisfiable(&conj) {
            let next = state_id_of((m1.to, m2.to), &mut reached, &mut to_visit);
            reached_rev.insert(next, (m1.to, m2.to));
            moves.push(SfaMove::input(current, next, conj));
          }
        }
      }
    }

    let product = Sfa::<A>::mk_sfa(moves, 0, final_states, ba, true, false);

    for &s in &product.states {
      let Some(&(p, q)) = reached_rev.get(&s) else {
        continue;
      };
      if p != q {
        trace!(product_state = s, "off-diagonal state is alive");
        let all_moves = product.transitions();
        let into = Sfa::<A>::mk_sfa(
          all_moves.clone(),
          product.initial_state,
          BTreeSet::from([s]),
          ba,
          false,
          false,
        );
        let out_of = Sfa::<A>::mk_sfa(
          all_moves,
          s,
          product.final_states.clone(),
          ba,
          false,
          false,
        );
        if let Some(word) = into.concatenate(&out_of, ba).witness_word(ba) {
          return Ok(Some(word));
        }
      }
    }
    Ok(None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::boolean_algebra::char_interval::{CharIntervalAlgebra, CharPred};

  fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
  }

  /* a(b|c)* as a deterministic automaton */
  fn a_bc_star_dfa(ba: &CharIntervalAlgebra) -> Sfa<CharIntervalAlgebra> {
    Sfa::new(
      vec![
        SfaMove::input(0, 1, CharPred::single('a')),
        SfaMove::input(1, 1, CharPred::range('b', 'c')),
      ],
      0,
      BTreeSet::from([1]),
      ba,
    )
  }

  /* a(b|c)* with epsilon moves and parallel paths */
  fn a_bc_star_nfa(ba: &CharIntervalAlgebra) -> Sfa<CharIntervalAlgebra> {
    Sfa::new(
      vec![
        SfaMove::input(0, 1, CharPred::single('a')),
        SfaMove::epsilon(1, 2),
        SfaMove::input(2, 3, CharPred::single('b')),
        SfaMove::epsilon(3, 2),
        SfaMove::input(2, 4, CharPred::single('c')),
        SfaMove::epsilon(4, 2),
      ],
      0,
      BTreeSet::from([1, 3, 4]),
      ba,
    )
  }

  #[test]
  fn accepts_words() {
    let ba = CharIntervalAlgebra;
    let dfa = a_bc_star_dfa(&ba);

    assert!(dfa.accepts(&chars("a"), &ba));
    assert!(dfa.accepts(&chars("abcb"), &ba));
    assert!(!dfa.accepts(&chars(""), &ba));
    assert!(!dfa.accepts(&chars("ba"), &ba));
    assert!(!dfa.accepts(&chars("abca"), &ba));

    let nfa = a_bc_star_nfa(&ba);
    assert!(nfa.accepts(&chars("abcb"), &ba));
    assert!(!nfa.accepts(&chars("ab c"), &ba));
  }

  #[test]
  fn factories() {
    let ba = CharIntervalAlgebra;

    assert!(Sfa::<CharIntervalAlgebra>::empty().is_empty());
    assert!(!Sfa::empty().accepts(&chars(""), &ba));

    let full = Sfa::full(&ba);
    assert!(full.is_total());
    assert!(full.accepts(&chars(""), &ba));
    assert!(full.accepts(&chars("anything"), &ba));

    let eps = Sfa::epsilon();
    assert!(eps.accepts(&chars(""), &ba));
    assert!(!eps.accepts(&chars("a"), &ba));

    let base = Sfa::base(CharPred::range('a', 'c'), &ba);
    assert!(base.accepts(&chars("b"), &ba));
    assert!(!base.accepts(&chars("d"), &ba));
    assert!(!base.accepts(&chars("ab"), &ba));

    assert!(Sfa::base(CharPred::empty(), &ba).is_empty());
  }

  #[test]
  fn unreachable_states_are_dropped() {
    let ba = CharIntervalAlgebra;
    let aut = Sfa::new(
      vec![
        SfaMove::input(0, 1, CharPred::single('a')),
        /* 2 is unreachable, 3 is dead */
        SfaMove::input(2, 1, CharPred::single('b')),
        SfaMove::input(0, 3, CharPred::single('c')),
      ],
      0,
      BTreeSet::from([1]),
      &ba,
    );
    assert_eq!(aut.states(), &BTreeSet::from([0, 1]));
    assert_eq!(aut.transition_count(), 1);
  }

  #[test]
  fn determinize_via_minterms() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    /* overlapping guards force the minterm split a-j / k-m / n-z */
    let aut = Sfa::new(
      vec![
        SfaMove::input(0, 1, CharPred::range('a', 'm')),
        SfaMove::input(0, 2, CharPred::range('k', 'z')),
      ],
      0,
      BTreeSet::from([1, 2]),
      &ba,
    );
    assert!(!aut.is_deterministic());

    let det = aut.determinize(&ba, &budget).unwrap();
    assert!(det.is_deterministic());
    assert!(det.is_equivalent_to(&aut, &ba, &budget).unwrap());

    let min = aut.minimize(&ba, &budget).unwrap();
    assert_eq!(min.state_count(), 3);
    for c in 'a'..='z' {
      assert!(min.accepts(&[c], &ba));
    }
    assert!(!min.accepts(&chars(""), &ba));
    assert!(!min.accepts(&chars("ab"), &ba));
  }

  #[test]
  fn totalization() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let dfa = a_bc_star_dfa(&ba);
    assert!(!dfa.is_total());

    let total = dfa.mk_total(&ba, &budget).unwrap();
    assert!(total.is_total());
    assert!(total.is_deterministic());
    assert!(total.is_equivalent_to(&dfa, &ba, &budget).unwrap());
    assert_eq!(total.state_count(), dfa.state_count() + 1);
  }

  #[test]
  fn boolean_laws() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let a = a_bc_star_dfa(&ba);
    let b = Sfa::base(CharPred::range('a', 'z'), &ba);
    let c = Sfa::base(CharPred::range('k', 'z'), &ba).star(&ba);

    let ab = a.union(&b, &ba);
    let ba_ = b.union(&a, &ba);
    assert!(ab.is_equivalent_to(&ba_, &ba, &budget).unwrap());

    let left = a.union(&b, &ba).union(&c, &ba);
    let right = a.union(&b.union(&c, &ba), &ba);
    assert!(left.is_equivalent_to(&right, &ba, &budget).unwrap());

    let inter_ab = a.intersection(&b, &ba, &budget).unwrap();
    let inter_ba = b.intersection(&a, &ba, &budget).unwrap();
    assert!(inter_ab.is_equivalent_to(&inter_ba, &ba, &budget).unwrap());

    let double = a
      .complement(&ba, &budget)
      .unwrap()
      .complement(&ba, &budget)
      .unwrap();
    assert!(double.is_equivalent_to(&a, &ba, &budget).unwrap());

    assert!(a.difference(&a, &ba, &budget).unwrap().is_empty());
    assert!(a
      .intersection(&a.complement(&ba, &budget).unwrap(), &ba, &budget)
      .unwrap()
      .is_empty());

    let everything = a.union(&a.complement(&ba, &budget).unwrap(), &ba);
    assert!(everything
      .is_equivalent_to(&Sfa::full(&ba), &ba, &budget)
      .unwrap());
  }

  #[test]
  fn empty_short_circuits() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let a = a_bc_star_dfa(&ba);
    let empty = Sfa::empty();

    assert!(empty.intersection(&a, &ba, &budget).unwrap().is_empty());
    assert!(a.intersection(&empty, &ba, &budget).unwrap().is_empty());
    assert!(empty.difference(&a, &ba, &budget).unwrap().is_empty());
    assert!(empty.concatenate(&a, &ba).is_empty());

    let with_full = a.intersection(&Sfa::full(&ba), &ba, &budget).unwrap();
    assert!(with_full.is_equivalent_to(&a, &ba, &budget).unwrap());
  }

  #[test]
  fn epsilon_elimination_preserves_language() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let nfa = a_bc_star_nfa(&ba);
    assert!(!nfa.is_epsilon_free());

    let eps_free = nfa.remove_epsilon_moves(&ba);
    assert!(eps_free.is_epsilon_free());
    assert!(eps_free.is_equivalent_to(&nfa, &ba, &budget).unwrap());
  }

  #[test_log::test]
  fn normal_forms_preserve_language() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let nfa = a_bc_star_nfa(&ba);

    let det = nfa.determinize(&ba, &budget).unwrap();
    assert!(det.is_equivalent_to(&nfa, &ba, &budget).unwrap());

    let total = nfa.mk_total(&ba, &budget).unwrap();
    assert!(total.is_equivalent_to(&nfa, &ba, &budget).unwrap());

    let min = nfa.minimize(&ba, &budget).unwrap();
    assert!(min.is_equivalent_to(&nfa, &ba, &budget).unwrap());
    /* minimal total automaton for a(b|c)*: start, accept, sink */
    assert_eq!(min.state_count(), 3);
    assert!(min.state_count() <= total.state_count());
  }

  #[test]
  fn equivalence_of_nfa_and_dfa() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let dfa = a_bc_star_dfa(&ba);
    let nfa = a_bc_star_nfa(&ba);

    assert!(dfa.is_equivalent_to(&nfa, &ba, &budget).unwrap());
    let (equivalent, counterexample) = dfa.hopcroft_karp_equivalent(&nfa, &ba, &budget).unwrap();
    assert!(equivalent);
    assert_eq!(counterexample, None);
  }

  #[test]
  fn hopcroft_karp_counterexample() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    let dfa = a_bc_star_dfa(&ba);
    /* same shape but also accepts 'd' continuations */
    let wider = Sfa::new(
      vec![
        SfaMove::input(0, 1, CharPred::single('a')),
        SfaMove::input(1, 1, CharPred::range('b', 'd')),
      ],
      0,
      BTreeSet::from([1]),
      &ba,
    );

    assert!(!dfa.is_equivalent_to(&wider, &ba, &budget).unwrap());
    let (equivalent, counterexample) =
      dfa.hopcroft_karp_equivalent(&wider, &ba, &budget).unwrap();
    assert!(!equivalent);
    let word = counterexample.unwrap();
    assert!(dfa.accepts(&word, &ba) != wider.accepts(&word, &ba));
  }

  #[test]
  fn ambiguity_of_parallel_paths() {
    let ba = CharIntervalAlgebra;
    let budget = TimeBudget::unlimited();
    /* two parallel accepting paths over the same guard */
    let ambiguous = Sfa::new(
      vec![
        SfaMove::input(0, 1, CharPred::single('a')),
        SfaMove::input(0, 2, CharPred::single('a')),
      ],
      0,
      BTreeSet::from([1, 2]),
      &ba,
    );
    let word = ambiguous.ambiguous_input(&ba, &budget).unwrap().unwrap();
    assert_eq!(word.len(), 1);
    assert!(ambiguous.accepts(&word, &ba));

    let unambiguous = a_bc_star_dfa(&ba);
    assert_eq!(unambiguous.ambiguous_input(&ba, &budget).unwrap(), None);
  }

  #[test]
  fn witness_of_concatenation() {
    let ba = CharIntervalAlgebra;
    let a = Sfa::base(CharPred::single('a'), &ba);
    let b = Sfa::base(CharPred::single('b'), &ba);

    let cat = a.concatenate(&b, &ba);
    assert!(cat.accepts(&chars("ab"), &ba));
    assert!(!cat.accepts(&chars("a"), &ba));
    assert!(!cat.accepts(&chars("ba"), &ba));
    assert_eq!(cat.witness_word(&ba), Some(chars("ab")));

    let star = a.star(&ba);
    assert!(star.accepts(&chars(""), &ba));
    assert!(star.accepts(&chars("aaa"), &ba));
    assert!(!star.accepts(&chars("ab"), &ba));

    assert_eq!(Sfa::<CharIntervalAlgebra>::empty().witness_word(&ba), None);
  }

  #[test]
  fn timeout_aborts() {
    let ba = CharIntervalAlgebra;
    let nfa = a_bc_star_nfa(&ba);
    let expired = TimeBudget::from_millis(0);
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(
      nfa.determinize(&ba, &expired).unwrap_err(),
      AutomataError::Timeout
    );
    assert_eq!(
      nfa.minimize(&ba, &expired).unwrap_err(),
      AutomataError::Timeout
    );
  }
}
