use crate::boolean_algebra::BoolAlgSubst;
use std::collections::HashMap;

/** a token evaluating to a string without looking at the input symbol */
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantToken<S> {
  Symbol(S),
  Var(String),
}
impl<S: Clone> ConstantToken<S> {
  pub fn var(name: impl Into<String>) -> Self {
    ConstantToken::Var(name.into())
  }

  fn rename(&self, rename: &HashMap<String, String>) -> Self {
    match self {
      ConstantToken::Var(name) => match rename.get(name) {
        Some(renamed) => ConstantToken::Var(renamed.clone()),
        None => self.clone(),
      },
      ConstantToken::Symbol(_) => self.clone(),
    }
  }
}

/** a token on an input move; function tokens are evaluated against the
 * consumed input symbol
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Token<S, F> {
  Symbol(S),
  Var(String),
  Func(F),
}
impl<S: Clone, F: Clone> Token<S, F> {
  pub fn var(name: impl Into<String>) -> Self {
    Token::Var(name.into())
  }

  fn rename(&self, rename: &HashMap<String, String>) -> Self {
    match self {
      Token::Var(name) => match rename.get(name) {
        Some(renamed) => Token::Var(renamed.clone()),
        None => self.clone(),
      },
      _ => self.clone(),
    }
  }
}
impl<S, F> From<ConstantToken<S>> for Token<S, F> {
  fn from(token: ConstantToken<S>) -> Self {
    match token {
      ConstantToken::Symbol(a) => Token::Symbol(a),
      ConstantToken::Var(x) => Token::Var(x),
    }
  }
}

/** the runtime value of the registers: one string per register. only the
 * simulator holds these.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct VariableAssignment<S> {
  values: Vec<Vec<S>>,
}
impl<S: Clone> VariableAssignment<S> {
  pub fn initial(register_count: usize) -> Self {
    VariableAssignment {
      values: vec![vec![]; register_count],
    }
  }

  pub fn from_values(values: Vec<Vec<S>>) -> Self {
    VariableAssignment { values }
  }

  pub fn value(&self, register: usize) -> &[S] {
    &self.values[register]
  }

  /** the content of the designated output register */
  pub fn into_output(mut self) -> Vec<S> {
    if self.values.is_empty() {
      vec![]
    } else {
      self.values.swap_remove(0)
    }
  }
}

/** register update whose right-hand sides hold only constants and variable
 * references; used on epsilon moves, output functions, and as the result
 * of composing out a known input symbol. assignment is simultaneous: every
 * row reads the pre-update registers.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleVariableUpdate<S> {
  rows: Vec<Vec<ConstantToken<S>>>,
}
impl<S: Clone> SimpleVariableUpdate<S> {
  pub fn new(rows: Vec<Vec<ConstantToken<S>>>) -> Self {
    SimpleVariableUpdate { rows }
  }

  /** x_i := x_i for every declared variable */
  pub fn identity(variables: &[String]) -> Self {
    SimpleVariableUpdate {
      rows: variables
        .iter()
        .map(|x| vec![ConstantToken::Var(x.clone())])
        .collect(),
    }
  }

  /** all registers cleared */
  pub fn clear(register_count: usize) -> Self {
    SimpleVariableUpdate {
      rows: vec![vec![]; register_count],
    }
  }

  pub fn rows(&self) -> &[Vec<ConstantToken<S>>] {
    &self.rows
  }

  pub fn row(&self, register: usize) -> &[ConstantToken<S>] {
    &self.rows[register]
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /** the right-hand side of the output register */
  pub fn output_row(&self) -> &[ConstantToken<S>] {
    &self.rows[0]
  }

  pub fn set_row(&mut self, register: usize, tokens: Vec<ConstantToken<S>>) {
    self.rows[register] = tokens;
  }

  pub fn append_to_row(&mut self, register: usize, token: ConstantToken<S>) {
    self.rows[register].push(token);
  }

  /** pad with empty rows for fresh registers */
  pub fn lift_to_n_vars(&self, register_count: usize) -> Self {
    let mut rows = self.rows.clone();
    rows.resize(register_count, vec![]);
    SimpleVariableUpdate { rows }
  }

  pub fn rename_vars(&self, rename: &HashMap<String, String>) -> Self {
    SimpleVariableUpdate {
      rows: self
        .rows
        .iter()
        .map(|row| row.iter().map(|token| token.rename(rename)).collect())
        .collect(),
    }
  }

  pub fn referenced_vars(&self) -> impl Iterator<Item = &String> {
    self.rows.iter().flatten().filter_map(|token| match token {
      ConstantToken::Var(name) => Some(name),
      ConstantToken::Symbol(_) => None,
    })
  }

  /** treat self as a substitution from the pre-state registers and apply
   * it to every right-hand side of `next`
   */
  pub fn compose_simple(
    &self,
    next: &SimpleVariableUpdate<S>,
    indices: &HashMap<String, usize>,
  ) -> SimpleVariableUpdate<S> {
    SimpleVariableUpdate {
      rows: next
        .rows
        .iter()
        .map(|row| {
          row
            .iter()
            .flat_map(|token| match token {
              ConstantToken::Var(name) => self.rows[indices[name]].clone(),
              ConstantToken::Symbol(_) => vec![token.clone()],
            })
            .collect()
        })
        .collect(),
    }
  }

  /** like compose_simple but the right-hand side may hold function tokens,
   * which are preserved; this is the epsilon-elimination composition
   */
  pub fn compose_functional<F: Clone>(
    &self,
    next: &FunctionalVariableUpdate<S, F>,
    indices: &HashMap<String, usize>,
  ) -> FunctionalVariableUpdate<S, F> {
    FunctionalVariableUpdate {
      rows: next
        .rows
        .iter()
        .map(|row| {
          row
            .iter()
            .flat_map(|token| match token {
              Token::Var(name) => self.rows[indices[name]]
                .iter()
                .cloned()
                .map(Token::from)
                .collect(),
              _ => vec![token.clone()],
            })
            .collect()
        })
        .collect(),
    }
  }

  /** the single-vector combination used at joint final states: register 0
   * becomes out_a followed by out_b on the combined register space
   */
  pub fn combine_output_updates(
    rename_a: &HashMap<String, String>,
    rename_b: &HashMap<String, String>,
    out_a: &SimpleVariableUpdate<S>,
    out_b: &SimpleVariableUpdate<S>,
    register_count: usize,
  ) -> SimpleVariableUpdate<S> {
    let mut combined = SimpleVariableUpdate::clear(register_count);
    let mut output: Vec<ConstantToken<S>> = out_a.rename_vars(rename_a).output_row().to_vec();
    output.extend(out_b.rename_vars(rename_b).output_row().iter().cloned());
    combined.set_row(0, output);
    combined
  }

  pub fn apply_to(
    &self,
    assignment: &VariableAssignment<S>,
    indices: &HashMap<String, usize>,
  ) -> VariableAssignment<S> {
    VariableAssignment {
      values: self
        .rows
        .iter()
        .map(|row| {
          row
            .iter()
            .flat_map(|token| match token {
              ConstantToken::Symbol(a) => vec![a.clone()],
              ConstantToken::Var(name) => assignment.value(indices[name]).to_vec(),
            })
            .collect()
        })
        .collect(),
    }
  }
}

/** register update additionally permitted to hold function tokens; used on
 * input moves, where the consumed symbol is available
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalVariableUpdate<S, F> {
  rows: Vec<Vec<Token<S, F>>>,
}
impl<S: Clone, F: Clone> FunctionalVariableUpdate<S, F> {
  pub fn new(rows: Vec<Vec<Token<S, F>>>) -> Self {
    FunctionalVariableUpdate { rows }
  }

  pub fn rows(&self) -> &[Vec<Token<S, F>>] {
    &self.rows
  }

  pub fn row(&self, register: usize) -> &[Token<S, F>] {
    &self.rows[register]
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn set_row(&mut self, register: usize, tokens: Vec<Token<S, F>>) {
    self.rows[register] = tokens;
  }

  pub fn append_to_row(&mut self, register: usize, token: Token<S, F>) {
    self.rows[register].push(token);
  }

  pub fn lift_to_n_vars(&self, register_count: usize) -> Self {
    let mut rows = self.rows.clone();
    rows.resize(register_count, vec![]);
    FunctionalVariableUpdate { rows }
  }

  pub fn rename_vars(&self, rename: &HashMap<String, String>) -> Self {
    FunctionalVariableUpdate {
      rows: self
        .rows
        .iter()
        .map(|row| row.iter().map(|token| token.rename(rename)).collect())
        .collect(),
    }
  }

  pub fn referenced_vars(&self) -> impl Iterator<Item = &String> {
    self.rows.iter().flatten().filter_map(|token| match token {
      Token::Var(name) => Some(name),
      _ => None,
    })
  }

  /** disjoint-union update on the concatenation of the renamed register
   * spaces of a and b
   */
  pub fn combine_updates(
    rename_a: &HashMap<String, String>,
    rename_b: &HashMap<String, String>,
    update_a: &FunctionalVariableUpdate<S, F>,
    update_b: &FunctionalVariableUpdate<S, F>,
  ) -> FunctionalVariableUpdate<S, F> {
    let mut rows = update_a.rename_vars(rename_a).rows;
    rows.extend(update_b.rename_vars(rename_b).rows);
    FunctionalVariableUpdate { rows }
  }

  /** append the renamed rows of `next` onto the accumulated update; the
   * multi-product construction folds component updates together with this
   */
  pub fn add_update(
    rename: &HashMap<String, String>,
    accumulated: &FunctionalVariableUpdate<S, F>,
    next: &FunctionalVariableUpdate<S, F>,
  ) -> FunctionalVariableUpdate<S, F> {
    let mut rows = accumulated.rows.clone();
    rows.extend(next.rename_vars(rename).rows);
    FunctionalVariableUpdate { rows }
  }

  pub fn apply_to<A>(
    &self,
    assignment: &VariableAssignment<S>,
    indices: &HashMap<String, usize>,
    symbol: &S,
    ba: &A,
  ) -> VariableAssignment<S>
  where
    A: BoolAlgSubst<Dom = S, Func = F>,
  {
    VariableAssignment::from_values(
      self
        .rows
        .iter()
        .map(|row| {
          row
            .iter()
            .flat_map(|token| match token {
              Token::Symbol(a) => vec![a.clone()],
              Token::Var(name) => assignment.value(indices[name]).to_vec(),
              Token::Func(f) => vec![ba.apply(f, symbol)],
            })
            .collect()
        })
        .collect(),
    )
  }
}
impl<S, F> From<SimpleVariableUpdate<S>> for FunctionalVariableUpdate<S, F> {
  fn from(update: SimpleVariableUpdate<S>) -> Self {
    FunctionalVariableUpdate {
      rows: update
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(Token::from).collect())
        .collect(),
    }
  }
}
