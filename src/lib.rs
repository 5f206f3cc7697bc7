/*!
 * symbolic automata and symbolic streaming string transducers over a
 * parametric effective Boolean algebra.
 *
 * transitions carry predicates instead of concrete symbols, so the
 * alphabet may be infinite; the engines only ever talk to the algebra
 * through the [`boolean_algebra::BoolAlg`] trait. transducers extend the
 * automata with simultaneously-updated string registers.
 */
pub mod boolean_algebra;
pub mod errors;
pub mod regular;
pub mod transducer;
pub mod util;

pub use errors::AutomataError;
pub use regular::symbolic_automata::Sfa;
pub use transducer::sst::Sst;
pub use util::TimeBudget;
