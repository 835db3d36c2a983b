//! Constraint-driven synthesis engine.
//!
//! This module is the *public entry point* for rule evaluation. The engine is
//! split into focused submodules under `src/engine/` while keeping public
//! paths stable (for example `crate::engine::SynthesisContext`).
//!
//! ## How the parts work together
//!
//! At a high level, synthesizing output for a tree node is a pipeline:
//!
//! ```text
//! rule tables ──┐
//!               │  RuleTrie::add_rule              (trie.rs)
//!               └───────────────┬──────────────
//!                               │
//! preference ── update_constraint ─ degrade axes, build value sets
//!               (synthesis.rs)  │
//!                               v
//!                SynthesisContext::evaluate (synthesis.rs)
//!                  - lookup + rank applicable rules
//!                  - execute action components in order
//!                  - recurse via [n]/[m], emit via [t]/[p]
//!                  - context/separator functions (functions.rs)
//!                  - grammar push/pop around each component
//!                               │
//!                               v
//!                  process_annotations (fixup.rs)
//!                    - punctuation indicator insertion
//!                               │
//!                               v
//!                        Vec<Fragment>
//! ```
//!
//! The engine leans on **single-rule selection**: for each visited node
//! exactly one best rule fires, chosen by constraint closeness, then static
//! priority, then constraint count, then declaration rank. Recursion happens
//! only where the winning rule's components ask for it, so evaluation is
//! deterministic and terminates on any finite tree.
//!
//! ## Responsibilities by module
//!
//! - `synthesis.rs`: owns [`SynthesisContext`] — constraint updating, rule
//!   ranking, component execution and personality accumulation.
//! - `functions.rs`: the closed set of context/separator functions available
//!   to `[m]` components (node counter, pause separator, content iterator).
//! - `fixup.rs`: annotation-driven post-processing over the finished
//!   fragment list.
//!
//! ## Adding new rules
//!
//! Rule tables live under `src/rules/**` and are loaded into a context via
//! [`crate::rules::RuleSet`]. A new context/separator function means a new
//! variant in `functions.rs` and a name match in its constructor.

#[path = "engine/fixup.rs"]
mod fixup;
#[path = "engine/functions.rs"]
mod functions;
#[path = "engine/synthesis.rs"]
mod synthesis;

pub use fixup::process_annotations;
pub use synthesis::{Evaluator, SynthesisContext};

pub(crate) use fixup::BLANK_CELL;
