use crate::primitives;
use crate::source::Span;
use crate::value::{PrimitiveFunc, Procedure, Value};
use log::debug;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Unbound variable: '{0}'")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
}

// --- Environment Definition ---

/// The single flat table of bindings for a session. There are no nested
/// frames: every lookup and every `define` goes to this one map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
        }
    }

    /// Creates the standard session environment: the numeric library first,
    /// then the built-in procedures (which win on a name clash).
    pub fn new_global_populated() -> Self {
        let mut env = Environment::new();
        crate::math::install(&mut env);

        // Arithmetic
        env.add_primitive("+", primitives::prim_add);
        env.add_primitive("-", primitives::prim_sub);
        env.add_primitive("*", primitives::prim_mul);
        env.add_primitive("/", primitives::prim_div);

        // Comparison. Greater-than lives under `v`; `>` stays unbound.
        env.add_primitive("v", primitives::prim_greater_than);
        env.add_primitive("<", primitives::prim_less_than);
        env.add_primitive(">=", primitives::prim_greater_than_or_equals);
        env.add_primitive("<=", primitives::prim_less_than_or_equals);
        env.add_primitive("=", primitives::prim_equals);

        // List primitives
        env.add_alias("append", "+");
        env.add_primitive("car", primitives::prim_car);
        env.add_primitive("cdr", primitives::prim_cdr);
        env.add_primitive("cons", primitives::prim_cons);
        env.add_primitive("length", primitives::prim_length);
        env.add_primitive("list", primitives::prim_list);

        // Type predicates
        env.add_primitive("eq?", primitives::prim_is_eq);
        env.add_primitive("equal?", primitives::prim_is_equal);
        env.add_primitive("list?", primitives::prim_is_list);
        env.add_primitive("null?", primitives::prim_is_null);
        env.add_primitive("number?", primitives::prim_is_number);
        env.add_primitive("procedure?", primitives::prim_is_procedure);
        env.add_primitive("symbol?", primitives::prim_is_symbol);

        // Utilities
        env.add_primitive("abs", primitives::prim_abs);
        env.add_primitive("apply", primitives::prim_apply);
        env.add_primitive("begin", primitives::prim_begin);
        env.add_primitive("expt", primitives::prim_expt);
        env.add_primitive("map", primitives::prim_map);
        env.add_primitive("max", primitives::prim_max);
        env.add_primitive("min", primitives::prim_min);
        env.add_primitive("not", primitives::prim_not);
        env.add_primitive("print", primitives::prim_print);
        env.add_primitive("round", primitives::prim_round);

        debug!("global environment seeded with {} bindings", env.len());
        env
    }

    /// Binds `name`, replacing any previous value.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Looks up a variable's value.
    /// `lookup_span` is the location where the variable was referenced, used for error reporting.
    pub fn get(&self, name: &str, lookup_span: Span) -> Result<Value, EnvError> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| EnvError::UnboundVariable(name.to_string(), lookup_span))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Helper to add a primitive procedure to the environment.
    pub(crate) fn add_primitive(&mut self, name: &str, func: PrimitiveFunc) {
        let procedure = Procedure::Primitive(func, name.to_string());
        self.define(name.to_string(), Value::Procedure(procedure));
    }

    /// Binds `alias` to the very procedure bound to `name`, so the two are
    /// `eq?` and render alike.
    pub(crate) fn add_alias(&mut self, alias: &str, name: &str) {
        if let Some(value) = self.bindings.get(name).cloned() {
            self.define(alias.to_string(), value);
        }
    }

    /// Gets a list of all identifiers in the environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        self.bindings.keys().cloned().collect()
    }
}
