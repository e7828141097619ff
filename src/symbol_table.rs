/**
 * The static scope stack used by the checker. Each scope is named after the
 * construct that opened it (`for`, `while`, `if`, `else`, `block`, `global`);
 * `Controlflow` validation looks at the nearest loop-named scope by walking
 * this stack from the top.
 */

use std::collections::HashMap;

use crate::ast::Type;

/** A tensor dimension as known (or not) to the checker. */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dim {
    Known(i64),
    Unknown,
}

/**
 * What a static descriptor carries beyond the base `Type`: either the literal
 * integer value of a scalar expression (when statically known, used to thread
 * `zeros`/`ones`/`eye` arguments into the shape of their result) or a tensor shape.
 */
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeOrValue {
    Scalar(Option<i64>),
    Tensor(Vec<Dim>),
}

impl ShapeOrValue {
    pub fn is_tensor(&self) -> bool {
        matches!(self, ShapeOrValue::Tensor(_))
    }

    pub fn rank(&self) -> usize {
        match self {
            ShapeOrValue::Scalar(_) => 0,
            ShapeOrValue::Tensor(dims) => dims.len(),
        }
    }
}

/** The full static descriptor of an expression: its type plus shape/value info. */
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    pub ty: Type,
    pub shape: ShapeOrValue,
}

impl Descriptor {
    pub fn scalar(ty: Type) -> Descriptor {
        Descriptor {
            ty,
            shape: ShapeOrValue::Scalar(None),
        }
    }

    pub fn scalar_value(ty: Type, value: i64) -> Descriptor {
        Descriptor {
            ty,
            shape: ShapeOrValue::Scalar(Some(value)),
        }
    }

    pub fn tensor(ty: Type, dims: Vec<Dim>) -> Descriptor {
        Descriptor {
            ty,
            shape: ShapeOrValue::Tensor(dims),
        }
    }

    pub fn unknown() -> Descriptor {
        Descriptor::scalar(Type::Unknown)
    }
}

/** A single lexical scope: a name (for loop-scope / diagnostic purposes) and its bindings. */
#[derive(Clone, Debug)]
pub struct Scope {
    pub name: String,
    bindings: HashMap<String, Descriptor>,
}

impl Scope {
    fn new(name: impl Into<String>) -> Scope {
        Scope {
            name: name.into(),
            bindings: HashMap::new(),
        }
    }
}

/** The stack of active static scopes, innermost last. */
#[derive(Clone, Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            scopes: vec![Scope::new("global")],
        }
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.scopes.push(Scope::new(name));
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /** Looks up `name` from the innermost scope outward. */
    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        for scope in self.scopes.iter().rev() {
            if let Some(descriptor) = scope.bindings.get(name) {
                return Some(descriptor);
            }
        }
        None
    }

    /** Binds `name` in the innermost scope, overwriting any existing binding there. */
    pub fn put(&mut self, name: impl Into<String>, descriptor: Descriptor) {
        self.scopes
            .last_mut()
            .expect("symbol table always has a global scope")
            .bindings
            .insert(name.into(), descriptor);
    }

    /**
     * Whether any scope on the stack, from the top down, is named `loop`/`for`/`while`,
     * used to reject `break`/`continue` outside of a loop.
     */
    pub fn innermost_loop(&self) -> Option<&str> {
        for scope in self.scopes.iter().rev() {
            match scope.name.as_str() {
                "for" | "while" => return Some(scope.name.as_str()),
                _ => {}
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for SymbolTable {
    fn default() -> SymbolTable {
        SymbolTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_finds_binding_in_enclosing_scope() {
        let mut table = SymbolTable::new();
        table.put("x", Descriptor::scalar_value(Type::Int, 3));
        table.push("block");
        assert_eq!(table.get("x").unwrap().ty, Type::Int);
        table.pop();
        assert_eq!(table.depth(), 1);
    }

    #[test]
    fn put_in_nested_scope_shadows_but_does_not_touch_parent() {
        let mut table = SymbolTable::new();
        table.put("x", Descriptor::scalar(Type::Int));
        table.push("if");
        table.put("x", Descriptor::scalar(Type::Float));
        assert_eq!(table.get("x").unwrap().ty, Type::Float);
        table.pop();
        assert_eq!(table.get("x").unwrap().ty, Type::Int);
    }

    #[test]
    fn innermost_loop_skips_non_loop_scopes() {
        let mut table = SymbolTable::new();
        table.push("for");
        table.push("if");
        assert_eq!(table.innermost_loop(), Some("for"));
    }

    #[test]
    fn innermost_loop_is_none_at_top_level() {
        let table = SymbolTable::new();
        assert_eq!(table.innermost_loop(), None);
    }
}
