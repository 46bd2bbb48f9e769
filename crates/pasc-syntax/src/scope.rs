use std::collections::HashMap;

use miette::SourceSpan;

use crate::codegen::{Slot, Value};
use crate::error::CompilerError;
use crate::types::CType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Const,
    Variable,
    ProgType,
    Procedure,
    Function,
}

/// Where the value behind an identifier lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    None,
    Slot(Slot),
    Const(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierInfo {
    pub purpose: Purpose,
    pub ty: CType,
    pub storage: Storage,
}

impl IdentifierInfo {
    pub fn variable(ty: CType, slot: Slot) -> Self {
        IdentifierInfo {
            purpose: Purpose::Variable,
            ty,
            storage: Storage::Slot(slot),
        }
    }

    pub fn constant(value: Value) -> Self {
        IdentifierInfo {
            purpose: Purpose::Const,
            ty: value.ty(),
            storage: Storage::Const(value),
        }
    }

    pub fn type_name(ty: CType) -> Self {
        IdentifierInfo {
            purpose: Purpose::ProgType,
            ty,
            storage: Storage::None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scope {
    identifiers: HashMap<String, IdentifierInfo>,
    types: Vec<CType>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.identifiers.contains_key(&key(name))
    }

    pub fn find(&self, name: &str) -> Option<&IdentifierInfo> {
        self.identifiers.get(&key(name))
    }
}

/// Identifiers are case-insensitive.
fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Stack of scopes. The bottom one holds the built-in names and is never
/// popped.
#[derive(Debug)]
pub struct ScopeManager {
    scopes: Vec<Scope>,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    /// Built-in scope plus one empty program scope.
    pub fn new() -> Self {
        let mut builtins = Scope::new();
        for ty in CType::ALL {
            builtins.types.push(ty);
            builtins
                .identifiers
                .insert(ty.name().to_owned(), IdentifierInfo::type_name(ty));
        }
        for (name, value) in [("true", true), ("false", false)] {
            builtins
                .identifiers
                .insert(name.to_owned(), IdentifierInfo::constant(Value::Boolean(value)));
        }

        let mut manager = ScopeManager {
            scopes: vec![builtins],
        };
        manager.push_scope();
        manager
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        tracing::debug!(depth = self.scopes.len() + 1, "enter scope");
        self.scopes.push(Scope::new());
    }

    /// Leaves the innermost scope, returning it. The built-in scope stays.
    pub fn pop_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() <= 1 {
            return None;
        }
        tracing::debug!(depth = self.scopes.len(), "leave scope");
        self.scopes.pop()
    }

    fn current(&mut self) -> &mut Scope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    /// Declares `name` in the innermost scope. The name must not exist in
    /// any scope on the stack.
    pub fn declare(
        &mut self,
        name: &str,
        info: IdentifierInfo,
        span: impl Into<SourceSpan>,
    ) -> Result<(), CompilerError> {
        if self.is_declared(name) {
            return Err(CompilerError::DuplicateIdentifier {
                name: name.to_owned(),
                span: span.into(),
            });
        }
        tracing::debug!(name, ty = %info.ty, purpose = ?info.purpose, "declare");
        self.current().identifiers.insert(key(name), info);
        Ok(())
    }

    /// Innermost declaration of `name`.
    pub fn lookup(
        &self,
        name: &str,
        span: impl Into<SourceSpan>,
    ) -> Result<&IdentifierInfo, CompilerError> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.find(name))
            .ok_or_else(|| CompilerError::UndefinedIdentifier {
                name: name.to_owned(),
                span: span.into(),
            })
    }

    /// Whether `ty` has been registered in any scope on the stack.
    pub fn is_registered_type(&self, ty: CType) -> bool {
        self.scopes.iter().any(|scope| scope.types.contains(&ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn builtins_always_resolve() {
        let scopes = ScopeManager::new();
        for name in ["integer", "real", "string", "boolean"] {
            let info = scopes.lookup(name, 0usize).unwrap();
            assert_eq!(info.purpose, Purpose::ProgType);
        }
        let info = scopes.lookup("TRUE", 0usize).unwrap();
        assert_eq!(info.purpose, Purpose::Const);
        assert_eq!(info.storage, Storage::Const(Value::Boolean(true)));
        assert_eq!(
            scopes.lookup("false", 0usize).unwrap().storage,
            Storage::Const(Value::Boolean(false))
        );
        assert!(CType::ALL.iter().all(|&ty| scopes.is_registered_type(ty)));
        assert_eq!(scopes.depth(), 2usize);
    }

    #[test]
    fn duplicates_are_checked_across_all_scopes() {
        let mut scopes = ScopeManager::new();
        scopes
            .declare("x", IdentifierInfo::variable(CType::Integer, Slot(0)), 4usize)
            .unwrap();
        let err = scopes
            .declare("X", IdentifierInfo::variable(CType::Real, Slot(1)), 9usize)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateIdentifier);
        assert_eq!(err.position(), 9usize);

        scopes.push_scope();
        let err = scopes
            .declare("x", IdentifierInfo::variable(CType::Real, Slot(1)), 12usize)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateIdentifier);

        let err = scopes
            .declare("integer", IdentifierInfo::variable(CType::Real, Slot(1)), 20usize)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateIdentifier);
    }

    #[test]
    fn lookup_walks_innermost_first() {
        let mut scopes = ScopeManager::new();
        scopes
            .declare("count", IdentifierInfo::variable(CType::Integer, Slot(3)), 0usize)
            .unwrap();
        scopes.push_scope();
        let info = scopes.lookup("Count", 0usize).unwrap();
        assert_eq!(info.storage, Storage::Slot(Slot(3)));

        let err = scopes.lookup("missing", 7usize).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UndefinedIdentifier);
        assert_eq!(err.position(), 7usize);
    }

    #[test]
    fn builtin_scope_is_never_popped() {
        let mut scopes = ScopeManager::new();
        assert!(scopes.pop_scope().is_some());
        assert!(scopes.pop_scope().is_none());
        assert!(scopes.lookup("integer", 0usize).is_ok());
    }
}
