//! Interned semantic types.
//!
//! Types are built bottom-up and interned, so a `TypeId` never refers to a
//! type created after it. Recursion between named types goes through
//! `SymbolId`s (`Instance`, `Constructor`, ...), never through ids.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::symbols::{SymbolId, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl TypeId {
    /// Resolution was inconclusive (cycle, missing name, depth limit)
    pub const UNRESOLVED: TypeId = TypeId(0);
    pub const ANY: TypeId = TypeId(1);
    pub const NUMBER: TypeId = TypeId(2);
    pub const STRING: TypeId = TypeId(3);
    pub const BOOLEAN: TypeId = TypeId(4);
    pub const VOID: TypeId = TypeId(5);
    pub const NULL: TypeId = TypeId(6);
    pub const UNDEFINED: TypeId = TypeId(7);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_unresolved(self) -> bool {
        self == TypeId::UNRESOLVED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Any,
    Number,
    String,
    Boolean,
    Void,
    Null,
    Undefined,
}

impl Primitive {
    pub const ALL: [Primitive; 7] = [
        Primitive::Any,
        Primitive::Number,
        Primitive::String,
        Primitive::Boolean,
        Primitive::Void,
        Primitive::Null,
        Primitive::Undefined,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Any => "any",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Void => "void",
            Primitive::Null => "null",
            Primitive::Undefined => "undefined",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn type_id(self) -> TypeId {
        match self {
            Primitive::Any => TypeId::ANY,
            Primitive::Number => TypeId::NUMBER,
            Primitive::String => TypeId::STRING,
            Primitive::Boolean => TypeId::BOOLEAN,
            Primitive::Void => TypeId::VOID,
            Primitive::Null => TypeId::NULL,
            Primitive::Undefined => TypeId::UNDEFINED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnParam {
    pub name: SmolStr,
    pub ty: TypeId,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnSig {
    pub params: Vec<FnParam>,
    pub ret: TypeId,
}

impl FnSig {
    /// Type expected for the argument at `index`, following a rest parameter
    pub fn param_type(&self, index: usize) -> Option<TypeId> {
        match self.params.get(index) {
            Some(param) => Some(param.ty),
            None => self.params.last().filter(|p| p.rest).map(|p| p.ty),
        }
    }
}

/// Structure of an anonymous object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ObjectShape {
    pub members: Vec<(SmolStr, TypeId)>,
    pub call: Vec<FnSig>,
    pub construct: Vec<FnSig>,
    pub index: Option<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Unresolved,
    Primitive(Primitive),
    /// Instances of a class or interface
    Instance(SymbolId),
    /// The value of a class
    Constructor(SymbolId),
    /// Values of an enum
    Enum(SymbolId),
    /// The value of a module or enum object
    Namespace(SymbolId),
    Array(TypeId),
    Function(FnSig),
    Object(ObjectShape),
    TypeParameter(SymbolId),
}

/// Interning arena for [`Type`]s.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
    interned: FxHashMap<Type, TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            interned: FxHashMap::default(),
        };
        table.intern(Type::Unresolved);
        for primitive in Primitive::ALL {
            table.intern(Type::Primitive(primitive));
        }
        table
    }

    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.interned.get(&ty) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        self.types.get(id.index()).unwrap_or(&Type::Unresolved)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        self.intern(Type::Array(element))
    }

    pub fn function(&mut self, sig: FnSig) -> TypeId {
        self.intern(Type::Function(sig))
    }

    /// Number-like for arithmetic
    pub fn is_numeric(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Primitive(Primitive::Number) | Type::Enum(_))
    }

    /// Call signatures reachable without consulting symbols
    pub fn call_signatures(&self, id: TypeId) -> Vec<FnSig> {
        match self.get(id) {
            Type::Function(sig) => vec![sig.clone()],
            Type::Object(shape) => shape.call.clone(),
            _ => Vec::new(),
        }
    }

    /// Render a type the way it would be written in source.
    pub fn display(&self, id: TypeId, symbols: &SymbolTable) -> String {
        match self.get(id) {
            Type::Unresolved => "{unknown}".to_string(),
            Type::Primitive(p) => p.name().to_string(),
            Type::Instance(sym) | Type::Enum(sym) | Type::TypeParameter(sym) => {
                symbols.qualified_name(*sym)
            }
            Type::Constructor(sym) | Type::Namespace(sym) => {
                format!("typeof {}", symbols.qualified_name(*sym))
            }
            Type::Array(element) => {
                let inner = self.display(*element, symbols);
                if matches!(self.get(*element), Type::Function(_)) {
                    format!("({})[]", inner)
                } else {
                    format!("{}[]", inner)
                }
            }
            Type::Function(sig) => self.display_sig(sig, " =>", symbols),
            Type::Object(shape) => {
                let mut parts = Vec::new();
                for sig in &shape.call {
                    parts.push(self.display_sig(sig, ":", symbols));
                }
                for sig in &shape.construct {
                    parts.push(format!("new {}", self.display_sig(sig, ":", symbols)));
                }
                if let Some(index) = shape.index {
                    parts.push(format!("[index: any]: {}", self.display(index, symbols)));
                }
                for (name, ty) in &shape.members {
                    parts.push(format!("{}: {}", name, self.display(*ty, symbols)));
                }
                if parts.is_empty() {
                    "{}".to_string()
                } else {
                    format!("{{ {}; }}", parts.join("; "))
                }
            }
        }
    }

    fn display_sig(&self, sig: &FnSig, arrow: &str, symbols: &SymbolTable) -> String {
        let params: Vec<String> = sig
            .params
            .iter()
            .map(|p| {
                format!(
                    "{}{}{}: {}",
                    if p.rest { "..." } else { "" },
                    p.name,
                    if p.optional { "?" } else { "" },
                    self.display(p.ty, symbols)
                )
            })
            .collect();
        format!("({}){} {}", params.join(", "), arrow, self.display(sig.ret, symbols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_preinterned() {
        let mut table = TypeTable::new();
        assert_eq!(table.intern(Type::Primitive(Primitive::String)), TypeId::STRING);
        assert_eq!(table.intern(Type::Unresolved), TypeId::UNRESOLVED);
        assert_eq!(Primitive::from_name("void").map(Primitive::type_id), Some(TypeId::VOID));
    }

    #[test]
    fn test_interning_dedups_structure() {
        let mut table = TypeTable::new();
        let a = table.array_of(TypeId::NUMBER);
        let b = table.array_of(TypeId::NUMBER);
        assert_eq!(a, b);
        assert_ne!(a, table.array_of(TypeId::STRING));
    }

    #[test]
    fn test_display() {
        let mut table = TypeTable::new();
        let symbols = SymbolTable::new();
        let f = table.function(FnSig {
            params: vec![
                FnParam {
                    name: "a".into(),
                    ty: TypeId::NUMBER,
                    optional: false,
                    rest: false,
                },
                FnParam {
                    name: "b".into(),
                    ty: TypeId::STRING,
                    optional: true,
                    rest: false,
                },
            ],
            ret: TypeId::VOID,
        });
        assert_eq!(table.display(f, &symbols), "(a: number, b?: string) => void");
        let arr = table.array_of(f);
        assert_eq!(table.display(arr, &symbols), "((a: number, b?: string) => void)[]");
    }
}
