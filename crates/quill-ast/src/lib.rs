//! AST node definitions and source ranges for the Quill schema language.
//!
//! This crate defines the syntax tree produced by the parser and consumed by
//! the semantic checker. Every node carries a [`Range`] for source location
//! tracking. The `Display` impls render a node back to source-like text and
//! are what diagnostic messages embed.

use std::fmt;

/// A half-open byte offset range `[start, end)` within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a range that covers both `self` and `other`.
    pub fn merge(self, other: Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// A lowercase-leading name token, e.g. a field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub range: Range,
}

/// An uppercase-leading name token naming a type definition, either at its
/// definition site or at a reference site.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub name: String,
    pub range: Range,
}

// ---------------------------------------------------------------------------
// Document and definitions
// ---------------------------------------------------------------------------

/// The root of a parsed schema: an ordered sequence of definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub definitions: Vec<Definition>,
    pub range: Range,
}

/// A top-level definition.
///
/// Currently the language only has object type definitions, but references
/// are checked through this enum so that "not an object type" stays a
/// reachable diagnostic once more definition kinds exist.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    ObjectType(ObjectTypeDefinition),
}

impl Definition {
    pub fn name(&self) -> &TypeName {
        match self {
            Definition::ObjectType(def) => &def.name,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Definition::ObjectType(def) => def.range,
        }
    }

    pub fn as_object_type(&self) -> Option<&ObjectTypeDefinition> {
        match self {
            Definition::ObjectType(def) => Some(def),
        }
    }
}

/// `type Name { fields… }`
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTypeDefinition {
    pub name: TypeName,
    pub fields: Vec<FieldDef>,
    pub range: Range,
}

/// A single field declaration: `name: Type` or `name?: Type`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: Identifier,
    pub ty: Type,
    pub optional: bool,
    pub range: Range,
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

/// A type expression paired with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub kind: TypeKind,
    pub range: Range,
}

impl Type {
    pub fn new(kind: TypeKind, range: Range) -> Self {
        Self { kind, range }
    }

    /// Whether this expression is a Live construct: `LiveList<…>`,
    /// `LiveMap<…>`, or a `LiveObject<…>`-wrapped reference.
    pub fn is_live_structure(&self) -> bool {
        match &self.kind {
            TypeKind::LiveList(_) | TypeKind::LiveMap { .. } => true,
            TypeKind::Ref(r) => r.as_live_object,
            _ => false,
        }
    }
}

/// The closed set of type expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// The `string` scalar.
    String,
    /// The `number` scalar.
    Number,
    /// The `boolean` scalar.
    Boolean,
    /// The `null` scalar.
    Null,
    /// A literal value used as a type, e.g. `"ready"` or `42`.
    Literal(LiteralValue),
    /// `T[]`
    Array(Box<Type>),
    /// An inline `{ field: T, … }` shape.
    ObjectLiteral(Vec<FieldDef>),
    /// A reference to a named definition, optionally wrapped as
    /// `LiveObject<Name>`.
    Ref(TypeRef),
    /// `LiveList<T>`
    LiveList(Box<Type>),
    /// `LiveMap<K, V>`
    LiveMap { key: Box<Type>, value: Box<Type> },
    /// `A | B | …`. Members are never unions themselves; the parser
    /// flattens nested unions.
    Union(Vec<Type>),
}

impl TypeKind {
    /// Whether this is one of the four built-in scalars.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeKind::String | TypeKind::Number | TypeKind::Boolean | TypeKind::Null
        )
    }
}

/// A name reference to a definition, e.g. `Foo` or `LiveObject<Foo>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: TypeName,
    /// True when the reference was written wrapped as `LiveObject<…>`.
    pub as_live_object: bool,
}

/// The value of a literal type.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl LiteralValue {
    pub fn is_string(&self) -> bool {
        matches!(self, LiteralValue::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, LiteralValue::Number(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, LiteralValue::Boolean(_))
    }
}

// ---------------------------------------------------------------------------
// Pretty-printing
// ---------------------------------------------------------------------------

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        _ => write!(f, "{ch}")?,
                    }
                }
                write!(f, "\"")
            }
            LiteralValue::Number(n) => {
                // Integer rendering only when the cast round-trips; whole
                // floats outside i64 range would otherwise saturate and
                // distinct literals would render identically.
                if n.fract() == 0.0 && *n as i64 as f64 == *n {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            LiteralValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::String => write!(f, "string"),
            TypeKind::Number => write!(f, "number"),
            TypeKind::Boolean => write!(f, "boolean"),
            TypeKind::Null => write!(f, "null"),
            TypeKind::Literal(value) => write!(f, "{value}"),
            TypeKind::Array(of) => {
                // Unions need parentheses to read back unambiguously.
                if matches!(of.kind, TypeKind::Union(_)) {
                    write!(f, "({of})[]")
                } else {
                    write!(f, "{of}[]")
                }
            }
            TypeKind::ObjectLiteral(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")
            }
            TypeKind::Ref(r) => {
                if r.as_live_object {
                    write!(f, "LiveObject<{}>", r.name.name)
                } else {
                    write!(f, "{}", r.name.name)
                }
            }
            TypeKind::LiveList(of) => write!(f, "LiveList<{of}>"),
            TypeKind::LiveMap { key, value } => write!(f, "LiveMap<{key}, {value}>"),
            TypeKind::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "{}?: {}", self.name.name, self.ty)
        } else {
            write!(f, "{}: {}", self.name.name, self.ty)
        }
    }
}
