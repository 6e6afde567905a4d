//! Type tags: coarse classification used to test union-member
//! disjointness.
//!
//! At runtime a decoder must be able to look at an incoming value in
//! isolation and know, purely from its shape, which member of a union it
//! belongs to. Two members with the same tag make that impossible:
//!
//! - `number[] | string[]` — which type is the value `[]`?
//! - `LiveList<number> | LiveList<string>` — which is an empty live list?
//! - `Person | { name: string }` — which is `{ name: "Alex" }`?
//!
//! Unions like `number | null`, `string | string[]`, or
//! `LiveList<string> | null` are fine.

use quill_ast::{Type, TypeKind};

/// The closed tag set. Object literals and static object type references
/// share [`Tag::Obj`]; object shapes cannot be told apart by tag alone.
/// Literal tags carry their rendered value, so two occurrences of `5`
/// collide while `5` and `6` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Str,
    Num,
    Bool,
    Arr,
    Obj,
    LiveMap,
    LiveList,
    LiveObj,
    Null,
    Lit(String),
}

/// Classify a non-union type expression.
///
/// Total over the concrete variants; a nested union is a parser invariant
/// violation, never a user-facing error.
pub fn type_tag(node: &Type) -> Tag {
    match &node.kind {
        TypeKind::Array(_) => Tag::Arr,
        TypeKind::ObjectLiteral(_) => Tag::Obj,
        TypeKind::LiveMap { .. } => Tag::LiveMap,
        TypeKind::LiveList(_) => Tag::LiveList,
        TypeKind::String => Tag::Str,
        TypeKind::Number => Tag::Num,
        TypeKind::Boolean => Tag::Bool,
        TypeKind::Null => Tag::Null,
        TypeKind::Literal(value) => Tag::Lit(value.to_string()),
        TypeKind::Ref(r) => {
            if r.as_live_object {
                Tag::LiveObj
            } else {
                Tag::Obj
            }
        }
        TypeKind::Union(_) => unreachable!("unions cannot be nested inside unions"),
    }
}
