//! A resolved graph of WIT packages, interfaces, worlds and types.
//!
//! The entry point of this crate is [`Resolve`], which is typically created by
//! decoding the JSON form of a set of WIT packages (as printed by
//! `wasm-tools component wit --json`) with [`Resolve::from_json_str`]. Once
//! decoded the graph can be queried for Canonical ABI layout information via
//! [`SizeAlign`] and [`Resolve::push_flat`], queried for dependencies with
//! [`Resolve::depends_on`], and pruned down to a single world or interface
//! with [`Resolve::prune_to`].

use id_arena::Id;
use indexmap::IndexMap;
use semver::Version;
use std::borrow::Cow;

pub mod abi;
mod depends;
pub use depends::Node;
mod ident;
pub use ident::{Ident, ParseIdentError};
mod live;
pub use live::LiveTypes;
mod resolve;
pub use resolve::{Cloner, Package, PackageId, Remap, Resolve};
mod sizealign;
pub use sizealign::*;

#[cfg(feature = "serde")]
mod decoding;
#[cfg(feature = "serde")]
pub use decoding::decode_json;
#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};
#[cfg(feature = "serde")]
mod serde_;
#[cfg(feature = "serde")]
use serde_::*;

pub use indexmap;

pub type WorldId = Id<World>;
pub type InterfaceId = Id<Interface>;
pub type TypeId = Id<TypeDef>;

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct World {
    /// The WIT identifier name of this world.
    pub name: String,

    /// All imported items into this world, both interfaces and functions.
    pub imports: IndexMap<WorldKey, WorldItem>,

    /// All exported items from this world, both interfaces and functions.
    pub exports: IndexMap<WorldKey, WorldItem>,

    /// The package that owns this world.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_optional_id"))]
    pub package: Option<PackageId>,

    /// Documentation associated with this world declaration.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,

    /// Stability annotation for this world itself.
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Stability::is_unknown")
    )]
    pub stability: Stability,
}

impl World {
    /// Iterates over all imports followed by all exports of this world.
    pub fn all_items(&self) -> impl Iterator<Item = (&WorldKey, &WorldItem)> + '_ {
        self.imports.iter().chain(self.exports.iter())
    }

    /// Iterates over every interface imported or exported by this world.
    pub fn all_interfaces(&self) -> impl Iterator<Item = InterfaceId> + '_ {
        self.all_items().filter_map(|(_, item)| match item {
            WorldItem::Interface { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// Iterates over every function directly imported or exported by this
    /// world.
    pub fn all_functions(&self) -> impl Iterator<Item = &Function> + '_ {
        self.all_items().filter_map(|(_, item)| match item {
            WorldItem::Function(f) => Some(f),
            _ => None,
        })
    }

    /// Iterates over every type imported or exported by this world.
    pub fn all_type_defs(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.all_items().filter_map(|(_, item)| match item {
            WorldItem::Type(t) => Some(*t),
            _ => None,
        })
    }
}

/// The key to the import/export maps of a world. Either a kebab-name or a
/// unique interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(into = "String"))]
pub enum WorldKey {
    /// A kebab-name.
    Name(String),
    /// An interface which is assigned no kebab-name.
    Interface(InterfaceId),
}

impl From<WorldKey> for String {
    fn from(key: WorldKey) -> String {
        match key {
            WorldKey::Name(name) => name,
            WorldKey::Interface(id) => format!("interface-{}", id.index()),
        }
    }
}

impl WorldKey {
    /// Asserts that this is `WorldKey::Name` and returns the name.
    #[track_caller]
    pub fn unwrap_name(self) -> String {
        match self {
            WorldKey::Name(name) => name,
            WorldKey::Interface(_) => panic!("expected a name, found interface"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WorldItem {
    /// An interface is being imported or exported from a world, indicating that
    /// it's a namespace of functions.
    Interface {
        #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
        id: InterfaceId,
        #[cfg_attr(
            feature = "serde",
            serde(skip_serializing_if = "Stability::is_unknown")
        )]
        stability: Stability,
    },

    /// A function is being directly imported or exported from this world.
    Function(Function),

    /// A type is being exported from this world.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Type(TypeId),
}

impl WorldItem {
    pub fn stability<'a>(&'a self, resolve: &'a Resolve) -> &'a Stability {
        match self {
            WorldItem::Interface { stability, .. } => stability,
            WorldItem::Function(f) => &f.stability,
            WorldItem::Type(id) => &resolve.types[*id].stability,
        }
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Interface {
    /// Optionally listed name of this interface.
    ///
    /// This is `None` for inline interfaces in worlds.
    pub name: Option<String>,

    /// Exported types from this interface.
    ///
    /// Export names are listed within the types themselves. Note that the
    /// export name here matches the name listed in the `TypeDef`.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id_map"))]
    pub types: IndexMap<String, TypeId>,

    /// Exported functions from this interface.
    pub functions: IndexMap<String, Function>,

    /// Documentation associated with this interface.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,

    /// Stability attribute for this interface.
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Stability::is_unknown")
    )]
    pub stability: Stability,

    /// The package that owns this interface.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_optional_id"))]
    pub package: Option<PackageId>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TypeDef {
    pub name: Option<String>,
    pub kind: TypeDefKind,
    pub owner: TypeOwner,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,
    /// Stability attribute for this type.
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Stability::is_unknown")
    )]
    pub stability: Stability,
}

impl TypeDef {
    /// An anonymous, unowned type definition of `kind`.
    pub fn anonymous(kind: TypeDefKind) -> TypeDef {
        TypeDef {
            name: None,
            kind,
            owner: TypeOwner::None,
            docs: Docs::default(),
            stability: Stability::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TypeDefKind {
    Record(Record),
    Resource,
    Handle(Handle),
    Flags(Flags),
    Tuple(Tuple),
    Variant(Variant),
    Enum(Enum),
    Option(Type),
    Result(Result_),
    List(Type),
    Future(Option<Type>),
    Stream(Option<Type>),
    ErrorContext,
    /// A raw pointer to `T` in linear memory.
    ///
    /// This never appears in WIT itself and exists only so that ABI
    /// computations can describe lowered values.
    Pointer(Type),
    /// Either a primitive type or an alias of another type definition.
    Type(Type),

    /// Placeholder for a type definition which hasn't been filled in yet.
    ///
    /// This is only present while a `Resolve` is being decoded or cloned;
    /// a finished `Resolve` never contains it.
    Unknown,
}

impl TypeDefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeDefKind::Record(_) => "record",
            TypeDefKind::Resource => "resource",
            TypeDefKind::Handle(handle) => match handle {
                Handle::Own(_) => "own",
                Handle::Borrow(_) => "borrow",
            },
            TypeDefKind::Flags(_) => "flags",
            TypeDefKind::Tuple(_) => "tuple",
            TypeDefKind::Variant(_) => "variant",
            TypeDefKind::Enum(_) => "enum",
            TypeDefKind::Option(_) => "option",
            TypeDefKind::Result(_) => "result",
            TypeDefKind::List(_) => "list",
            TypeDefKind::Future(_) => "future",
            TypeDefKind::Stream(_) => "stream",
            TypeDefKind::ErrorContext => "error-context",
            TypeDefKind::Pointer(_) => "pointer",
            TypeDefKind::Type(_) => "type",
            TypeDefKind::Unknown => "unknown",
        }
    }

    /// Reduces `tuple`, `enum`, `option` and `result` to the `record` or
    /// `variant` they are equivalent to in the Canonical ABI.
    ///
    /// All other kinds are returned unchanged.
    pub fn despecialize(&self) -> Cow<'_, TypeDefKind> {
        match self {
            TypeDefKind::Tuple(t) => Cow::Owned(TypeDefKind::Record(Record {
                fields: t
                    .types
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| Field {
                        name: i.to_string(),
                        ty: *ty,
                        docs: Docs::default(),
                    })
                    .collect(),
            })),
            TypeDefKind::Enum(e) => Cow::Owned(TypeDefKind::Variant(Variant {
                cases: e
                    .cases
                    .iter()
                    .map(|c| Case {
                        name: c.name.clone(),
                        ty: None,
                        docs: c.docs.clone(),
                    })
                    .collect(),
            })),
            TypeDefKind::Option(t) => Cow::Owned(TypeDefKind::Variant(Variant {
                cases: vec![Case::new("none", None), Case::new("some", Some(*t))],
            })),
            TypeDefKind::Result(r) => Cow::Owned(TypeDefKind::Variant(Variant {
                cases: vec![Case::new("ok", r.ok), Case::new("error", r.err)],
            })),
            _ => Cow::Borrowed(self),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TypeOwner {
    /// This type was defined within a `world` block.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    World(WorldId),
    /// This type was defined within an `interface` block.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Interface(InterfaceId),
    /// This type wasn't inherently defined anywhere, such as a `list<T>`, which
    /// doesn't need an owner.
    #[cfg_attr(feature = "serde", serde(untagged, serialize_with = "serialize_none"))]
    None,
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Handle {
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Own(TypeId),
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Borrow(TypeId),
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Type {
    Bool,
    U8,
    U16,
    U32,
    U64,
    S8,
    S16,
    S32,
    S64,
    F32,
    F64,
    Char,
    String,
    ErrorContext,
    Id(TypeId),
}

impl Type {
    /// Parses the name of a primitive type, returning `None` for anything
    /// else.
    ///
    /// Both the current `f32`/`f64` spellings and the older
    /// `float32`/`float64` spellings are accepted.
    pub fn from_primitive_name(name: &str) -> Option<Type> {
        Some(match name {
            "bool" => Type::Bool,
            "u8" => Type::U8,
            "u16" => Type::U16,
            "u32" => Type::U32,
            "u64" => Type::U64,
            "s8" => Type::S8,
            "s16" => Type::S16,
            "s32" => Type::S32,
            "s64" => Type::S64,
            "f32" | "float32" => Type::F32,
            "f64" | "float64" => Type::F64,
            "char" => Type::Char,
            "string" => Type::String,
            "error-context" => Type::ErrorContext,
            _ => return None,
        })
    }

    /// The canonical name of this type if it's a primitive.
    pub fn primitive_name(&self) -> Option<&'static str> {
        Some(match self {
            Type::Bool => "bool",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::S8 => "s8",
            Type::S16 => "s16",
            Type::S32 => "s32",
            Type::S64 => "s64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Char => "char",
            Type::String => "string",
            Type::ErrorContext => "error-context",
            Type::Id(_) => return None,
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Int {
    U8,
    U16,
    U32,
    U64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Record {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Field {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: Type,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Flags {
    pub flags: Vec<Flag>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Flag {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlagsRepr {
    U8,
    U16,
    U32(usize),
}

impl Flags {
    pub fn repr(&self) -> FlagsRepr {
        match self.flags.len() {
            n if n <= 8 => FlagsRepr::U8,
            n if n <= 16 => FlagsRepr::U16,
            n => FlagsRepr::U32(sizealign::align_to(n, 32) / 32),
        }
    }

    /// Number of `i32` values these flags flatten to.
    pub fn flat_count(&self) -> usize {
        sizealign::align_to(self.flags.len(), 32) / 32
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Tuple {
    pub types: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Variant {
    pub cases: Vec<Case>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Case {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: Option<Type>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,
}

impl Case {
    fn new(name: &str, ty: Option<Type>) -> Case {
        Case {
            name: name.to_string(),
            ty,
            docs: Docs::default(),
        }
    }
}

impl Variant {
    pub fn tag(&self) -> Int {
        discriminant_type(self.cases.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Enum {
    pub cases: Vec<EnumCase>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EnumCase {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,
}

impl Enum {
    pub fn tag(&self) -> Int {
        discriminant_type(self.cases.len())
    }
}

/// This corresponds to the `discriminant_type` function in the Canonical ABI.
fn discriminant_type(num_cases: usize) -> Int {
    match num_cases.checked_sub(1) {
        None => Int::U8,
        Some(n) if n <= u8::MAX as usize => Int::U8,
        Some(n) if n <= u16::MAX as usize => Int::U16,
        Some(n) if n <= u32::MAX as usize => Int::U32,
        _ => panic!("too many cases to fit in a repr"),
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Result_ {
    pub ok: Option<Type>,
    pub err: Option<Type>,
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Docs {
    #[cfg_attr(feature = "serde", serde(default))]
    pub contents: Option<String>,
}

impl Docs {
    pub fn is_empty(&self) -> bool {
        self.contents.is_none()
    }
}

pub type Params = Vec<(String, Type)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Results {
    Named(Params),
    /// A single unnamed result, as produced by the `result` field.
    Anon(Type),
}

pub enum ResultsTypeIter<'a> {
    Named(std::slice::Iter<'a, (String, Type)>),
    Anon(std::iter::Once<&'a Type>),
}

impl<'a> Iterator for ResultsTypeIter<'a> {
    type Item = &'a Type;

    fn next(&mut self) -> Option<&'a Type> {
        match self {
            ResultsTypeIter::Named(ps) => ps.next().map(|p| &p.1),
            ResultsTypeIter::Anon(ty) => ty.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ResultsTypeIter::Named(ps) => ps.size_hint(),
            ResultsTypeIter::Anon(ty) => ty.size_hint(),
        }
    }
}

impl ExactSizeIterator for ResultsTypeIter<'_> {}

impl Results {
    // For the common case of an empty results list.
    pub fn empty() -> Results {
        Results::Named(Vec::new())
    }

    pub fn len(&self) -> usize {
        match self {
            Results::Named(params) => params.len(),
            Results::Anon(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_types(&self) -> ResultsTypeIter<'_> {
        match self {
            Results::Named(ps) => ResultsTypeIter::Named(ps.iter()),
            Results::Anon(ty) => ResultsTypeIter::Anon(std::iter::once(ty)),
        }
    }

    pub fn iter_types_mut(&mut self) -> impl Iterator<Item = &mut Type> + '_ {
        let (named, anon) = match self {
            Results::Named(ps) => (Some(ps.iter_mut().map(|p| &mut p.1)), None),
            Results::Anon(ty) => (None, Some(ty)),
        };
        named.into_iter().flatten().chain(anon)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_params"))]
    pub params: Params,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub results: Results,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,
    /// Stability attribute for this function.
    #[cfg_attr(
        feature = "serde",
        serde(skip_serializing_if = "Stability::is_unknown")
    )]
    pub stability: Stability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FunctionKind {
    Freestanding,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Method(TypeId),
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Static(TypeId),
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id"))]
    Constructor(TypeId),
}

impl Function {
    /// The name of this function within the resource it's attached to, or its
    /// full name if it's freestanding.
    pub fn item_name(&self) -> &str {
        match &self.kind {
            FunctionKind::Freestanding => &self.name,
            FunctionKind::Method(_) | FunctionKind::Static(_) => match self.name.find('.') {
                Some(i) => &self.name[i + 1..],
                None => &self.name,
            },
            FunctionKind::Constructor(_) => "constructor",
        }
    }

    /// Like [`Function::item_name`] but additionally recognizes the names of
    /// the administrative functions of the Canonical ABI.
    pub fn base_name(&self) -> Cow<'_, str> {
        const SPECIAL: &[(&str, &str)] = &[
            ("[constructor]", "constructor"),
            ("[resource-new]", "resource-new"),
            ("[resource-rep]", "resource-rep"),
            ("[resource-drop]", "resource-drop"),
            ("[dtor]", "destructor"),
        ];
        for (prefix, name) in SPECIAL {
            if self.name.starts_with(prefix) {
                return Cow::Borrowed(name);
            }
        }
        if let Some(rest) = self.name.strip_prefix("cabi_post_") {
            return Cow::Owned(format!("{rest}-post-return"));
        }
        match self.name.split_once('.') {
            Some((_, name)) => Cow::Borrowed(name),
            None => Cow::Borrowed(&self.name),
        }
    }

    /// The resource type this function is attached to, if any.
    pub fn kind_type(&self) -> Option<TypeId> {
        match self.kind {
            FunctionKind::Freestanding => None,
            FunctionKind::Method(id) | FunctionKind::Static(id) | FunctionKind::Constructor(id) => {
                Some(id)
            }
        }
    }

    /// Returns whether this is a method whose first parameter is the
    /// resource it's attached to, either directly or as `borrow<T>`.
    pub fn is_method(&self, resolve: &Resolve) -> bool {
        let FunctionKind::Method(resource) = self.kind else {
            return false;
        };
        match self.params.first() {
            Some((_, Type::Id(id))) if *id == resource => true,
            Some((_, Type::Id(id))) => matches!(
                resolve.types[*id].kind,
                TypeDefKind::Handle(Handle::Borrow(t)) if t == resource
            ),
            _ => false,
        }
    }

    /// Returns whether this is one of the administrative functions of the
    /// Canonical ABI rather than something declared in WIT.
    pub fn is_admin(&self) -> bool {
        let kind = &self.kind;
        (matches!(kind, FunctionKind::Static(_)) && self.name.starts_with("[resource-new]"))
            || (matches!(kind, FunctionKind::Method(_))
                && (self.name.starts_with("[resource-rep]")
                    || self.name.starts_with("[resource-drop]")
                    || self.name.starts_with("[dtor]")))
            || self.name.starts_with("cabi_post_")
    }
}

/// Representation of the stability attributes associated with a world,
/// interface, function, or type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Stability {
    /// `@since(version = 1.2.3)`, optionally with `@deprecated`.
    Stable {
        #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_version"))]
        #[cfg_attr(feature = "serde", serde(deserialize_with = "deserialize_version"))]
        since: Version,
        #[cfg_attr(
            feature = "serde",
            serde(
                default,
                skip_serializing_if = "Option::is_none",
                serialize_with = "serialize_optional_version",
                deserialize_with = "deserialize_optional_version"
            )
        )]
        deprecated: Option<Version>,
    },

    /// `@unstable(feature = foo)`, optionally with `@deprecated`.
    Unstable {
        feature: String,
        #[cfg_attr(
            feature = "serde",
            serde(
                default,
                skip_serializing_if = "Option::is_none",
                serialize_with = "serialize_optional_version",
                deserialize_with = "deserialize_optional_version"
            )
        )]
        deprecated: Option<Version>,
    },

    /// This item does not have either `@since` or `@unstable`.
    #[default]
    Unknown,
}

impl Stability {
    /// Returns whether this is `Stability::Unknown`.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Stability::Unknown)
    }

    /// The version this item was deprecated in, if any.
    pub fn deprecated(&self) -> Option<&Version> {
        match self {
            Stability::Stable { deprecated, .. } | Stability::Unstable { deprecated, .. } => {
                deprecated.as_ref()
            }
            Stability::Unknown => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_discriminant_type() {
        assert_eq!(discriminant_type(0), Int::U8);
        assert_eq!(discriminant_type(1), Int::U8);
        assert_eq!(discriminant_type(0x100), Int::U8);
        assert_eq!(discriminant_type(0x101), Int::U16);
        assert_eq!(discriminant_type(0x10000), Int::U16);
        assert_eq!(discriminant_type(0x10001), Int::U32);
        if let Ok(num_cases) = usize::try_from(0x100000000_u64) {
            assert_eq!(discriminant_type(num_cases), Int::U32);
        }
    }

    #[test]
    fn flags_repr() {
        let flags = |n: usize| Flags {
            flags: (0..n)
                .map(|i| Flag {
                    name: format!("f{i}"),
                    docs: Docs::default(),
                })
                .collect(),
        };
        assert_eq!(flags(0).repr(), FlagsRepr::U8);
        assert_eq!(flags(8).repr(), FlagsRepr::U8);
        assert_eq!(flags(9).repr(), FlagsRepr::U16);
        assert_eq!(flags(33).repr(), FlagsRepr::U32(2));
        assert_eq!(flags(0).flat_count(), 0);
        assert_eq!(flags(32).flat_count(), 1);
        assert_eq!(flags(33).flat_count(), 2);
    }

    #[test]
    fn despecialize() {
        let tuple = TypeDefKind::Tuple(Tuple {
            types: vec![Type::U8, Type::String],
        });
        let TypeDefKind::Record(r) = tuple.despecialize().into_owned() else {
            panic!("expected a record");
        };
        let names = r.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["0", "1"]);

        let result = TypeDefKind::Result(Result_ {
            ok: None,
            err: Some(Type::U32),
        });
        let TypeDefKind::Variant(v) = result.despecialize().into_owned() else {
            panic!("expected a variant");
        };
        assert_eq!(v.cases[0].name, "ok");
        assert_eq!(v.cases[0].ty, None);
        assert_eq!(v.cases[1].name, "error");
        assert_eq!(v.cases[1].ty, Some(Type::U32));

        let list = TypeDefKind::List(Type::U8);
        assert!(matches!(list.despecialize(), Cow::Borrowed(_)));
    }

    #[test]
    fn function_names() {
        let func = |name: &str, kind: FunctionKind| Function {
            name: name.to_string(),
            kind,
            params: Vec::new(),
            results: Results::empty(),
            docs: Docs::default(),
            stability: Stability::Unknown,
        };
        let mut arena = id_arena::Arena::<TypeDef>::new();
        let r = arena.alloc(TypeDef::anonymous(TypeDefKind::Resource));

        assert_eq!(func("f", FunctionKind::Freestanding).item_name(), "f");
        assert_eq!(
            func("[method]blob.read", FunctionKind::Method(r)).item_name(),
            "read"
        );
        assert_eq!(
            func("[constructor]blob", FunctionKind::Constructor(r)).item_name(),
            "constructor"
        );
        assert_eq!(
            func("[resource-drop]blob", FunctionKind::Method(r)).base_name(),
            "resource-drop"
        );
        assert_eq!(
            func("cabi_post_run", FunctionKind::Freestanding).base_name(),
            "run-post-return"
        );
        assert_eq!(
            func("[static]blob.merge", FunctionKind::Static(r)).base_name(),
            "merge"
        );
        assert!(func("[resource-drop]blob", FunctionKind::Method(r)).is_admin());
        assert!(!func("[method]blob.read", FunctionKind::Method(r)).is_admin());
    }
}
