//! Decoding of the JSON representation of a [`Resolve`], as printed by
//! `wasm-tools component wit --json`.
//!
//! Items in the JSON form refer to each other by their index in the
//! top-level `worlds`, `interfaces`, `types` and `packages` lists, and may do
//! so before the referenced item appears. Decoding therefore happens in two
//! passes: first a placeholder is allocated for every item so that every
//! index is known, and then each placeholder is filled in.

use crate::*;
use anyhow::{anyhow, bail, Context, Result};
use serde_derive::Deserialize;
use std::io::Read;

#[derive(Deserialize)]
struct RawResolve {
    #[serde(default)]
    worlds: Vec<RawWorld>,
    #[serde(default)]
    interfaces: Vec<RawInterface>,
    #[serde(default)]
    types: Vec<RawTypeDef>,
    #[serde(default)]
    packages: Vec<RawPackage>,
}

#[derive(Deserialize)]
struct RawWorld {
    name: String,
    #[serde(default)]
    imports: IndexMap<String, RawWorldItem>,
    #[serde(default)]
    exports: IndexMap<String, RawWorldItem>,
    #[serde(default)]
    package: Option<usize>,
    #[serde(default)]
    docs: Docs,
    #[serde(default)]
    stability: Stability,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawWorldItem {
    Interface(RawInterfaceRef),
    Function(RawFunction),
    Type(RawType),
}

/// Older encodings refer to interfaces by bare index, newer ones attach a
/// stability annotation.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInterfaceRef {
    Index(usize),
    Ref {
        id: usize,
        #[serde(default)]
        stability: Stability,
    },
}

#[derive(Deserialize)]
struct RawInterface {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    types: IndexMap<String, usize>,
    #[serde(default)]
    functions: IndexMap<String, RawFunction>,
    #[serde(default)]
    package: Option<usize>,
    #[serde(default)]
    docs: Docs,
    #[serde(default)]
    stability: Stability,
}

#[derive(Deserialize)]
struct RawTypeDef {
    #[serde(default)]
    name: Option<String>,
    kind: RawTypeDefKind,
    #[serde(default)]
    owner: Option<RawTypeOwner>,
    #[serde(default)]
    docs: Docs,
    #[serde(default)]
    stability: Stability,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawTypeOwner {
    World(usize),
    Interface(usize),
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
enum RawTypeDefKind {
    Record(RawRecord),
    Resource,
    Handle(RawHandle),
    Flags(RawFlags),
    Tuple(RawTuple),
    Variant(RawVariant),
    Enum(RawEnum),
    Option(RawType),
    Result(RawResult),
    List(RawType),
    Future(Option<RawType>),
    Stream(Option<RawType>),
    #[serde(alias = "errorcontext")]
    ErrorContext,
    Type(RawType),
}

#[derive(Deserialize)]
struct RawRecord {
    fields: Vec<RawField>,
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: RawType,
    #[serde(default)]
    docs: Docs,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawHandle {
    Own(usize),
    Borrow(usize),
}

#[derive(Deserialize)]
struct RawFlags {
    flags: Vec<RawName>,
}

#[derive(Deserialize)]
struct RawTuple {
    types: Vec<RawType>,
}

#[derive(Deserialize)]
struct RawVariant {
    cases: Vec<RawCase>,
}

#[derive(Deserialize)]
struct RawCase {
    name: String,
    #[serde(rename = "type", default)]
    ty: Option<RawType>,
    #[serde(default)]
    docs: Docs,
}

#[derive(Deserialize)]
struct RawEnum {
    cases: Vec<RawName>,
}

/// A flag or an enum case.
#[derive(Deserialize)]
struct RawName {
    name: String,
    #[serde(default)]
    docs: Docs,
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    ok: Option<RawType>,
    #[serde(default)]
    err: Option<RawType>,
}

/// Either an index into `types` or the name of a primitive type.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawType {
    Index(usize),
    Name(String),
}

#[derive(Deserialize)]
struct RawFunction {
    name: String,
    kind: RawFunctionKind,
    #[serde(default)]
    params: Vec<RawParam>,
    #[serde(default)]
    result: Option<RawType>,
    #[serde(default)]
    results: Option<Vec<RawParam>>,
    #[serde(default)]
    docs: Docs,
    #[serde(default)]
    stability: Stability,
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawFunctionKind {
    Freestanding,
    Method(usize),
    Static(usize),
    Constructor(usize),
}

#[derive(Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: RawType,
}

#[derive(Deserialize)]
struct RawPackage {
    name: String,
    #[serde(default)]
    docs: Docs,
    #[serde(default)]
    interfaces: IndexMap<String, usize>,
    #[serde(default)]
    worlds: IndexMap<String, usize>,
}

/// Decodes the JSON form of a [`Resolve`] from `reader`.
pub fn decode_json(reader: impl Read) -> Result<Resolve> {
    Resolve::from_json_reader(reader)
}

impl Resolve {
    /// Decodes the JSON form of a `Resolve`.
    ///
    /// References between items may point forwards or backwards, and the
    /// returned `Resolve` keeps every item at the index it had in the JSON.
    pub fn from_json_str(json: &str) -> Result<Resolve> {
        let raw = serde_json::from_str(json).context("failed to parse JSON")?;
        Decoder::default().decode(raw)
    }

    /// Same as [`Resolve::from_json_str`] but for raw bytes.
    pub fn from_json_slice(json: &[u8]) -> Result<Resolve> {
        let raw = serde_json::from_slice(json).context("failed to parse JSON")?;
        Decoder::default().decode(raw)
    }

    /// Same as [`Resolve::from_json_str`] but reads from `reader`.
    pub fn from_json_reader(reader: impl Read) -> Result<Resolve> {
        let raw = serde_json::from_reader(reader).context("failed to parse JSON")?;
        Decoder::default().decode(raw)
    }

    /// Encodes this `Resolve` in the same JSON form accepted by
    /// [`Resolve::from_json_str`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Default)]
struct Decoder {
    resolve: Resolve,
    worlds: Vec<WorldId>,
    interfaces: Vec<InterfaceId>,
    types: Vec<TypeId>,
    packages: Vec<PackageId>,
}

impl Decoder {
    fn decode(mut self, raw: RawResolve) -> Result<Resolve> {
        for _ in raw.types.iter() {
            let id = self
                .resolve
                .types
                .alloc(TypeDef::anonymous(TypeDefKind::Unknown));
            self.types.push(id);
        }
        for _ in raw.interfaces.iter() {
            let id = self.resolve.interfaces.alloc(Interface::default());
            self.interfaces.push(id);
        }
        for _ in raw.worlds.iter() {
            let id = self.resolve.worlds.alloc(World::default());
            self.worlds.push(id);
        }
        for (i, pkg) in raw.packages.iter().enumerate() {
            let name = Ident::parse(&pkg.name)
                .with_context(|| format!("invalid name `{}` for package {i}", pkg.name))?;
            let id = self.resolve.packages.alloc(Package {
                name,
                docs: Docs::default(),
                interfaces: IndexMap::new(),
                worlds: IndexMap::new(),
            });
            self.packages.push(id);
        }

        for (i, def) in raw.types.into_iter().enumerate() {
            let def = self
                .type_def(def)
                .with_context(|| format!("failed to decode type {i}"))?;
            self.resolve.types[self.types[i]] = def;
        }
        for (i, iface) in raw.interfaces.into_iter().enumerate() {
            let iface = self
                .interface(iface)
                .with_context(|| format!("failed to decode interface {i}"))?;
            self.resolve.interfaces[self.interfaces[i]] = iface;
        }
        for (i, world) in raw.worlds.into_iter().enumerate() {
            let world = self
                .world(world)
                .with_context(|| format!("failed to decode world {i}"))?;
            self.resolve.worlds[self.worlds[i]] = world;
        }
        for (i, pkg) in raw.packages.into_iter().enumerate() {
            let id = self.packages[i];
            self.resolve.packages[id].docs = pkg.docs;
            self.resolve.packages[id].interfaces = pkg
                .interfaces
                .into_iter()
                .map(|(name, idx)| Ok((name, self.interface_id(idx)?)))
                .collect::<Result<_>>()
                .with_context(|| format!("failed to decode package {i}"))?;
            self.resolve.packages[id].worlds = pkg
                .worlds
                .into_iter()
                .map(|(name, idx)| Ok((name, self.world_id(idx)?)))
                .collect::<Result<_>>()
                .with_context(|| format!("failed to decode package {i}"))?;
        }

        self.resolve.index_package_names()?;
        log::debug!(
            "decoded {} packages, {} worlds, {} interfaces and {} types",
            self.resolve.packages.len(),
            self.resolve.worlds.len(),
            self.resolve.interfaces.len(),
            self.resolve.types.len(),
        );
        Ok(self.resolve)
    }

    fn world_id(&self, idx: usize) -> Result<WorldId> {
        self.worlds
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow!("world index {idx} is out of bounds"))
    }

    fn interface_id(&self, idx: usize) -> Result<InterfaceId> {
        self.interfaces
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow!("interface index {idx} is out of bounds"))
    }

    fn type_id(&self, idx: usize) -> Result<TypeId> {
        self.types
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow!("type index {idx} is out of bounds"))
    }

    fn package_id(&self, idx: Option<usize>) -> Result<Option<PackageId>> {
        idx.map(|idx| {
            self.packages
                .get(idx)
                .copied()
                .ok_or_else(|| anyhow!("package index {idx} is out of bounds"))
        })
        .transpose()
    }

    fn ty(&self, ty: RawType) -> Result<Type> {
        match ty {
            RawType::Index(idx) => Ok(Type::Id(self.type_id(idx)?)),
            RawType::Name(name) => {
                Type::from_primitive_name(&name).ok_or_else(|| anyhow!("unknown type `{name}`"))
            }
        }
    }

    fn optional_ty(&self, ty: Option<RawType>) -> Result<Option<Type>> {
        ty.map(|ty| self.ty(ty)).transpose()
    }

    fn world(&self, world: RawWorld) -> Result<World> {
        Ok(World {
            name: world.name,
            imports: self.world_items(world.imports).context("invalid import")?,
            exports: self.world_items(world.exports).context("invalid export")?,
            package: self.package_id(world.package)?,
            docs: world.docs,
            stability: world.stability,
        })
    }

    fn world_items(
        &self,
        items: IndexMap<String, RawWorldItem>,
    ) -> Result<IndexMap<WorldKey, WorldItem>> {
        items
            .into_iter()
            .map(|(name, item)| {
                let item = self
                    .world_item(item)
                    .with_context(|| format!("failed to decode `{name}`"))?;
                let key = match &item {
                    WorldItem::Interface { id, .. }
                        if name == format!("interface-{}", id.index()) =>
                    {
                        WorldKey::Interface(*id)
                    }
                    _ => WorldKey::Name(name),
                };
                Ok((key, item))
            })
            .collect()
    }

    fn world_item(&self, item: RawWorldItem) -> Result<WorldItem> {
        Ok(match item {
            RawWorldItem::Interface(RawInterfaceRef::Index(idx)) => WorldItem::Interface {
                id: self.interface_id(idx)?,
                stability: Stability::Unknown,
            },
            RawWorldItem::Interface(RawInterfaceRef::Ref { id, stability }) => {
                WorldItem::Interface {
                    id: self.interface_id(id)?,
                    stability,
                }
            }
            RawWorldItem::Function(func) => WorldItem::Function(self.function(func)?),
            RawWorldItem::Type(RawType::Index(idx)) => WorldItem::Type(self.type_id(idx)?),
            RawWorldItem::Type(RawType::Name(name)) => {
                bail!("world items must refer to a type definition, found `{name}`")
            }
        })
    }

    fn interface(&self, iface: RawInterface) -> Result<Interface> {
        let types = iface
            .types
            .into_iter()
            .map(|(name, idx)| Ok((name, self.type_id(idx)?)))
            .collect::<Result<_>>()?;
        let functions = iface
            .functions
            .into_iter()
            .map(|(name, func)| {
                let func = self
                    .function(func)
                    .with_context(|| format!("failed to decode function `{name}`"))?;
                Ok((name, func))
            })
            .collect::<Result<_>>()?;
        Ok(Interface {
            name: iface.name,
            types,
            functions,
            docs: iface.docs,
            stability: iface.stability,
            package: self.package_id(iface.package)?,
        })
    }

    fn function(&self, func: RawFunction) -> Result<Function> {
        let kind = match func.kind {
            RawFunctionKind::Freestanding => FunctionKind::Freestanding,
            RawFunctionKind::Method(idx) => FunctionKind::Method(self.type_id(idx)?),
            RawFunctionKind::Static(idx) => FunctionKind::Static(self.type_id(idx)?),
            RawFunctionKind::Constructor(idx) => FunctionKind::Constructor(self.type_id(idx)?),
        };
        let params = self.params(func.params)?;
        let results = match (func.result, func.results) {
            (Some(_), Some(_)) => bail!("function has both `result` and `results`"),
            (Some(ty), None) => Results::Anon(self.ty(ty)?),
            (None, Some(results)) => {
                let mut results = self.params(results)?;
                // A lone unnamed entry is the older spelling of `result`.
                if results.len() == 1 && results[0].0.is_empty() {
                    Results::Anon(results.remove(0).1)
                } else {
                    Results::Named(results)
                }
            }
            (None, None) => Results::empty(),
        };
        Ok(Function {
            name: func.name,
            kind,
            params,
            results,
            docs: func.docs,
            stability: func.stability,
        })
    }

    fn params(&self, params: Vec<RawParam>) -> Result<Params> {
        params
            .into_iter()
            .map(|p| Ok((p.name, self.ty(p.ty)?)))
            .collect()
    }

    fn type_def(&self, def: RawTypeDef) -> Result<TypeDef> {
        let owner = match def.owner {
            Some(RawTypeOwner::World(idx)) => TypeOwner::World(self.world_id(idx)?),
            Some(RawTypeOwner::Interface(idx)) => TypeOwner::Interface(self.interface_id(idx)?),
            None => TypeOwner::None,
        };
        Ok(TypeDef {
            name: def.name,
            kind: self.type_def_kind(def.kind)?,
            owner,
            docs: def.docs,
            stability: def.stability,
        })
    }

    fn type_def_kind(&self, kind: RawTypeDefKind) -> Result<TypeDefKind> {
        Ok(match kind {
            RawTypeDefKind::Record(r) => TypeDefKind::Record(Record {
                fields: r
                    .fields
                    .into_iter()
                    .map(|f| {
                        Ok(Field {
                            name: f.name,
                            ty: self.ty(f.ty)?,
                            docs: f.docs,
                        })
                    })
                    .collect::<Result<_>>()?,
            }),
            RawTypeDefKind::Resource => TypeDefKind::Resource,
            RawTypeDefKind::Handle(RawHandle::Own(idx)) => {
                TypeDefKind::Handle(Handle::Own(self.type_id(idx)?))
            }
            RawTypeDefKind::Handle(RawHandle::Borrow(idx)) => {
                TypeDefKind::Handle(Handle::Borrow(self.type_id(idx)?))
            }
            RawTypeDefKind::Flags(f) => TypeDefKind::Flags(Flags {
                flags: f
                    .flags
                    .into_iter()
                    .map(|f| Flag {
                        name: f.name,
                        docs: f.docs,
                    })
                    .collect(),
            }),
            RawTypeDefKind::Tuple(t) => TypeDefKind::Tuple(Tuple {
                types: t
                    .types
                    .into_iter()
                    .map(|ty| self.ty(ty))
                    .collect::<Result<_>>()?,
            }),
            RawTypeDefKind::Variant(v) => TypeDefKind::Variant(Variant {
                cases: v
                    .cases
                    .into_iter()
                    .map(|c| {
                        Ok(Case {
                            name: c.name,
                            ty: self.optional_ty(c.ty)?,
                            docs: c.docs,
                        })
                    })
                    .collect::<Result<_>>()?,
            }),
            RawTypeDefKind::Enum(e) => TypeDefKind::Enum(Enum {
                cases: e
                    .cases
                    .into_iter()
                    .map(|c| EnumCase {
                        name: c.name,
                        docs: c.docs,
                    })
                    .collect(),
            }),
            RawTypeDefKind::Option(ty) => TypeDefKind::Option(self.ty(ty)?),
            RawTypeDefKind::Result(r) => TypeDefKind::Result(Result_ {
                ok: self.optional_ty(r.ok)?,
                err: self.optional_ty(r.err)?,
            }),
            RawTypeDefKind::List(ty) => TypeDefKind::List(self.ty(ty)?),
            RawTypeDefKind::Future(ty) => TypeDefKind::Future(self.optional_ty(ty)?),
            RawTypeDefKind::Stream(ty) => TypeDefKind::Stream(self.optional_ty(ty)?),
            RawTypeDefKind::ErrorContext => TypeDefKind::ErrorContext,
            RawTypeDefKind::Type(ty) => TypeDefKind::Type(self.ty(ty)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn primitive_names() {
        let resolve = Resolve::from_json_str(
            r#"{
                "types": [
                    {"kind": {"type": "float32"}},
                    {"kind": {"type": "f64"}},
                    {"kind": {"list": "error-context"}}
                ]
            }"#,
        )
        .unwrap();
        let kinds = resolve
            .types
            .iter()
            .map(|(_, t)| t.kind.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            [
                TypeDefKind::Type(Type::F32),
                TypeDefKind::Type(Type::F64),
                TypeDefKind::List(Type::ErrorContext),
            ]
        );
    }

    #[test]
    fn unknown_type_name() {
        let err = Resolve::from_json_str(r#"{"types": [{"kind": {"type": "u128"}}]}"#)
            .unwrap_err();
        assert!(format!("{err:?}").contains("unknown type `u128`"), "{err:?}");
    }

    #[test]
    fn unknown_kind() {
        let err = Resolve::from_json_str(r#"{"types": [{"kind": {"map": "u8"}}]}"#).unwrap_err();
        assert!(format!("{err:?}").contains("failed to parse JSON"), "{err:?}");
    }

    #[test]
    fn out_of_bounds() {
        let err = Resolve::from_json_str(r#"{"types": [{"kind": {"option": 7}}]}"#).unwrap_err();
        assert!(format!("{err:?}").contains("type index 7"), "{err:?}");
    }

    #[test]
    fn error_context_spellings() {
        let resolve = Resolve::from_json_str(
            r#"{"types": [{"kind": "error-context"}, {"kind": "errorcontext"}]}"#,
        )
        .unwrap();
        assert!(resolve
            .types
            .iter()
            .all(|(_, t)| t.kind == TypeDefKind::ErrorContext));
    }
}
