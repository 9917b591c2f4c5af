use crate::{
    Docs, Function, FunctionKind, Ident, Interface, InterfaceId, Type, TypeDef, TypeDefKind,
    TypeId, TypeOwner, World, WorldId, WorldKey,
};
use anyhow::{anyhow, bail, Context, Result};
use id_arena::{Arena, Id};
use indexmap::IndexMap;

#[cfg(feature = "serde")]
use crate::serde_::{serialize_arena, serialize_id_map};
#[cfg(feature = "serde")]
use serde_derive::Serialize;

mod clone;
pub use clone::Cloner;
mod prune;

/// Representation of a fully resolved set of WIT packages.
///
/// This structure contains a graph of WIT packages and all of their contents
/// merged together into the contained arenas. Everything here is fully
/// resolved, so with a `Resolve` no name lookups are necessary and instead
/// everything is index-based.
///
/// Each item in a `Resolve` has a parent link to trace it back to the original
/// package as necessary.
#[derive(Default, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Resolve {
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_arena"))]
    pub worlds: Arena<World>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_arena"))]
    pub interfaces: Arena<Interface>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_arena"))]
    pub types: Arena<TypeDef>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_arena"))]
    pub packages: Arena<Package>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub package_names: IndexMap<Ident, PackageId>,
}

/// A WIT package within a `Resolve`.
///
/// A package is a collection of interfaces and worlds. Packages additionally
/// have a unique identifier that affects generated components and uniquely
/// identifiers this particular package.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Package {
    /// A unique name corresponding to this package.
    pub name: Ident,

    /// Documentation associated with this package.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Docs::is_empty"))]
    pub docs: Docs,

    /// All interfaces contained in this packaged, keyed by the interface's
    /// name.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id_map"))]
    pub interfaces: IndexMap<String, InterfaceId>,

    /// All worlds contained in this package, keyed by the world's name.
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_id_map"))]
    pub worlds: IndexMap<String, WorldId>,
}

pub type PackageId = Id<Package>;

impl Resolve {
    /// Creates a new [`Resolve`] with no packages/items inside of it.
    pub fn new() -> Resolve {
        Resolve::default()
    }

    /// Iterates over every function in this `Resolve`: first those
    /// imported or exported directly by worlds, then those of interfaces.
    pub fn all_functions(&self) -> impl Iterator<Item = &Function> + '_ {
        let worlds = self.worlds.iter().flat_map(|(_, w)| w.all_functions());
        let interfaces = self
            .interfaces
            .iter()
            .flat_map(|(_, i)| i.functions.values());
        worlds.chain(interfaces)
    }

    pub fn all_interfaces(&self) -> impl Iterator<Item = (InterfaceId, &Interface)> + '_ {
        self.interfaces.iter()
    }

    pub fn all_type_defs(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> + '_ {
        self.types.iter()
    }

    /// Looks up a package by its name.
    pub fn package_by_name(&self, name: &Ident) -> Option<PackageId> {
        self.package_names.get(name).copied()
    }

    /// Rebuilds `package_names` from the packages in this `Resolve`.
    ///
    /// Returns an error if two packages share a name.
    pub fn index_package_names(&mut self) -> Result<()> {
        self.package_names.clear();
        for (id, pkg) in self.packages.iter() {
            if self.package_names.insert(pkg.name.clone(), id).is_some() {
                bail!("package `{}` is defined more than once", pkg.name);
            }
        }
        Ok(())
    }

    /// Returns the ID of the specified `interface`, such as
    /// `wasi:io/streams@0.2.0`.
    ///
    /// Returns `None` for unnamed interfaces and interfaces without a
    /// package.
    pub fn id_of(&self, interface: InterfaceId) -> Option<String> {
        let interface = &self.interfaces[interface];
        let package = &self.packages[interface.package?];
        let name = interface.name.as_ref()?;
        Some(package.name.with_extension(name).to_string())
    }

    /// Returns whether `pattern` names the world `id`.
    ///
    /// The pattern may be the bare name of the world, its fully qualified
    /// name (`ns:pkg/world@1.0.0`), or the qualified name without a version.
    pub fn world_matches(&self, id: WorldId, pattern: &str) -> bool {
        let world = &self.worlds[id];
        self.item_matches(Some(&world.name), world.package, pattern)
    }

    /// Same as [`Resolve::world_matches`] but for interfaces. Unnamed
    /// interfaces never match.
    pub fn interface_matches(&self, id: InterfaceId, pattern: &str) -> bool {
        let iface = &self.interfaces[id];
        self.item_matches(iface.name.as_ref(), iface.package, pattern)
    }

    fn item_matches(&self, name: Option<&String>, pkg: Option<PackageId>, pattern: &str) -> bool {
        let Some(name) = name else {
            return false;
        };
        if pattern == name {
            return true;
        }
        let Some(pkg) = pkg else {
            return false;
        };
        let id = self.packages[pkg].name.with_extension(name);
        pattern == id.to_string() || pattern == id.unversioned().to_string()
    }

    /// Finds the first world matched by `pattern`.
    pub fn match_world(&self, pattern: &str) -> Option<WorldId> {
        self.worlds
            .iter()
            .map(|(id, _)| id)
            .find(|id| self.world_matches(*id, pattern))
    }

    /// Finds the first interface matched by `pattern`.
    pub fn match_interface(&self, pattern: &str) -> Option<InterfaceId> {
        self.interfaces
            .iter()
            .map(|(id, _)| id)
            .find(|id| self.interface_matches(*id, pattern))
    }

    /// Attempts to locate a world given the "default" package `pkg` and the
    /// optional string specifier `world`.
    ///
    /// If `world` is `None` then `pkg` must have precisely one world which will
    /// be returned.
    ///
    /// If `world` is `Some` then it can either be:
    ///
    /// * A kebab-name of a world contained within `pkg` which is being
    ///   selected, such as `"the-world"`.
    ///
    /// * An ID-based form of a world which is selected within this `Resolve`,
    ///   ignoring `pkg`. For example `"wasi:http/proxy"`.
    ///
    /// If successful the corresponding `WorldId` is returned, otherwise an
    /// error is returned.
    pub fn select_world(&self, pkg: PackageId, world: Option<&str>) -> Result<WorldId> {
        let world = match world {
            Some(world) => world,
            None => {
                let pkg = &self.packages[pkg];
                let mut worlds = pkg.worlds.values();
                return match (worlds.next(), worlds.next()) {
                    (None, _) => bail!("no worlds found in package `{}`", pkg.name),
                    (Some(world), None) => Ok(*world),
                    (Some(_), Some(_)) => bail!(
                        "multiple worlds found in package `{}`: one must be explicitly chosen",
                        pkg.name
                    ),
                };
            }
        };

        let (pkg, name) = if world.contains(':') {
            let id = Ident::parse(world)
                .with_context(|| format!("failed to parse world specifier `{world}`"))?;
            let name = id
                .extension
                .clone()
                .ok_or_else(|| anyhow!("world specifier `{world}` is missing a world name"))?;
            let pkg_name = id.package_name();
            let pkg = self
                .package_by_name(&pkg_name)
                .ok_or_else(|| anyhow!("unknown package `{pkg_name}`"))?;
            (pkg, name)
        } else {
            (pkg, world.to_string())
        };
        let pkg = &self.packages[pkg];
        pkg.worlds
            .get(&name)
            .copied()
            .ok_or_else(|| anyhow!("no world named `{name}` in package `{}`", pkg.name))
    }

    /// Assigns a human readable name to the `WorldKey` specified.
    pub fn name_world_key(&self, key: &WorldKey) -> String {
        match key {
            WorldKey::Name(s) => s.to_string(),
            WorldKey::Interface(i) => self
                .id_of(*i)
                .unwrap_or_else(|| format!("interface-{}", i.index())),
        }
    }

    /// Follows the chain of aliases starting at `id` and returns the first
    /// type definition which isn't an alias of another type definition.
    pub fn type_root(&self, mut id: TypeId) -> TypeId {
        while let TypeDefKind::Type(Type::Id(next)) = self.types[id].kind {
            id = next;
        }
        id
    }

    /// Returns the kind of the root definition of `ty`, or `None` for
    /// primitive types.
    pub fn kind_of(&self, ty: &Type) -> Option<&TypeDefKind> {
        match ty {
            Type::Id(id) => Some(&self.types[self.type_root(*id)].kind),
            _ => None,
        }
    }

    fn owner_functions(&self, owner: TypeOwner) -> Vec<&Function> {
        match owner {
            TypeOwner::Interface(i) => self.interfaces[i].functions.values().collect(),
            TypeOwner::World(w) => self.worlds[w].all_functions().collect(),
            TypeOwner::None => Vec::new(),
        }
    }

    /// Returns the constructor of the resource `resource`, if it has one.
    pub fn constructor(&self, resource: TypeId) -> Option<&Function> {
        self.owner_functions(self.types[resource].owner)
            .into_iter()
            .find(|f| f.kind == FunctionKind::Constructor(resource))
    }

    /// Returns the methods of the resource `resource`, sorted by name.
    pub fn methods(&self, resource: TypeId) -> Vec<&Function> {
        self.resource_functions(resource, FunctionKind::Method(resource))
    }

    /// Returns the static functions of the resource `resource`, sorted by
    /// name.
    pub fn static_functions(&self, resource: TypeId) -> Vec<&Function> {
        self.resource_functions(resource, FunctionKind::Static(resource))
    }

    fn resource_functions(&self, resource: TypeId, kind: FunctionKind) -> Vec<&Function> {
        let mut funcs = self
            .owner_functions(self.types[resource].owner)
            .into_iter()
            .filter(|f| f.kind == kind)
            .collect::<Vec<_>>();
        funcs.sort_by(|a, b| a.name.cmp(&b.name));
        funcs
    }

    /// Creates a copy of this `Resolve` that shares nothing with it.
    ///
    /// Items keep their position within each arena, but ids of `self` are not
    /// valid in the copy nor vice versa. Use [`Resolve::deep_clone_with_remap`]
    /// to translate them.
    pub fn deep_clone(&self) -> Resolve {
        self.deep_clone_with_remap().0
    }

    /// Same as [`Resolve::deep_clone`], additionally returning the mapping
    /// from ids in `self` to ids in the copy.
    pub fn deep_clone_with_remap(&self) -> (Resolve, Remap) {
        let mut ret = Resolve::default();
        let mut map = Remap::default();
        let mut cloner = Cloner::new(self, &mut ret);
        for (id, _) in self.packages.iter() {
            map.packages.push(cloner.reserve_package(id));
        }
        for (id, _) in self.worlds.iter() {
            map.worlds.push(cloner.reserve_world(id));
        }
        for (id, _) in self.interfaces.iter() {
            map.interfaces.push(cloner.reserve_interface(id));
        }
        for (id, _) in self.types.iter() {
            map.types.push(cloner.reserve_type(id));
        }
        for (id, pkg) in self.packages.iter() {
            cloner.populate_package(id, pkg);
        }
        for (id, world) in self.worlds.iter() {
            cloner.populate_world(id, world);
        }
        for (id, iface) in self.interfaces.iter() {
            cloner.populate_interface(id, iface);
        }
        for (id, ty) in self.types.iter() {
            cloner.populate_type(id, ty);
        }
        ret.package_names = ret
            .packages
            .iter()
            .map(|(id, pkg)| (pkg.name.clone(), id))
            .collect();
        (ret, map)
    }
}

/// Structure returned by [`Resolve::deep_clone_with_remap`] which maps the
/// ids of the original, by index, to the ids of the copy.
#[derive(Default, Debug)]
pub struct Remap {
    pub types: Vec<TypeId>,
    pub interfaces: Vec<InterfaceId>,
    pub worlds: Vec<WorldId>,
    pub packages: Vec<PackageId>,
}

impl Remap {
    pub fn map_type(&self, id: TypeId) -> TypeId {
        self.types[id.index()]
    }

    pub fn map_interface(&self, id: InterfaceId) -> InterfaceId {
        self.interfaces[id.index()]
    }

    pub fn map_world(&self, id: WorldId) -> WorldId {
        self.worlds[id.index()]
    }

    pub fn map_package(&self, id: PackageId) -> PackageId {
        self.packages[id.index()]
    }
}
