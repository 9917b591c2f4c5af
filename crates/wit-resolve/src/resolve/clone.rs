//! Deep copies of items from one `Resolve` into another.
//!
//! Cloning items is not as simple as calling `Clone` due to the nature of how
//! ids track relationships between worlds, interfaces and types. A full deep
//! clone requires walking the full structure and allocating new id links. This
//! is akin to, for example, creating a deep copy of an `Rc<T>` by calling
//! `Clone for T`.
//!
//! Every item is copied at most once. A slot for the copy is allocated in the
//! destination and recorded before any of the item's contents are visited, so
//! cycles through type owners (a type owned by a world which imports the
//! interface using it, for example) terminate and resolve to the same copy.
//!
//! The general structure of this module is that each method takes a mutable
//! reference to an item and updates it as necessary internally, delegating to
//! other methods for internal items.

use crate::*;
use std::collections::HashMap;

pub struct Cloner<'a> {
    src: &'a Resolve,
    dst: &'a mut Resolve,

    /// These maps keep track of all copied items, keyed by their id in `src`.
    types: HashMap<TypeId, TypeId>,
    interfaces: HashMap<InterfaceId, InterfaceId>,
    worlds: HashMap<WorldId, WorldId>,
    packages: HashMap<PackageId, PackageId>,
}

impl<'a> Cloner<'a> {
    pub fn new(src: &'a Resolve, dst: &'a mut Resolve) -> Cloner<'a> {
        Cloner {
            src,
            dst,
            types: Default::default(),
            interfaces: Default::default(),
            worlds: Default::default(),
            packages: Default::default(),
        }
    }

    /// Copies the world `id`, and everything it refers to, returning the id
    /// of the copy.
    pub fn world(&mut self, id: WorldId) -> WorldId {
        if let Some(new) = self.worlds.get(&id) {
            return *new;
        }
        let src = self.src;
        self.populate_world(id, &src.worlds[id])
    }

    /// Allocates an empty slot in the destination for the copy of world `id`.
    ///
    /// Until it's populated the slot is only a placeholder, but any copy which
    /// refers to `id` in the meantime will refer to this slot.
    pub fn reserve_world(&mut self, id: WorldId) -> WorldId {
        if let Some(new) = self.worlds.get(&id) {
            return *new;
        }
        let new = self.dst.worlds.alloc(World::default());
        self.worlds.insert(id, new);
        new
    }

    /// Fills in the copy of world `id` with a copy of `world`.
    ///
    /// `world` is typically `src.worlds[id]` but may be a modified version of
    /// it, such as one with fewer imports.
    pub fn populate_world(&mut self, id: WorldId, world: &World) -> WorldId {
        let new = self.reserve_world(id);
        let mut world = world.clone();
        world.imports = self.world_items(&world.imports);
        world.exports = self.world_items(&world.exports);
        self.optional_package(&mut world.package);
        self.dst.worlds[new] = world;
        new
    }

    fn world_items(
        &mut self,
        items: &IndexMap<WorldKey, WorldItem>,
    ) -> IndexMap<WorldKey, WorldItem> {
        items
            .iter()
            .map(|(key, item)| {
                let mut key = key.clone();
                let mut item = item.clone();
                self.world_item(&mut key, &mut item);
                (key, item)
            })
            .collect()
    }

    pub fn world_item(&mut self, key: &mut WorldKey, item: &mut WorldItem) {
        match key {
            WorldKey::Name(_) => {}
            WorldKey::Interface(id) => *id = self.interface(*id),
        }

        match item {
            WorldItem::Type(t) => *t = self.type_id(*t),
            WorldItem::Function(f) => self.function(f),
            WorldItem::Interface { id, .. } => *id = self.interface(*id),
        }
    }

    /// Copies the interface `id`, and everything it refers to, returning the
    /// id of the copy.
    pub fn interface(&mut self, id: InterfaceId) -> InterfaceId {
        if let Some(new) = self.interfaces.get(&id) {
            return *new;
        }
        let src = self.src;
        self.populate_interface(id, &src.interfaces[id])
    }

    pub fn reserve_interface(&mut self, id: InterfaceId) -> InterfaceId {
        if let Some(new) = self.interfaces.get(&id) {
            return *new;
        }
        let new = self.dst.interfaces.alloc(Interface::default());
        self.interfaces.insert(id, new);
        new
    }

    pub fn populate_interface(&mut self, id: InterfaceId, iface: &Interface) -> InterfaceId {
        let new = self.reserve_interface(id);
        let mut iface = iface.clone();
        for id in iface.types.values_mut() {
            *id = self.type_id(*id);
        }
        for func in iface.functions.values_mut() {
            self.function(func);
        }
        self.optional_package(&mut iface.package);
        self.dst.interfaces[new] = iface;
        new
    }

    /// Copies the type `id`, and everything it refers to, returning the id of
    /// the copy.
    pub fn type_id(&mut self, id: TypeId) -> TypeId {
        if let Some(new) = self.types.get(&id) {
            return *new;
        }
        let src = self.src;
        self.populate_type(id, &src.types[id])
    }

    pub fn reserve_type(&mut self, id: TypeId) -> TypeId {
        if let Some(new) = self.types.get(&id) {
            return *new;
        }
        let new = self
            .dst
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Unknown));
        self.types.insert(id, new);
        new
    }

    pub fn populate_type(&mut self, id: TypeId, def: &TypeDef) -> TypeId {
        let new = self.reserve_type(id);
        let mut def = def.clone();
        self.type_def(&mut def);
        self.dst.types[new] = def;
        new
    }

    pub fn type_def(&mut self, def: &mut TypeDef) {
        self.type_owner(&mut def.owner);
        match &mut def.kind {
            TypeDefKind::Type(ty)
            | TypeDefKind::List(ty)
            | TypeDefKind::Option(ty)
            | TypeDefKind::Pointer(ty)
            | TypeDefKind::Future(Some(ty))
            | TypeDefKind::Stream(Some(ty)) => self.ty(ty),
            TypeDefKind::Handle(Handle::Own(id) | Handle::Borrow(id)) => {
                *id = self.type_id(*id);
            }
            TypeDefKind::Tuple(list) => {
                for ty in list.types.iter_mut() {
                    self.ty(ty);
                }
            }
            TypeDefKind::Record(r) => {
                for field in r.fields.iter_mut() {
                    self.ty(&mut field.ty);
                }
            }
            TypeDefKind::Variant(r) => {
                for case in r.cases.iter_mut() {
                    if let Some(ty) = &mut case.ty {
                        self.ty(ty);
                    }
                }
            }
            TypeDefKind::Result(r) => {
                if let Some(ok) = &mut r.ok {
                    self.ty(ok);
                }
                if let Some(err) = &mut r.err {
                    self.ty(err);
                }
            }
            TypeDefKind::Resource
            | TypeDefKind::Flags(_)
            | TypeDefKind::Enum(_)
            | TypeDefKind::ErrorContext
            | TypeDefKind::Future(None)
            | TypeDefKind::Stream(None)
            | TypeDefKind::Unknown => {}
        }
    }

    pub fn type_owner(&mut self, owner: &mut TypeOwner) {
        match owner {
            TypeOwner::World(id) => *id = self.world(*id),
            TypeOwner::Interface(id) => *id = self.interface(*id),
            TypeOwner::None => {}
        }
    }

    pub fn ty(&mut self, ty: &mut Type) {
        if let Type::Id(id) = ty {
            *id = self.type_id(*id);
        }
    }

    pub fn function(&mut self, func: &mut Function) {
        match &mut func.kind {
            FunctionKind::Freestanding => {}
            FunctionKind::Method(id) | FunctionKind::Static(id) | FunctionKind::Constructor(id) => {
                *id = self.type_id(*id)
            }
        }
        for (_, ty) in func.params.iter_mut() {
            self.ty(ty);
        }
        for ty in func.results.iter_types_mut() {
            self.ty(ty);
        }
    }

    /// Copies the package `id` along with all of its interfaces and worlds,
    /// returning the id of the copy.
    pub fn package(&mut self, id: PackageId) -> PackageId {
        if let Some(new) = self.packages.get(&id) {
            return *new;
        }
        let src = self.src;
        self.populate_package(id, &src.packages[id])
    }

    pub fn reserve_package(&mut self, id: PackageId) -> PackageId {
        if let Some(new) = self.packages.get(&id) {
            return *new;
        }
        let pkg = &self.src.packages[id];
        let new = self.dst.packages.alloc(Package {
            name: pkg.name.clone(),
            docs: pkg.docs.clone(),
            interfaces: IndexMap::new(),
            worlds: IndexMap::new(),
        });
        self.packages.insert(id, new);
        new
    }

    pub fn populate_package(&mut self, id: PackageId, pkg: &Package) -> PackageId {
        let new = self.reserve_package(id);
        let mut pkg = pkg.clone();
        for id in pkg.interfaces.values_mut() {
            *id = self.interface(*id);
        }
        for id in pkg.worlds.values_mut() {
            *id = self.world(*id);
        }
        self.dst.packages[new] = pkg;
        new
    }

    pub fn optional_package(&mut self, pkg: &mut Option<PackageId>) {
        if let Some(id) = pkg {
            *id = self.package(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cloner;
    use crate::*;

    /// A world `w` importing an interface `i` which uses a type owned by `w`.
    fn cyclic() -> (Resolve, WorldId, InterfaceId, TypeId) {
        let mut resolve = Resolve::default();
        let world = resolve.worlds.alloc(World {
            name: "w".to_string(),
            ..World::default()
        });
        let ty = resolve.types.alloc(TypeDef {
            name: Some("t".to_string()),
            owner: TypeOwner::World(world),
            ..TypeDef::anonymous(TypeDefKind::Type(Type::U32))
        });
        let iface = resolve.interfaces.alloc(Interface {
            name: Some("i".to_string()),
            ..Interface::default()
        });
        resolve.interfaces[iface]
            .types
            .insert("t".to_string(), ty);
        resolve.worlds[world].imports.insert(
            WorldKey::Interface(iface),
            WorldItem::Interface {
                id: iface,
                stability: Stability::Unknown,
            },
        );
        (resolve, world, iface, ty)
    }

    #[test]
    fn cycles_resolve_to_one_copy() {
        let (src, world, iface, ty) = cyclic();
        let mut dst = Resolve::default();
        let mut cloner = Cloner::new(&src, &mut dst);
        let new_world = cloner.world(world);
        let new_iface = cloner.interface(iface);
        let new_ty = cloner.type_id(ty);
        drop(cloner);

        assert_eq!(dst.worlds.len(), 1);
        assert_eq!(dst.interfaces.len(), 1);
        assert_eq!(dst.types.len(), 1);
        assert_eq!(dst.types[new_ty].owner, TypeOwner::World(new_world));
        assert_eq!(dst.interfaces[new_iface].types["t"], new_ty);
        assert!(dst.worlds[new_world]
            .imports
            .contains_key(&WorldKey::Interface(new_iface)));
    }

    #[test]
    fn copies_are_independent() {
        let (src, world, _, ty) = cyclic();
        let mut dst = Resolve::default();
        let new_world = Cloner::new(&src, &mut dst).world(world);
        let new_ty = match dst.worlds[new_world].imports.values().next() {
            Some(WorldItem::Interface { id, .. }) => dst.interfaces[*id].types["t"],
            other => panic!("unexpected import {other:?}"),
        };

        dst.worlds[new_world].name = "renamed".to_string();
        dst.types[new_ty].kind = TypeDefKind::Type(Type::String);
        assert_eq!(src.worlds[world].name, "w");
        assert_eq!(src.types[ty].kind, TypeDefKind::Type(Type::U32));
    }

    #[test]
    fn reserve_is_idempotent() {
        let (src, world, _, _) = cyclic();
        let mut dst = Resolve::default();
        let mut cloner = Cloner::new(&src, &mut dst);
        let a = cloner.reserve_world(world);
        let b = cloner.reserve_world(world);
        assert_eq!(a, b);

        // A reserved slot is handed out as-is until it's populated.
        assert_eq!(cloner.world(world), a);
        assert_eq!(cloner.populate_world(world, &src.worlds[world]), a);
        drop(cloner);
        assert_eq!(dst.worlds.len(), 1);
        assert_eq!(dst.worlds[a].name, "w");
    }

    #[test]
    fn deep_clone_remaps_ids() {
        let (src, world, iface, ty) = cyclic();
        let (mut copy, map) = src.deep_clone_with_remap();
        let (new_world, new_iface, new_ty) =
            (map.map_world(world), map.map_interface(iface), map.map_type(ty));
        assert_eq!(new_world.index(), world.index());
        assert_eq!(copy.worlds[new_world].name, "w");
        assert_eq!(copy.interfaces[new_iface].types["t"], new_ty);
        assert_eq!(copy.types[new_ty].owner, TypeOwner::World(new_world));

        copy.types[new_ty].name = Some("renamed".to_string());
        copy.interfaces[new_iface].types.clear();
        assert_eq!(src.types[ty].name.as_deref(), Some("t"));
        assert_eq!(src.interfaces[iface].types["t"], ty);
    }

    #[test]
    fn empty_references_stay_empty() {
        let mut src = Resolve::default();
        let ty = src
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::List(Type::U8)));
        let iface = src.interfaces.alloc(Interface::default());
        let mut dst = Resolve::default();
        let mut cloner = Cloner::new(&src, &mut dst);

        let mut package = None;
        cloner.optional_package(&mut package);
        assert_eq!(package, None);
        let mut owner = TypeOwner::None;
        cloner.type_owner(&mut owner);
        assert_eq!(owner, TypeOwner::None);

        let new_ty = cloner.type_id(ty);
        let new_iface = cloner.interface(iface);
        drop(cloner);
        assert_eq!(dst.types[new_ty].owner, TypeOwner::None);
        assert_eq!(dst.types[new_ty].kind, TypeDefKind::List(Type::U8));
        assert_eq!(dst.interfaces[new_iface].package, None);
        assert_eq!(dst.packages.len(), 0);
    }
}
