use crate::{
    Function, InterfaceId, PackageId, Resolve, Type, TypeId, TypeOwner, WorldId, WorldItem,
};
use std::collections::HashSet;

/// A reference to any item within a [`Resolve`] which can participate in
/// dependency queries.
///
/// Functions aren't arena-allocated so they're identified by address: two
/// `Node::Function`s are equal only if they point at the same `Function`.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Package(PackageId),
    World(WorldId),
    Interface(InterfaceId),
    Type(TypeId),
    Function(&'a Function),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Key {
    Package(PackageId),
    World(WorldId),
    Interface(InterfaceId),
    Type(TypeId),
    Function(*const Function),
}

impl Node<'_> {
    fn key(&self) -> Key {
        match *self {
            Node::Package(id) => Key::Package(id),
            Node::World(id) => Key::World(id),
            Node::Interface(id) => Key::Interface(id),
            Node::Type(id) => Key::Type(id),
            Node::Function(f) => Key::Function(f),
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Node<'_> {}

impl From<WorldId> for Node<'_> {
    fn from(id: WorldId) -> Self {
        Node::World(id)
    }
}

impl From<InterfaceId> for Node<'_> {
    fn from(id: InterfaceId) -> Self {
        Node::Interface(id)
    }
}

impl From<TypeId> for Node<'_> {
    fn from(id: TypeId) -> Self {
        Node::Type(id)
    }
}

impl From<PackageId> for Node<'_> {
    fn from(id: PackageId) -> Self {
        Node::Package(id)
    }
}

impl<'a> From<&'a Function> for Node<'a> {
    fn from(f: &'a Function) -> Self {
        Node::Function(f)
    }
}

impl<'a> Node<'a> {
    fn from_world_item(item: &'a WorldItem) -> Node<'a> {
        match item {
            WorldItem::Interface { id, .. } => Node::Interface(*id),
            WorldItem::Function(f) => Node::Function(f),
            WorldItem::Type(id) => Node::Type(*id),
        }
    }
}

impl Resolve {
    /// Returns whether `node` depends on `dep`, directly or transitively.
    ///
    /// Every node depends on itself. Otherwise:
    ///
    /// * a package depends on its interfaces and worlds,
    /// * a world depends on its package and its imported and exported items,
    /// * an interface depends on its package, its types and its functions,
    /// * a type depends on its owner, its owner's package and the types it
    ///   refers to,
    /// * a function depends on the types of its parameters and results and
    ///   on the resource it's attached to.
    ///
    /// The package and owner links are only compared against `dep` and never
    /// traversed, so asking whether an interface depends on one of its
    /// siblings is `false` even though both belong to the same package.
    pub fn depends_on<'a>(&'a self, node: Node<'a>, dep: Node<'_>) -> bool {
        let dep = dep.key();
        let mut visited = HashSet::new();
        let mut stack = vec![node];
        while let Some(node) = stack.pop() {
            if node.key() == dep {
                return true;
            }
            if !visited.insert(node.key()) {
                continue;
            }
            match node {
                Node::Package(id) => {
                    let pkg = &self.packages[id];
                    stack.extend(pkg.interfaces.values().map(|id| Node::Interface(*id)));
                    stack.extend(pkg.worlds.values().map(|id| Node::World(*id)));
                }
                Node::World(id) => {
                    let world = &self.worlds[id];
                    if world.package.map(Key::Package) == Some(dep) {
                        return true;
                    }
                    stack.extend(world.all_items().map(|(_, item)| Node::from_world_item(item)));
                }
                Node::Interface(id) => {
                    let iface = &self.interfaces[id];
                    if iface.package.map(Key::Package) == Some(dep) {
                        return true;
                    }
                    stack.extend(iface.types.values().map(|id| Node::Type(*id)));
                    stack.extend(iface.functions.values().map(Node::Function));
                }
                Node::Type(id) => {
                    let def = &self.types[id];
                    let (owner, package) = match def.owner {
                        TypeOwner::World(w) => (Some(Key::World(w)), self.worlds[w].package),
                        TypeOwner::Interface(i) => {
                            (Some(Key::Interface(i)), self.interfaces[i].package)
                        }
                        TypeOwner::None => (None, None),
                    };
                    if owner == Some(dep) || package.map(Key::Package) == Some(dep) {
                        return true;
                    }
                    self.any_type(&def.kind, &mut |ty| {
                        if let Type::Id(id) = ty {
                            stack.push(Node::Type(*id));
                        }
                        false
                    });
                }
                Node::Function(func) => {
                    if let Some(id) = func.kind_type() {
                        stack.push(Node::Type(id));
                    }
                    let types = func.params.iter().map(|(_, ty)| ty);
                    for ty in types.chain(func.results.iter_types()) {
                        if let Type::Id(id) = ty {
                            stack.push(Node::Type(*id));
                        }
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::Node;
    use crate::*;

    struct Graph {
        resolve: Resolve,
        pkg: PackageId,
        world: WorldId,
        types_iface: InterfaceId,
        api_iface: InterfaceId,
        record: TypeId,
    }

    // package test:pkg
    //   interface types { record r { x: u32 } }
    //   interface api { use types.{r}; f: func(x: r); }
    //   world w { import api; export g: func(); }
    fn graph() -> Graph {
        let mut resolve = Resolve::default();
        let pkg = resolve.packages.alloc(Package {
            name: Ident::parse("test:pkg").unwrap(),
            docs: Docs::default(),
            interfaces: IndexMap::new(),
            worlds: IndexMap::new(),
        });
        let types_iface = resolve.interfaces.alloc(Interface {
            name: Some("types".to_string()),
            package: Some(pkg),
            ..Interface::default()
        });
        let api_iface = resolve.interfaces.alloc(Interface {
            name: Some("api".to_string()),
            package: Some(pkg),
            ..Interface::default()
        });
        let record = resolve.types.alloc(TypeDef {
            name: Some("r".to_string()),
            owner: TypeOwner::Interface(types_iface),
            ..TypeDef::anonymous(TypeDefKind::Record(Record {
                fields: vec![Field {
                    name: "x".to_string(),
                    ty: Type::U32,
                    docs: Docs::default(),
                }],
            }))
        });
        let alias = resolve.types.alloc(TypeDef {
            name: Some("r".to_string()),
            owner: TypeOwner::Interface(api_iface),
            ..TypeDef::anonymous(TypeDefKind::Type(Type::Id(record)))
        });
        resolve.interfaces[types_iface]
            .types
            .insert("r".to_string(), record);
        resolve.interfaces[api_iface]
            .types
            .insert("r".to_string(), alias);
        resolve.interfaces[api_iface].functions.insert(
            "f".to_string(),
            Function {
                name: "f".to_string(),
                kind: FunctionKind::Freestanding,
                params: vec![("x".to_string(), Type::Id(alias))],
                results: Results::empty(),
                docs: Docs::default(),
                stability: Stability::Unknown,
            },
        );
        let world = resolve.worlds.alloc(World {
            name: "w".to_string(),
            package: Some(pkg),
            ..World::default()
        });
        resolve.worlds[world].imports.insert(
            WorldKey::Interface(api_iface),
            WorldItem::Interface {
                id: api_iface,
                stability: Stability::Unknown,
            },
        );
        resolve.worlds[world].exports.insert(
            WorldKey::Name("g".to_string()),
            WorldItem::Function(Function {
                name: "g".to_string(),
                kind: FunctionKind::Freestanding,
                params: Vec::new(),
                results: Results::empty(),
                docs: Docs::default(),
                stability: Stability::Unknown,
            }),
        );
        let p = &mut resolve.packages[pkg];
        p.interfaces.insert("types".to_string(), types_iface);
        p.interfaces.insert("api".to_string(), api_iface);
        p.worlds.insert("w".to_string(), world);
        Graph {
            resolve,
            pkg,
            world,
            types_iface,
            api_iface,
            record,
        }
    }

    #[test]
    fn reflexive() {
        let g = graph();
        let r = &g.resolve;
        for node in [
            Node::Package(g.pkg),
            Node::World(g.world),
            Node::Interface(g.api_iface),
            Node::Type(g.record),
        ] {
            assert!(r.depends_on(node, node));
        }
        let f = &r.interfaces[g.api_iface].functions["f"];
        assert!(r.depends_on(Node::Function(f), Node::Function(f)));
    }

    #[test]
    fn transitive() {
        let g = graph();
        let r = &g.resolve;
        assert!(r.depends_on(g.world.into(), g.api_iface.into()));
        assert!(r.depends_on(g.world.into(), g.types_iface.into()));
        assert!(r.depends_on(g.world.into(), g.record.into()));
        assert!(r.depends_on(g.world.into(), g.pkg.into()));
        assert!(r.depends_on(g.pkg.into(), g.record.into()));

        let f = &r.interfaces[g.api_iface].functions["f"];
        assert!(r.depends_on(g.world.into(), f.into()));
        assert!(r.depends_on(f.into(), g.types_iface.into()));
    }

    #[test]
    fn not_symmetric() {
        let g = graph();
        let r = &g.resolve;
        assert!(!r.depends_on(g.types_iface.into(), g.api_iface.into()));
        assert!(!r.depends_on(g.types_iface.into(), g.world.into()));
        assert!(!r.depends_on(g.record.into(), g.world.into()));
    }

    #[test]
    fn functions_compare_by_address() {
        let g = graph();
        let r = &g.resolve;
        let g_fn = match &r.worlds[g.world].exports[0] {
            WorldItem::Function(f) => f,
            _ => unreachable!(),
        };
        let copy = g_fn.clone();
        assert!(r.depends_on(g.world.into(), g_fn.into()));
        assert!(!r.depends_on(g.world.into(), (&copy).into()));
    }
}
