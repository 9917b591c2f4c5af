use crate::*;
use indexmap::IndexSet;
use std::borrow::Cow;

impl Resolve {
    /// Returns a new `Resolve` containing only the world `world` and
    /// everything related to it.
    ///
    /// See [`Resolve::prune_to`].
    pub fn prune_to_world(&self, world: WorldId) -> Resolve {
        self.prune_to(Node::World(world))
    }

    /// Returns a new `Resolve` containing only the interface `iface` and
    /// everything it depends on.
    ///
    /// See [`Resolve::prune_to`].
    pub fn prune_to_interface(&self, iface: InterfaceId) -> Resolve {
        self.prune_to(Node::Interface(iface))
    }

    /// Returns a deep copy of the subset of this `Resolve` related to
    /// `target`.
    ///
    /// The copy keeps:
    ///
    /// * packages which depend on `target` or which `target` depends on,
    /// * worlds which depend on `target`, with their imports and exports
    ///   limited to the interfaces and functions `target` depends on,
    /// * interfaces which `target` depends on,
    /// * every type reachable from the kept worlds and interfaces,
    ///
    /// along with the owners and packages of everything kept, so the result
    /// is self-contained. Items retain their relative order and `self` is
    /// left untouched.
    pub fn prune_to(&self, target: Node<'_>) -> Resolve {
        let mut packages = self
            .packages
            .iter()
            .map(|(id, _)| id)
            .filter(|id| {
                self.depends_on(Node::Package(*id), target)
                    || self.depends_on(target, Node::Package(*id))
            })
            .collect::<IndexSet<_>>();
        let mut worlds = self
            .worlds
            .iter()
            .filter(|(id, _)| self.depends_on(Node::World(*id), target))
            .map(|(id, world)| (id, self.prune_world(world, target)))
            .collect::<IndexMap<_, _>>();
        let mut interfaces = self
            .interfaces
            .iter()
            .map(|(id, _)| id)
            .filter(|id| self.depends_on(target, Node::Interface(*id)))
            .collect::<IndexSet<_>>();

        // Types pull in their owners, and everything pulls in its package,
        // which may in turn make more types live.
        let live = loop {
            let mut changed = false;
            for world in worlds.values() {
                for id in world.all_interfaces() {
                    changed |= interfaces.insert(id);
                }
            }

            let mut live = LiveTypes::default();
            for (_, world) in worlds.iter() {
                for (_, item) in world.all_items() {
                    live.add_world_item(self, item);
                }
            }
            for id in interfaces.iter() {
                live.add_interface(self, *id);
            }

            for id in live.iter() {
                match self.types[id].owner {
                    TypeOwner::Interface(i) => {
                        if interfaces.insert(i) {
                            log::debug!(
                                "keeping interface {} as the owner of a live type",
                                i.index()
                            );
                            changed = true;
                        }
                    }
                    TypeOwner::World(w) => {
                        if !worlds.contains_key(&w) {
                            log::debug!(
                                "keeping world `{}` as the owner of a live type",
                                self.worlds[w].name
                            );
                            worlds.insert(w, self.prune_world(&self.worlds[w], target));
                            changed = true;
                        }
                    }
                    TypeOwner::None => {}
                }
            }

            let owners = worlds
                .values()
                .filter_map(|w| w.package)
                .chain(interfaces.iter().filter_map(|i| self.interfaces[*i].package));
            for pkg in owners.collect::<Vec<_>>() {
                changed |= packages.insert(pkg);
            }

            if !changed {
                break live;
            }
        };

        log::debug!(
            "pruning to {} packages, {} worlds, {} interfaces and {} types",
            packages.len(),
            worlds.len(),
            interfaces.len(),
            live.len(),
        );

        let mut pruned = Resolve::default();
        let mut cloner = Cloner::new(self, &mut pruned);
        for (id, _) in self.packages.iter() {
            if packages.contains(&id) {
                cloner.reserve_package(id);
            }
        }
        for (id, _) in self.worlds.iter() {
            if worlds.contains_key(&id) {
                cloner.reserve_world(id);
            }
        }
        for (id, _) in self.interfaces.iter() {
            if interfaces.contains(&id) {
                cloner.reserve_interface(id);
            }
        }
        for (id, _) in self.types.iter() {
            if live.contains(id) {
                cloner.reserve_type(id);
            }
        }

        for (id, pkg) in self.packages.iter() {
            if packages.contains(&id) {
                let pkg = prune_package(pkg, &interfaces, &worlds);
                cloner.populate_package(id, &pkg);
            }
        }
        for (id, _) in self.worlds.iter() {
            if let Some(world) = worlds.get(&id) {
                cloner.populate_world(id, world);
            }
        }
        for (id, iface) in self.interfaces.iter() {
            if interfaces.contains(&id) {
                cloner.populate_interface(id, iface);
            }
        }
        for (id, ty) in self.types.iter() {
            if live.contains(id) {
                cloner.populate_type(id, ty);
            }
        }

        pruned.package_names = pruned
            .packages
            .iter()
            .map(|(id, pkg)| (pkg.name.clone(), id))
            .collect();
        pruned
    }

    /// Removes the interfaces and functions from `world` which `target`
    /// doesn't depend on. Types are always kept.
    fn prune_world<'a>(&self, world: &'a World, target: Node<'_>) -> Cow<'a, World> {
        // Note that functions are identified by address, so decisions must be
        // made against the items in `world` rather than against a copy.
        let keep = |item: &WorldItem| match item {
            WorldItem::Interface { id, .. } => self.depends_on(target, Node::Interface(*id)),
            WorldItem::Function(f) => self.depends_on(target, Node::Function(f)),
            WorldItem::Type(_) => true,
        };
        let filter = |items: &IndexMap<WorldKey, WorldItem>| {
            items
                .iter()
                .filter(|&(_, item)| keep(item))
                .map(|(key, item)| (key.clone(), item.clone()))
                .collect::<IndexMap<_, _>>()
        };

        let mut ret = Cow::Borrowed(world);
        if !world.imports.values().all(keep) {
            ret.to_mut().imports = filter(&world.imports);
        }
        if !world.exports.values().all(keep) {
            ret.to_mut().exports = filter(&world.exports);
        }
        ret
    }
}

/// Removes the interfaces and worlds from `pkg` which aren't being kept.
fn prune_package<'a>(
    pkg: &'a Package,
    interfaces: &IndexSet<InterfaceId>,
    worlds: &IndexMap<WorldId, Cow<'_, World>>,
) -> Cow<'a, Package> {
    let mut ret = Cow::Borrowed(pkg);
    if !pkg.interfaces.values().all(|id| interfaces.contains(id)) {
        ret.to_mut()
            .interfaces
            .retain(|_, id| interfaces.contains(&*id));
    }
    if !pkg.worlds.values().all(|id| worlds.contains_key(id)) {
        ret.to_mut().worlds.retain(|_, id| worlds.contains_key(&*id));
    }
    ret
}
