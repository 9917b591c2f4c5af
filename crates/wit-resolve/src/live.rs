use crate::{Function, FunctionKind, Handle, InterfaceId, Resolve, Type, TypeDefKind, TypeId, WorldItem};
use indexmap::IndexSet;
use std::collections::HashSet;

/// The set of types reachable from some set of roots.
///
/// Iteration yields types in dependency order: a type is always yielded after
/// all of the types it refers to.
#[derive(Default)]
pub struct LiveTypes {
    set: IndexSet<TypeId>,
}

impl LiveTypes {
    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.set.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.set.contains(&id)
    }

    /// Adds every type defined in, or used by a function of, `iface`.
    pub fn add_interface(&mut self, resolve: &Resolve, iface: InterfaceId) {
        let iface = &resolve.interfaces[iface];
        for id in iface.types.values() {
            self.add_type_id(resolve, *id);
        }
        for func in iface.functions.values() {
            self.add_func(resolve, func);
        }
    }

    pub fn add_world_item(&mut self, resolve: &Resolve, item: &WorldItem) {
        match item {
            WorldItem::Interface { id, .. } => self.add_interface(resolve, *id),
            WorldItem::Function(f) => self.add_func(resolve, f),
            WorldItem::Type(t) => self.add_type_id(resolve, *t),
        }
    }

    /// Adds `id` after everything it refers to.
    pub fn add_type_id(&mut self, resolve: &Resolve, id: TypeId) {
        let mut entered = HashSet::new();
        let mut pending = vec![(id, false)];
        while let Some((id, expanded)) = pending.pop() {
            if self.set.contains(&id) {
                continue;
            }
            if expanded {
                self.set.insert(id);
                continue;
            }
            if !entered.insert(id) {
                continue;
            }
            pending.push((id, true));
            // Pushed in reverse so the first reference is finished first.
            let refs = direct_refs(&resolve.types[id].kind);
            for dep in refs.into_iter().rev() {
                if !self.set.contains(&dep) {
                    pending.push((dep, false));
                }
            }
        }
    }

    fn add_func(&mut self, resolve: &Resolve, func: &Function) {
        // Methods and constructors mention their resource in their signature
        // already, static functions may not.
        if let FunctionKind::Static(id) = func.kind {
            self.add_type_id(resolve, id);
        }
        let types = func.params.iter().map(|(_, ty)| ty).chain(func.results.iter_types());
        for ty in types {
            if let Type::Id(id) = ty {
                self.add_type_id(resolve, *id);
            }
        }
    }
}

/// Returns the types that `kind` refers to directly, in declaration order.
fn direct_refs(kind: &TypeDefKind) -> Vec<TypeId> {
    let types: Vec<&Type> = match kind {
        TypeDefKind::Type(t)
        | TypeDefKind::List(t)
        | TypeDefKind::Option(t)
        | TypeDefKind::Pointer(t)
        | TypeDefKind::Future(Some(t))
        | TypeDefKind::Stream(Some(t)) => vec![t],
        TypeDefKind::Handle(Handle::Own(id) | Handle::Borrow(id)) => return vec![*id],
        TypeDefKind::Record(r) => r.fields.iter().map(|f| &f.ty).collect(),
        TypeDefKind::Tuple(t) => t.types.iter().collect(),
        TypeDefKind::Variant(v) => v.cases.iter().filter_map(|c| c.ty.as_ref()).collect(),
        TypeDefKind::Result(r) => r.ok.iter().chain(r.err.iter()).collect(),
        TypeDefKind::Resource
        | TypeDefKind::Flags(_)
        | TypeDefKind::Enum(_)
        | TypeDefKind::ErrorContext
        | TypeDefKind::Future(None)
        | TypeDefKind::Stream(None)
        | TypeDefKind::Unknown => Vec::new(),
    };
    types
        .into_iter()
        .filter_map(|ty| match ty {
            Type::Id(id) => Some(*id),
            _ => None,
        })
        .collect()
}
