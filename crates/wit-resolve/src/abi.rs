use crate::{Function, FunctionKind, Handle, Int, Resolve, SizeAlign, Type, TypeDefKind};

/// A core WebAssembly signature with params and results.
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct WasmSignature {
    /// The WebAssembly parameters of this function.
    pub params: Vec<WasmType>,

    /// The WebAssembly results of this function.
    pub results: Vec<WasmType>,

    /// Whether or not this signature is passing all of its parameters
    /// indirectly through a pointer within `params`.
    ///
    /// Note that `params` still reflects the true wasm parameters of this
    /// function, this is auxiliary information for code generators if
    /// necessary.
    pub indirect_params: bool,

    /// Whether or not this signature is using a return pointer to store the
    /// result of the function, which is reflected either in `params` or
    /// `results` depending on the context this function is used (e.g. an import
    /// or an export).
    pub retptr: bool,
}

/// Enumerates wasm types used by interface types when lowering/lifting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WasmType {
    I32,
    I64,
    F32,
    F64,

    /// A pointer into linear memory, lowered to `i32`.
    ///
    /// This is kept distinct from `I32` so that bindings can preserve
    /// provenance; users that don't care can treat it as `i32`.
    Pointer,
}

impl WasmType {
    /// Size in bytes of this core wasm value.
    pub fn size(&self) -> usize {
        match self {
            WasmType::I32 | WasmType::F32 | WasmType::Pointer => 4,
            WasmType::I64 | WasmType::F64 => 8,
        }
    }
}

/// Unifies two flat types occupying the same slot of different variant
/// cases.
///
/// Identical types are kept, two 32-bit types share an `i32`, and anything
/// else widens to `i64`.
pub fn join(a: WasmType, b: WasmType) -> WasmType {
    if a == b {
        a
    } else if a.size() == 4 && b.size() == 4 {
        WasmType::I32
    } else {
        WasmType::I64
    }
}

impl From<Int> for WasmType {
    fn from(i: Int) -> WasmType {
        match i {
            Int::U8 | Int::U16 | Int::U32 => WasmType::I32,
            Int::U64 => WasmType::I64,
        }
    }
}

/// We use a different ABI for wasm importing functions exported by the host
/// than for wasm exporting functions imported by the host.
///
/// The bindings ABI has a concept of a "guest" and a "host". There are two
/// variants of the ABI, one specialized for the "guest" importing and calling
/// a function defined and exported in the "host", and the other specialized for
/// the "host" importing and calling a function defined and exported in the "guest".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AbiVariant {
    /// The guest is importing and calling the function.
    GuestImport,
    /// The guest is defining and exporting the function.
    GuestExport,
}

const MAX_FLAT_PARAMS: usize = 16;
const MAX_FLAT_RESULTS: usize = 1;

impl Resolve {
    /// Get the WebAssembly type signature for this interface function
    ///
    /// The first entry returned is the list of parameters and the second entry
    /// is the list of results for the wasm function signature.
    pub fn wasm_signature(&self, variant: AbiVariant, func: &Function) -> WasmSignature {
        let mut params = Vec::new();
        let mut indirect_params = false;
        for (_, param) in func.params.iter() {
            self.push_flat(param, &mut params);
        }

        if params.len() > MAX_FLAT_PARAMS {
            params.truncate(0);
            params.push(WasmType::Pointer);
            indirect_params = true;
        } else if matches!(
            (&func.kind, variant),
            (FunctionKind::Method(_), AbiVariant::GuestExport)
        ) {
            // Guest exported methods always receive resource rep as first argument
            if let Some(first @ WasmType::I32) = params.first_mut() {
                *first = WasmType::Pointer;
            }
        }

        let mut results = Vec::new();
        for ty in func.results.iter_types() {
            self.push_flat(ty, &mut results)
        }

        let mut retptr = false;

        // Multiple flat results are returned through memory instead. Imports
        // take a return pointer to write into and exports return a pointer
        // they wrote into.
        if results.len() > MAX_FLAT_RESULTS {
            retptr = true;
            results.truncate(0);
            match variant {
                AbiVariant::GuestImport => {
                    params.push(WasmType::Pointer);
                }
                AbiVariant::GuestExport => {
                    results.push(WasmType::Pointer);
                }
            }
        }

        WasmSignature {
            params,
            indirect_params,
            results,
            retptr,
        }
    }

    /// Returns the flattened representation of `ty`.
    pub fn flat(&self, ty: &Type) -> Vec<WasmType> {
        let mut result = Vec::new();
        self.push_flat(ty, &mut result);
        result
    }

    /// Appends the flat wasm types representing `ty` onto the `result`
    /// list provided.
    pub fn push_flat(&self, ty: &Type, result: &mut Vec<WasmType>) {
        match ty {
            Type::Bool
            | Type::S8
            | Type::U8
            | Type::S16
            | Type::U16
            | Type::S32
            | Type::U32
            | Type::Char
            | Type::ErrorContext => result.push(WasmType::I32),

            Type::U64 | Type::S64 => result.push(WasmType::I64),
            Type::F32 => result.push(WasmType::F32),
            Type::F64 => result.push(WasmType::F64),
            Type::String => {
                result.push(WasmType::Pointer);
                result.push(WasmType::I32);
            }

            Type::Id(id) => self.push_flat_kind(&self.types[*id].kind, result),
        }
    }

    /// Appends the flat wasm types representing a value of `kind`.
    pub fn push_flat_kind(&self, kind: &TypeDefKind, result: &mut Vec<WasmType>) {
        match kind {
            TypeDefKind::Type(t) => self.push_flat(t, result),

            TypeDefKind::Handle(_)
            | TypeDefKind::Resource
            | TypeDefKind::Future(_)
            | TypeDefKind::Stream(_)
            | TypeDefKind::ErrorContext => result.push(WasmType::I32),

            TypeDefKind::Pointer(_) => result.push(WasmType::Pointer),

            TypeDefKind::Record(r) => {
                for field in r.fields.iter() {
                    self.push_flat(&field.ty, result);
                }
            }

            TypeDefKind::Flags(r) => {
                for _ in 0..r.flat_count() {
                    result.push(WasmType::I32);
                }
            }

            TypeDefKind::List(_) => {
                result.push(WasmType::Pointer);
                result.push(WasmType::I32);
            }

            TypeDefKind::Variant(v) => {
                result.push(v.tag().into());
                self.push_flat_variants(v.cases.iter().map(|c| c.ty.as_ref()), result);
            }

            TypeDefKind::Tuple(_)
            | TypeDefKind::Enum(_)
            | TypeDefKind::Option(_)
            | TypeDefKind::Result(_) => self.push_flat_kind(&kind.despecialize(), result),

            TypeDefKind::Unknown => unreachable!("unknown type cannot be flattened"),
        }
    }

    fn push_flat_variants<'a>(
        &self,
        tys: impl IntoIterator<Item = Option<&'a Type>>,
        result: &mut Vec<WasmType>,
    ) {
        let mut temp = Vec::new();
        let start = result.len();

        // Push each case's type onto a temporary vector, and then
        // merge that vector into our final list starting at
        // `start`. Note that this requires some degree of
        // "unification" so we can handle things like `Result<i32,
        // f32>` where that turns into `[i32 i32]` where the second
        // `i32` might be the `f32` bitcasted.
        for ty in tys.into_iter().flatten() {
            self.push_flat(ty, &mut temp);

            for (i, ty) in temp.drain(..).enumerate() {
                match result.get_mut(start + i) {
                    Some(prev) => *prev = join(*prev, ty),
                    None => result.push(ty),
                }
            }
        }
    }

    /// Returns whether a value of `ty` contains a pointer into linear memory.
    pub fn has_pointer(&self, ty: &Type) -> bool {
        match ty {
            Type::String => true,
            Type::Id(id) => match &self.types[*id].kind {
                TypeDefKind::List(_) | TypeDefKind::Pointer(_) => true,
                kind => self.any_type(kind, &mut |t| self.has_pointer(t)),
            },
            _ => false,
        }
    }

    /// Returns whether a value of `ty` contains a `borrow<T>` handle.
    pub fn has_borrow(&self, ty: &Type) -> bool {
        match ty {
            Type::Id(id) => match &self.types[*id].kind {
                TypeDefKind::Handle(Handle::Borrow(_)) => true,
                kind => self.any_type(kind, &mut |t| self.has_borrow(t)),
            },
            _ => false,
        }
    }

    /// Returns whether a value of `ty` refers to a resource, either directly
    /// or through an `own<T>` or `borrow<T>` handle.
    pub fn has_resource(&self, ty: &Type) -> bool {
        match ty {
            Type::Id(id) => match &self.types[*id].kind {
                TypeDefKind::Resource => true,
                kind => self.any_type(kind, &mut |t| self.has_resource(t)),
            },
            _ => false,
        }
    }

    /// Tests `f` against each type directly contained in `kind`.
    pub(crate) fn any_type(&self, kind: &TypeDefKind, f: &mut dyn FnMut(&Type) -> bool) -> bool {
        match kind {
            TypeDefKind::Type(t)
            | TypeDefKind::List(t)
            | TypeDefKind::Option(t)
            | TypeDefKind::Pointer(t)
            | TypeDefKind::Future(Some(t))
            | TypeDefKind::Stream(Some(t)) => f(t),
            TypeDefKind::Handle(Handle::Own(id) | Handle::Borrow(id)) => f(&Type::Id(*id)),
            TypeDefKind::Record(r) => r.fields.iter().any(|field| f(&field.ty)),
            TypeDefKind::Tuple(t) => t.types.iter().any(|t| f(t)),
            TypeDefKind::Variant(v) => v.cases.iter().filter_map(|c| c.ty.as_ref()).any(f),
            TypeDefKind::Result(r) => r.ok.iter().chain(r.err.iter()).any(f),
            TypeDefKind::Resource
            | TypeDefKind::Flags(_)
            | TypeDefKind::Enum(_)
            | TypeDefKind::ErrorContext
            | TypeDefKind::Future(None)
            | TypeDefKind::Stream(None)
            | TypeDefKind::Unknown => false,
        }
    }

    fn is_bool(&self, ty: &Type) -> bool {
        match ty {
            Type::Bool => true,
            Type::Id(id) => matches!(
                self.types[self.type_root(*id)].kind,
                TypeDefKind::Type(Type::Bool)
            ),
            _ => false,
        }
    }

    /// Selects the type whose layout represents the payload of a variant
    /// with the case types `types`.
    ///
    /// This is the largest type, except that `bool` is never chosen when any
    /// other type is available and, among equally sized types, one containing
    /// a pointer is preferred. Remaining ties keep the order of `types`.
    pub fn variant_shape(&self, sizes: &SizeAlign, types: &[Type]) -> Option<Type> {
        let mut types = types.to_vec();
        types.sort_by(|a, b| {
            sizes
                .size(b)
                .cmp(&sizes.size(a))
                .then_with(|| self.is_bool(a).cmp(&self.is_bool(b)))
                .then_with(|| self.has_pointer(b).cmp(&self.has_pointer(a)))
        });
        types.first().copied()
    }

    /// Selects the type with the largest alignment among `types`, the first
    /// one winning ties.
    pub fn variant_align(&self, sizes: &SizeAlign, types: &[Type]) -> Option<Type> {
        let mut types = types.to_vec();
        types.sort_by(|a, b| sizes.align(b).cmp(&sizes.align(a)));
        types.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;
    use pretty_assertions::assert_eq;
    use super::WasmType::*;

    fn anon(resolve: &mut Resolve, kind: TypeDefKind) -> Type {
        Type::Id(resolve.types.alloc(TypeDef::anonymous(kind)))
    }

    #[test]
    fn joins() {
        assert_eq!(join(I32, I32), I32);
        assert_eq!(join(Pointer, Pointer), Pointer);
        assert_eq!(join(I32, F32), I32);
        assert_eq!(join(Pointer, I32), I32);
        assert_eq!(join(F32, F64), I64);
        assert_eq!(join(I64, F64), I64);
        assert_eq!(join(F64, F64), F64);
        assert_eq!(join(I32, I64), I64);
    }

    #[test]
    fn flat_primitives() {
        let resolve = Resolve::default();
        assert_eq!(resolve.flat(&Type::Bool), [I32]);
        assert_eq!(resolve.flat(&Type::U64), [I64]);
        assert_eq!(resolve.flat(&Type::F32), [F32]);
        assert_eq!(resolve.flat(&Type::String), [Pointer, I32]);
        assert_eq!(resolve.flat(&Type::ErrorContext), [I32]);
    }

    #[test]
    fn flat_list_of_u8() {
        let mut resolve = Resolve::default();
        let list = anon(&mut resolve, TypeDefKind::List(Type::U8));
        assert_eq!(resolve.flat(&list), [Pointer, I32]);
        assert!(resolve.has_pointer(&list));
    }

    #[test]
    fn flat_variants() {
        let mut resolve = Resolve::default();
        let result = anon(
            &mut resolve,
            TypeDefKind::Result(Result_ {
                ok: Some(Type::S32),
                err: Some(Type::F32),
            }),
        );
        assert_eq!(resolve.flat(&result), [I32, I32]);

        let option = anon(&mut resolve, TypeDefKind::Option(Type::F64));
        assert_eq!(resolve.flat(&option), [I32, F64]);

        let tuple = anon(
            &mut resolve,
            TypeDefKind::Tuple(Tuple {
                types: vec![Type::String, Type::U64],
            }),
        );
        let mixed = anon(
            &mut resolve,
            TypeDefKind::Result(Result_ {
                ok: Some(tuple),
                err: Some(Type::F32),
            }),
        );
        assert_eq!(resolve.flat(&mixed), [I32, I32, I32, I64]);

        let flags = anon(&mut resolve, TypeDefKind::Flags(Flags { flags: vec![] }));
        assert!(resolve.flat(&flags).is_empty());
    }

    #[test]
    fn despecialized_flat_matches() {
        let mut resolve = Resolve::default();
        let kinds = [
            TypeDefKind::Tuple(Tuple {
                types: vec![Type::U8, Type::String, Type::F64],
            }),
            TypeDefKind::Enum(Enum {
                cases: (0..300)
                    .map(|i| EnumCase {
                        name: format!("c{i}"),
                        docs: Docs::default(),
                    })
                    .collect(),
            }),
            TypeDefKind::Option(Type::String),
            TypeDefKind::Result(Result_ {
                ok: Some(Type::U32),
                err: None,
            }),
        ];
        let ids = kinds
            .iter()
            .map(|kind| anon(&mut resolve, kind.clone()))
            .collect::<Vec<_>>();
        let mut sizes = SizeAlign::new();
        sizes.fill(&resolve);
        for (kind, id) in kinds.iter().zip(ids) {
            let despecialized = kind.despecialize();
            let mut flat = Vec::new();
            resolve.push_flat_kind(&despecialized, &mut flat);
            assert_eq!(resolve.flat(&id), flat);
            assert_eq!(sizes.calculate(&despecialized), sizes.calculate(kind));
            assert_eq!(sizes.size(&id), sizes.calculate(&despecialized).size);
        }
    }

    #[test]
    fn predicates() {
        let mut resolve = Resolve::default();
        let res = resolve.types.alloc(TypeDef::anonymous(TypeDefKind::Resource));
        let own = anon(&mut resolve, TypeDefKind::Handle(Handle::Own(res)));
        let borrow = anon(&mut resolve, TypeDefKind::Handle(Handle::Borrow(res)));
        let list = anon(&mut resolve, TypeDefKind::List(borrow));
        let record = anon(
            &mut resolve,
            TypeDefKind::Record(Record {
                fields: vec![Field {
                    name: "a".to_string(),
                    ty: own,
                    docs: Docs::default(),
                }],
            }),
        );
        let future = anon(&mut resolve, TypeDefKind::Future(Some(Type::String)));

        assert!(resolve.has_resource(&Type::Id(res)));
        assert!(resolve.has_resource(&own));
        assert!(resolve.has_resource(&record));
        assert!(!resolve.has_borrow(&own));
        assert!(resolve.has_borrow(&borrow));
        assert!(resolve.has_borrow(&list));
        assert!(!resolve.has_borrow(&record));
        assert!(resolve.has_pointer(&list));
        assert!(!resolve.has_pointer(&record));
        assert!(resolve.has_pointer(&future));
        assert!(!resolve.has_pointer(&Type::U64));
    }

    #[test]
    fn variant_shape_prefers_pointers() {
        let mut resolve = Resolve::default();
        let alias = anon(&mut resolve, TypeDefKind::Type(Type::Bool));
        let list = anon(&mut resolve, TypeDefKind::List(Type::U8));
        let mut sizes = SizeAlign::new();
        sizes.fill(&resolve);

        let shape = resolve.variant_shape(&sizes, &[Type::Bool, Type::U8, Type::String]);
        assert_eq!(shape, Some(Type::String));

        // Equal sizes: never pick bool, even through an alias.
        let shape = resolve.variant_shape(&sizes, &[Type::Bool, Type::U8]);
        assert_eq!(shape, Some(Type::U8));
        let shape = resolve.variant_shape(&sizes, &[alias, Type::S8]);
        assert_eq!(shape, Some(Type::S8));
        assert_eq!(resolve.variant_shape(&sizes, &[Type::Bool]), Some(Type::Bool));

        // Equal sizes: prefer the pointer.
        let shape = resolve.variant_shape(&sizes, &[Type::U64, list]);
        assert_eq!(shape, Some(list));

        assert_eq!(resolve.variant_shape(&sizes, &[]), None);
    }

    #[test]
    fn variant_align_picks_largest() {
        let resolve = Resolve::default();
        let sizes = SizeAlign::new();
        let align = resolve.variant_align(&sizes, &[Type::U8, Type::U32, Type::F32, Type::U16]);
        assert_eq!(align, Some(Type::U32));
    }

    #[test]
    fn signatures() {
        let mut resolve = Resolve::default();
        let tuple = anon(
            &mut resolve,
            TypeDefKind::Tuple(Tuple {
                types: vec![Type::String, Type::String],
            }),
        );
        let func = |params: Vec<Type>, results: Results| Function {
            name: "f".to_string(),
            kind: FunctionKind::Freestanding,
            params: params
                .into_iter()
                .enumerate()
                .map(|(i, t)| (format!("p{i}"), t))
                .collect(),
            results,
            docs: Docs::default(),
            stability: Stability::Unknown,
        };

        let sig = resolve.wasm_signature(
            AbiVariant::GuestImport,
            &func(vec![Type::U32, Type::String], Results::Anon(Type::U64)),
        );
        assert_eq!(sig.params, [I32, Pointer, I32]);
        assert_eq!(sig.results, [I64]);
        assert!(!sig.retptr && !sig.indirect_params);

        let sig = resolve.wasm_signature(
            AbiVariant::GuestImport,
            &func(vec![], Results::Anon(tuple)),
        );
        assert_eq!(sig.params, [Pointer]);
        assert!(sig.results.is_empty());
        assert!(sig.retptr);

        let sig = resolve.wasm_signature(
            AbiVariant::GuestExport,
            &func(vec![], Results::Anon(tuple)),
        );
        assert!(sig.params.is_empty());
        assert_eq!(sig.results, [Pointer]);

        let sig = resolve.wasm_signature(
            AbiVariant::GuestImport,
            &func(vec![Type::String; 9], Results::empty()),
        );
        assert_eq!(sig.params, [Pointer]);
        assert!(sig.indirect_params);
    }
}
