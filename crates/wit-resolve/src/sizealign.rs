use crate::{FlagsRepr, Int, LiveTypes, Resolve, Type, TypeDefKind};

/// Size in bytes of a pointer in linear memory.
///
/// All layout computations derive the representation of `string`, `list<T>`
/// and raw pointers from this single value.
pub const PTR_SIZE: usize = 4;

/// Size and alignment of handles, resources, `future`, `stream` and
/// `error-context` values, which are all represented as a 32-bit index.
const HANDLE: ElementInfo = ElementInfo { size: 4, align: 4 };

/// Size and alignment information for a single type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    pub size: usize,
    pub align: usize,
}

impl Default for ElementInfo {
    fn default() -> ElementInfo {
        ElementInfo { size: 0, align: 1 }
    }
}

/// Canonical ABI size and alignment of every type in a [`Resolve`].
#[derive(Default)]
pub struct SizeAlign {
    map: Vec<ElementInfo>,
}

impl SizeAlign {
    pub fn new() -> Self {
        Self { map: Vec::new() }
    }

    /// Computes the size and alignment of every type within `resolve`.
    ///
    /// Types are visited dependencies-first so the order of `resolve.types`
    /// doesn't matter.
    pub fn fill(&mut self, resolve: &Resolve) {
        self.map = vec![ElementInfo::default(); resolve.types.len()];
        let mut live = LiveTypes::default();
        for (id, _) in resolve.types.iter() {
            live.add_type_id(resolve, id);
        }
        for id in live.iter() {
            self.map[id.index()] = self.calculate(&resolve.types[id].kind);
        }
    }

    /// Computes the size and alignment of `kind`, whose constituent types
    /// must all have already been computed by [`SizeAlign::fill`].
    pub fn calculate(&self, kind: &TypeDefKind) -> ElementInfo {
        match kind {
            TypeDefKind::Type(t) => ElementInfo {
                size: self.size(t),
                align: self.align(t),
            },
            TypeDefKind::List(_) => ElementInfo {
                size: 2 * PTR_SIZE,
                align: PTR_SIZE,
            },
            TypeDefKind::Pointer(_) => ElementInfo {
                size: PTR_SIZE,
                align: PTR_SIZE,
            },
            TypeDefKind::Record(r) => self.record(r.fields.iter().map(|f| &f.ty)),
            TypeDefKind::Flags(f) => match f.repr() {
                FlagsRepr::U8 => int_size_align(Int::U8),
                FlagsRepr::U16 => int_size_align(Int::U16),
                FlagsRepr::U32(n) => ElementInfo {
                    size: n * 4,
                    align: 4,
                },
            },
            TypeDefKind::Variant(v) => self.variant(v.tag(), v.cases.iter().map(|c| c.ty.as_ref())),
            TypeDefKind::Tuple(_)
            | TypeDefKind::Enum(_)
            | TypeDefKind::Option(_)
            | TypeDefKind::Result(_) => self.calculate(&kind.despecialize()),
            TypeDefKind::Handle(_)
            | TypeDefKind::Resource
            | TypeDefKind::Future(_)
            | TypeDefKind::Stream(_)
            | TypeDefKind::ErrorContext => HANDLE,
            TypeDefKind::Unknown => unreachable!("unknown type has no layout"),
        }
    }

    pub fn size(&self, ty: &Type) -> usize {
        match ty {
            Type::Bool | Type::U8 | Type::S8 => 1,
            Type::U16 | Type::S16 => 2,
            Type::U32 | Type::S32 | Type::F32 | Type::Char => 4,
            Type::U64 | Type::S64 | Type::F64 => 8,
            Type::String => 2 * PTR_SIZE,
            Type::ErrorContext => HANDLE.size,
            Type::Id(id) => self.map[id.index()].size,
        }
    }

    pub fn align(&self, ty: &Type) -> usize {
        match ty {
            Type::Bool | Type::U8 | Type::S8 => 1,
            Type::U16 | Type::S16 => 2,
            Type::U32 | Type::S32 | Type::F32 | Type::Char => 4,
            Type::U64 | Type::S64 | Type::F64 => 8,
            Type::String => PTR_SIZE,
            Type::ErrorContext => HANDLE.align,
            Type::Id(id) => self.map[id.index()].align,
        }
    }

    /// Offsets of each of `types` when laid out as the fields of a record.
    pub fn field_offsets<'a>(
        &self,
        types: impl IntoIterator<Item = &'a Type>,
    ) -> Vec<(usize, &'a Type)> {
        let mut cur = 0;
        types
            .into_iter()
            .map(|ty| {
                let ret = align_to(cur, self.align(ty));
                cur = ret + self.size(ty);
                (ret, ty)
            })
            .collect()
    }

    /// Offset of the payload of a variant with discriminant `tag` and the
    /// given case types.
    pub fn payload_offset<'a>(
        &self,
        tag: Int,
        cases: impl IntoIterator<Item = Option<&'a Type>>,
    ) -> usize {
        let max_align = cases
            .into_iter()
            .flatten()
            .map(|ty| self.align(ty))
            .fold(1, usize::max);
        align_to(int_size_align(tag).size, max_align)
    }

    pub fn record<'a>(&self, types: impl Iterator<Item = &'a Type>) -> ElementInfo {
        let mut size = 0;
        let mut align = 1;
        for ty in types {
            let field_size = self.size(ty);
            let field_align = self.align(ty);
            size = align_to(size, field_align) + field_size;
            align = align.max(field_align);
        }
        ElementInfo {
            size: align_to(size, align),
            align,
        }
    }

    pub fn params<'a>(&self, types: impl IntoIterator<Item = &'a Type>) -> ElementInfo {
        self.record(types.into_iter())
    }

    fn variant<'a>(
        &self,
        tag: Int,
        types: impl IntoIterator<Item = Option<&'a Type>>,
    ) -> ElementInfo {
        let ElementInfo {
            size: discrim_size,
            align: discrim_align,
        } = int_size_align(tag);
        let mut case_size = 0;
        let mut case_align = 1;
        for ty in types.into_iter().flatten() {
            case_size = case_size.max(self.size(ty));
            case_align = case_align.max(self.align(ty));
        }
        let align = discrim_align.max(case_align);
        ElementInfo {
            size: align_to(align_to(discrim_size, case_align) + case_size, align),
            align,
        }
    }
}

fn int_size_align(i: Int) -> ElementInfo {
    let n = match i {
        Int::U8 => 1,
        Int::U16 => 2,
        Int::U32 => 4,
        Int::U64 => 8,
    };
    ElementInfo { size: n, align: n }
}

pub(crate) fn align_to(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::*;
    use pretty_assertions::assert_eq;

    fn flags(n: usize) -> TypeDefKind {
        TypeDefKind::Flags(Flags {
            flags: (0..n)
                .map(|i| Flag {
                    name: format!("f{i}"),
                    docs: Docs::default(),
                })
                .collect(),
        })
    }

    #[test]
    fn align() {
        assert_eq!(align_to(0, 4), 0);
        assert_eq!(align_to(1, 4), 4);
        assert_eq!(align_to(5, 8), 8);
        assert_eq!(align_to(8, 8), 8);
        assert_eq!(align_to(3, 1), 3);
    }

    #[test]
    fn flags_buckets() {
        let sizes = SizeAlign::new();
        let got = [0, 8, 9, 16, 17, 32, 33]
            .iter()
            .map(|n| sizes.calculate(&flags(*n)).size)
            .collect::<Vec<_>>();
        assert_eq!(got, [1, 1, 2, 2, 4, 4, 8]);
        let aligns = [0, 9, 17, 33]
            .iter()
            .map(|n| sizes.calculate(&flags(*n)).align)
            .collect::<Vec<_>>();
        assert_eq!(aligns, [1, 2, 4, 4]);
    }

    #[test]
    fn list_of_u8() {
        let sizes = SizeAlign::new();
        let info = sizes.calculate(&TypeDefKind::List(Type::U8));
        assert_eq!(info, ElementInfo { size: 8, align: 4 });
    }

    #[test]
    fn records() {
        let mut resolve = Resolve::default();
        let field = |name: &str, ty| Field {
            name: name.to_string(),
            ty,
            docs: Docs::default(),
        };
        // { a: u8, b: u32, c: u16 } => 1 + pad(3) + 4 + 2 + pad(2)
        let r = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Record(Record {
                fields: vec![
                    field("a", Type::U8),
                    field("b", Type::U32),
                    field("c", Type::U16),
                ],
            })));
        // { x: u8, y: r } => 1 + pad(3) + 12
        let outer = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Record(Record {
                fields: vec![field("x", Type::U8), field("y", Type::Id(r))],
            })));
        let mut sizes = SizeAlign::new();
        sizes.fill(&resolve);
        assert_eq!(sizes.size(&Type::Id(r)), 12);
        assert_eq!(sizes.align(&Type::Id(r)), 4);
        assert_eq!(sizes.size(&Type::Id(outer)), 16);
        let offsets = sizes
            .field_offsets(&[Type::U8, Type::U64, Type::Bool])
            .into_iter()
            .map(|(offset, _)| offset)
            .collect::<Vec<_>>();
        assert_eq!(offsets, [0, 8, 16]);
        assert_eq!(sizes.record([].iter()), ElementInfo { size: 0, align: 1 });
    }

    #[test]
    fn variants() {
        let mut resolve = Resolve::default();
        let option_u64 = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Option(Type::U64)));
        let result = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Result(Result_ {
                ok: Some(Type::String),
                err: Some(Type::U8),
            })));
        let empty = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Result(Result_ {
                ok: None,
                err: None,
            })));
        let mut sizes = SizeAlign::new();
        sizes.fill(&resolve);
        assert_eq!(sizes.size(&Type::Id(option_u64)), 16);
        assert_eq!(sizes.align(&Type::Id(option_u64)), 8);
        assert_eq!(sizes.size(&Type::Id(result)), 12);
        assert_eq!(sizes.align(&Type::Id(result)), 4);
        assert_eq!(sizes.size(&Type::Id(empty)), 1);
        assert_eq!(
            sizes.payload_offset(Int::U8, [Some(&Type::U64), None]),
            8
        );
    }

    #[test]
    fn fill_tolerates_any_order() {
        let mut resolve = Resolve::default();
        // Allocate the outer type first and patch it to point at a type
        // allocated afterwards.
        let outer = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Unknown));
        let inner = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Tuple(Tuple {
                types: vec![Type::U32, Type::U64],
            })));
        resolve.types[outer].kind = TypeDefKind::List(Type::Id(inner));
        let alias = resolve
            .types
            .alloc(TypeDef::anonymous(TypeDefKind::Type(Type::Id(inner))));
        let mut sizes = SizeAlign::new();
        sizes.fill(&resolve);
        assert_eq!(sizes.size(&Type::Id(outer)), 8);
        assert_eq!(sizes.size(&Type::Id(inner)), 16);
        assert_eq!(sizes.align(&Type::Id(alias)), 8);
    }
}
