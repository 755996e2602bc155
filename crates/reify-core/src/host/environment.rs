//! Well-known host classes
//!
//! The environment owns the system classes every type system needs (Object,
//! ValueType, String, the array base, primitives, the collection interfaces)
//! and hands out one canonical erased array class per element class.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

use super::class::{ClassBuilder, ClassKind, ClassRef, PrimitiveKind, TypeSig};

/// The collection interfaces arrays and strings can be cast to
#[derive(Debug, Clone)]
pub struct CollectionInterfaces {
    /// `System.ICloneable`
    pub cloneable: ClassRef,
    /// `System.Collections.IEnumerable`
    pub enumerable: ClassRef,
    /// `System.Collections.ICollection`
    pub collection: ClassRef,
    /// `System.Collections.IList`
    pub list: ClassRef,
    /// `System.Collections.IStructuralComparable`
    pub structural_comparable: ClassRef,
    /// `System.Collections.IStructuralEquatable`
    pub structural_equatable: ClassRef,
    /// `IEnumerable<out T>`
    pub generic_enumerable: ClassRef,
    /// `ICollection<T>`
    pub generic_collection: ClassRef,
    /// `IList<T>`
    pub generic_list: ClassRef,
    /// `IReadOnlyCollection<out T>`
    pub read_only_collection: ClassRef,
    /// `IReadOnlyList<out T>`
    pub read_only_list: ClassRef,
}

impl CollectionInterfaces {
    fn new(marker: &ClassRef) -> Self {
        let cloneable = ClassBuilder::interface("System.ICloneable").build();
        let enumerable = ClassBuilder::interface("System.Collections.IEnumerable").build();
        let collection = ClassBuilder::interface("System.Collections.ICollection")
            .implements(TypeSig::class(&enumerable))
            .build();
        let list = ClassBuilder::interface("System.Collections.IList")
            .implements(TypeSig::class(&collection))
            .build();
        let structural_comparable =
            ClassBuilder::interface("System.Collections.IStructuralComparable").build();
        let structural_equatable =
            ClassBuilder::interface("System.Collections.IStructuralEquatable").build();

        let generic_enumerable = ClassBuilder::interface("System.Collections.Generic.IEnumerable`1")
            .generic_with_marker(marker, 1)
            .variance("O")
            .implements(TypeSig::class(&enumerable))
            .build();
        let generic_collection = ClassBuilder::interface("System.Collections.Generic.ICollection`1")
            .generic_with_marker(marker, 1)
            .implements(TypeSig::generic(&generic_enumerable, vec![TypeSig::Param(0)]))
            .build();
        let generic_list = ClassBuilder::interface("System.Collections.Generic.IList`1")
            .generic_with_marker(marker, 1)
            .implements(TypeSig::generic(&generic_collection, vec![TypeSig::Param(0)]))
            .build();
        let read_only_collection =
            ClassBuilder::interface("System.Collections.Generic.IReadOnlyCollection`1")
                .generic_with_marker(marker, 1)
                .variance("O")
                .implements(TypeSig::generic(&generic_enumerable, vec![TypeSig::Param(0)]))
                .build();
        let read_only_list = ClassBuilder::interface("System.Collections.Generic.IReadOnlyList`1")
            .generic_with_marker(marker, 1)
            .variance("O")
            .implements(TypeSig::generic(&read_only_collection, vec![TypeSig::Param(0)]))
            .build();

        Self {
            cloneable,
            enumerable,
            collection,
            list,
            structural_comparable,
            structural_equatable,
            generic_enumerable,
            generic_collection,
            generic_list,
            read_only_collection,
            read_only_list,
        }
    }

    /// The generic interfaces every array implements over its element type
    pub fn generic_interfaces(&self) -> [&ClassRef; 5] {
        [
            &self.generic_list,
            &self.generic_collection,
            &self.generic_enumerable,
            &self.read_only_list,
            &self.read_only_collection,
        ]
    }
}

/// Well-known host classes plus the canonical array-class table
pub struct HostEnvironment {
    object: ClassRef,
    value_type: ClassRef,
    string: ClassRef,
    array: ClassRef,
    void: ClassRef,
    by_ref: ClassRef,
    generic_marker: ClassRef,
    type_class: ClassRef,
    type_array: ClassRef,
    reference: ClassRef,
    primitives: Vec<ClassRef>,
    collections: CollectionInterfaces,
    array_classes: DashMap<usize, ClassRef, FxBuildHasher>,
}

impl HostEnvironment {
    /// Create an environment with the standard system classes
    pub fn new() -> Self {
        let object = ClassBuilder::class("System.Object").build();
        let value_type = ClassBuilder::class("System.ValueType")
            .extends(TypeSig::class(&object))
            .build();
        let generic_marker = ClassBuilder::class("Reify.GenericMarker").build();
        let collections = CollectionInterfaces::new(&generic_marker);

        let array = ClassBuilder::class("System.Array")
            .extends(TypeSig::class(&object))
            .implements(TypeSig::class(&collections.cloneable))
            .implements(TypeSig::class(&collections.list))
            .implements(TypeSig::class(&collections.structural_comparable))
            .implements(TypeSig::class(&collections.structural_equatable))
            .build();
        let string = ClassBuilder::class("System.String")
            .extends(TypeSig::class(&object))
            .build();
        let void = ClassBuilder::new("System.Void", ClassKind::Void).build();
        let by_ref = ClassBuilder::new("Reify.ByRef", ClassKind::ByRef).build();
        let type_class = ClassBuilder::class("System.Type")
            .extends(TypeSig::class(&object))
            .build();
        let reference = ClassBuilder::class("Reify.Reference")
            .extends(TypeSig::class(&object))
            .build();

        let primitives = PrimitiveKind::ALL
            .iter()
            .map(|&kind| {
                ClassBuilder::new(kind.class_name(), ClassKind::Primitive(kind))
                    .extends(TypeSig::class(&value_type))
                    .build()
            })
            .collect();

        let array_classes = DashMap::with_hasher(FxBuildHasher);
        let type_array = ClassBuilder::array(&type_class, &array).build();
        array_classes.insert(class_key(&type_class), type_array.clone());

        Self {
            object,
            value_type,
            string,
            array,
            void,
            by_ref,
            generic_marker,
            type_class,
            type_array,
            reference,
            primitives,
            collections,
            array_classes,
        }
    }

    /// `System.Object`
    pub fn object_class(&self) -> &ClassRef {
        &self.object
    }

    /// `System.ValueType`
    pub fn value_type_class(&self) -> &ClassRef {
        &self.value_type
    }

    /// `System.String`
    pub fn string_class(&self) -> &ClassRef {
        &self.string
    }

    /// `System.Array`, the parent of every array class
    pub fn array_base(&self) -> &ClassRef {
        &self.array
    }

    /// `System.Void`
    pub fn void_class(&self) -> &ClassRef {
        &self.void
    }

    /// Marker class for by-reference types
    pub fn by_ref_class(&self) -> &ClassRef {
        &self.by_ref
    }

    /// Parameter class of the `-generic-info` convention
    pub fn generic_marker(&self) -> &ClassRef {
        &self.generic_marker
    }

    /// `System.Type`
    pub fn type_class(&self) -> &ClassRef {
        &self.type_class
    }

    /// `System.Type[]`, the parameter class of static-data constructors
    pub fn type_array_class(&self) -> &ClassRef {
        &self.type_array
    }

    /// Class of addressable element references
    pub fn reference_class(&self) -> &ClassRef {
        &self.reference
    }

    /// Class of a primitive kind
    pub fn primitive_class(&self, kind: PrimitiveKind) -> &ClassRef {
        &self.primitives[kind.index()]
    }

    /// Collection interfaces
    pub fn collections(&self) -> &CollectionInterfaces {
        &self.collections
    }

    /// Canonical erased array class for `element`
    pub fn array_class(&self, element: &ClassRef) -> ClassRef {
        let key = class_key(element);
        if let Some(existing) = self.array_classes.get(&key) {
            return existing.value().clone();
        }
        self.array_classes
            .entry(key)
            .or_insert_with(|| ClassBuilder::array(element, &self.array).build())
            .value()
            .clone()
    }
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("array_classes", &self.array_classes.len())
            .finish()
    }
}

fn class_key(class: &ClassRef) -> usize {
    Arc::as_ptr(class) as usize
}
