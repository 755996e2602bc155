//! Proxy request classification
//!
//! Decides whether a cast target is one of the collection interfaces an
//! array (or a string, viewed as `char[]`) can be proxied as.

use crate::host::{same_class, HostEnvironment};
use crate::types::{TypeKind, TypeRef};

/// Non-generic collection-like targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionMarker {
    /// `System.Array`
    Array,
    /// `ICloneable`
    Cloneable,
    /// Non-generic `IEnumerable`
    Enumerable,
    /// Non-generic `ICollection`
    Collection,
    /// Non-generic `IList`
    List,
    /// `IStructuralComparable`
    StructuralComparable,
    /// `IStructuralEquatable`
    StructuralEquatable,
}

/// Generic collection interface families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericCollection {
    /// `IEnumerable<T>`
    Enumerable,
    /// `ICollection<T>`
    Collection,
    /// `IList<T>`
    List,
    /// `IReadOnlyCollection<T>`
    ReadOnlyCollection,
    /// `IReadOnlyList<T>`
    ReadOnlyList,
}

/// A recognized proxy request
#[derive(Debug, Clone)]
pub enum ProxyRequest {
    /// Non-generic marker; any proxy satisfies it
    Marker(CollectionMarker),
    /// Constructed generic interface; must pass a variance check
    Generic(GenericCollection, TypeRef),
}

impl ProxyRequest {
    /// Whether a string may be proxied for this request
    pub fn permits_string(&self) -> bool {
        match self {
            ProxyRequest::Marker(marker) => {
                matches!(marker, CollectionMarker::Enumerable | CollectionMarker::Cloneable)
            }
            ProxyRequest::Generic(family, _) => matches!(
                family,
                GenericCollection::Enumerable
                    | GenericCollection::ReadOnlyCollection
                    | GenericCollection::ReadOnlyList
            ),
        }
    }
}

/// Classify `target`; `None` if no proxy can satisfy it
pub fn classify_request(env: &HostEnvironment, target: &TypeRef) -> Option<ProxyRequest> {
    let class = target.class()?;
    let c = env.collections();
    match target.kind() {
        TypeKind::NotGeneric => {
            let markers = [
                (env.array_base(), CollectionMarker::Array),
                (&c.cloneable, CollectionMarker::Cloneable),
                (&c.enumerable, CollectionMarker::Enumerable),
                (&c.collection, CollectionMarker::Collection),
                (&c.list, CollectionMarker::List),
                (&c.structural_comparable, CollectionMarker::StructuralComparable),
                (&c.structural_equatable, CollectionMarker::StructuralEquatable),
            ];
            markers
                .iter()
                .find(|(marker, _)| same_class(marker, class))
                .map(|(_, marker)| ProxyRequest::Marker(*marker))
        }
        TypeKind::Instantiation => {
            let families = [
                (&c.generic_enumerable, GenericCollection::Enumerable),
                (&c.generic_collection, GenericCollection::Collection),
                (&c.generic_list, GenericCollection::List),
                (&c.read_only_collection, GenericCollection::ReadOnlyCollection),
                (&c.read_only_list, GenericCollection::ReadOnlyList),
            ];
            families
                .iter()
                .find(|(definition, _)| same_class(definition, class))
                .map(|(_, family)| ProxyRequest::Generic(*family, target.clone()))
        }
        TypeKind::GenericDefinition | TypeKind::Parameter => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::PrimitiveKind;
    use crate::runtime::TypeSystem;

    #[test]
    fn test_markers_recognized() {
        let system = TypeSystem::with_defaults();
        let env = system.environment();
        let list = system.type_for_class(&env.collections().list).unwrap();
        let array = system.type_for_class(env.array_base()).unwrap();
        assert!(matches!(
            classify_request(env, &list),
            Some(ProxyRequest::Marker(CollectionMarker::List))
        ));
        assert!(matches!(
            classify_request(env, &array),
            Some(ProxyRequest::Marker(CollectionMarker::Array))
        ));
        assert!(classify_request(env, &system.object_type().unwrap()).is_none());
    }

    #[test]
    fn test_generic_families_need_instantiations() {
        let system = TypeSystem::with_defaults();
        let env = system.environment();
        let definition = system
            .type_for_class(&env.collections().read_only_list)
            .unwrap();
        assert!(classify_request(env, &definition).is_none());

        let int = system.primitive_type(PrimitiveKind::I32).unwrap();
        let target = system
            .make_generic_type(&definition, Some(&[int]))
            .unwrap();
        let request = classify_request(env, &target).unwrap();
        assert!(matches!(
            request,
            ProxyRequest::Generic(GenericCollection::ReadOnlyList, _)
        ));
        assert!(request.permits_string());
    }

    #[test]
    fn test_string_permissions() {
        assert!(ProxyRequest::Marker(CollectionMarker::Enumerable).permits_string());
        assert!(!ProxyRequest::Marker(CollectionMarker::List).permits_string());
        assert!(!ProxyRequest::Marker(CollectionMarker::Array).permits_string());
    }
}
