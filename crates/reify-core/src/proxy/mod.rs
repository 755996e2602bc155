//! Collection-interface proxies
//!
//! Arrays do not natively implement the generic collection interfaces. A cast
//! to one of them (or to a non-generic collection marker) is answered with a
//! proxy instead. The base proxy state is cached per array, keyed weakly so
//! the cache never keeps an array alive.

pub mod array_proxy;
pub mod factory;
pub mod targets;

pub use array_proxy::{ArrayProxy, ProxyId, ProxySubject};
pub use factory::ArrayProxyFactory;
pub use targets::{classify_request, CollectionMarker, GenericCollection, ProxyRequest};
