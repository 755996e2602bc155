//! Identity-cache keys

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::descriptor::TypeRef;
use crate::host::ClassRef;

/// Host class plus optional ordered type-argument vector
///
/// Equality is reference equality on the class and element-wise reference
/// equality on the arguments.
#[derive(Clone)]
pub struct TypeKey {
    class: ClassRef,
    args: Option<Arc<[TypeRef]>>,
}

impl TypeKey {
    /// Key for a plain class or generic definition
    pub fn class(class: &ClassRef) -> Self {
        Self {
            class: class.clone(),
            args: None,
        }
    }

    /// Key for a class applied to `args`
    pub fn with_args(class: &ClassRef, args: Arc<[TypeRef]>) -> Self {
        Self {
            class: class.clone(),
            args: Some(args),
        }
    }

    /// The host class
    pub fn host_class(&self) -> &ClassRef {
        &self.class
    }

    /// The argument vector
    pub fn args(&self) -> Option<&[TypeRef]> {
        self.args.as_deref()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        if !Arc::ptr_eq(&self.class, &other.class) {
            return false;
        }
        match (&self.args, &other.args) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| Arc::ptr_eq(x, y))
            }
            _ => false,
        }
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.class) as usize).hash(state);
        match &self.args {
            None => 0usize.hash(state),
            Some(args) => {
                args.len().hash(state);
                for arg in args.iter() {
                    arg.id().hash(state);
                }
            }
        }
    }
}

impl std::fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args = self
            .args
            .as_ref()
            .map(|a| a.iter().map(|t| t.name().to_string()).collect::<Vec<_>>());
        f.debug_struct("TypeKey")
            .field("class", &self.class.name())
            .field("args", &args)
            .finish()
    }
}
