//! Generic instantiation and static-data binding
//!
//! An instantiation is published as a shell before its static data is bound,
//! so lookups made by the static-data constructor itself (on the same thread,
//! under the reentrant type lock) resolve to the shell instead of recursing.
//! Only one binding may be pending at a time.

use std::any::Any;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::cache::{PendingInstantiation, TypeLockGuard, TypeLockState};
use super::descriptor::{StaticData, TypeDescriptor, TypeKind, TypeRef};
use super::key::TypeKey;
use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::TypeSystem;

/// Context handed to a per-instantiation static-data constructor
pub struct StaticInit<'a> {
    system: &'a TypeSystem,
    ty: &'a TypeRef,
}

impl<'a> StaticInit<'a> {
    /// The instantiation being initialized
    pub fn instantiation(&self) -> &TypeRef {
        self.ty
    }

    /// Its type-argument vector
    pub fn type_arguments(&self) -> &[TypeRef] {
        self.ty.generic_arguments()
    }

    /// Register the static data before the constructor returns
    ///
    /// May be called at most once, and only while this binding is pending.
    pub fn publish(&self, data: StaticData) -> RuntimeResult<()> {
        self.system.publish_static_data(data)
    }

    /// The owning type system, for nested lookups
    pub fn system(&self) -> &'a TypeSystem {
        self.system
    }
}

/// Withdraws a published shell, and everything built on it, unless
/// construction completes
struct ShellGuard<'a, 'g> {
    system: &'a TypeSystem,
    guard: &'a TypeLockGuard<'g>,
    ty: TypeRef,
    mark: usize,
    committed: bool,
}

impl<'a, 'g> ShellGuard<'a, 'g> {
    fn publish(
        system: &'a TypeSystem,
        guard: &'a TypeLockGuard<'g>,
        key: TypeKey,
        ty: TypeRef,
    ) -> Self {
        let mark = system.cache.open_shell(guard);
        system.cache.publish(guard, key, ty.clone());
        Self {
            system,
            guard,
            ty,
            mark,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ShellGuard<'_, '_> {
    fn drop(&mut self) {
        let failed = (!self.committed).then_some(&self.ty);
        self.system.cache.close_shell(self.guard, self.mark, failed);
    }
}

/// Clears the pending marker on every exit path
struct PendingMarker<'a> {
    state: &'a TypeLockState,
}

impl PendingMarker<'_> {
    fn set<'s>(state: &'s TypeLockState, ty: &TypeRef) -> RuntimeResult<PendingMarker<'s>> {
        let mut pending = state.pending.borrow_mut();
        if let Some(current) = pending.as_ref() {
            return Err(RuntimeError::InvalidOperation(format!(
                "cannot bind static data for {} while {} is still pending",
                ty.name(),
                current.ty.name()
            )));
        }
        *pending = Some(PendingInstantiation {
            ty: ty.clone(),
            published: false,
        });
        Ok(PendingMarker { state })
    }
}

impl Drop for PendingMarker<'_> {
    fn drop(&mut self) {
        match self.state.pending.try_borrow_mut() {
            Ok(mut pending) => *pending = None,
            Err(_) => warn!("pending static-data marker is borrowed and could not be cleared"),
        }
    }
}

impl TypeSystem {
    /// Instantiate a generic definition with `args`
    ///
    /// `definition` may also be an instantiation, in which case its own
    /// definition is used. Identical argument vectors always yield the same
    /// descriptor.
    pub fn make_generic_type(
        &self,
        definition: &TypeRef,
        args: Option<&[TypeRef]>,
    ) -> RuntimeResult<TypeRef> {
        let definition = definition.generic_type_definition().ok_or_else(|| {
            RuntimeError::InvalidOperation(format!(
                "{} is not a generic type definition",
                definition.name()
            ))
        })?;
        let args = args.ok_or(RuntimeError::NullArgument {
            name: "type_arguments",
        })?;
        self.validate_type_arguments(&definition, args)?;

        let class = definition.class().ok_or_else(|| {
            RuntimeError::InvalidOperation(format!("{} has no host class", definition.name()))
        })?;
        let args: Arc<[TypeRef]> = Arc::from(args);
        let key = TypeKey::with_args(class, args.clone());

        if let Some(ty) = self.cache.get(&key) {
            return Ok(ty);
        }

        let guard = self.cache.lock();
        if let Some(ty) = self.cache.get_locked(&guard, &key) {
            trace!(ty = %ty.name(), "instantiation resolved under type lock");
            return Ok(ty);
        }

        let def_info = definition.generic_info().ok_or_else(|| {
            RuntimeError::InvalidOperation(format!("{} is not generic", definition.name()))
        })?;
        let ty: TypeRef = Arc::new(TypeDescriptor::new_instantiation(&definition, def_info, args));
        let shell = ShellGuard::publish(self, &guard, key, ty.clone());
        debug!(ty = %ty.name(), "published instantiation shell");

        if let Err(error) = self.bind_static_data(&guard, &ty) {
            warn!(ty = %ty.name(), %error, "static data construction failed");
            return Err(RuntimeError::TypeInitialization {
                type_name: ty.name().to_string(),
                source: Box::new(error),
            });
        }

        if ty.generic_arguments().iter().any(|a| a.mentions_shell()) {
            trace!(ty = %ty.name(), "instantiation over a pending type, initialized when it settles");
        } else {
            ty.mark_initialized();
        }
        shell.commit();
        debug!(ty = %ty.name(), "instantiation created");
        Ok(ty)
    }

    fn validate_type_arguments(&self, definition: &TypeRef, args: &[TypeRef]) -> RuntimeResult<()> {
        if args.is_empty() {
            return Err(RuntimeError::InvalidArgument(format!(
                "empty type-argument vector for {}",
                definition.name()
            )));
        }
        let arity = definition.generic_parameters().len();
        if args.len() != arity {
            return Err(RuntimeError::TypeArgumentCount {
                type_name: definition.name().to_string(),
                expected: arity,
                actual: args.len(),
            });
        }
        for (i, arg) in args.iter().enumerate() {
            let problem = if arg.contains_generic_parameters() {
                "is not a closed type"
            } else if arg.is_by_ref() {
                "is a by-reference type"
            } else if arg.is_void() {
                "is void"
            } else {
                continue;
            };
            return Err(RuntimeError::InvalidArgument(format!(
                "type argument {} ({}) for {} {}",
                i,
                arg.name(),
                definition.name(),
                problem
            )));
        }
        Ok(())
    }

    fn bind_static_data(&self, guard: &TypeLockGuard<'_>, ty: &TypeRef) -> RuntimeResult<()> {
        let info = ty
            .generic_info()
            .ok_or_else(|| RuntimeError::InvalidOperation(format!("{} is not generic", ty.name())))?;
        let Some(ctor) = info.static_ctor() else {
            return Ok(());
        };

        let marker = PendingMarker::set(guard, ty)?;
        let init = StaticInit { system: self, ty };
        let returned = ctor(&init);
        drop(marker);

        let cell = info.static_data_cell();
        match (returned?, cell.get()) {
            (Some(data), Some(published)) if !Arc::ptr_eq(&data, published) => {
                return Err(RuntimeError::InvalidOperation(format!(
                    "static constructor of {} returned data different from what it published",
                    ty.name()
                )));
            }
            (Some(_), Some(_)) | (None, Some(_)) => {}
            (Some(data), None) => cell.set(data).map_err(|_| {
                RuntimeError::InvalidOperation(format!("static data of {} already bound", ty.name()))
            })?,
            (None, None) => {
                return Err(RuntimeError::InvalidOperation(format!(
                    "static constructor of {} produced no data",
                    ty.name()
                )));
            }
        }

        debug!(ty = %ty.name(), "static data bound");
        Ok(())
    }

    /// One-shot callback for the instantiation whose static data is pending
    pub fn publish_static_data(&self, data: StaticData) -> RuntimeResult<()> {
        let guard = self.cache.lock();
        let mut pending = guard.pending.borrow_mut();
        let current = pending.as_mut().ok_or_else(|| {
            RuntimeError::InvalidOperation("no instantiation is awaiting static data".to_string())
        })?;
        if current.published {
            return Err(RuntimeError::InvalidOperation(format!(
                "static data of {} was already published",
                current.ty.name()
            )));
        }
        let info = current.ty.generic_info().ok_or_else(|| {
            RuntimeError::InvalidOperation(format!("{} is not generic", current.ty.name()))
        })?;
        info.static_data_cell().set(data).map_err(|_| {
            RuntimeError::InvalidOperation(format!(
                "static data of {} already bound",
                current.ty.name()
            ))
        })?;
        current.published = true;
        trace!(ty = %current.ty.name(), "static data published early");
        Ok(())
    }

    /// Static data of a constructed instantiation
    pub fn static_data_for(&self, ty: &TypeRef) -> RuntimeResult<StaticData> {
        if ty.kind() != TypeKind::Instantiation {
            return Err(RuntimeError::InvalidOperation(format!(
                "{} is not a constructed generic instantiation",
                ty.name()
            )));
        }
        ty.generic_info()
            .and_then(|info| info.static_data())
            .cloned()
            .ok_or_else(|| {
                RuntimeError::InvalidOperation(format!("{} has no static data", ty.name()))
            })
    }

    /// Static data of an instantiation, downcast to `T`
    pub fn static_data_as<T>(&self, ty: &TypeRef) -> RuntimeResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.static_data_for(ty)?.downcast::<T>().map_err(|_| {
            RuntimeError::InvalidOperation(format!(
                "static data of {} is not a {}",
                ty.name(),
                std::any::type_name::<T>()
            ))
        })
    }
}
