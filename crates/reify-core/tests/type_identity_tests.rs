//! Integration tests for type identity and generic instantiation

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::Fixture;
use parking_lot::Mutex;
use reify_core::{
    ClassBuilder, ClassRef, ErrorKind, HostEnvironment, RuntimeError, RuntimeOptions, StaticData,
    TypeKind, TypeRef, TypeSystem,
};

/// Static data recorded by the test constructors
#[derive(Debug)]
struct Slot {
    argument: String,
}

fn slot_data(argument: &str) -> StaticData {
    Arc::new(Slot {
        argument: argument.to_string(),
    })
}

// ============================================================================
// Identity
// ============================================================================

mod identity {
    use super::*;

    #[test]
    fn test_same_arguments_same_descriptor() {
        let fx = Fixture::new();
        let a = fx.of(&fx.boxed, &[fx.int()]);
        let b = fx.of(&fx.boxed, &[fx.int()]);
        let c = fx.of(&fx.boxed, &[fx.string()]);

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.name(), "IBox`1[System.Int32]");
        assert_eq!(a.kind(), TypeKind::Instantiation);
    }

    #[test]
    fn test_plain_and_derived_types_are_canonical() {
        let fx = Fixture::new();
        assert!(Arc::ptr_eq(&fx.ty(&fx.base), &fx.ty(&fx.base)));

        let int = fx.int();
        let a = fx.system.make_array_type(&int).unwrap();
        let b = fx.system.make_array_type(&int).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "System.Int32[]");

        let r = fx.system.make_by_ref_type(&int).unwrap();
        assert!(Arc::ptr_eq(&r, &fx.system.make_by_ref_type(&int).unwrap()));
        assert!(r.is_by_ref());
    }

    #[test]
    fn test_array_class_resolves_to_array_type() {
        let fx = Fixture::new();
        let env = fx.system.environment();
        let class = env.array_class(env.primitive_class(reify_core::PrimitiveKind::I32));
        let via_class = fx.system.type_for_class(&class).unwrap();
        let via_element = fx.system.make_array_type(&fx.int()).unwrap();
        assert!(Arc::ptr_eq(&via_class, &via_element));
    }

    #[test]
    fn test_definition_round_trip() {
        let fx = Fixture::new();
        let definition = fx.ty(&fx.pair);
        let closed = fx.of(&fx.pair, &[fx.string(), fx.int()]);

        assert_eq!(definition.kind(), TypeKind::GenericDefinition);
        assert!(definition.contains_generic_parameters());
        assert!(!closed.contains_generic_parameters());
        assert!(Arc::ptr_eq(
            &closed.generic_type_definition().unwrap(),
            &definition
        ));
        assert!(Arc::ptr_eq(&closed.generic_arguments()[1], &fx.int()));
        assert_eq!(definition.generic_parameters().len(), 2);
    }

    #[test]
    fn test_instantiation_accepted_as_definition() {
        let fx = Fixture::new();
        let of_int = fx.of(&fx.boxed, &[fx.int()]);
        let of_string = fx
            .system
            .make_generic_type(&of_int, Some(&[fx.string()]))
            .unwrap();
        assert!(Arc::ptr_eq(&of_string, &fx.of(&fx.boxed, &[fx.string()])));
    }

    #[test]
    fn test_lookup_matches_make_generic_type() {
        let fx = Fixture::new();
        let via_lookup = fx.system.lookup(&fx.boxed, Some(&[fx.int()])).unwrap();
        assert!(Arc::ptr_eq(&via_lookup, &fx.of(&fx.boxed, &[fx.int()])));

        let by_ref_class = fx.system.environment().by_ref_class().clone();
        let by_ref = fx.system.lookup(&by_ref_class, Some(&[fx.int()])).unwrap();
        assert!(Arc::ptr_eq(
            &by_ref,
            &fx.system.make_by_ref_type(&fx.int()).unwrap()
        ));
    }

    #[test]
    fn test_nested_instantiation_arguments() {
        let fx = Fixture::new();
        let inner = fx.of(&fx.boxed, &[fx.int()]);
        let outer = fx.of(&fx.boxed, &[inner.clone()]);
        assert_eq!(outer.name(), "IBox`1[IBox`1[System.Int32]]");
        assert!(Arc::ptr_eq(&outer, &fx.of(&fx.boxed, &[inner])));
    }
}

// ============================================================================
// Supertypes
// ============================================================================

mod supertypes {
    use super::*;

    #[test]
    fn test_base_types() {
        let fx = Fixture::new();
        let base = fx.system.base_type(&fx.ty(&fx.derived)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&base, &fx.ty(&fx.base)));
        assert!(fx.system.base_type(&fx.object()).unwrap().is_none());
        assert!(fx.system.base_type(&fx.ty(&fx.boxed)).unwrap().is_none());

        let value_type = fx.system.base_type(&fx.ty(&fx.point)).unwrap().unwrap();
        assert_eq!(value_type.name(), "System.ValueType");
    }

    #[test]
    fn test_interfaces_are_substituted() {
        let fx = Fixture::new();
        let holder = fx.of(&fx.holder, &[fx.string()]);
        let interfaces = fx.system.interfaces(&holder).unwrap();
        let expected = fx.of(&fx.producer, &[fx.string()]);
        assert!(interfaces.iter().any(|i| Arc::ptr_eq(i, &expected)));
    }

    #[test]
    fn test_array_interfaces() {
        let fx = Fixture::new();
        let array = fx.system.make_array_type(&fx.int()).unwrap();
        let interfaces = fx.system.interfaces(&array).unwrap();

        let list = fx.collection(&fx.collections().generic_list, &fx.int());
        let read_only = fx.collection(&fx.collections().read_only_list, &fx.int());
        assert!(interfaces.iter().any(|i| Arc::ptr_eq(i, &list)));
        assert!(interfaces.iter().any(|i| Arc::ptr_eq(i, &read_only)));
        assert!(interfaces
            .iter()
            .any(|i| i.name() == "System.Collections.IList"));

        let base = fx.system.base_type(&array).unwrap().unwrap();
        assert_eq!(base.name(), "System.Array");
    }
}

// ============================================================================
// Argument validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn test_not_generic() {
        let fx = Fixture::new();
        let err = fx
            .system
            .make_generic_type(&fx.ty(&fx.base), Some(&[fx.int()]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_missing_arguments() {
        let fx = Fixture::new();
        let err = fx
            .system
            .make_generic_type(&fx.ty(&fx.boxed), None)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NullArgument { .. }));
        assert!(err.is_argument_error());

        let err = fx
            .system
            .make_generic_type(&fx.ty(&fx.boxed), Some(&[]))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidArgument(_)));
    }

    #[test]
    fn test_arity_mismatch_leaves_no_entry() {
        let fx = Fixture::new();
        let definition = fx.ty(&fx.pair);
        let int = fx.int();
        let before = fx.system.stats().types;

        let err = fx
            .system
            .make_generic_type(&definition, Some(&[int]))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::TypeArgumentCount {
                expected: 2,
                actual: 1,
                ..
            }
        ));
        assert!(err.is_argument_error());
        assert_eq!(fx.system.stats().types, before);
    }

    #[test]
    fn test_rejects_open_by_ref_and_void_arguments() {
        let fx = Fixture::new();
        let definition = fx.ty(&fx.boxed);
        let open = fx.ty(&fx.producer);
        let by_ref = fx.system.make_by_ref_type(&fx.int()).unwrap();
        let void = fx.system.void_type().unwrap();

        for arg in [open, by_ref, void] {
            let err = fx
                .system
                .make_generic_type(&definition, Some(&[arg.clone()]))
                .unwrap_err();
            assert!(
                matches!(err, RuntimeError::InvalidArgument(_)),
                "{} should be rejected, got {:?}",
                arg.name(),
                err
            );
        }
    }

    #[test]
    fn test_rejects_by_ref_and_void_elements() {
        let fx = Fixture::new();
        let by_ref = fx.system.make_by_ref_type(&fx.int()).unwrap();
        let void = fx.system.void_type().unwrap();
        assert!(fx.system.make_array_type(&by_ref).is_err());
        assert!(fx.system.make_array_type(&void).is_err());
        assert!(fx.system.make_by_ref_type(&by_ref).is_err());
    }
}

// ============================================================================
// Static data
// ============================================================================

mod static_data {
    use super::*;

    fn registry(env: &HostEnvironment, runs: Arc<AtomicUsize>) -> ClassRef {
        ClassBuilder::class("Registry`1")
            .generic(env, 1)
            .static_data(env, move |init| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(Some(slot_data(init.type_arguments()[0].name())))
            })
            .build()
    }

    #[test]
    fn test_static_data_per_instantiation() {
        let env = HostEnvironment::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let class = registry(&env, runs.clone());
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let int = system.primitive_type(reify_core::PrimitiveKind::I32).unwrap();
        let string = system.string_type().unwrap();
        let of_int = system.lookup(&class, Some(&[int.clone()])).unwrap();
        let of_string = system.lookup(&class, Some(&[string])).unwrap();
        let again = system.lookup(&class, Some(&[int])).unwrap();

        assert!(Arc::ptr_eq(&of_int, &again));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(
            system.static_data_as::<Slot>(&of_int).unwrap().argument,
            "System.Int32"
        );
        assert_eq!(
            system.static_data_as::<Slot>(&of_string).unwrap().argument,
            "System.String"
        );
        assert!(of_int.generic_info().unwrap().has_static_data());
    }

    #[test]
    fn test_static_data_of_non_instantiation() {
        let env = HostEnvironment::new();
        let class = registry(&env, Arc::new(AtomicUsize::new(0)));
        let system = TypeSystem::new(env, RuntimeOptions::default());
        let definition = system.type_for_class(&class).unwrap();

        let err = system.static_data_for(&definition).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_wrong_downcast() {
        let env = HostEnvironment::new();
        let class = registry(&env, Arc::new(AtomicUsize::new(0)));
        let system = TypeSystem::new(env, RuntimeOptions::default());
        let ty = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap();
        assert!(system.static_data_as::<u32>(&ty).is_err());
    }

    #[test]
    fn test_concurrent_instantiation_runs_constructor_once() {
        const THREADS: usize = 8;

        let env = HostEnvironment::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let class = registry(&env, runs.clone());
        let system = TypeSystem::new(env, RuntimeOptions::default());
        let int = system.primitive_type(reify_core::PrimitiveKind::I32).unwrap();
        let barrier = Barrier::new(THREADS);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        system.lookup(&class, Some(&[int.clone()])).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        for ty in &results[1..] {
            assert!(Arc::ptr_eq(ty, &results[0]));
        }
        assert!(system.static_data_as::<Slot>(&results[0]).is_ok());
    }

    #[test]
    fn test_failed_constructor_can_be_retried() {
        let env = HostEnvironment::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let class = ClassBuilder::class("Flaky`1")
            .generic(&env, 1)
            .static_data(&env, move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RuntimeError::Host("first attempt fails".to_string()))
                } else {
                    Ok(Some(slot_data("ok")))
                }
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());
        let string = system.string_type().unwrap();
        let before = system.stats().types;

        let err = system.lookup(&class, Some(&[string.clone()])).unwrap_err();
        match err {
            RuntimeError::TypeInitialization { type_name, source } => {
                assert_eq!(type_name, "Flaky`1[System.String]");
                assert!(matches!(*source, RuntimeError::Host(_)));
            }
            other => panic!("expected a type initialization error, got {:?}", other),
        }
        // Only the definition was added; the failed shell was withdrawn.
        assert_eq!(system.stats().types, before + 1);

        let ty = system.lookup(&class, Some(&[string])).unwrap();
        assert_eq!(system.static_data_as::<Slot>(&ty).unwrap().argument, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_constructor_withdraws_types_built_on_it() {
        let env = HostEnvironment::new();
        let plain = ClassBuilder::class("Plain`1").generic(&env, 1).build();
        let inner = plain.clone();
        let built: Arc<Mutex<Option<TypeRef>>> = Arc::new(Mutex::new(None));
        let stash = built.clone();
        let attempts = AtomicUsize::new(0);
        let class = ClassBuilder::class("Flaky`1")
            .generic(&env, 1)
            .static_data(&env, move |init| {
                if attempts.fetch_add(1, Ordering::SeqCst) > 0 {
                    return Ok(Some(slot_data("ok")));
                }
                let this = std::slice::from_ref(init.instantiation());
                *stash.lock() = Some(init.system().lookup(&inner, Some(this))?);
                init.system().make_array_type(init.instantiation())?;
                Err(RuntimeError::Host("first attempt fails".to_string()))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());
        let string = system.string_type().unwrap();
        let before = system.stats().types;

        assert!(system.lookup(&class, Some(&[string.clone()])).is_err());
        // The two definitions stay; the shell, Plain<shell> and shell[] are gone.
        assert_eq!(system.stats().types, before + 2);
        let stale = built.lock().take().unwrap();

        let flaky = system.lookup(&class, Some(&[string])).unwrap();
        let nested = system.lookup(&plain, Some(&[flaky.clone()])).unwrap();
        assert!(!Arc::ptr_eq(&nested, &stale));
        assert!(Arc::ptr_eq(&nested.generic_arguments()[0], &flaky));
        let array = system.make_array_type(&flaky).unwrap();
        assert!(Arc::ptr_eq(array.element_type().unwrap(), &flaky));
    }

    #[test]
    fn test_types_built_on_a_shell_settle_with_it() {
        let env = HostEnvironment::new();
        let plain = ClassBuilder::class("Plain`1").generic(&env, 1).build();
        let inner = plain.clone();
        let built: Arc<Mutex<Option<TypeRef>>> = Arc::new(Mutex::new(None));
        let stash = built.clone();
        let class = ClassBuilder::class("Settled`1")
            .generic(&env, 1)
            .static_data(&env, move |init| {
                let this = std::slice::from_ref(init.instantiation());
                *stash.lock() = Some(init.system().lookup(&inner, Some(this))?);
                Ok(Some(slot_data("settled")))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let ty = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap();
        let nested = built.lock().take().unwrap();

        let from_other_thread = thread::scope(|s| {
            s.spawn(|| system.lookup(&plain, Some(&[ty.clone()])).unwrap())
                .join()
                .unwrap()
        });
        assert!(Arc::ptr_eq(&from_other_thread, &nested));
        assert!(system.is_assignable(&system.object_type().unwrap(), &nested));
    }

    #[test]
    fn test_constructor_sees_its_own_shell() {
        let env = HostEnvironment::new();
        let same = Arc::new(AtomicBool::new(false));
        let seen = same.clone();
        let class = ClassBuilder::class("SelfRef`1")
            .generic(&env, 1)
            .static_data(&env, move |init| {
                let definition = init.instantiation().generic_type_definition().unwrap();
                let looked_up = init
                    .system()
                    .make_generic_type(&definition, Some(init.type_arguments()))?;
                seen.store(Arc::ptr_eq(&looked_up, init.instantiation()), Ordering::SeqCst);
                Ok(Some(slot_data("self")))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let ty = system
            .lookup(&class, Some(&[system.object_type().unwrap()]))
            .unwrap();
        assert!(same.load(Ordering::SeqCst));
        assert!(system.static_data_for(&ty).is_ok());
    }

    #[test]
    fn test_constructor_may_instantiate_plain_generics() {
        let env = HostEnvironment::new();
        let plain = ClassBuilder::class("Plain`1").generic(&env, 1).build();
        let inner = plain.clone();
        let class = ClassBuilder::class("Outer`1")
            .generic(&env, 1)
            .static_data(&env, move |init| {
                let nested = init.system().lookup(&inner, Some(init.type_arguments()))?;
                Ok(Some(slot_data(nested.name())))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let ty = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap();
        assert_eq!(
            system.static_data_as::<Slot>(&ty).unwrap().argument,
            "Plain`1[System.String]"
        );
    }

    #[test]
    fn test_nested_static_binding_is_rejected() {
        let env = HostEnvironment::new();
        let inner = registry(&env, Arc::new(AtomicUsize::new(0)));
        let nested = inner.clone();
        let class = ClassBuilder::class("Chained`1")
            .generic(&env, 1)
            .static_data(&env, move |init| {
                init.system().lookup(&nested, Some(init.type_arguments()))?;
                Ok(Some(slot_data("unreachable")))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());
        let string = system.string_type().unwrap();

        let err = system.lookup(&class, Some(&[string.clone()])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeInitialization);

        // The inner type is unaffected once nothing is pending.
        let ty = system.lookup(&inner, Some(&[string])).unwrap();
        assert!(system.static_data_for(&ty).is_ok());
    }
}

// ============================================================================
// Early publication
// ============================================================================

mod early_publication {
    use super::*;

    #[test]
    fn test_published_data_is_kept() {
        let env = HostEnvironment::new();
        let second_rejected = Arc::new(AtomicBool::new(false));
        let flag = second_rejected.clone();
        let class = ClassBuilder::class("Early`1")
            .generic(&env, 1)
            .static_data(&env, move |init| {
                init.publish(slot_data("early"))?;
                flag.store(init.publish(slot_data("again")).is_err(), Ordering::SeqCst);
                Ok(None)
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let ty = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap();
        assert!(second_rejected.load(Ordering::SeqCst));
        assert_eq!(system.static_data_as::<Slot>(&ty).unwrap().argument, "early");
    }

    #[test]
    fn test_returning_the_published_data_is_accepted() {
        let env = HostEnvironment::new();
        let class = ClassBuilder::class("Echo`1")
            .generic(&env, 1)
            .static_data(&env, |init| {
                let data = slot_data("echo");
                init.publish(data.clone())?;
                Ok(Some(data))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let ty = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap();
        assert_eq!(system.static_data_as::<Slot>(&ty).unwrap().argument, "echo");
    }

    #[test]
    fn test_returning_different_data_fails() {
        let env = HostEnvironment::new();
        let class = ClassBuilder::class("Conflict`1")
            .generic(&env, 1)
            .static_data(&env, |init| {
                init.publish(slot_data("published"))?;
                Ok(Some(slot_data("returned")))
            })
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let err = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap_err();
        match err {
            RuntimeError::TypeInitialization { source, .. } => {
                assert_eq!(source.kind(), ErrorKind::InvalidOperation);
            }
            other => panic!("expected a type initialization error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_data_at_all_fails() {
        let env = HostEnvironment::new();
        let class = ClassBuilder::class("Empty`1")
            .generic(&env, 1)
            .static_data(&env, |_| Ok(None))
            .build();
        let system = TypeSystem::new(env, RuntimeOptions::default());

        let err = system
            .lookup(&class, Some(&[system.string_type().unwrap()]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeInitialization);
    }

    #[test]
    fn test_publish_outside_construction_fails() {
        let system = TypeSystem::with_defaults();
        let err = system.publish_static_data(slot_data("stray")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }
}
