//! Shared host classes for integration tests

#![allow(dead_code)]

use reify_core::host::CollectionInterfaces;
use reify_core::{
    ClassBuilder, ClassRef, HostEnvironment, PrimitiveKind, RuntimeOptions, TypeRef, TypeSig,
    TypeSystem,
};

/// A small host class hierarchy on top of a fresh type system
pub struct Fixture {
    pub system: TypeSystem,
    /// `Base`, one instance field
    pub base: ClassRef,
    /// `Derived : Base`, one more instance field
    pub derived: ClassRef,
    /// `Unrelated`
    pub unrelated: ClassRef,
    /// `IProducer<out T>`
    pub producer: ClassRef,
    /// `IConsumer<in T>`
    pub consumer: ClassRef,
    /// `IBox<T>`, invariant
    pub boxed: ClassRef,
    /// `IPair<out A, in B>`
    pub pair: ClassRef,
    /// `Point`, value type with two fields
    pub point: ClassRef,
    /// `Holder<T> : IProducer<T>`
    pub holder: ClassRef,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    pub fn with_options(options: RuntimeOptions) -> Self {
        let env = HostEnvironment::new();

        let base = ClassBuilder::class("Base").instance_field("id").build();
        let derived = ClassBuilder::class("Derived")
            .extends(TypeSig::class(&base))
            .instance_field("extra")
            .build();
        let unrelated = ClassBuilder::class("Unrelated").build();

        let producer = ClassBuilder::interface("IProducer`1")
            .generic(&env, 1)
            .variance("O")
            .build();
        let consumer = ClassBuilder::interface("IConsumer`1")
            .generic(&env, 1)
            .variance("I")
            .build();
        let boxed = ClassBuilder::interface("IBox`1").generic(&env, 1).build();
        let pair = ClassBuilder::interface("IPair`2")
            .generic(&env, 2)
            .variance("OI")
            .build();
        let point = ClassBuilder::value_type("Point")
            .instance_field("x")
            .instance_field("y")
            .build();
        let holder = ClassBuilder::class("Holder`1")
            .generic(&env, 1)
            .implements(TypeSig::generic(&producer, vec![TypeSig::Param(0)]))
            .instance_field("value")
            .build();

        Self {
            system: TypeSystem::new(env, options),
            base,
            derived,
            unrelated,
            producer,
            consumer,
            boxed,
            pair,
            point,
            holder,
        }
    }

    pub fn ty(&self, class: &ClassRef) -> TypeRef {
        self.system.type_for_class(class).unwrap()
    }

    pub fn of(&self, class: &ClassRef, args: &[TypeRef]) -> TypeRef {
        let definition = self.ty(class);
        self.system.make_generic_type(&definition, Some(args)).unwrap()
    }

    pub fn object(&self) -> TypeRef {
        self.system.object_type().unwrap()
    }

    pub fn string(&self) -> TypeRef {
        self.system.string_type().unwrap()
    }

    pub fn int(&self) -> TypeRef {
        self.system.primitive_type(PrimitiveKind::I32).unwrap()
    }

    pub fn collections(&self) -> &CollectionInterfaces {
        self.system.environment().collections()
    }

    /// Constructed generic collection interface over `element`
    pub fn collection(&self, interface: &ClassRef, element: &TypeRef) -> TypeRef {
        self.of(interface, std::slice::from_ref(element))
    }
}
