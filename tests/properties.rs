//! Resolution and caching behavior of the three property modes, exercised the
//! way calling code sees them: through class objects, instances, and
//! subclasses.

mod support;

use std::sync::Arc;

use classprop::{CachedClassProperty, Class, ClassProperty, ClassRef, Error, Mode, Resolver,
                ThreadsafeCachedClassProperty};
use support::{init_tracing, Calls};


fn config() -> ClassRef {
    let copyright = ClassProperty::new("copyright", |cls| {
        let year = cls.attr_as::<u32>("year").unwrap();
        let name = cls.attr_as::<String>("name").unwrap();
        format!("{}-{}", year, name)
    });

    Class::builder("Config")
        .attr("name", "foo".to_owned())
        .attr("year", 2024u32)
        .slot(copyright.with_doc("Copyright line, rebuilt on every read."))
        .build()
        .unwrap()
}


#[test]
fn eager_slot_tracks_class_state() {
    init_tracing();
    let cls = config();

    let first = cls.getattr_as::<String>("copyright").unwrap();
    cls.setattr("name", "bar".to_owned()).unwrap();
    let second = cls.getattr_as::<String>("copyright").unwrap();

    assert_eq!(*first, "2024-foo");
    assert_eq!(*second, "2024-bar");
    assert_eq!(cls.find_slot("copyright").unwrap().descriptor().doc(),
               Some("Copyright line, rebuilt on every read."));
}


#[test]
fn eager_slot_runs_producer_on_every_read() {
    init_tracing();
    let calls = Calls::default();
    let producer_calls = calls.clone();
    let prop = ClassProperty::new("roll", move |_| producer_calls.hit());
    let cls = Class::builder("Dice").slot(prop.clone()).build().unwrap();

    let a = prop.get(&cls).unwrap();
    let b = prop.get(&cls).unwrap();

    assert_eq!(calls.count(), 2);
    assert_ne!(a, b);
    assert!(!Arc::ptr_eq(&a, &b));
}


#[test]
fn eager_slot_reads_agree_through_class_and_instance() {
    init_tracing();
    let cls = config();

    assert_eq!(cls.getattr_as::<String>("copyright").unwrap(),
               cls.instantiate().getattr_as::<String>("copyright").unwrap());
}


#[test]
fn cached_slot_computes_once() {
    init_tracing();
    let calls = Calls::default();
    let producer_calls = calls.clone();
    let prop = CachedClassProperty::new("val", move |_| producer_calls.hit());
    let cls = Class::builder("Cached").slot(prop).build().unwrap();

    assert_eq!(*cls.getattr_as::<usize>("val").unwrap(), 1);
    assert_eq!(*cls.getattr_as::<usize>("val").unwrap(), 1);
    assert_eq!(calls.count(), 1);
}


fn app(calls: &Calls) -> (CachedClassProperty<String>, ClassRef) {
    let producer_calls = calls.clone();
    let boot_time = CachedClassProperty::new("boot_time", move |_| format!("boot #{}", producer_calls.hit()));
    let cls = Class::builder("App").slot(boot_time.clone()).build().unwrap();
    (boot_time, cls)
}


#[test]
fn cached_slot_scenario() {
    init_tracing();
    let calls = Calls::default();
    let (boot_time, cls) = app(&calls);

    // App.boot_time is App().boot_time
    let from_class = cls.getattr_as::<String>("boot_time").unwrap();
    let from_instance = cls.instantiate().getattr_as::<String>("boot_time").unwrap();
    assert!(Arc::ptr_eq(&from_class, &from_instance));

    // App().boot_time = 'X'
    cls.instantiate().setattr("boot_time", "X".to_owned()).unwrap();
    assert_eq!(*boot_time.get(&cls).unwrap(), "X");

    // del App().boot_time
    cls.instantiate().delattr("boot_time").unwrap();
    assert_ne!(*boot_time.get(&cls).unwrap(), "X");
    assert_eq!(calls.count(), 2);
}


#[test]
fn write_bypasses_producer_and_delete_recomputes() {
    init_tracing();
    let calls = Calls::default();
    let (boot_time, cls) = app(&calls);
    let instance = cls.instantiate();

    boot_time.set(&instance, "manual".to_owned()).unwrap();
    assert_eq!(*boot_time.get(&cls).unwrap(), "manual");
    assert_eq!(calls.count(), 0);

    boot_time.delete(&instance).unwrap();
    assert_eq!(*boot_time.get(&cls).unwrap(), "boot #1");
    assert_eq!(calls.count(), 1);

    // Deleting an uncomputed slot is harmless.
    boot_time.delete(&instance).unwrap();
    boot_time.delete(&instance).unwrap();
    assert!(!boot_time.is_cached(&cls));
}


#[test]
fn explicit_helpers_match_instance_mutation() {
    init_tracing();
    let calls = Calls::default();
    let (boot_time, cls) = app(&calls);

    boot_time.set_for(&cls, "pinned".to_owned());
    assert_eq!(*cls.getattr_as::<String>("boot_time").unwrap(), "pinned");

    boot_time.invalidate(&cls);
    assert!(!boot_time.is_cached(&cls));
    assert_eq!(*cls.getattr_as::<String>("boot_time").unwrap(), "boot #1");
}


fn family(mode: Mode, calls: &Calls) -> (ClassRef, ClassRef, ClassRef) {
    let producer_calls = calls.clone();
    let producer = move |cls: &ClassRef| format!("{}:{}", cls.name(), producer_calls.hit());

    let base = match mode {
        Mode::Cached => Class::builder("Base").slot(CachedClassProperty::new("slot", producer)),
        Mode::CachedLocked => Class::builder("Base").slot(ThreadsafeCachedClassProperty::new("slot", producer)),
        Mode::Eager => unreachable!("eager slots have no storage"),
    }.build().unwrap();

    let a = Class::builder("A").base(&base).build().unwrap();
    let b = Class::builder("B").base(&base).build().unwrap();
    (base, a, b)
}


#[test]
fn subclasses_cache_independently() {
    init_tracing();

    for mode in [Mode::Cached, Mode::CachedLocked] {
        let calls = Calls::default();
        let (base, a, b) = family(mode, &calls);

        assert_eq!(*a.getattr_as::<String>("slot").unwrap(), "A:1");
        assert_eq!(*b.getattr_as::<String>("slot").unwrap(), "B:2");
        assert_eq!(*a.getattr_as::<String>("slot").unwrap(), "A:1");
        assert!(base.cached_slots().is_empty());

        a.instantiate().setattr("slot", "changed".to_owned()).unwrap();
        assert_eq!(*a.getattr_as::<String>("slot").unwrap(), "changed");
        assert_eq!(*b.getattr_as::<String>("slot").unwrap(), "B:2");

        a.instantiate().delattr("slot").unwrap();
        assert_eq!(b.cached_slots(), ["slot"]);
        assert_eq!(calls.count(), 2);
    }
}


#[test]
fn base_cache_is_not_inherited() {
    init_tracing();
    let calls = Calls::default();
    let (base, a, _) = family(Mode::Cached, &calls);

    assert_eq!(*base.getattr_as::<String>("slot").unwrap(), "Base:1");
    assert_eq!(*a.getattr_as::<String>("slot").unwrap(), "A:2");
}


#[test]
fn redefined_slot_in_subclass_uses_its_own_producer() {
    init_tracing();
    let base = Class::builder("Base")
        .slot(CachedClassProperty::new("kind", |_| "base".to_owned()))
        .build()
        .unwrap();
    let child = Class::builder("Child")
        .base(&base)
        .slot(CachedClassProperty::new("kind", |_| "child".to_owned()))
        .build()
        .unwrap();

    assert_eq!(*base.getattr_as::<String>("kind").unwrap(), "base");
    assert_eq!(*child.getattr_as::<String>("kind").unwrap(), "child");
    assert_eq!(*child.instantiate().getattr_as::<String>("kind").unwrap(), "child");
}


#[test]
fn mutation_through_the_class_is_rejected_for_every_mode() {
    init_tracing();
    let cls = Class::builder("Everything")
        .slot(ClassProperty::new("eager", |_| 1u32))
        .slot(CachedClassProperty::new("cached", |_| 2u32))
        .slot(ThreadsafeCachedClassProperty::new("locked", |_| 3u32))
        .build()
        .unwrap();

    for name in ["eager", "cached", "locked"] {
        let before = cls.getattr_as::<u32>(name).unwrap();

        assert!(matches!(cls.setattr(name, 9u32), Err(Error::UnsupportedMutation { .. })));
        assert!(matches!(cls.delattr(name), Err(Error::UnsupportedMutation { .. })));

        assert_eq!(cls.getattr_as::<u32>(name).unwrap(), before);
    }

    let instance = cls.instantiate();
    assert!(instance.setattr("eager", 9u32).unwrap_err().is_unsupported_mutation());
    assert!(instance.delattr("eager").unwrap_err().is_unsupported_mutation());
}


#[test]
fn duplicate_slot_is_rejected() {
    let result = Class::builder("Twice")
        .slot(ClassProperty::new("x", |_| 1u8))
        .slot(CachedClassProperty::new("x", |_| 2u8))
        .build();

    match result {
        Err(Error::DuplicateSlot { class, slot }) => {
            assert_eq!(class, "Twice");
            assert_eq!(slot, "x");
        }
        other => panic!("expected DuplicateSlot, got {:?}", other),
    }
}


#[test]
fn producer_error_reaches_the_caller_unchanged() {
    init_tracing();

    #[derive(Debug)]
    struct Unreachable;

    impl std::fmt::Display for Unreachable {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("host unreachable")
        }
    }

    impl std::error::Error for Unreachable {}

    let prop: CachedClassProperty<u32> = CachedClassProperty::try_new("remote", |_| Err(Unreachable));
    let cls = Class::builder("Remote").slot(prop.clone()).build().unwrap();

    let err = cls.getattr("remote").unwrap_err();
    assert!(err.producer_error().unwrap().downcast_ref::<Unreachable>().is_some());
    assert!(!prop.is_cached(&cls));
}
