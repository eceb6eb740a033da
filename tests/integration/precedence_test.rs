//! Integration tests for choosing between plugins with the same identifier.

mod helpers;

use std::fs;

use helpers::{FOO_ID, TestHost};

#[test]
fn test_higher_minor_version_wins() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "FooOld", helpers::foo_library());
    host.install(&root, "FooNew", helpers::foo_newer_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    runtime.scan();
    let cache = runtime.cache();

    let current = cache.get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert_eq!(current.record().version_minor(), 2);

    let pinned = cache.get_plugin_by_id(FOO_ID, Some(1), Some(0)).unwrap();
    assert_eq!(pinned.record().version_minor(), 0);
    assert!(cache.get_plugin_by_id(FOO_ID, Some(1), Some(1)).is_none());
    assert_eq!(cache.registry().versions(FOO_ID).len(), 2);
}

#[test]
fn test_major_versions_are_kept_apart() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "FooNew", helpers::foo_newer_library());
    host.install(&root, "FooTwo", helpers::foo_v2_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    runtime.scan();
    let cache = runtime.cache();

    let current = cache.get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert_eq!(current.record().version_major(), 2);

    let v1 = cache.get_plugin_by_id(FOO_ID, Some(1), None).unwrap();
    assert_eq!(v1.record().version_label(), "1.2");

    let by_major = cache.get_plugins_by_id_major();
    assert_eq!(by_major.len(), 2);
    assert!(by_major.contains_key(&(FOO_ID.to_string(), 1)));
    assert!(by_major.contains_key(&(FOO_ID.to_string(), 2)));
    assert_eq!(cache.get_plugins_by_id().len(), 1);
}

#[test]
fn test_earlier_search_root_wins_equal_versions() {
    let host = TestHost::new();
    let first_root = host.path("first");
    let second_root = host.path("second");
    host.install(&second_root, "Foo", helpers::foo_library());
    host.install(&first_root, "Foo", helpers::foo_library());

    let mut runtime = host.runtime(host.config(&[&first_root, &second_root]));
    runtime.scan();

    let current = runtime.cache().get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert!(current.record().binary().bundle_path().starts_with(&first_root));
}

#[test]
fn test_root_rank_matches_whole_path_segments() {
    let host = TestHost::new();
    let ofx = host.path("OFX");
    let ofx2 = host.path("OFX2");
    host.install(&ofx2, "Foo", helpers::foo_library());

    // Seed the cache with the OFX2 bundle only, so it is listed first.
    let mut seed = host.runtime(host.config(&[&ofx2]));
    seed.scan();
    seed.save_cache().unwrap();

    host.install(&ofx, "Foo", helpers::foo_library());
    let mut runtime = host.runtime(host.config(&[&ofx, &ofx2]));
    assert!(runtime.load_cache());
    runtime.scan();
    let cache = runtime.cache();

    assert_eq!(cache.search_root_rank(&ofx2.join("Foo.ofx.bundle")), 1);
    assert_eq!(cache.search_root_rank(&ofx.join("Foo.ofx.bundle")), 0);

    let current = cache.get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert_eq!(
        current.record().binary().bundle_path(),
        ofx.join("Foo.ofx.bundle")
    );
}

#[test]
fn test_static_plugin_wins_equal_versions() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let exe = host.path("ofxhost-bin");
    fs::write(&exe, b"host").unwrap();

    let mut runtime = host.runtime(host.config(&[&root]));
    runtime
        .cache_mut()
        .set_static_plugins(helpers::foo_static(), &exe);
    let report = runtime.scan();

    assert_eq!(report.binaries, 2);
    let current = runtime.cache().get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert!(current.record().binary().is_static());
    assert_eq!(current.record().binary().file_path(), exe);
}
