//! Integration tests for the plugin cache file.

mod helpers;

use std::fs;

use helpers::{FOO_ID, TestHost};
use ofxhost_plugin::action::Action;
use ofxhost_plugin::constants::contexts;
use ofxhost_plugin::image_effect::ImageEffectPlugin;

#[test]
fn test_cached_plugins_are_not_described_again() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    assert!(!first.load_cache());
    first.scan();
    assert!(first.save_cache().unwrap());
    assert!(first.cache_path().is_file());

    helpers::clear_actions();
    let mut second = host.runtime(config);
    assert!(second.load_cache());
    let report = second.scan();

    assert_eq!(report.new_binaries, 0);
    assert_eq!(report.changed_binaries, 0);
    assert_eq!(report.plugins, 1);
    assert!(helpers::actions().is_empty());

    let foo = second.cache().get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert_eq!(foo.label(), "Foo");
    assert!(!second.save_cache().unwrap());
}

#[test]
fn test_changed_binary_is_described_again() {
    let host = TestHost::new();
    let root = host.path("OFX");
    let binary = host.install(&root, "Foo", helpers::foo_library());
    let untouched = host.install(&root, "Other", helpers::foo_v2_library());
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    first.scan();
    first.save_cache().unwrap();

    fs::write(&binary, b"rebuilt binary").unwrap();
    helpers::clear_actions();
    let foo_opens = host.backend.open_count(&binary);
    let other_opens = host.backend.open_count(&untouched);

    let mut second = host.runtime(config);
    assert!(second.load_cache());
    let report = second.scan();

    assert_eq!(report.changed_binaries, 1);
    assert_eq!(report.new_binaries, 0);
    assert_eq!(helpers::count(Action::Describe), 1);
    assert!(host.backend.open_count(&binary) > foo_opens);
    assert_eq!(host.backend.open_count(&untouched), other_opens);
    assert_eq!(second.cache().get_plugins().len(), 2);
    assert!(second.save_cache().unwrap());
}

#[test]
fn test_changed_binary_unloads_its_cached_plugins() {
    let host = TestHost::new();
    let root = host.path("OFX");
    let binary = host.install(&root, "Foo", helpers::foo_library());
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    first.scan();
    first.save_cache().unwrap();

    fs::write(&binary, b"rebuilt binary").unwrap();
    let mut second = host.runtime(config);
    assert!(second.load_cache());
    let cached = second.cache().binaries()[0].plugins().next().cloned().unwrap();
    let cached = ImageEffectPlugin::from_hosted(cached).unwrap();
    cached.plugin_handle().unwrap();
    assert!(cached.is_loaded());

    helpers::clear_actions();
    second.scan();

    assert!(!cached.is_loaded());
    assert_eq!(
        helpers::actions(),
        vec![Action::Unload, Action::Load, Action::Describe, Action::Unload]
    );
}

#[test]
fn test_changed_host_executable_describes_static_plugins_again() {
    let host = TestHost::new();
    let root = host.path("OFX");
    let exe = host.path("ofxhost-bin");
    fs::write(&exe, b"host").unwrap();
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    first
        .cache_mut()
        .set_static_plugins(helpers::foo_static(), &exe);
    first.scan();
    assert!(first.save_cache().unwrap());

    helpers::clear_actions();
    let mut unchanged = host.runtime(config.clone());
    unchanged
        .cache_mut()
        .set_static_plugins(helpers::foo_static(), &exe);
    assert!(unchanged.load_cache());
    let report = unchanged.scan();
    assert_eq!(report.changed_binaries, 0);
    assert_eq!(helpers::count(Action::Describe), 0);
    assert!(!unchanged.save_cache().unwrap());

    fs::write(&exe, b"rebuilt host").unwrap();
    helpers::clear_actions();
    let mut rebuilt = host.runtime(config);
    rebuilt
        .cache_mut()
        .set_static_plugins(helpers::foo_static(), &exe);
    assert!(rebuilt.load_cache());
    let report = rebuilt.scan();

    assert_eq!(report.changed_binaries, 1);
    assert_eq!(helpers::count(Action::Describe), 1);
    let foo = rebuilt.cache().get_plugin_by_id(FOO_ID, None, None).unwrap();
    assert!(foo.record().binary().is_static());
    assert!(rebuilt.save_cache().unwrap());
}

#[test]
fn test_cache_from_other_version_is_ignored() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    first.scan();
    first.save_cache().unwrap();

    let mut upgraded = config;
    upgraded.cache.version = "ofxhost_next_OFXCachev2".to_string();
    helpers::clear_actions();

    let mut second = host.runtime(upgraded);
    assert!(!second.load_cache());
    let report = second.scan();
    assert_eq!(report.new_binaries, 1);
    assert_eq!(helpers::count(Action::Describe), 1);
}

#[test]
fn test_corrupt_cache_file_falls_back_to_scan() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());

    let mut runtime = host.runtime(host.config(&[&root]));
    let cache_path = runtime.cache_path();
    fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
    fs::write(&cache_path, "<cache version=").unwrap();

    assert!(!runtime.load_cache());
    let report = runtime.scan();
    assert_eq!(report.plugins, 1);
    assert!(runtime.save_cache().unwrap());

    let text = fs::read_to_string(&cache_path).unwrap();
    assert!(text.contains(FOO_ID));
}

#[test]
fn test_invalid_binary_is_not_opened_again_until_it_changes() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let bar = host.install(&root, "Bar", helpers::bar_library());
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    first.scan();
    assert!(first.save_cache().unwrap());
    let text = fs::read_to_string(first.cache_path()).unwrap();
    assert!(text.contains("Bar.ofx\""));
    assert!(text.contains("invalid=\"1\""));
    let bar_opens = host.backend.open_count(&bar);
    assert_eq!(bar_opens, 1);

    let mut second = host.runtime(config.clone());
    assert!(second.load_cache());
    let report = second.scan();
    assert_eq!(report.new_binaries, 0);
    assert_eq!(report.changed_binaries, 0);
    assert_eq!(report.invalid_binaries, vec![bar.clone()]);
    assert_eq!(report.plugins, 1);
    assert_eq!(host.backend.open_count(&bar), bar_opens);
    assert!(!second.save_cache().unwrap());

    fs::write(&bar, b"rebuilt binary").unwrap();
    let mut third = host.runtime(config);
    assert!(third.load_cache());
    let report = third.scan();
    assert_eq!(report.changed_binaries, 1);
    assert_eq!(report.invalid_binaries, vec![bar.clone()]);
    assert_eq!(host.backend.open_count(&bar), bar_opens + 1);
    assert!(third.save_cache().unwrap());
}

#[test]
fn test_cached_plugin_loads_on_first_context_request() {
    let host = TestHost::new();
    let root = host.path("OFX");
    host.install(&root, "Foo", helpers::foo_library());
    let config = host.config(&[&root]);

    let mut first = host.runtime(config.clone());
    first.scan();
    first.save_cache().unwrap();

    helpers::clear_actions();
    let mut second = host.runtime(config);
    second.load_cache();
    second.scan();

    let effect = second.cache().get_image_effect(FOO_ID, None, None).unwrap();
    assert!(!effect.is_loaded());
    let descriptor = effect.get_context(contexts::FILTER).unwrap();

    assert!(effect.is_loaded());
    assert_eq!(descriptor.clips().len(), 2);
    assert_eq!(descriptor.params().len(), 1);
    assert_eq!(
        helpers::actions(),
        vec![Action::Load, Action::Describe, Action::DescribeInContext]
    );

    effect.unload().unwrap();
    assert_eq!(helpers::count(Action::Unload), 1);
}
