//! Shared test helpers: in-process OFX plugins served through the mock
//! loader, and bundle trees on disk.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::ffi::{CStr, c_char, c_int, c_void};
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;

use tempfile::TempDir;

use ofxhost_core::config::HostConfig;
use ofxhost_core::types::status::Status;
use ofxhost_plugin::action::Action;
use ofxhost_plugin::binary::StaticPlugins;
use ofxhost_plugin::cache::scan::ARCHITECTURES;
use ofxhost_plugin::ffi::abi::{
    GET_NUMBER_OF_PLUGINS_SYMBOL, GetNumberOfPluginsFn, MainEntryFn, OfxHost,
    OfxImageEffectHandle, OfxImageEffectSuiteV1, OfxParamSetHandle, OfxParameterSuiteV1,
    OfxPlugin, OfxPropertySetHandle, OfxPropertySuiteV1, OfxStatus,
};
use ofxhost_plugin::ffi::mock::{MockBackend, MockLibrary};
use ofxhost_plugin::runtime::HostRuntime;

/// Identifier exported by every effect plugin below.
pub const FOO_ID: &str = "net.example.foo";
/// Identifier of the plugin declaring no contexts.
pub const CONTEXTLESS_ID: &str = "net.example.contextless";
/// Identifier of the plugin whose `Load` fails.
pub const NO_LOAD_ID: &str = "net.example.noload";
/// Identifier of the plugin whose `Describe` fails.
pub const NO_DESCRIBE_ID: &str = "net.example.nodescribe";
/// Identifier of the plugin failing `Render` and `InstanceChanged`.
pub const FUSSY_ID: &str = "net.example.fussy";

thread_local! {
    static HOST: Cell<*mut OfxHost> = const { Cell::new(ptr::null_mut()) };
    static ACTIONS: RefCell<Vec<Action>> = const { RefCell::new(Vec::new()) };
}

/// Actions received on this thread since the last [`clear_actions`].
pub fn actions() -> Vec<Action> {
    ACTIONS.with(|actions| actions.borrow().clone())
}

/// How many times `action` was received on this thread.
pub fn count(action: Action) -> usize {
    ACTIONS.with(|actions| actions.borrow().iter().filter(|a| **a == action).count())
}

/// Forget recorded actions.
pub fn clear_actions() {
    ACTIONS.with(|actions| actions.borrow_mut().clear());
}

// ── Exported plugin structs ──────────────────────────────────────

struct ExportedPlugin(OfxPlugin);

// SAFETY: the structs only hold pointers to static C strings and functions.
unsafe impl Sync for ExportedPlugin {}

const fn effect(
    identifier: &'static CStr,
    major: u32,
    minor: u32,
    main_entry: MainEntryFn,
) -> ExportedPlugin {
    ExportedPlugin(OfxPlugin {
        plugin_api: c"OfxImageEffectPluginAPI".as_ptr(),
        api_version: 1,
        plugin_identifier: identifier.as_ptr(),
        plugin_version_major: major,
        plugin_version_minor: minor,
        set_host: Some(set_host),
        main_entry: Some(main_entry),
    })
}

static FOO_V1_0: ExportedPlugin = effect(c"net.example.foo", 1, 0, effect_main);
static FOO_V1_2: ExportedPlugin = effect(c"net.example.foo", 1, 2, effect_main);
static FOO_V2_0: ExportedPlugin = effect(c"net.example.foo", 2, 0, effect_main);
static CONTEXTLESS: ExportedPlugin = effect(c"net.example.contextless", 1, 0, contextless_main);
static NO_LOAD: ExportedPlugin = effect(c"net.example.noload", 1, 0, no_load_main);
static NO_DESCRIBE: ExportedPlugin = effect(c"net.example.nodescribe", 1, 0, no_describe_main);
static FUSSY: ExportedPlugin = effect(c"net.example.fussy", 1, 0, fussy_main);

fn exported(plugin: &'static ExportedPlugin) -> *mut OfxPlugin {
    &plugin.0 as *const OfxPlugin as *mut OfxPlugin
}

unsafe extern "C" fn one_plugin() -> c_int {
    1
}

unsafe extern "C" fn two_plugins() -> c_int {
    2
}

unsafe extern "C" fn get_foo(nth: c_int) -> *mut OfxPlugin {
    if nth == 0 { exported(&FOO_V1_0) } else { ptr::null_mut() }
}

unsafe extern "C" fn get_foo_newer(nth: c_int) -> *mut OfxPlugin {
    if nth == 0 { exported(&FOO_V1_2) } else { ptr::null_mut() }
}

unsafe extern "C" fn get_foo_v2(nth: c_int) -> *mut OfxPlugin {
    if nth == 0 { exported(&FOO_V2_0) } else { ptr::null_mut() }
}

unsafe extern "C" fn get_mixed(nth: c_int) -> *mut OfxPlugin {
    match nth {
        0 => exported(&FOO_V1_0),
        1 => exported(&CONTEXTLESS),
        _ => ptr::null_mut(),
    }
}

unsafe extern "C" fn get_failing(nth: c_int) -> *mut OfxPlugin {
    match nth {
        0 => exported(&NO_LOAD),
        1 => exported(&NO_DESCRIBE),
        _ => ptr::null_mut(),
    }
}

unsafe extern "C" fn get_fussy(nth: c_int) -> *mut OfxPlugin {
    if nth == 0 { exported(&FUSSY) } else { ptr::null_mut() }
}

/// Exports `net.example.foo` 1.0.
pub fn foo_library() -> MockLibrary {
    MockLibrary::with_plugin_exports(one_plugin, get_foo)
}

/// Exports `net.example.foo` 1.2.
pub fn foo_newer_library() -> MockLibrary {
    MockLibrary::with_plugin_exports(one_plugin, get_foo_newer)
}

/// Exports `net.example.foo` 2.0.
pub fn foo_v2_library() -> MockLibrary {
    MockLibrary::with_plugin_exports(one_plugin, get_foo_v2)
}

/// Exports `net.example.foo` 1.0 and a plugin without contexts.
pub fn mixed_library() -> MockLibrary {
    MockLibrary::with_plugin_exports(two_plugins, get_mixed)
}

/// Exports one plugin failing `Load` and one failing `Describe`.
pub fn failing_library() -> MockLibrary {
    MockLibrary::with_plugin_exports(two_plugins, get_failing)
}

/// Exports `net.example.fussy` 1.0.
pub fn fussy_library() -> MockLibrary {
    MockLibrary::with_plugin_exports(one_plugin, get_fussy)
}

/// Exports the plugin count but not `OfxGetPlugin`.
pub fn bar_library() -> MockLibrary {
    MockLibrary::new().with_symbol(
        GET_NUMBER_OF_PLUGINS_SYMBOL,
        one_plugin as GetNumberOfPluginsFn as *const c_void,
    )
}

/// `net.example.foo` 1.0 as a static table.
pub fn foo_static() -> StaticPlugins {
    StaticPlugins {
        count: one_plugin,
        get: get_foo,
    }
}

// ── Plugin side of the protocol ──────────────────────────────────

unsafe extern "C" fn set_host(host: *mut OfxHost) {
    HOST.with(|current| current.set(host));
}

/// Fetch suite `name` version 1 from the host given to `setHost`.
unsafe fn fetch<T>(name: &CStr) -> &'static T {
    let host = HOST.with(Cell::get);
    assert!(!host.is_null(), "setHost was not called");
    unsafe {
        let suite = ((*host).fetch_suite)((*host).host, name.as_ptr(), 1) as *const T;
        assert!(!suite.is_null(), "suite {name:?} not served");
        &*suite
    }
}

fn record(action: *const c_char) -> Option<Action> {
    // SAFETY: the host always passes a NUL-terminated action name.
    let name = unsafe { CStr::from_ptr(action) }.to_str().ok()?;
    let action = name.parse::<Action>().ok()?;
    ACTIONS.with(|actions| actions.borrow_mut().push(action));
    Some(action)
}

fn first_failure(statuses: &[OfxStatus]) -> OfxStatus {
    statuses
        .iter()
        .copied()
        .find(|status| *status != Status::OK.0)
        .unwrap_or(Status::OK.0)
}

unsafe fn describe(handle: OfxImageEffectHandle, contexts: &[&CStr]) -> OfxStatus {
    unsafe {
        let properties: &OfxPropertySuiteV1 = fetch(c"OfxPropertySuite");
        let effects: &OfxImageEffectSuiteV1 = fetch(c"OfxImageEffectSuite");

        let mut props: OfxPropertySetHandle = ptr::null_mut();
        let status = (effects.get_property_set)(handle, &mut props);
        if status != Status::OK.0 {
            return status;
        }

        let mut statuses = vec![
            (properties.prop_set_string)(props, c"OfxPropLabel".as_ptr(), 0, c"Foo".as_ptr()),
            (properties.prop_set_string)(
                props,
                c"OfxImageEffectPluginPropGrouping".as_ptr(),
                0,
                c"Example".as_ptr(),
            ),
        ];
        for (index, context) in contexts.iter().enumerate() {
            statuses.push((properties.prop_set_string)(
                props,
                c"OfxImageEffectPropSupportedContexts".as_ptr(),
                index as c_int,
                context.as_ptr(),
            ));
        }
        first_failure(&statuses)
    }
}

unsafe fn describe_in_context(handle: OfxImageEffectHandle) -> OfxStatus {
    unsafe {
        let properties: &OfxPropertySuiteV1 = fetch(c"OfxPropertySuite");
        let effects: &OfxImageEffectSuiteV1 = fetch(c"OfxImageEffectSuite");
        let params: &OfxParameterSuiteV1 = fetch(c"OfxParameterSuite");

        let mut source: OfxPropertySetHandle = ptr::null_mut();
        let mut output: OfxPropertySetHandle = ptr::null_mut();
        let mut param_set: OfxParamSetHandle = ptr::null_mut();
        let mut gain: OfxPropertySetHandle = ptr::null_mut();

        let mut statuses = vec![
            (effects.clip_define)(handle, c"Source".as_ptr(), &mut source),
            (effects.clip_define)(handle, c"Output".as_ptr(), &mut output),
            (effects.get_param_set)(handle, &mut param_set),
        ];
        if first_failure(&statuses) != Status::OK.0 {
            return first_failure(&statuses);
        }
        statuses.push((params.param_define)(
            param_set,
            c"OfxParamTypeDouble".as_ptr(),
            c"gain".as_ptr(),
            &mut gain,
        ));
        if first_failure(&statuses) != Status::OK.0 {
            return first_failure(&statuses);
        }
        statuses.push((properties.prop_set_string)(
            gain,
            c"OfxPropLabel".as_ptr(),
            0,
            c"Gain".as_ptr(),
        ));
        first_failure(&statuses)
    }
}

unsafe extern "C" fn effect_main(
    action: *const c_char,
    handle: *const c_void,
    _in_args: OfxPropertySetHandle,
    _out_args: OfxPropertySetHandle,
) -> OfxStatus {
    let handle = handle as OfxImageEffectHandle;
    match record(action) {
        Some(Action::Describe) => unsafe {
            describe(
                handle,
                &[c"OfxImageEffectContextFilter", c"OfxImageEffectContextGeneral"],
            )
        },
        Some(Action::DescribeInContext) => unsafe { describe_in_context(handle) },
        Some(Action::Load | Action::Unload | Action::CreateInstance | Action::DestroyInstance) => {
            Status::OK.0
        }
        Some(_) => Status::REPLY_DEFAULT.0,
        None => Status::FAILED.0,
    }
}

unsafe extern "C" fn contextless_main(
    action: *const c_char,
    handle: *const c_void,
    _in_args: OfxPropertySetHandle,
    _out_args: OfxPropertySetHandle,
) -> OfxStatus {
    match record(action) {
        Some(Action::Describe) => unsafe { describe(handle as OfxImageEffectHandle, &[]) },
        Some(_) => Status::REPLY_DEFAULT.0,
        None => Status::FAILED.0,
    }
}

unsafe extern "C" fn no_load_main(
    action: *const c_char,
    _handle: *const c_void,
    _in_args: OfxPropertySetHandle,
    _out_args: OfxPropertySetHandle,
) -> OfxStatus {
    match record(action) {
        Some(Action::Load) => Status::FAILED.0,
        Some(_) => Status::REPLY_DEFAULT.0,
        None => Status::FAILED.0,
    }
}

unsafe extern "C" fn no_describe_main(
    action: *const c_char,
    _handle: *const c_void,
    _in_args: OfxPropertySetHandle,
    _out_args: OfxPropertySetHandle,
) -> OfxStatus {
    match record(action) {
        Some(Action::Load | Action::Unload) => Status::OK.0,
        Some(Action::Describe) => Status::ERR_FATAL.0,
        Some(_) => Status::REPLY_DEFAULT.0,
        None => Status::FAILED.0,
    }
}

/// Behaves like the Foo effect but fails `Render` and `InstanceChanged`.
unsafe extern "C" fn fussy_main(
    action: *const c_char,
    handle: *const c_void,
    in_args: OfxPropertySetHandle,
    out_args: OfxPropertySetHandle,
) -> OfxStatus {
    let status = unsafe { effect_main(action, handle, in_args, out_args) };
    match actions().last() {
        Some(Action::Render) => Status::ERR_MEMORY.0,
        Some(Action::InstanceChanged) => Status::FAILED.0,
        _ => status,
    }
}

// ── Bundle trees and runtimes ────────────────────────────────────

/// Create `<root>/<name>.ofx.bundle` and return its binary path.
pub fn make_bundle(root: &Path, name: &str) -> PathBuf {
    let arch_dir = root
        .join(format!("{name}.ofx.bundle"))
        .join("Contents")
        .join(ARCHITECTURES[0]);
    fs::create_dir_all(&arch_dir).expect("Failed to create bundle");
    let binary = arch_dir.join(format!("{name}.ofx"));
    fs::write(&binary, b"binary").expect("Failed to write binary");
    binary
}

/// A temporary directory and a mock loader shared by the runtimes of one test.
pub struct TestHost {
    /// Holds plugin roots and the cache directory.
    pub dir: TempDir,
    /// Serves the libraries installed with [`TestHost::install`].
    pub backend: Arc<MockBackend>,
}

impl TestHost {
    /// Create an empty test host and forget earlier actions.
    pub fn new() -> Self {
        clear_actions();
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
            backend: Arc::new(MockBackend::new()),
        }
    }

    /// A directory under the temporary root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Install a bundle under `root` whose binary loads as `library`.
    pub fn install(&self, root: &Path, name: &str, library: MockLibrary) -> PathBuf {
        let binary = make_bundle(root, name);
        self.backend.register(&binary, library);
        binary
    }

    /// Configuration searching `roots` recursively, nothing else.
    pub fn config(&self, roots: &[&Path]) -> HostConfig {
        let mut config = HostConfig::default();
        config.plugins.path_env_var = String::new();
        config.plugins.use_standard_locations = false;
        config.plugins.search_paths = roots
            .iter()
            .map(|root| root.to_string_lossy().into_owned())
            .collect();
        config.cache.directory = self.path("cache").to_string_lossy().into_owned();
        config
    }

    /// A runtime over the mock loader; nothing is scanned yet.
    pub fn runtime(&self, config: HostConfig) -> HostRuntime {
        HostRuntime::with_backend(config, self.backend.clone()).expect("Failed to build runtime")
    }
}
