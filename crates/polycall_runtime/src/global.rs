//! Process-wide default runtime and free-function wrappers over it.

use std::path::Path;

use once_cell::sync::Lazy;

use polycall_value::{Value, ValueTag};

use crate::error::Result;
use crate::runtime::Runtime;

static GLOBAL_RUNTIME: Lazy<Runtime> = Lazy::new(Runtime::from_env);

/// The default runtime, configured from the environment on first access.
pub fn global() -> &'static Runtime {
    &GLOBAL_RUNTIME
}

pub fn initialize() -> Result<()> {
    global().initialize()
}

pub fn destroy() -> Result<()> {
    global().destroy()
}

pub fn args_size() -> usize {
    global().args_size()
}

pub fn print_info() -> &'static str {
    Runtime::print_info()
}

pub fn load_from_file<P: AsRef<Path>>(tag: &str, paths: &[P]) -> Result<usize> {
    global().load_from_file(tag, paths)
}

pub fn load_from_memory(tag: &str, buffer: &[u8]) -> Result<usize> {
    global().load_from_memory(tag, buffer)
}

pub fn load_from_package(tag: &str, path: impl AsRef<Path>) -> Result<usize> {
    global().load_from_package(tag, path)
}

pub fn metacallv(name: &str, args: &[Value]) -> Result<Value> {
    global().metacallv(name, args)
}

pub fn register<F>(name: &str, invoke: F, result: ValueTag, params: &[ValueTag]) -> Result<()>
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    global().register(name, invoke, result, params)
}
