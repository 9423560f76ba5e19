use abi_stable::StableAbi;
use abi_stable::std_types::{RString, RVec};
use anyhow::{Context, Result};
use libloading::Library;

use polycall_symbol::Signature;
use polycall_value::ParamType;

/// One exported function as described by a shared library.
#[repr(C)]
#[derive(Clone, StableAbi)]
pub struct StableFunction {
    pub name: RString,
    /// Name passed back to the library's call dispatcher.
    pub symbol: RString,
    pub params: RVec<ParamType>,
    pub result: ParamType,
    pub variadic: bool,
}

impl StableFunction {
    pub fn signature(&self) -> Signature {
        Signature {
            params: self.params.iter().copied().collect(),
            variadic: self.variadic,
            result: self.result,
        }
    }
}

#[repr(C)]
#[derive(Clone, StableAbi)]
pub struct StableExportSet {
    pub functions: RVec<StableFunction>,
}

pub type ExportFn = extern "C" fn() -> StableExportSet;

/// Calls the library's export table entry point.
pub fn read_exports(library: &Library, symbol: &str) -> Result<Vec<StableFunction>> {
    let set = unsafe {
        let exports = library
            .get::<ExportFn>(symbol.as_bytes())
            .with_context(|| format!("library is missing the `{symbol}` export table"))?;
        exports()
    };
    Ok(set.functions.into_vec())
}
