//! Shared-library modules loaded with `libloading`
//!
//! A module library exports one entry symbol that returns its primary
//! export as a boxed [`Value`]. Host and module must be built by the same
//! compiler against the same version of this crate.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use async_trait::async_trait;
use libloading::Library;

use super::ModuleLoader;
use crate::application::errors::{panic_message, ModuleError};
use crate::domain::entities::Value;

/// Name of the symbol every module library exports
pub const MODULE_ENTRY_SYMBOL: &[u8] = b"blitz_module_default";

/// Signature of [`MODULE_ENTRY_SYMBOL`]
pub type ModuleEntryFn = unsafe extern "C-unwind" fn() -> *mut Value;

/// Export a module's primary value from a `cdylib`.
///
/// ```ignore
/// fn ping() -> blitz::domain::entities::Command { /* ... */ }
/// blitz::export_module!(ping);
/// ```
#[macro_export]
macro_rules! export_module {
    ($init:path) => {
        #[no_mangle]
        pub extern "C-unwind" fn blitz_module_default() -> *mut $crate::domain::entities::Value {
            let value: $crate::domain::entities::Value = $init().into();
            ::std::boxed::Box::into_raw(::std::boxed::Box::new(value))
        }
    };
}

/// Loads platform shared libraries (`.so`, `.dylib`, `.dll`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryLoader;

impl LibraryLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModuleLoader for LibraryLoader {
    fn extension(&self) -> &str {
        std::env::consts::DLL_EXTENSION
    }

    async fn import(&self, path: &Path) -> Result<Value, ModuleError> {
        // SAFETY: loading a module runs its initializers with full host privilege.
        let library = unsafe { Library::new(path) }.map_err(|e| ModuleError::Library {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: the symbol's type is fixed by the module ABI above.
        let entry: ModuleEntryFn = unsafe {
            *library
                .get::<ModuleEntryFn>(MODULE_ENTRY_SYMBOL)
                .map_err(|_| ModuleError::MissingEntry(path.to_path_buf()))?
        };

        // SAFETY: the library stays loaded for as long as the export lives.
        let value = unsafe { take_export(entry, path) }?;

        // Handlers inside `value` point into the library; it stays mapped until exit.
        std::mem::forget(library);

        Ok(value)
    }
}

/// Call a module's entry point and take ownership of the value it exports.
///
/// # Safety
///
/// `entry` must follow the [`export_module!`] contract and the code behind
/// it must stay loaded while the returned value is alive.
pub(crate) unsafe fn take_export(entry: ModuleEntryFn, path: &Path) -> Result<Value, ModuleError> {
    let raw = panic::catch_unwind(AssertUnwindSafe(|| unsafe { entry() })).map_err(|payload| {
        ModuleError::Panicked {
            path: path.to_path_buf(),
            message: panic_message(payload),
        }
    })?;

    if raw.is_null() {
        return Err(ModuleError::NullExport(path.to_path_buf()));
    }

    // SAFETY: the export macro hands over a pointer from `Box::into_raw`.
    Ok(unsafe { *Box::from_raw(raw) })
}
