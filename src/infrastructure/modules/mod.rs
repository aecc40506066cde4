//! Dynamic module loading
//!
//! Modules are loaded through a [`ModuleLoader`] backend: shared libraries
//! via [`LibraryLoader`], or host-compiled modules via [`BuiltinModules`].

pub mod builtin;
pub mod library;
pub mod loader;

pub use builtin::{BuiltinModules, ModuleFactory};
pub use library::{LibraryLoader, ModuleEntryFn, MODULE_ENTRY_SYMBOL};
pub use loader::{load_module, load_modules_from_directory, resolve, ModuleLoader};
