//! Dynamic library loading for in-process plugins
//!
//! A plugin is a shared library exporting:
//!
//! ```c
//! void scripter_setup(void);                  /* optional, called once after load */
//! int  scripter_execute(const char *argument); /* required */
//! ```

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;

use libloading::Library;

use super::HostError;

pub const SETUP_SYMBOL: &str = "scripter_setup";
pub const EXECUTE_SYMBOL: &str = "scripter_execute";

type SetupFn = unsafe extern "C" fn();
type ExecuteFn = unsafe extern "C" fn(*const c_char) -> c_int;

/// Opens compiled artifacts as plugin modules
pub trait ModuleLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PluginModule>, HostError>;
}

/// A mapped plugin. Dropping it unmaps the library and releases the file.
pub trait PluginModule: Send + Sync {
    fn setup(&self) -> Result<(), HostError>;
    fn execute(&self, argument: &str) -> Result<i32, HostError>;
}

/// Loads plugins with the platform's dlopen/dlclose
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibLoader;

impl ModuleLoader for DylibLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn PluginModule>, HostError> {
        let library = unsafe { Library::new(path) }.map_err(|source| HostError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let execute: ExecuteFn = unsafe {
            *library
                .get::<ExecuteFn>(EXECUTE_SYMBOL.as_bytes())
                .map_err(|_| HostError::MissingEntryPoint {
                    path: path.to_path_buf(),
                    symbol: EXECUTE_SYMBOL,
                })?
        };
        let setup: Option<SetupFn> =
            unsafe { library.get::<SetupFn>(SETUP_SYMBOL.as_bytes()).ok().map(|s| *s) };

        Ok(Box::new(DylibModule {
            setup,
            execute,
            _library: library,
        }))
    }
}

struct DylibModule {
    setup: Option<SetupFn>,
    execute: ExecuteFn,
    // Keeps the entry points above mapped
    _library: Library,
}

impl PluginModule for DylibModule {
    fn setup(&self) -> Result<(), HostError> {
        if let Some(setup) = self.setup {
            unsafe { setup() };
        }
        Ok(())
    }

    fn execute(&self, argument: &str) -> Result<i32, HostError> {
        let argument = CString::new(argument)?;
        Ok(unsafe { (self.execute)(argument.as_ptr()) })
    }
}
