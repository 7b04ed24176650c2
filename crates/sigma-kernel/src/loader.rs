//! Dynamic loading of the compiled sigma library.

use crate::abi::{SigmaExecuteFn, DEFAULT_ENTRY_POINT};
use crate::call::KernelCall;
use crate::error::{KernelError, Result};
use crate::SigmaKernel;
use libloading::Library;
use std::cell::Cell;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_LIBRARY: &str = "sigma.so";

/// GSL, which the routine links against for its integrators. CBLAS first so
/// that libgsl can resolve against it.
pub const DEFAULT_DEPENDENCIES: &[&str] = &["libgslcblas.so", "libgsl.so"];

/// Where to find the routine and what it needs loaded before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySpec {
    pub path: PathBuf,
    /// Opened in order with global symbol visibility before `path`.
    pub dependencies: Vec<PathBuf>,
    pub entry_point: String,
}

impl Default for LibrarySpec {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LIBRARY),
            dependencies: DEFAULT_DEPENDENCIES.iter().map(PathBuf::from).collect(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
        }
    }
}

#[cfg(unix)]
unsafe fn open_global(path: &Path) -> std::result::Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
    UnixLibrary::open(Some(path.as_os_str()), RTLD_NOW | RTLD_GLOBAL).map(Library::from)
}

#[cfg(not(unix))]
unsafe fn open_global(path: &Path) -> std::result::Result<Library, libloading::Error> {
    Library::new(path.as_os_str())
}

fn open(path: &Path) -> Result<Library> {
    // Safety: loading runs the library's initialisers. The artifacts named in
    // a LibrarySpec are trusted numerical libraries supplied by the operator.
    unsafe { open_global(path) }.map_err(|source| KernelError::LibraryLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// The native routine, bound once at setup.
///
/// Holds every library it opened so the function pointer stays valid for
/// the kernel's lifetime. The routine's own thread safety is unknown, so the
/// kernel is `Send` but deliberately not `Sync`.
pub struct NativeKernel {
    execute: SigmaExecuteFn,
    path: PathBuf,
    entry_point: String,
    // Drop order: the main library before its dependencies.
    _library: Library,
    _dependencies: Vec<Library>,
    _single_caller: PhantomData<Cell<()>>,
}

impl std::fmt::Debug for NativeKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeKernel")
            .field("path", &self.path)
            .field("entry_point", &self.entry_point)
            .finish_non_exhaustive()
    }
}

impl NativeKernel {
    pub fn load(spec: &LibrarySpec) -> Result<Self> {
        let mut dependencies = Vec::with_capacity(spec.dependencies.len());
        for dep in &spec.dependencies {
            debug!(dependency = %dep.display(), "preloading native dependency");
            dependencies.push(open(dep)?);
        }

        let library = open(&spec.path)?;
        let execute = unsafe {
            // Safety: the entry point is declared with the SigmaExecuteFn
            // signature by the library's C code.
            let symbol: libloading::Symbol<SigmaExecuteFn> = library
                .get(spec.entry_point.as_bytes())
                .map_err(|source| KernelError::SymbolNotFound {
                    symbol: spec.entry_point.clone(),
                    path: spec.path.clone(),
                    source,
                })?;
            *symbol
        };

        info!(
            library = %spec.path.display(),
            entry_point = %spec.entry_point,
            dependencies = spec.dependencies.len(),
            "bound native sigma routine"
        );

        Ok(Self {
            execute,
            path: spec.path.clone(),
            entry_point: spec.entry_point.clone(),
            _library: library,
            _dependencies: dependencies,
            _single_caller: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

impl SigmaKernel for NativeKernel {
    fn launch(&self, call: &mut KernelCall<'_>) -> i32 {
        let args = *call.args();
        let int_config = *call.int_config();
        let output = call.output_mut();
        // Safety: KernelCall::new checked every slice against int_config, and
        // `output` has length n_m * n_z as the routine expects.
        unsafe {
            (self.execute)(
                args.omega_m,
                int_config.as_ptr(),
                args.k_h.as_ptr(),
                args.pk_z.as_ptr(),
                args.pk.as_ptr(),
                args.z.as_ptr(),
                args.log_m.as_ptr(),
                args.r.as_ptr(),
                output.as_mut_ptr(),
            )
        }
    }
}
