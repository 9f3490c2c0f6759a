//! Symbol discovery cache kept under `<root>/cache`.

use std::path::PathBuf;

use log::{debug, warn};

use crate::lifecycle::SymbolCache;
use crate::runtime::Runtime;

pub struct DirSymbolCache<'a, R: Runtime> {
    runtime: &'a R,
    dir: PathBuf,
}

impl<'a, R: Runtime> DirSymbolCache<'a, R> {
    pub fn new(runtime: &'a R, dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            dir: dir.into(),
        }
    }
}

impl<R: Runtime> SymbolCache for DirSymbolCache<'_, R> {
    fn invalidate(&self) {
        if !self.runtime.exists(&self.dir) {
            return;
        }
        match self.runtime.remove_dir_all(&self.dir) {
            Ok(()) => debug!("Cleared symbol cache {:?}", self.dir),
            Err(e) => warn!("Failed to clear symbol cache {:?}: {:#}", self.dir, e),
        }
    }
}
