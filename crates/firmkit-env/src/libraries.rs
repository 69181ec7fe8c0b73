//! Library resolution against the discovered distribution.

use std::path::Path;

use firmkit_deps::{include_flags, list_subdirs, resolve, DependencyLister, DependencyScanner, Library};

use crate::discovery::keys;
use crate::environment::Environment;
use crate::error::Result;

impl Environment {
    /// Every library a project may link against, in scan order: the core,
    /// project libraries, distribution libraries, then the board variant.
    pub fn candidate_libraries(&self, variant_dir: Option<&Path>) -> Result<Vec<Library>> {
        let mut candidates = vec![Library::new(self.found(keys::CORE_DIR)?)];
        candidates.extend(list_subdirs(&self.settings.lib_dir)?.into_iter().map(Library::from));
        candidates.extend(
            list_subdirs(self.found(keys::LIBRARIES_DIR)?)?
                .into_iter()
                .map(Library::from),
        );
        if let Some(variant) = variant_dir {
            candidates.push(Library::new(variant));
        }
        Ok(candidates)
    }

    /// Work out which libraries the project uses and in what order to link
    /// them. Listings go under the build directory.
    ///
    /// Records the order in `used_libs`, the listings in `deps`, and appends
    /// include flags for the used libraries to `cflags`.
    pub fn resolve_libraries(&mut self, lister: &dyn DependencyLister, variant_dir: Option<&Path>) -> Result<()> {
        let candidates = self.candidate_libraries(variant_dir)?;
        let build_dir = self.build_dir()?.to_path_buf();

        let mut scanner = DependencyScanner::new(lister, &candidates, build_dir)?;
        let used = resolve(&mut scanner, &self.settings.src_dir)?;

        self.cflags.extend(include_flags(&used)?);
        self.deps = scanner.listings().to_vec();
        self.used_libs = used;
        Ok(())
    }
}
