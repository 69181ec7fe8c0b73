//! Library closure and link ordering.
//!
//! Static archives are searched left to right, so a library has to appear
//! before every library it depends on. Starting from the libraries the
//! project sources reference, each not-yet-scanned library is scanned in
//! turn; any already-used library it references is moved to the tail, and
//! newly seen ones are appended. Scanning stops once every used library has
//! been scanned.
//!
//! This is not a topological sort. A dependency is moved behind the library
//! whose scan observed it, but a library bumped after its own scan does not
//! drag its dependencies along, and for a cycle the result is whatever the
//! scan sequence produced.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::library::Library;
use crate::lister::DependencyLister;
use crate::scan::DependencyScanner;

/// Resolve the ordered set of libraries used by the sources in `src_dir`.
pub fn resolve<L: DependencyLister + ?Sized>(
    scanner: &mut DependencyScanner<'_, L>,
    src_dir: &Path,
) -> Result<Vec<Library>> {
    let direct = scanner.scan(src_dir)?;
    let used = order_libraries(direct, |lib| scanner.scan(lib.path()))?;
    log::info!(
        "resolved libraries: [{}]",
        used.iter().map(Library::name).collect::<Vec<_>>().join(", ")
    );
    Ok(used)
}

/// Close `initial` over `dependencies_of` and order the result.
///
/// `dependencies_of` is called exactly once per library that ends up in the
/// result.
pub fn order_libraries<F>(initial: Vec<Library>, mut dependencies_of: F) -> Result<Vec<Library>>
where
    F: FnMut(&Library) -> Result<Vec<Library>>,
{
    let mut used: Vec<Library> = Vec::with_capacity(initial.len());
    for lib in initial {
        if !used.contains(&lib) {
            used.push(lib);
        }
    }
    let mut scanned: HashSet<Library> = HashSet::new();

    loop {
        let pending: Vec<Library> = used
            .iter()
            .filter(|lib| !scanned.contains(*lib))
            .cloned()
            .collect();
        if pending.is_empty() {
            break;
        }

        for lib in pending {
            let mut deps: Vec<Library> = Vec::new();
            for dep in dependencies_of(&lib)? {
                if dep != lib && !deps.contains(&dep) {
                    deps.push(dep);
                }
            }

            // Already-used dependencies move to the tail in their current order.
            for existing in used.clone() {
                if let Some(at) = deps.iter().position(|d| *d == existing) {
                    deps.remove(at);
                    if let Some(pos) = used.iter().position(|u| *u == existing) {
                        let moved = used.remove(pos);
                        used.push(moved);
                    }
                }
            }
            used.extend(deps);
            scanned.insert(lib);
        }
    }

    Ok(used)
}
