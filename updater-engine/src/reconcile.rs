//! Merge discovered package directories into the persisted list.

use std::collections::HashSet;

use updater_core::{Package, PackageList, PackageName};

/// Append every discovered name not yet in `persisted`, in discovery order.
///
/// Existing entries keep their position. A name repeated in `persisted`
/// keeps only its first occurrence.
pub fn reconcile(persisted: PackageList, discovered: &[PackageName]) -> PackageList {
    let mut seen: HashSet<PackageName> = HashSet::with_capacity(persisted.len() + discovered.len());
    let mut packages = PackageList::with_capacity(persisted.len() + discovered.len());

    for package in persisted {
        if seen.insert(package.name.clone()) {
            packages.push(package);
        } else {
            tracing::warn!(pkg_name = %package.name, "dropping duplicate state entry");
        }
    }
    let before = packages.len();
    for name in discovered {
        if seen.insert(name.clone()) {
            packages.push(Package::new(name.clone()));
        }
    }
    if packages.len() > before {
        tracing::info!(num_of_new_packages = packages.len() - before, "appended new packages");
    }
    packages
}
