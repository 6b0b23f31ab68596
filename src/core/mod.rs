pub mod package;
pub mod version;

pub use package::{Dependency, Package, PackageId, PackageState};
pub use version::{Version, VersionRange};
