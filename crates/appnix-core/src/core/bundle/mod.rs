//! System implementations of the bundle and packaging seams.

mod desktop;
mod generator;
mod packager;

pub use desktop::{render_desktop_entry, write_desktop_entry};
pub use generator::ElectronBundleGenerator;
pub use packager::ElectronBuilderPackager;
