pub mod daemon;
pub mod paths;
pub mod portal;

pub use daemon::DaemonConfig;
pub use paths::ConfigPaths;
pub use portal::PortalConfig;
