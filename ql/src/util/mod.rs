pub mod format;
pub mod fs;
pub mod logging;
