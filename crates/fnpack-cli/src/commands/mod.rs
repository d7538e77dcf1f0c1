mod init;
mod package;
mod sdk;

pub use init::init_project;
pub use package::package;
pub use sdk::{SdkArgs, SdkPlatform, sdk};
