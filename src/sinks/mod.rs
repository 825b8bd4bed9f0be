pub mod collecting;
pub mod logging;
