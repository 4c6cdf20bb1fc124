pub mod environment;
pub mod error;
pub mod game_process;
pub mod message;
pub mod model_process;
pub mod pipe;
pub mod progress;
pub mod supervisor;

#[cfg(test)]
#[ctor::ctor]
fn init() {
    ql::util::logging::init_test_logging()
}
