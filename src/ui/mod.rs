pub mod prompt;
pub mod progress;

pub use prompt::TerminalOperator;
pub use progress::create_progress_bar;
