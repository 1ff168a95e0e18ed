mod edit;
mod keymap;
mod options;
mod repeat_ui;
mod runtime;
mod status;
mod terminal;

pub use options::UiOptions;
pub use repeat_ui::RepeatUI;
