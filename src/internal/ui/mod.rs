pub mod app;
pub mod keybinding_validator;
pub mod keybindings;
pub mod keybindings_default;
pub mod scroll;
pub mod sort;
pub mod view;
