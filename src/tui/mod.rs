pub mod canvas;
pub mod editor;
pub mod input;
pub mod render;
