pub mod layout;
pub mod theme;
pub mod view;
pub mod widgets;
