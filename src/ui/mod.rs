mod gallery_view;
mod keys;
mod overlays;
mod toolbar;
mod window;

pub use window::MainWindow;
