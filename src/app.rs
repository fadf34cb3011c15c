use gtk4::prelude::*;
use gtk4::Application;
use tracing::error;

use crate::config::MedleyConfig;
use crate::ui::MainWindow;

const APP_ID: &str = "com.medley.MediaBrowser";

pub struct MedleyApp {
    app: Application,
}

impl MedleyApp {
    pub fn new() -> Self {
        let app = Application::builder().application_id(APP_ID).build();
        app.connect_activate(Self::on_activate);
        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn on_activate(app: &Application) {
        let config = match MedleyConfig::load_default() {
            Ok(config) => config,
            Err(err) => {
                error!(%err, "failed to load config, using defaults");
                MedleyConfig::default()
            }
        };

        match MainWindow::new(app, config) {
            Ok(window) => {
                window.present();
                // Keep the window alive by storing it on the Application.
                unsafe {
                    app.set_data("main-window", window);
                }
            }
            Err(err) => {
                error!(%err, "failed to build main window");
                app.quit();
            }
        }
    }
}

impl Default for MedleyApp {
    fn default() -> Self {
        Self::new()
    }
}
