use env_switcher::{logging, tui, Catalog};

fn main() {
    let catalog = match Catalog::from_env() {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Failed to load environments: {}", e);
            std::process::exit(1);
        }
    };

    // TUI 占用终端，日志写文件
    if let Err(e) = logging::init(&catalog.store_path()) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let mut app = match tui::App::new(&catalog) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run() {
        tracing::error!("tui exited with error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
