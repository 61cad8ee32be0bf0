use std::process::ExitCode;
use std::sync::Arc;

use floodboard_service::config::Config;
use floodboard_service::line::{ChatCommandHandler, LineBot, LineMessagingClient};
use floodboard_service::logging::{self, Component};
use floodboard_service::store::{ReportLedger, open_store};
use floodboard_service::web::{self, AppContext};

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let store = match open_store(&config.store) {
        Ok(store) => store,
        Err(e) => {
            logging::log_store_failure(config.store.backend.as_str(), "Open report store", &e);
            return ExitCode::FAILURE;
        }
    };
    let ledger = Arc::new(ReportLedger::new(store, &config.retention));
    // An unreachable database is not fatal: reads degrade to Monitoring.
    ledger.init_schema();

    let categories = config.category_table();

    // Built before the runtime starts: the blocking HTTP client must not be
    // created or dropped inside an async context.
    let line = match config.line.credentials() {
        Some(creds) => match LineMessagingClient::new(&config.line.api_base, &creds.channel_access_token) {
            Ok(client) => {
                let handler = ChatCommandHandler::new(
                    &config.line.status_command,
                    config.consensus.min_reports,
                    categories.clone(),
                );
                Some(Arc::new(LineBot::new(&creds.channel_secret, handler, Arc::new(client))))
            }
            Err(e) => {
                logging::error(Component::Line, None, &format!("LINE client unavailable: {}", e));
                None
            }
        },
        None => {
            logging::warn(Component::Line, None, "LINE credentials not set; webhook will answer 503");
            None
        }
    };

    logging::info(
        Component::System,
        None,
        &format!(
            "Flood board starting: store={}, strategy={:?}, min_reports={}, keep_recent={}",
            ledger.backend_name(),
            config.consensus.strategy,
            config.consensus.min_reports,
            config.retention.keep_recent,
        ),
    );

    let ctx = Arc::new(AppContext {
        ledger: ledger.clone(),
        consensus: config.consensus.clone(),
        categories,
        line: line.clone(),
    });

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            logging::error(Component::System, None, &format!("Cannot start runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(web::serve(&config.server.listen_addr, ctx));
    // Shut the runtime down first so the last references to the store and
    // the LINE client are dropped here, outside any async context.
    drop(runtime);
    drop(line);
    drop(ledger);

    match result {
        Ok(()) => {
            logging::info(Component::System, None, "Shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(e) => {
            logging::error(Component::System, None, &e);
            ExitCode::FAILURE
        }
    }
}
