/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use std::{env::var, sync::Arc};

use actix_web::{web, App, HttpServer};
use speed_alert_service::{
    bus::kafka::KafkaBus,
    domain::api,
    environment::{read_dhall_config, AppState},
    router::TelemetryRouter,
    tools::{error::AppError, logger::*, prometheus::prometheus_metrics},
};
use tokio::{
    signal::unix::{signal, SignalKind},
    sync::watch,
};
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn start_server() -> anyhow::Result<()> {
    let dhall_config_path = var("DHALL_CONFIG")
        .unwrap_or_else(|_| "./dhall_config/speed_alert_service.dhall".to_string());
    let app_config = read_dhall_config(&dhall_config_path).unwrap_or_else(|err| {
        println!("Dhall Config Reading Error : {}", err);
        std::process::exit(1);
    });

    let _guard = setup_tracing(app_config.logger_cfg)?;

    std::panic::set_hook(Box::new(|panic_info| {
        let reason = panic_info.to_string();
        error!(tag = "[Panic]", error = %AppError::PanicOccured(reason));
    }));

    let bus = Arc::new(KafkaBus::new(
        app_config.kafka_cfg.to_owned(),
        app_config.inbound_channel_capacity,
    ));
    let mut router = TelemetryRouter::new(app_config.router_cfg.to_owned(), bus);
    router.start().await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    for (kind, name) in [
        (SignalKind::terminate(), "SIGTERM"),
        (SignalKind::interrupt(), "SIGINT"),
    ] {
        let mut listener = signal(kind)?;
        let shutdown_tx = shutdown_tx.to_owned();
        tokio::spawn(async move {
            listener.recv().await;
            info!(tag = "[Shutdown Requested]", signal = %name);
            shutdown_tx.send_replace(true);
        });
    }

    let data = web::Data::new(AppState::new(router.state_watch()));
    let prometheus = prometheus_metrics();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(TracingLogger::default())
            .wrap(prometheus.clone())
            .configure(api::handler)
    })
    .workers(app_config.workers)
    .disable_signals()
    .bind(("0.0.0.0", app_config.port))?
    .run();

    let server_handle = server.handle();
    let router_thread = tokio::spawn(async move {
        let result = router.run(shutdown_rx).await;
        server_handle.stop(true).await;
        result
    });

    server.await?;
    router_thread.await??;

    Ok(())
}

fn main() {
    if let Err(err) = start_server() {
        eprintln!("Speed Alert Service Failed : {:?}", err);
        std::process::exit(1);
    }
}
