// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

#![forbid(non_ascii_idents)]
#![deny(unsafe_code)]

use std::io;
use std::net::TcpListener;
use std::path::Path;

use actix::Actor;
use actix_web::{App, HttpServer, middleware, web};
use clap::{Command, arg};
use log::info;
use neo_blinds_cloud::configuration::{DEF_CONFIG_FILE, get_configuration};
use neo_blinds_cloud::server::{self, json_error_handler};
use neo_blinds_cloud::{APP_VERSION, Coordinator, built_info};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let args = Command::new(built_info::PKG_NAME)
        .author("Unfolded Circle ApS")
        .version(APP_VERSION)
        .about("Neo Smart Blinds cloud integration")
        .arg(arg!(-c --config <FILE> "Configuration file").required(false))
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg_file = match args.get_one::<String>("config") {
        None => {
            if Path::new(DEF_CONFIG_FILE).exists() {
                info!("Loading default configuration file: {DEF_CONFIG_FILE}");
                Some(DEF_CONFIG_FILE)
            } else {
                None
            }
        }
        Some(c) => Some(c.as_str()),
    };
    let cfg = get_configuration(cfg_file).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to read configuration: {e}"),
        )
    })?;

    if !cfg.integration.http.enabled {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "The http listener must be enabled",
        ));
    }
    let address = format!(
        "{}:{}",
        cfg.integration.interface, cfg.integration.http.port
    );
    info!(
        "{} {APP_VERSION} listening on: {address}",
        built_info::PKG_NAME
    );
    let listener = TcpListener::bind(address)?;

    let coordinator = web::Data::new(Coordinator::new(cfg).start());

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(
                web::JsonConfig::default()
                    .limit(16 * 1024) // limit size of the payload (global configuration)
                    .error_handler(json_error_handler),
            )
            .app_data(coordinator.clone())
            .configure(server::configure)
    })
    .workers(1)
    .listen(listener)?
    .run()
    .await
}
